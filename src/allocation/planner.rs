use serde::{Deserialize, Serialize};

use crate::credits::Credit;
use crate::decimal::{ExchangeRate, Money};
use crate::receivables::ReceivableSet;
use crate::types::{CreditRef, InvoiceRef};

/// an amount moved from one credit onto one invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub credit: CreditRef,
    pub invoice: InvoiceRef,
    pub allocated_amount: Money,
    /// invoice balance when the record was planned
    pub outstanding_before: Money,
    pub currency: String,
    pub exchange_rate: ExchangeRate,
}

/// why a plan came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// credit carries no positive balance
    NoCreditBalance,
    /// nothing left to settle
    NoOutstandingInvoices,
}

impl SkipReason {
    pub fn describe(&self, credit: &Credit) -> String {
        match self {
            SkipReason::NoCreditBalance => format!(
                "{} {} has no remaining balance to allocate.",
                credit.kind.label(),
                credit.reference
            ),
            SkipReason::NoOutstandingInvoices => format!(
                "no outstanding invoices were available to reconcile {} {}.",
                credit.kind.label(),
                credit.reference
            ),
        }
    }
}

/// result of planning one credit against the current receivables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub credit: CreditRef,
    pub records: Vec<AllocationRecord>,
    /// credit that stays unapplied after the plan
    pub leftover: Money,
    pub skip: Option<SkipReason>,
}

impl AllocationPlan {
    fn skipped(credit: &Credit, reason: SkipReason) -> Self {
        Self {
            credit: credit.reference.clone(),
            records: Vec::new(),
            leftover: credit.amount_available().max(Money::ZERO),
            skip: Some(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total(&self) -> Money {
        self.records.iter().map(|r| r.allocated_amount).sum()
    }
}

/// greedy oldest-first matcher
///
/// Walks the receivables in their canonical order and gives each open invoice
/// `min(remaining credit, outstanding)` until either side runs dry. Pure: the
/// receivables and the credit are only read.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationPlanner;

impl AllocationPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, receivables: &ReceivableSet, credit: &Credit) -> AllocationPlan {
        let available = credit.amount_available();
        if !available.is_positive() {
            return AllocationPlan::skipped(credit, SkipReason::NoCreditBalance);
        }
        if !receivables.total_outstanding().is_positive() {
            return AllocationPlan::skipped(credit, SkipReason::NoOutstandingInvoices);
        }

        let context = credit.as_posting_context();
        let mut remaining = available;
        let mut records = Vec::new();

        for invoice in receivables.invoices() {
            if !remaining.is_positive() {
                break;
            }
            let outstanding = invoice.outstanding_amount;
            if !outstanding.is_positive() {
                continue;
            }

            let allocation = remaining.min(outstanding);
            records.push(AllocationRecord {
                credit: credit.reference.clone(),
                invoice: invoice.voucher.clone(),
                allocated_amount: allocation,
                outstanding_before: outstanding,
                currency: context.currency.clone(),
                exchange_rate: context.exchange_rate,
            });
            remaining -= allocation;
        }

        AllocationPlan {
            credit: credit.reference.clone(),
            records,
            leftover: remaining,
            skip: None,
        }
    }
}
