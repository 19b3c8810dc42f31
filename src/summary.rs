use serde::{Deserialize, Serialize};

use crate::allocation::AllocationRecord;
use crate::decimal::{format_money, Money, Precision};
use crate::receivables::ReceivableSet;
use crate::state::CreditState;
use crate::types::{CreditRef, InvoiceRef, RunId};

/// what a committed credit settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAllocation {
    pub credit: CreditRef,
    pub credit_kind: String,
    pub allocated_amount: Money,
    /// balance left on the credit after the run
    pub unapplied: Money,
    pub allocations: Vec<InvoiceAllocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAllocation {
    pub invoice: InvoiceRef,
    pub amount: Money,
}

impl From<&AllocationRecord> for InvoiceAllocation {
    fn from(record: &AllocationRecord) -> Self {
        Self {
            invoice: record.invoice.clone(),
            amount: record.allocated_amount,
        }
    }
}

/// category of a skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipKind {
    NoCreditBalance,
    NoOutstandingInvoices,
    NotFound,
    SourceUnavailable,
    CurrencyMismatch,
    CreationFailed,
    Invariant,
    Posting,
}

/// a credit that was not allocated, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCredit {
    pub credit: CreditRef,
    pub kind: SkipKind,
    pub reason: String,
}

/// ledger disagreed with the local allocation after a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub credit: CreditRef,
    pub local: Money,
    pub ledger: Option<Money>,
    pub message: String,
}

/// outcome of a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub run_id: RunId,
    pub message: String,
    pub allocations: Vec<CreditAllocation>,
    pub skipped_payments: Vec<SkippedCredit>,
    pub consistency_issues: Vec<ConsistencyIssue>,
    /// payments minted during the run, allocated or not
    pub new_payments: Vec<CreditRef>,
    pub total_allocated: Money,
    pub remaining_outstanding: Money,
    pub outstanding_count: usize,
    pub reconciled_count: usize,
    pub processed_count: usize,
    pub cancelled: bool,
    pub unprocessed: Vec<CreditRef>,
    pub final_states: Vec<(CreditRef, CreditState)>,
}

impl ReconciliationSummary {
    /// summary for a run that stopped before any credit was considered
    pub fn early_exit(run_id: RunId, message: impl Into<String>, receivables: &ReceivableSet, processed: usize) -> Self {
        Self {
            run_id,
            message: message.into(),
            allocations: Vec::new(),
            skipped_payments: Vec::new(),
            consistency_issues: Vec::new(),
            new_payments: Vec::new(),
            total_allocated: Money::ZERO,
            remaining_outstanding: receivables.total_outstanding(),
            outstanding_count: receivables.open_count(),
            reconciled_count: 0,
            processed_count: processed,
            cancelled: false,
            unprocessed: Vec::new(),
            final_states: Vec::new(),
        }
    }

    pub fn allocation_for(&self, credit: &str) -> Option<&CreditAllocation> {
        self.allocations.iter().find(|a| a.credit == credit)
    }

    pub fn skip_for(&self, credit: &str) -> Option<&SkippedCredit> {
        self.skipped_payments.iter().find(|s| s.credit == credit)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// incremental builder used while the run is in flight
#[derive(Debug)]
pub struct SummaryBuilder {
    run_id: RunId,
    allocations: Vec<CreditAllocation>,
    skipped: Vec<SkippedCredit>,
    issues: Vec<ConsistencyIssue>,
    new_payments: Vec<CreditRef>,
    processed: usize,
    cancelled: bool,
    unprocessed: Vec<CreditRef>,
    final_states: Vec<(CreditRef, CreditState)>,
}

impl SummaryBuilder {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            allocations: Vec::new(),
            skipped: Vec::new(),
            issues: Vec::new(),
            new_payments: Vec::new(),
            processed: 0,
            cancelled: false,
            unprocessed: Vec::new(),
            final_states: Vec::new(),
        }
    }

    pub fn record_allocation(&mut self, allocation: CreditAllocation) {
        self.allocations.push(allocation);
    }

    pub fn record_skip(&mut self, credit: impl Into<CreditRef>, kind: SkipKind, reason: impl Into<String>) {
        self.skipped.push(SkippedCredit {
            credit: credit.into(),
            kind,
            reason: reason.into(),
        });
    }

    pub fn record_issue(&mut self, issue: ConsistencyIssue) {
        self.issues.push(issue);
    }

    pub fn record_new_payment(&mut self, credit: CreditRef) {
        self.new_payments.push(credit);
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    pub fn record_final_state(&mut self, credit: CreditRef, state: CreditState) {
        self.final_states.push((credit, state));
    }

    pub fn mark_cancelled(&mut self, unprocessed: Vec<CreditRef>) {
        self.cancelled = true;
        self.unprocessed = unprocessed;
    }

    pub fn total_allocated(&self) -> Money {
        self.allocations.iter().map(|a| a.allocated_amount).sum()
    }

    pub fn new_payments(&self) -> &[CreditRef] {
        &self.new_payments
    }

    pub fn reconciled(&self) -> usize {
        self.allocations.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped.len()
    }

    /// freeze the summary against the final receivable state
    pub fn finalize(self, receivables: &ReceivableSet, currency: &str, precision: Precision) -> ReconciliationSummary {
        let total_allocated = self.total_allocated();
        let remaining_outstanding = receivables.total_outstanding();
        let outstanding_count = receivables.open_count();

        let mut parts = Vec::new();
        if total_allocated.is_positive() {
            parts.push(format!(
                "Allocated {} across {} payment(s).",
                format_money(total_allocated, currency, precision),
                self.allocations.len()
            ));
        } else {
            parts.push("No allocations were made.".to_string());
        }
        parts.push(format!(
            "Remaining outstanding: {} across {} invoice(s).",
            format_money(remaining_outstanding, currency, precision),
            outstanding_count
        ));
        if !self.skipped.is_empty() {
            parts.push(format!("{} payment(s) were skipped.", self.skipped.len()));
        }
        if self.cancelled {
            parts.push(format!("Run cancelled with {} credit(s) unprocessed.", self.unprocessed.len()));
        }

        ReconciliationSummary {
            run_id: self.run_id,
            message: parts.join(" "),
            reconciled_count: self.allocations.len(),
            allocations: self.allocations,
            skipped_payments: self.skipped,
            consistency_issues: self.issues,
            new_payments: self.new_payments,
            total_allocated,
            remaining_outstanding,
            outstanding_count,
            processed_count: self.processed,
            cancelled: self.cancelled,
            unprocessed: self.unprocessed,
            final_states: self.final_states,
        }
    }
}
