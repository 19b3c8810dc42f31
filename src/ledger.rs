//! external collaborators: the accounting ledger, the document submitter that
//! mints new payments, and the settlement gateway for mobile-money receipts.
//!
//! Implementations live outside this crate. Every call crosses an i/o
//! boundary, so callers wrap them with [`bounded`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationRecord;
use crate::decimal::{ExchangeRate, Money};
use crate::errors::LedgerError;
use crate::receivables::Invoice;
use crate::types::{CreditRef, InvoiceRef, PostingContext, ReceivableQuery, RunId};

/// an already posted payment with money left to allocate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnallocatedPayment {
    pub name: CreditRef,
    pub posting_date: NaiveDate,
    pub paid_amount: Money,
    pub unallocated_amount: Money,
    pub mode_of_payment: Option<String>,
    pub currency: String,
    pub paid_from: String,
    pub cost_center: Option<String>,
}

/// a submitted return invoice; outstanding is negative while credit remains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnNote {
    pub name: CreditRef,
    pub posting_date: NaiveDate,
    pub outstanding_amount: Money,
    pub currency: String,
    pub conversion_rate: ExchangeRate,
    pub return_against: Option<InvoiceRef>,
    pub debit_to: String,
    pub cost_center: Option<String>,
}

/// what the ledger reports as usable credit for a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreditRecord {
    Payment(UnallocatedPayment),
    ReturnNote(ReturnNote),
}

/// a confirmed gateway settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub name: CreditRef,
    pub transaction_id: String,
    pub amount: Money,
    pub currency: String,
    pub posting_date: NaiveDate,
    pub account: String,
}

/// request to mint a new customer payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    /// in the party currency
    pub amount: Money,
    /// in the bank account currency
    pub received_amount: Money,
    pub mode_of_payment: String,
    pub customer: String,
    pub company: String,
    pub currency: String,
    pub posting_date: NaiveDate,
    pub reference_no: Option<String>,
    pub cost_center: Option<String>,
}

/// a submitted payment document as returned by the document submitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDocument {
    pub name: CreditRef,
    pub mode_of_payment: String,
    pub posting_date: NaiveDate,
    pub paid_amount: Money,
    pub received_amount: Money,
    pub currency: String,
    pub paid_from: String,
    pub exchange_rate: ExchangeRate,
    pub cost_center: Option<String>,
}

/// one reconciliation write: a single credit against every invoice in its plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    pub run_id: RunId,
    pub credit: CreditRef,
    pub credit_kind: String,
    pub context: PostingContext,
    /// credit balance before this posting
    pub unreconciled_amount: Money,
    pub total_allocated: Money,
    pub records: Vec<AllocationRecord>,
}

impl PostingRequest {
    /// the credit side must equal the sum of the invoice lines
    pub fn is_balanced(&self, tolerance: Money) -> bool {
        let lines: Money = self.records.iter().map(|r| r.allocated_amount).sum();
        lines.within(self.total_allocated, tolerance) && self.total_allocated <= self.unreconciled_amount
    }
}

/// ledger answer to a posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingReceipt {
    pub posted: bool,
    /// amount the ledger actually moved off the credit
    pub ledger_delta: Money,
    pub error: Option<String>,
}

impl PostingReceipt {
    pub fn posted(ledger_delta: Money) -> Self {
        Self {
            posted: true,
            ledger_delta,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            posted: false,
            ledger_delta: Money::ZERO,
            error: Some(error.into()),
        }
    }
}

/// the accounting ledger; each posting call is its own transaction
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn outstanding_invoices(&self, query: &ReceivableQuery) -> Result<Vec<Invoice>, LedgerError>;

    async fn unallocated_credits(&self, query: &ReceivableQuery) -> Result<Vec<CreditRecord>, LedgerError>;

    async fn post_reconciliation(&self, request: &PostingRequest) -> Result<PostingReceipt, LedgerError>;

    async fn read_outstanding(&self, invoice: &InvoiceRef) -> Result<Money, LedgerError>;

    async fn read_unallocated(&self, credit: &CreditRef) -> Result<Money, LedgerError>;
}

/// creates and submits new payment documents
#[async_trait]
pub trait DocumentSubmitter: Send + Sync {
    async fn create_payment(&self, draft: &PaymentDraft) -> Result<PaymentDocument, LedgerError>;
}

/// supplies externally confirmed settlements for a reference
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    async fn settlements(&self, reference: &str, customer: &str) -> Result<Vec<SettlementRecord>, LedgerError>;
}

/// run a collaborator call under a deadline; an elapsed deadline is a timeout error
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout {
            millis: timeout.as_millis() as u64,
        }),
    }
}
