pub mod conversion;
pub mod ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{ExchangeRate, Money};
use crate::errors::{ReconcileError, Result};
use crate::ledger::{PaymentDocument, ReturnNote, SettlementRecord, UnallocatedPayment};
use crate::types::{CreditPhase, CreditRef, InvoiceRef, PostingContext};

pub use conversion::{paid_and_received, PaidAmounts, PaymentDirection};
pub use ordering::CreditQueue;

/// variant-specific data of a credit instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditKind {
    /// payment minted in this run
    CashPayment {
        mode_of_payment: String,
        received_amount: Money,
    },
    /// previously posted payment with an unallocated remainder
    ExistingPayment {
        mode_of_payment: Option<String>,
    },
    /// return invoice whose negative outstanding is spendable credit
    CreditNote {
        return_against: Option<InvoiceRef>,
    },
    /// gateway-confirmed settlement
    SettlementPayment {
        transaction_id: String,
    },
}

impl CreditKind {
    pub fn phase(&self) -> CreditPhase {
        match self {
            CreditKind::SettlementPayment { .. } => CreditPhase::Settlement,
            CreditKind::ExistingPayment { .. } | CreditKind::CreditNote { .. } => CreditPhase::Existing,
            CreditKind::CashPayment { .. } => CreditPhase::NewPayment,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CreditKind::CashPayment { .. } => "New Payment",
            CreditKind::ExistingPayment { .. } => "Payment Entry",
            CreditKind::CreditNote { .. } => "Credit Note",
            CreditKind::SettlementPayment { .. } => "Settlement",
        }
    }
}

/// a credit normalised into the one shape the planner consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub reference: CreditRef,
    pub kind: CreditKind,
    pub posting_date: NaiveDate,
    /// position in the order the credits were gathered
    pub creation_order: u64,
    original_amount: Money,
    available: Money,
    posting: PostingContext,
}

impl Credit {
    /// create a credit; negative amounts are clamped to zero so the planner skips them
    pub fn new(
        reference: impl Into<CreditRef>,
        kind: CreditKind,
        amount_available: Money,
        posting_date: NaiveDate,
        posting: PostingContext,
    ) -> Self {
        let amount = amount_available.max(Money::ZERO);
        Self {
            reference: reference.into(),
            kind,
            posting_date,
            creation_order: 0,
            original_amount: amount,
            available: amount,
            posting,
        }
    }

    pub fn from_unallocated_payment(payment: UnallocatedPayment, party: &str) -> Self {
        Self::new(
            payment.name,
            CreditKind::ExistingPayment {
                mode_of_payment: payment.mode_of_payment,
            },
            payment.unallocated_amount,
            payment.posting_date,
            PostingContext {
                account: payment.paid_from,
                party: party.to_string(),
                currency: payment.currency,
                exchange_rate: ExchangeRate::PAR,
                cost_center: payment.cost_center,
            },
        )
    }

    /// return notes carry their credit as negative outstanding
    pub fn from_return_note(note: ReturnNote, party: &str) -> Self {
        Self::new(
            note.name,
            CreditKind::CreditNote {
                return_against: note.return_against,
            },
            note.outstanding_amount.abs(),
            note.posting_date,
            PostingContext {
                account: note.debit_to,
                party: party.to_string(),
                currency: note.currency,
                exchange_rate: note.conversion_rate,
                cost_center: note.cost_center,
            },
        )
    }

    pub fn from_settlement(settlement: SettlementRecord, party: &str) -> Self {
        Self::new(
            settlement.name,
            CreditKind::SettlementPayment {
                transaction_id: settlement.transaction_id,
            },
            settlement.amount,
            settlement.posting_date,
            PostingContext {
                account: settlement.account,
                party: party.to_string(),
                currency: settlement.currency,
                exchange_rate: ExchangeRate::PAR,
                cost_center: None,
            },
        )
    }

    pub fn from_payment_document(doc: PaymentDocument, party: &str) -> Self {
        Self::new(
            doc.name,
            CreditKind::CashPayment {
                mode_of_payment: doc.mode_of_payment,
                received_amount: doc.received_amount,
            },
            doc.paid_amount,
            doc.posting_date,
            PostingContext {
                account: doc.paid_from,
                party: party.to_string(),
                currency: doc.currency,
                exchange_rate: doc.exchange_rate,
                cost_center: doc.cost_center,
            },
        )
    }

    pub fn phase(&self) -> CreditPhase {
        self.kind.phase()
    }

    pub fn is_credit_note(&self) -> bool {
        matches!(self.kind, CreditKind::CreditNote { .. })
    }

    pub fn currency(&self) -> &str {
        &self.posting.currency
    }

    pub fn amount_available(&self) -> Money {
        self.available
    }

    /// amount the credit carried when it entered the run
    pub fn original_amount(&self) -> Money {
        self.original_amount
    }

    /// amount consumed so far in this run
    pub fn consumed(&self) -> Money {
        self.original_amount - self.available
    }

    /// decrement the available balance; never past zero
    pub fn consume(&mut self, amount: Money) -> Result<()> {
        if !amount.is_positive() || amount > self.available {
            return Err(ReconcileError::Invariant {
                reference: self.reference.clone(),
                requested: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        Ok(())
    }

    /// inverse of `consume`; never above the original amount
    pub fn refund(&mut self, amount: Money) -> Result<()> {
        let consumed = self.consumed();
        if !amount.is_positive() || amount > consumed {
            return Err(ReconcileError::Invariant {
                reference: self.reference.clone(),
                requested: amount,
                available: consumed,
            });
        }
        self.available += amount;
        Ok(())
    }

    pub fn as_posting_context(&self) -> &PostingContext {
        &self.posting
    }
}
