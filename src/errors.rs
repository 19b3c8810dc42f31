use thiserror::Error;

use crate::decimal::Money;
use crate::types::{CreditRef, InvoiceRef};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} {reference} not found")]
    NotFound {
        kind: &'static str,
        reference: String,
    },

    #[error("invariant violated on {reference}: requested {requested}, available {available}")]
    Invariant {
        reference: String,
        requested: Money,
        available: Money,
    },

    #[error("illegal lifecycle transition for {credit}: {from} -> {to}")]
    IllegalTransition {
        credit: CreditRef,
        from: String,
        to: String,
    },

    #[error("posting failed for {credit}: {message}")]
    Posting {
        credit: CreditRef,
        message: String,
    },

    #[error("ledger disagrees for {credit}: allocated locally {local}, ledger delta {ledger}")]
    Consistency {
        credit: CreditRef,
        local: Money,
        ledger: Money,
    },

    /// `new_payments` lists documents already created before the batch failed
    #[error("ledger unreachable for the whole batch after {attempts} posting attempt(s), created payments: {new_payments:?}")]
    LedgerUnreachable {
        attempts: usize,
        new_payments: Vec<CreditRef>,
    },

    #[error("unable to {operation}: {message}")]
    Collaborator {
        operation: &'static str,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl ReconcileError {
    pub fn invoice_not_found(reference: &InvoiceRef) -> Self {
        ReconcileError::NotFound {
            kind: "invoice",
            reference: reference.clone(),
        }
    }

    pub fn credit_not_found(reference: &CreditRef) -> Self {
        ReconcileError::NotFound {
            kind: "credit",
            reference: reference.clone(),
        }
    }

    /// failures that abort the whole run rather than a single credit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::Validation(_)
                | ReconcileError::LedgerUnreachable { .. }
                | ReconcileError::Collaborator { .. }
                | ReconcileError::InvalidConfiguration { .. }
        )
    }
}

/// batch preconditions, checked before anything is mutated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("customer is required")]
    MissingCustomer,

    #[error("company is required")]
    MissingCompany,

    #[error("currency is required")]
    MissingCurrency,

    #[error("an open shift is required")]
    MissingShift,

    #[error("pos profile is required")]
    MissingPosProfile,

    #[error("payments are not enabled for this pos profile")]
    PaymentsDisabled,

    #[error("invalid amount for {field}: {amount}")]
    InvalidAmount {
        field: String,
        amount: Money,
    },
}

/// failures reported by the external collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out after {millis}ms")]
    Timeout {
        millis: u64,
    },
}

impl LedgerError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_) | LedgerError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ReconcileError::invoice_not_found(&"SINV-0001".to_string());
        assert_eq!(err.to_string(), "invoice SINV-0001 not found");

        let err: ReconcileError = ValidationError::MissingShift.into();
        assert_eq!(err.to_string(), "validation failed: an open shift is required");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_per_credit_errors_are_not_fatal() {
        let err = ReconcileError::Posting {
            credit: "PE-1".to_string(),
            message: "locked".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(ReconcileError::LedgerUnreachable {
            attempts: 3,
            new_payments: Vec::new(),
        }
        .is_fatal());
    }
}
