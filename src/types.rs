use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::ExchangeRate;

/// voucher reference of a sales invoice
pub type InvoiceRef = String;

/// voucher reference of a credit instrument (payment entry, credit note, settlement)
pub type CreditRef = String;

/// unique identifier for a reconciliation run
pub type RunId = Uuid;

/// processing phase of a credit; runs always go settlement -> existing -> new
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreditPhase {
    /// credits produced by a payment gateway settlement (mobile money)
    Settlement,
    /// already posted credits: unallocated payments and return credit notes
    Existing,
    /// payments minted during this run
    NewPayment,
}

/// accounting context a credit is posted under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingContext {
    pub account: String,
    pub party: String,
    pub currency: String,
    pub exchange_rate: ExchangeRate,
    pub cost_center: Option<String>,
}

/// filter used to load receivables and credits for one customer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReceivableQuery {
    pub customer: String,
    pub company: String,
    pub currency: Option<String>,
    pub pos_profile: Option<String>,
}

impl ReceivableQuery {
    pub fn new(customer: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            customer: customer.into(),
            company: company.into(),
            currency: None,
            pos_profile: None,
        }
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn pos_profile(mut self, profile: impl Into<String>) -> Self {
        self.pos_profile = Some(profile.into());
        self
    }
}
