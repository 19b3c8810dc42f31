use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decimal::Money;
use crate::errors::{ReconcileError, Result};
use crate::ledger::{bounded, Ledger};
use crate::types::{InvoiceRef, ReceivableQuery};

/// an outstanding sales invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub voucher: InvoiceRef,
    pub outstanding_amount: Money,
    pub invoice_amount: Money,
    pub posting_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
}

impl Invoice {
    pub fn new(
        voucher: impl Into<InvoiceRef>,
        outstanding_amount: Money,
        posting_date: NaiveDate,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            voucher: voucher.into(),
            outstanding_amount,
            invoice_amount: outstanding_amount,
            posting_date,
            due_date: None,
            currency: currency.into(),
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// oldest posting date first, then due date (posting date when absent), then voucher
    fn sort_key(&self) -> (NaiveDate, NaiveDate, &str) {
        (
            self.posting_date,
            self.due_date.unwrap_or(self.posting_date),
            self.voucher.as_str(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    invoice: Invoice,
    loaded_outstanding: Money,
}

/// the customer's open receivables for one run, in allocation order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReceivableSet {
    entries: Vec<Entry>,
    index: HashMap<InvoiceRef, usize>,
}

impl ReceivableSet {
    /// build from invoices; non-positive balances are dropped and the rest ordered
    pub fn new(invoices: Vec<Invoice>) -> Self {
        let mut invoices: Vec<Invoice> = invoices
            .into_iter()
            .filter(|inv| inv.outstanding_amount.is_positive())
            .collect();
        invoices.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut set = Self::default();
        for invoice in invoices {
            if set.index.contains_key(&invoice.voucher) {
                warn!(invoice = %invoice.voucher, "duplicate invoice in receivable set, ignoring");
                continue;
            }
            set.index.insert(invoice.voucher.clone(), set.entries.len());
            set.entries.push(Entry {
                loaded_outstanding: invoice.outstanding_amount,
                invoice,
            });
        }
        set
    }

    /// fetch the customer's outstanding invoices from the ledger
    pub async fn load(
        ledger: &dyn Ledger,
        query: &ReceivableQuery,
        timeout: Duration,
    ) -> Result<Self> {
        let invoices = bounded(timeout, ledger.outstanding_invoices(query))
            .await
            .map_err(|e| ReconcileError::Collaborator {
                operation: "load outstanding invoices",
                message: e.to_string(),
            })?;

        let invoices = match &query.currency {
            Some(currency) => invoices
                .into_iter()
                .filter(|inv| &inv.currency == currency)
                .collect(),
            None => invoices,
        };

        let set = Self::new(invoices);
        debug!(
            customer = %query.customer,
            open = set.open_count(),
            total = %set.total_outstanding(),
            "loaded receivables"
        );
        Ok(set)
    }

    /// build from an operator selection, refreshing balances the caller did not know
    pub async fn from_selection(
        ledger: &dyn Ledger,
        mut selection: Vec<Invoice>,
        timeout: Duration,
    ) -> Self {
        for invoice in selection.iter_mut() {
            if invoice.outstanding_amount.is_positive() {
                continue;
            }
            invoice.outstanding_amount =
                match bounded(timeout, ledger.read_outstanding(&invoice.voucher)).await {
                    Ok(amount) => amount,
                    Err(e) => {
                        warn!(invoice = %invoice.voucher, error = %e, "could not refresh outstanding");
                        Money::ZERO
                    }
                };
        }
        Self::new(selection)
    }

    /// keep only invoices billed in `currency`
    pub fn in_currency(self, currency: &str) -> Self {
        let dropped = self.entries.iter().filter(|e| e.invoice.currency != currency).count();
        if dropped > 0 {
            debug!(currency, dropped, "invoices in other currencies left out");
        }
        Self::new(
            self.entries
                .into_iter()
                .map(|e| e.invoice)
                .filter(|inv| inv.currency == currency)
                .collect(),
        )
    }

    /// invoices in allocation order
    pub fn invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.entries.iter().map(|e| &e.invoice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, invoice: &InvoiceRef) -> Result<&Entry> {
        self.index
            .get(invoice)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ReconcileError::invoice_not_found(invoice))
    }

    fn entry_mut(&mut self, invoice: &InvoiceRef) -> Result<&mut Entry> {
        match self.index.get(invoice) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(ReconcileError::invoice_not_found(invoice)),
        }
    }

    /// current outstanding of an invoice
    pub fn remaining(&self, invoice: &InvoiceRef) -> Result<Money> {
        Ok(self.entry(invoice)?.invoice.outstanding_amount)
    }

    /// decrement outstanding; never past zero
    pub fn apply(&mut self, invoice: &InvoiceRef, amount: Money) -> Result<()> {
        let entry = self.entry_mut(invoice)?;
        let available = entry.invoice.outstanding_amount;
        if !amount.is_positive() || amount > available {
            return Err(ReconcileError::Invariant {
                reference: invoice.clone(),
                requested: amount,
                available,
            });
        }
        entry.invoice.outstanding_amount -= amount;
        Ok(())
    }

    /// inverse of `apply`, never above the balance the invoice was loaded with
    pub fn restore(&mut self, invoice: &InvoiceRef, amount: Money) -> Result<()> {
        let entry = self.entry_mut(invoice)?;
        let headroom = entry.loaded_outstanding - entry.invoice.outstanding_amount;
        if !amount.is_positive() || amount > headroom {
            return Err(ReconcileError::Invariant {
                reference: invoice.clone(),
                requested: amount,
                available: headroom,
            });
        }
        entry.invoice.outstanding_amount += amount;
        Ok(())
    }

    pub fn total_outstanding(&self) -> Money {
        self.invoices()
            .map(|inv| inv.outstanding_amount)
            .filter(|amount| amount.is_positive())
            .sum()
    }

    /// invoices that still carry a balance
    pub fn open_count(&self) -> usize {
        self.invoices()
            .filter(|inv| inv.outstanding_amount.is_positive())
            .count()
    }

    /// (voucher, outstanding) pairs, used to compare before/after states
    pub fn balances(&self) -> Vec<(InvoiceRef, Money)> {
        self.invoices()
            .map(|inv| (inv.voucher.clone(), inv.outstanding_amount))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn set() -> ReceivableSet {
        ReceivableSet::new(vec![
            Invoice::new("SINV-003", Money::from_major(25), date(3), "KES"),
            Invoice::new("SINV-001", Money::from_major(100), date(1), "KES"),
            Invoice::new("SINV-002", Money::from_major(50), date(1), "KES").with_due_date(date(20)),
            Invoice::new("SINV-000", Money::ZERO, date(1), "KES"),
        ])
    }

    #[test]
    fn test_ordering_is_oldest_first_then_due_date_then_voucher() {
        let order: Vec<_> = set().invoices().map(|i| i.voucher.clone()).collect();
        assert_eq!(order, vec!["SINV-001", "SINV-002", "SINV-003"]);
    }

    #[test]
    fn test_in_currency_drops_foreign_invoices() {
        let mixed = ReceivableSet::new(vec![
            Invoice::new("SINV-USD", Money::from_major(100), date(1), "USD"),
            Invoice::new("SINV-KES", Money::from_major(50), date(2), "KES"),
        ]);

        let usd = mixed.in_currency("USD");

        let order: Vec<_> = usd.invoices().map(|i| i.voucher.as_str()).collect();
        assert_eq!(order, vec!["SINV-USD"]);
        assert_eq!(usd.total_outstanding(), Money::from_major(100));
    }

    #[test]
    fn test_voucher_breaks_full_ties() {
        let set = ReceivableSet::new(vec![
            Invoice::new("B", Money::from_major(1), date(1), "KES"),
            Invoice::new("A", Money::from_major(1), date(1), "KES"),
        ]);
        let order: Vec<_> = set.invoices().map(|i| i.voucher.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn test_apply_and_restore_round_trip() {
        let mut set = set();
        let before = set.balances();
        let inv = "SINV-001".to_string();

        set.apply(&inv, Money::from_major(60)).unwrap();
        assert_eq!(set.remaining(&inv).unwrap(), Money::from_major(40));

        set.restore(&inv, Money::from_major(60)).unwrap();
        assert_eq!(set.balances(), before);
    }

    #[test]
    fn test_apply_past_zero_is_invariant_error() {
        let mut set = set();
        let err = set.apply(&"SINV-003".to_string(), Money::from_major(26)).unwrap_err();
        assert!(matches!(err, ReconcileError::Invariant { .. }));
        assert_eq!(set.remaining(&"SINV-003".to_string()).unwrap(), Money::from_major(25));
    }

    #[test]
    fn test_restore_above_loaded_balance_is_refused() {
        let mut set = set();
        assert!(set.restore(&"SINV-003".to_string(), Money::ONE).is_err());
    }

    #[test]
    fn test_unknown_invoice() {
        let err = set().remaining(&"nope".to_string()).unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound { kind: "invoice", .. }));
    }

    #[test]
    fn test_totals_ignore_settled_invoices() {
        let mut set = set();
        set.apply(&"SINV-003".to_string(), Money::from_major(25)).unwrap();
        assert_eq!(set.total_outstanding(), Money::from_major(150));
        assert_eq!(set.open_count(), 2);
        assert_eq!(set.len(), 3);
    }
}
