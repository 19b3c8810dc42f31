//! in-memory books shared by the demos
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use pos_reconcile::chrono::NaiveDate;
use pos_reconcile::{
    async_trait, CreditRecord, CreditRef, DocumentSubmitter, ExchangeRate, Invoice, InvoiceRef,
    Ledger, LedgerError, Money, PaymentDocument, PaymentDraft, PostingReceipt, PostingRequest,
    ReceivableQuery, ReturnNote, SettlementGateway, SettlementRecord, UnallocatedPayment,
};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// ledger, payment desk and m-pesa gateway in one struct
#[derive(Default)]
pub struct Books {
    invoices: Mutex<Vec<Invoice>>,
    credits: Mutex<Vec<CreditRecord>>,
    balances: Mutex<HashMap<CreditRef, Money>>,
    settlements: Mutex<HashMap<String, Vec<SettlementRecord>>>,
    locked: Mutex<HashSet<CreditRef>>,
    next_payment: AtomicU64,
}

impl Books {
    pub fn invoice(&self, voucher: &str, amount: i64, posted: NaiveDate) {
        self.invoices
            .lock()
            .unwrap()
            .push(Invoice::new(voucher, Money::from_major(amount), posted, "KES"));
    }

    pub fn payment(&self, name: &str, amount: i64, posted: NaiveDate) {
        self.credits.lock().unwrap().push(CreditRecord::Payment(UnallocatedPayment {
            name: name.to_string(),
            posting_date: posted,
            paid_amount: Money::from_major(amount),
            unallocated_amount: Money::from_major(amount),
            mode_of_payment: Some("Cash".to_string()),
            currency: "KES".to_string(),
            paid_from: "Debtors - NR".to_string(),
            cost_center: None,
        }));
        self.balances.lock().unwrap().insert(name.to_string(), Money::from_major(amount));
    }

    pub fn credit_note(&self, name: &str, amount: i64, posted: NaiveDate) {
        self.credits.lock().unwrap().push(CreditRecord::ReturnNote(ReturnNote {
            name: name.to_string(),
            posting_date: posted,
            outstanding_amount: Money::from_major(-amount),
            currency: "KES".to_string(),
            conversion_rate: ExchangeRate::PAR,
            return_against: None,
            debit_to: "Debtors - NR".to_string(),
            cost_center: None,
        }));
        self.balances.lock().unwrap().insert(name.to_string(), Money::from_major(amount));
    }

    pub fn settlement(&self, reference: &str, name: &str, amount: i64, posted: NaiveDate) {
        self.settlements
            .lock()
            .unwrap()
            .entry(reference.to_string())
            .or_default()
            .push(SettlementRecord {
                name: name.to_string(),
                transaction_id: format!("QK-{name}"),
                amount: Money::from_major(amount),
                currency: "KES".to_string(),
                posting_date: posted,
                account: "M-Pesa - NR".to_string(),
            });
        self.balances.lock().unwrap().insert(name.to_string(), Money::from_major(amount));
    }

    /// postings for this credit will be refused
    pub fn lock(&self, credit: &str) {
        self.locked.lock().unwrap().insert(credit.to_string());
    }

    pub fn print_invoices(&self) {
        for inv in self.invoices.lock().unwrap().iter() {
            println!("  {:<10} outstanding {}", inv.voucher, inv.outstanding_amount);
        }
    }
}

#[async_trait]
impl Ledger for Books {
    async fn outstanding_invoices(&self, _query: &ReceivableQuery) -> Result<Vec<Invoice>, LedgerError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.outstanding_amount.is_positive())
            .cloned()
            .collect())
    }

    async fn unallocated_credits(&self, _query: &ReceivableQuery) -> Result<Vec<CreditRecord>, LedgerError> {
        let balances = self.balances.lock().unwrap();
        let current = |name: &CreditRef| balances.get(name).copied().unwrap_or(Money::ZERO);
        Ok(self
            .credits
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|record| match record {
                CreditRecord::Payment(mut p) => {
                    p.unallocated_amount = current(&p.name);
                    CreditRecord::Payment(p)
                }
                CreditRecord::ReturnNote(mut n) => {
                    n.outstanding_amount = -current(&n.name);
                    CreditRecord::ReturnNote(n)
                }
            })
            .collect())
    }

    async fn post_reconciliation(&self, request: &PostingRequest) -> Result<PostingReceipt, LedgerError> {
        if self.locked.lock().unwrap().contains(&request.credit) {
            return Ok(PostingReceipt::rejected(format!("{} is locked by another user", request.credit)));
        }
        let mut invoices = self.invoices.lock().unwrap();
        for record in &request.records {
            if let Some(inv) = invoices.iter_mut().find(|inv| inv.voucher == record.invoice) {
                inv.outstanding_amount -= record.allocated_amount;
            }
        }
        self.balances.lock().unwrap().insert(
            request.credit.clone(),
            request.unreconciled_amount - request.total_allocated,
        );
        Ok(PostingReceipt::posted(request.total_allocated))
    }

    async fn read_outstanding(&self, invoice: &InvoiceRef) -> Result<Money, LedgerError> {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|inv| &inv.voucher == invoice)
            .map(|inv| inv.outstanding_amount)
            .ok_or_else(|| LedgerError::NotFound(invoice.clone()))
    }

    async fn read_unallocated(&self, credit: &CreditRef) -> Result<Money, LedgerError> {
        self.balances
            .lock()
            .unwrap()
            .get(credit)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(credit.clone()))
    }
}

#[async_trait]
impl DocumentSubmitter for Books {
    async fn create_payment(&self, draft: &PaymentDraft) -> Result<PaymentDocument, LedgerError> {
        let name = format!("ACC-PAY-{:04}", self.next_payment.fetch_add(1, Ordering::SeqCst) + 1);
        self.balances.lock().unwrap().insert(name.clone(), draft.amount);
        Ok(PaymentDocument {
            name,
            mode_of_payment: draft.mode_of_payment.clone(),
            posting_date: draft.posting_date,
            paid_amount: draft.amount,
            received_amount: draft.received_amount,
            currency: draft.currency.clone(),
            paid_from: "Debtors - NR".to_string(),
            exchange_rate: ExchangeRate::PAR,
            cost_center: draft.cost_center.clone(),
        })
    }
}

#[async_trait]
impl SettlementGateway for Books {
    async fn settlements(&self, reference: &str, _customer: &str) -> Result<Vec<SettlementRecord>, LedgerError> {
        Ok(self
            .settlements
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .unwrap_or_default())
    }
}
