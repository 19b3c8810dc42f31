#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use pos_reconcile::{
    async_trait, CancellationToken, CreditRecord, CreditRef, DocumentSubmitter, ExchangeRate,
    Invoice, InvoiceRef, Ledger, LedgerError, Money, PaymentDocument, PaymentDraft,
    PaymentIntakeCoordinator, PostingReceipt, PostingRequest, ReceivableQuery, ReconcileConfig,
    ReturnNote, SafeTimeProvider, SettlementGateway, SettlementRecord, TimeSource,
    UnallocatedPayment,
};

pub const CUSTOMER: &str = "CUST-0001";
pub const COMPANY: &str = "Nairobi Retail";
pub const CURRENCY: &str = "KES";

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

pub fn kes(amount: i64) -> Money {
    Money::from_major(amount)
}

pub fn time() -> SafeTimeProvider {
    SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()))
}

/// how the ledger answers a posting for one credit
#[derive(Debug, Clone, PartialEq)]
pub enum Behaviour {
    Accept,
    Reject(String),
    Unavailable,
    /// never answers; the caller's timeout has to fire
    Hang,
    /// accepts, but leaves `offset` more on the credit than was allocated
    Diverge(Money),
}

/// in-memory ledger whose answers are scripted per credit
pub struct ScriptedLedger {
    invoices: Mutex<Vec<Invoice>>,
    credits: Mutex<Vec<CreditRecord>>,
    balances: Mutex<HashMap<CreditRef, Money>>,
    behaviours: Mutex<HashMap<CreditRef, Behaviour>>,
    fallback: Mutex<Behaviour>,
    postings: Mutex<Vec<PostingRequest>>,
    cancel_after_post: Mutex<Option<CancellationToken>>,
}

impl Default for ScriptedLedger {
    fn default() -> Self {
        Self {
            invoices: Mutex::new(Vec::new()),
            credits: Mutex::new(Vec::new()),
            balances: Mutex::new(HashMap::new()),
            behaviours: Mutex::new(HashMap::new()),
            fallback: Mutex::new(Behaviour::Accept),
            postings: Mutex::new(Vec::new()),
            cancel_after_post: Mutex::new(None),
        }
    }
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoice(self, voucher: &str, amount: i64, posted: NaiveDate) -> Self {
        self.invoice_in(voucher, amount, posted, CURRENCY)
    }

    pub fn invoice_in(self, voucher: &str, amount: i64, posted: NaiveDate, currency: &str) -> Self {
        self.invoices
            .lock()
            .unwrap()
            .push(Invoice::new(voucher, kes(amount), posted, currency));
        self
    }

    pub fn payment(self, name: &str, amount: i64, posted: NaiveDate) -> Self {
        self.payment_in(name, amount, posted, CURRENCY)
    }

    pub fn payment_in(self, name: &str, amount: i64, posted: NaiveDate, currency: &str) -> Self {
        self.credits.lock().unwrap().push(CreditRecord::Payment(UnallocatedPayment {
            name: name.to_string(),
            posting_date: posted,
            paid_amount: kes(amount),
            unallocated_amount: kes(amount),
            mode_of_payment: Some("Cash".to_string()),
            currency: currency.to_string(),
            paid_from: "Debtors - NR".to_string(),
            cost_center: None,
        }));
        self.register(name, kes(amount));
        self
    }

    /// a return invoice carrying `amount` of credit
    pub fn credit_note(self, name: &str, amount: i64, posted: NaiveDate) -> Self {
        self.credits.lock().unwrap().push(CreditRecord::ReturnNote(ReturnNote {
            name: name.to_string(),
            posting_date: posted,
            outstanding_amount: kes(-amount),
            currency: CURRENCY.to_string(),
            conversion_rate: ExchangeRate::PAR,
            return_against: None,
            debit_to: "Debtors - NR".to_string(),
            cost_center: None,
        }));
        self.register(name, kes(amount));
        self
    }

    pub fn behave(self, credit: &str, behaviour: Behaviour) -> Self {
        self.behaviours
            .lock()
            .unwrap()
            .insert(credit.to_string(), behaviour);
        self
    }

    pub fn by_default(self, behaviour: Behaviour) -> Self {
        *self.fallback.lock().unwrap() = behaviour;
        self
    }

    /// cancel `token` once the first posting has been accepted
    pub fn cancel_after_first_post(&self, token: CancellationToken) {
        *self.cancel_after_post.lock().unwrap() = Some(token);
    }

    pub fn register(&self, credit: &str, amount: Money) {
        self.balances
            .lock()
            .unwrap()
            .insert(credit.to_string(), amount);
    }

    pub fn postings(&self) -> Vec<PostingRequest> {
        self.postings.lock().unwrap().clone()
    }

    pub fn posted_credits(&self) -> Vec<CreditRef> {
        self.postings().into_iter().map(|p| p.credit).collect()
    }

    /// outstanding as the ledger sees it
    pub fn outstanding(&self, voucher: &str) -> Money {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|inv| inv.voucher == voucher)
            .map(|inv| inv.outstanding_amount)
            .unwrap_or(Money::ZERO)
    }

    fn behaviour_for(&self, credit: &str) -> Behaviour {
        self.behaviours
            .lock()
            .unwrap()
            .get(credit)
            .cloned()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }

    fn book(&self, request: &PostingRequest, offset: Money) {
        let mut invoices = self.invoices.lock().unwrap();
        for record in &request.records {
            if let Some(inv) = invoices.iter_mut().find(|inv| inv.voucher == record.invoice) {
                inv.outstanding_amount -= record.allocated_amount;
            }
        }
        let after = request.unreconciled_amount - request.total_allocated + offset;
        self.balances
            .lock()
            .unwrap()
            .insert(request.credit.clone(), after);
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
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
        Ok(self.credits.lock().unwrap().clone())
    }

    async fn post_reconciliation(&self, request: &PostingRequest) -> Result<PostingReceipt, LedgerError> {
        self.postings.lock().unwrap().push(request.clone());
        let receipt = match self.behaviour_for(&request.credit) {
            Behaviour::Accept => {
                self.book(request, Money::ZERO);
                PostingReceipt::posted(request.total_allocated)
            }
            Behaviour::Diverge(offset) => {
                self.book(request, offset);
                PostingReceipt::posted(request.total_allocated - offset)
            }
            Behaviour::Reject(message) => return Ok(PostingReceipt::rejected(message)),
            Behaviour::Unavailable => return Err(LedgerError::Unavailable("connection refused".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                return Err(LedgerError::Unavailable("hung".to_string()));
            }
        };
        if let Some(token) = self.cancel_after_post.lock().unwrap().take() {
            token.cancel();
        }
        Ok(receipt)
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

/// mints payment documents and tells the ledger about them
pub struct ScriptedSubmitter {
    ledger: Arc<ScriptedLedger>,
    next: AtomicU64,
    failing: bool,
    drafts: Mutex<Vec<PaymentDraft>>,
}

impl ScriptedSubmitter {
    pub fn new(ledger: Arc<ScriptedLedger>) -> Self {
        Self {
            ledger,
            next: AtomicU64::new(1),
            failing: false,
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(ledger: Arc<ScriptedLedger>) -> Self {
        Self {
            failing: true,
            ..Self::new(ledger)
        }
    }

    pub fn drafts(&self) -> Vec<PaymentDraft> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSubmitter for ScriptedSubmitter {
    async fn create_payment(&self, draft: &PaymentDraft) -> Result<PaymentDocument, LedgerError> {
        self.drafts.lock().unwrap().push(draft.clone());
        if self.failing {
            return Err(LedgerError::Rejected("mode of payment has no default account".to_string()));
        }
        let name = format!("ACC-PAY-{:04}", self.next.fetch_add(1, Ordering::SeqCst));
        self.ledger.register(&name, draft.amount);
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

/// settlements keyed by gateway reference
#[derive(Default)]
pub struct ScriptedGateway {
    settlements: HashMap<String, Vec<SettlementRecord>>,
    unavailable: bool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn settlement(mut self, ledger: &ScriptedLedger, reference: &str, name: &str, amount: i64) -> Self {
        ledger.register(name, kes(amount));
        self.settlements
            .entry(reference.to_string())
            .or_default()
            .push(SettlementRecord {
                name: name.to_string(),
                transaction_id: format!("TX-{name}"),
                amount: kes(amount),
                currency: CURRENCY.to_string(),
                posting_date: day(20),
                account: "M-Pesa - NR".to_string(),
            });
        self
    }
}

#[async_trait]
impl SettlementGateway for ScriptedGateway {
    async fn settlements(&self, reference: &str, _customer: &str) -> Result<Vec<SettlementRecord>, LedgerError> {
        if self.unavailable {
            return Err(LedgerError::Unavailable("gateway offline".to_string()));
        }
        Ok(self.settlements.get(reference).cloned().unwrap_or_default())
    }
}

/// collaborators plus a coordinator wired to them
pub struct Harness {
    pub ledger: Arc<ScriptedLedger>,
    pub submitter: Arc<ScriptedSubmitter>,
    pub coordinator: PaymentIntakeCoordinator,
}

impl Harness {
    pub fn new(ledger: ScriptedLedger) -> Self {
        Self::with(ledger, ScriptedGateway::new(), false, ReconcileConfig::standard())
    }

    pub fn with(ledger: ScriptedLedger, gateway: ScriptedGateway, failing_submitter: bool, config: ReconcileConfig) -> Self {
        let ledger = Arc::new(ledger);
        let submitter = Arc::new(if failing_submitter {
            ScriptedSubmitter::failing(ledger.clone())
        } else {
            ScriptedSubmitter::new(ledger.clone())
        });
        let coordinator = PaymentIntakeCoordinator::new(
            ledger.clone(),
            submitter.clone(),
            Arc::new(gateway),
            config.with_timeout(Duration::from_secs(2)),
            time(),
        )
        .unwrap();
        Self {
            ledger,
            submitter,
            coordinator,
        }
    }
}
