use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::allocation::AllocationPlan;
use crate::config::ReconcileConfig;
use crate::credits::{paid_and_received, Credit, CreditKind, CreditQueue, PaymentDirection};
use crate::decimal::{ExchangeRate, Money};
use crate::errors::{ReconcileError, Result, ValidationError};
use crate::events::{Event, EventStore};
use crate::executor::{ExecutionOutcome, ReconciliationExecutor, RunScope};
use crate::ledger::{bounded, CreditRecord, DocumentSubmitter, Ledger, PaymentDraft, SettlementGateway};
use crate::receivables::{Invoice, ReceivableSet};
use crate::state::CreditState;
use crate::summary::{ReconciliationSummary, SkipKind, SkippedCredit, SummaryBuilder};
use crate::types::{CreditPhase, CreditRef, PostingContext, ReceivableQuery, RunId};

/// a payment to mint during the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInstruction {
    /// in the run currency
    pub amount: Money,
    pub mode_of_payment: String,
    /// currency of the receiving account, when it differs from the run currency
    pub bank_currency: Option<String>,
    pub exchange_rate: Option<ExchangeRate>,
    /// amount actually received in the bank currency, if known
    pub bank_amount: Option<Money>,
}

impl PaymentInstruction {
    pub fn new(amount: Money, mode_of_payment: impl Into<String>) -> Self {
        Self {
            amount,
            mode_of_payment: mode_of_payment.into(),
            bank_currency: None,
            exchange_rate: None,
            bank_amount: None,
        }
    }

    pub fn in_bank_currency(mut self, currency: impl Into<String>, rate: ExchangeRate) -> Self {
        self.bank_currency = Some(currency.into());
        self.exchange_rate = Some(rate);
        self
    }

    pub fn with_bank_amount(mut self, amount: Money) -> Self {
        self.bank_amount = Some(amount);
        self
    }

    fn label(&self) -> String {
        format!("{} payment", self.mode_of_payment)
    }
}

/// one settlement request from the point of sale
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub customer: String,
    pub company: String,
    pub currency: String,
    pub pos_profile: Option<String>,
    /// open cashier shift; new payments reference it
    pub shift: Option<String>,
    /// gateway references whose settlements become credits
    pub settlement_refs: Vec<String>,
    /// operator-selected unallocated payments and credit notes
    pub existing_refs: Vec<CreditRef>,
    pub new_payments: Vec<PaymentInstruction>,
    /// restrict the run to these invoices instead of everything outstanding
    pub selected_invoices: Option<Vec<Invoice>>,
}

impl ReconcileRequest {
    pub fn new(customer: impl Into<String>, company: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            customer: customer.into(),
            company: company.into(),
            currency: currency.into(),
            ..Self::default()
        }
    }

    pub fn shift(mut self, shift: impl Into<String>) -> Self {
        self.shift = Some(shift.into());
        self
    }

    pub fn pos_profile(mut self, profile: impl Into<String>) -> Self {
        self.pos_profile = Some(profile.into());
        self
    }

    pub fn settlement(mut self, reference: impl Into<String>) -> Self {
        self.settlement_refs.push(reference.into());
        self
    }

    pub fn existing(mut self, reference: impl Into<CreditRef>) -> Self {
        self.existing_refs.push(reference.into());
        self
    }

    pub fn new_payment(mut self, instruction: PaymentInstruction) -> Self {
        self.new_payments.push(instruction);
        self
    }

    pub fn select_invoices(mut self, invoices: Vec<Invoice>) -> Self {
        self.selected_invoices = Some(invoices);
        self
    }

    /// check the batch preconditions; nothing is touched on failure
    pub fn validate(&self, config: &ReconcileConfig) -> std::result::Result<(), ValidationError> {
        if self.customer.trim().is_empty() {
            return Err(ValidationError::MissingCustomer);
        }
        if self.company.trim().is_empty() {
            return Err(ValidationError::MissingCompany);
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::MissingCurrency);
        }
        if self.shift.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ValidationError::MissingShift);
        }
        if !config.payments_enabled {
            return Err(ValidationError::PaymentsDisabled);
        }
        if !self.new_payments.is_empty() && self.pos_profile.is_none() {
            return Err(ValidationError::MissingPosProfile);
        }
        for instruction in &self.new_payments {
            if let Some(bank_amount) = instruction.bank_amount {
                if bank_amount.is_negative() {
                    return Err(ValidationError::InvalidAmount {
                        field: format!("{} bank amount", instruction.mode_of_payment),
                        amount: bank_amount,
                    });
                }
            }
        }
        Ok(())
    }

    fn query(&self) -> ReceivableQuery {
        let query = ReceivableQuery::new(&self.customer, &self.company).currency(&self.currency);
        match &self.pos_profile {
            Some(profile) => query.pos_profile(profile),
            None => query,
        }
    }
}

/// what a run would do, computed without writing anything
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationPreview {
    pub plans: Vec<AllocationPlan>,
    pub unmatched: Vec<SkippedCredit>,
    pub total_planned: Money,
    pub remaining_outstanding: Money,
    pub outstanding_count: usize,
}

/// top-level entry point for settling a customer's receivables
///
/// Runs the credit phases in a fixed order (settlement, existing, new) over a
/// single receivable set owned by the run. Individual credit failures become
/// skips; only bad input, an unreadable ledger at load time, or a ledger that
/// refused every posting for being unreachable fail the call.
pub struct PaymentIntakeCoordinator {
    ledger: Arc<dyn Ledger>,
    submitter: Arc<dyn DocumentSubmitter>,
    gateway: Arc<dyn SettlementGateway>,
    config: ReconcileConfig,
    executor: ReconciliationExecutor,
    time: SafeTimeProvider,
    events: EventStore,
}

impl PaymentIntakeCoordinator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        submitter: Arc<dyn DocumentSubmitter>,
        gateway: Arc<dyn SettlementGateway>,
        config: ReconcileConfig,
        time: SafeTimeProvider,
    ) -> Result<Self> {
        config.validate()?;
        let executor = ReconciliationExecutor::new(config.posting_timeout, config.precision.tolerance());
        Ok(Self {
            ledger,
            submitter,
            gateway,
            config,
            executor,
            time,
            events: EventStore::new(),
        })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub async fn reconcile(&mut self, request: ReconcileRequest) -> Result<ReconciliationSummary> {
        self.reconcile_with_cancel(request, CancellationToken::new()).await
    }

    /// reconcile, checking `cancel` between credits
    pub async fn reconcile_with_cancel(
        &mut self,
        request: ReconcileRequest,
        cancel: CancellationToken,
    ) -> Result<ReconciliationSummary> {
        request.validate(&self.config)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", %run_id, customer = %request.customer);
        self.run_request(run_id, request, cancel).instrument(span).await
    }

    async fn run_request(
        &mut self,
        run_id: RunId,
        request: ReconcileRequest,
        cancel: CancellationToken,
    ) -> Result<ReconciliationSummary> {
        let query = request.query();
        let receivables = self.receivables_for(&request, &query).await?;
        let (queue, unmatched) = self.gather_credits(&request, &query).await?;

        let mut session = Session {
            run_id,
            currency: &request.currency,
            ledger: self.ledger.as_ref(),
            submitter: self.submitter.as_ref(),
            config: &self.config,
            executor: &self.executor,
            time: &self.time,
            events: &mut self.events,
            receivables,
            summary: SummaryBuilder::new(run_id),
            stats: PostingStats::default(),
        };
        session.started(&request.customer, &request.company);
        for skip in unmatched {
            session.skip(skip.credit, skip.kind, skip.reason, CreditState::Pending);
        }

        let ordered = queue.into_ordered();
        let mut remaining = ordered.iter().cloned();
        let mut phase = None;
        while let Some(credit) = remaining.next() {
            if cancel.is_cancelled() {
                let mut unprocessed: Vec<CreditRef> = std::iter::once(credit.reference)
                    .chain(remaining.map(|c| c.reference))
                    .collect();
                if self.config.phase_enabled(CreditPhase::NewPayment) {
                    unprocessed.extend(request.new_payments.iter().map(PaymentInstruction::label));
                }
                return Ok(session.cancelled(unprocessed));
            }
            if phase != Some(credit.phase()) {
                let current = credit.phase();
                phase = Some(current);
                session.phase_started(current, ordered.iter().filter(|c| c.phase() == current).count());
            }
            session.process(credit).await;
        }

        if self.config.phase_enabled(CreditPhase::NewPayment) && !request.new_payments.is_empty() {
            session.phase_started(CreditPhase::NewPayment, request.new_payments.len());
            let mut instructions = request.new_payments.iter();
            while let Some(instruction) = instructions.next() {
                if cancel.is_cancelled() {
                    let unprocessed = std::iter::once(instruction)
                        .chain(instructions)
                        .map(PaymentInstruction::label)
                        .collect();
                    return Ok(session.cancelled(unprocessed));
                }
                let Some(credit) = session.mint_payment(&request, instruction).await else {
                    continue;
                };
                session.process(credit).await;
            }
        }

        session.finish()
    }

    /// reconcile every unallocated credit the customer holds
    ///
    /// Only the existing-credit phase runs. Returns early with an explanatory
    /// message when there is nothing to match on either side.
    pub async fn auto_reconcile(
        &mut self,
        customer: &str,
        company: &str,
        currency: Option<&str>,
        pos_profile: Option<&str>,
    ) -> Result<ReconciliationSummary> {
        if customer.trim().is_empty() {
            return Err(ValidationError::MissingCustomer.into());
        }
        if company.trim().is_empty() {
            return Err(ValidationError::MissingCompany.into());
        }

        let mut query = ReceivableQuery::new(customer, company);
        if let Some(currency) = currency {
            query = query.currency(currency);
        }
        if let Some(profile) = pos_profile {
            query = query.pos_profile(profile);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("auto_reconcile", %run_id, customer = %customer);
        self.run_auto(run_id, query).instrument(span).await
    }

    async fn run_auto(&mut self, run_id: RunId, query: ReceivableQuery) -> Result<ReconciliationSummary> {
        let receivables = ReceivableSet::load(self.ledger.as_ref(), &query, self.config.posting_timeout).await?;
        if receivables.is_empty() {
            let credits = self.unallocated_credits(&query).await?.len();
            info!(credits, "no outstanding invoices");
            return Ok(ReconciliationSummary::early_exit(
                run_id,
                format!("No outstanding invoices were found for {}.", query.customer),
                &receivables,
                credits,
            ));
        }

        // without an explicit currency the oldest invoice decides
        let currency = query
            .currency
            .clone()
            .or_else(|| receivables.invoices().next().map(|inv| inv.currency.clone()))
            .unwrap_or_default();
        let receivables = receivables.in_currency(&currency);

        let mut queue = CreditQueue::new();
        for credit in self.unallocated_credits(&query).await? {
            if credit.currency() != currency {
                debug!(credit = %credit.reference, currency = %credit.currency(), "other currency, not queued");
                continue;
            }
            queue.push(credit);
        }
        if queue.is_empty() {
            info!("no unallocated credits");
            return Ok(ReconciliationSummary::early_exit(
                run_id,
                "No unallocated payments were available for reconciliation.",
                &receivables,
                0,
            ));
        }

        let mut session = Session {
            run_id,
            currency: &currency,
            ledger: self.ledger.as_ref(),
            submitter: self.submitter.as_ref(),
            config: &self.config,
            executor: &self.executor,
            time: &self.time,
            events: &mut self.events,
            receivables,
            summary: SummaryBuilder::new(run_id),
            stats: PostingStats::default(),
        };
        session.started(&query.customer, &query.company);
        session.phase_started(CreditPhase::Existing, queue.len());
        for credit in queue.into_ordered() {
            session.process(credit).await;
        }
        session.finish()
    }

    /// plan every credit in phase order against a scratch copy of the receivables
    ///
    /// Reads from the ledger and the gateway but never posts, and never mints
    /// payments: new-payment instructions are planned as provisional credits.
    pub async fn preview(&self, request: &ReconcileRequest) -> Result<ReconciliationPreview> {
        request.validate(&self.config)?;
        let query = request.query();
        let mut scratch = self.receivables_for(request, &query).await?;
        let (mut queue, mut unmatched) = self.gather_credits(request, &query).await?;

        if self.config.phase_enabled(CreditPhase::NewPayment) {
            let posting_date = self.time.now().date_naive();
            for (i, instruction) in request.new_payments.iter().enumerate() {
                queue.push(Credit::new(
                    format!("new-payment-{}", i + 1),
                    CreditKind::CashPayment {
                        mode_of_payment: instruction.mode_of_payment.clone(),
                        received_amount: instruction.amount,
                    },
                    instruction.amount,
                    posting_date,
                    PostingContext {
                        account: instruction.mode_of_payment.clone(),
                        party: request.customer.clone(),
                        currency: request.currency.clone(),
                        exchange_rate: ExchangeRate::PAR,
                        cost_center: self.config.cost_center.clone(),
                    },
                ));
            }
        }

        let planner = self.executor.planner();
        let mut plans = Vec::new();
        for credit in queue.into_ordered() {
            if credit.currency() != request.currency {
                unmatched.push(currency_mismatch(&credit, &request.currency));
                continue;
            }
            let plan = planner.plan(&scratch, &credit);
            for record in &plan.records {
                scratch.apply(&record.invoice, record.allocated_amount)?;
            }
            plans.push(plan);
        }

        Ok(ReconciliationPreview {
            total_planned: plans.iter().map(AllocationPlan::total).sum(),
            plans,
            unmatched,
            remaining_outstanding: scratch.total_outstanding(),
            outstanding_count: scratch.open_count(),
        })
    }

    async fn receivables_for(&self, request: &ReconcileRequest, query: &ReceivableQuery) -> Result<ReceivableSet> {
        match &request.selected_invoices {
            Some(selection) => {
                let selection = selection
                    .iter()
                    .filter(|inv| inv.currency == request.currency)
                    .cloned()
                    .collect();
                Ok(ReceivableSet::from_selection(self.ledger.as_ref(), selection, self.config.posting_timeout).await)
            }
            None => ReceivableSet::load(self.ledger.as_ref(), query, self.config.posting_timeout).await,
        }
    }

    /// settlement and existing credits for the request, plus skips for references that resolved to nothing
    async fn gather_credits(
        &self,
        request: &ReconcileRequest,
        query: &ReceivableQuery,
    ) -> Result<(CreditQueue, Vec<SkippedCredit>)> {
        let mut queue = CreditQueue::new();
        let mut unmatched = Vec::new();

        if self.config.phase_enabled(CreditPhase::Settlement) {
            for reference in &request.settlement_refs {
                let lookup = bounded(
                    self.config.posting_timeout,
                    self.gateway.settlements(reference, &request.customer),
                )
                .await;
                match lookup {
                    Ok(records) if records.is_empty() => unmatched.push(SkippedCredit {
                        credit: reference.clone(),
                        kind: SkipKind::NotFound,
                        reason: format!("No confirmed settlements were found for {}.", reference),
                    }),
                    Ok(records) => {
                        for record in records {
                            if queue.contains(&record.name) {
                                continue;
                            }
                            queue.push(Credit::from_settlement(record, &request.customer));
                        }
                    }
                    Err(e) => {
                        warn!(reference = %reference, error = %e, "settlement lookup failed");
                        unmatched.push(SkippedCredit {
                            credit: reference.clone(),
                            kind: SkipKind::SourceUnavailable,
                            reason: format!("Settlement lookup for {} failed: {}", reference, e),
                        });
                    }
                }
            }
        } else if !request.settlement_refs.is_empty() {
            debug!("settlement credits disabled, ignoring {} reference(s)", request.settlement_refs.len());
        }

        if self.config.phase_enabled(CreditPhase::Existing) && !request.existing_refs.is_empty() {
            let mut available = self.unallocated_credits(query).await?;
            for reference in &request.existing_refs {
                if queue.contains(reference) {
                    continue;
                }
                match available.iter().position(|c| &c.reference == reference) {
                    Some(i) => queue.push(available.swap_remove(i)),
                    None => unmatched.push(SkippedCredit {
                        credit: reference.clone(),
                        kind: SkipKind::NotFound,
                        reason: ReconcileError::credit_not_found(reference).to_string(),
                    }),
                }
            }
        }

        Ok((queue, unmatched))
    }

    /// unallocated payments and return notes with credit left, as credits
    async fn unallocated_credits(&self, query: &ReceivableQuery) -> Result<Vec<Credit>> {
        let records = bounded(self.config.posting_timeout, self.ledger.unallocated_credits(query))
            .await
            .map_err(|e| ReconcileError::Collaborator {
                operation: "load unallocated credits",
                message: e.to_string(),
            })?;

        Ok(records
            .into_iter()
            .filter_map(|record| match record {
                CreditRecord::Payment(p) if p.unallocated_amount.is_positive() => {
                    Some(Credit::from_unallocated_payment(p, &query.customer))
                }
                CreditRecord::ReturnNote(n) if n.outstanding_amount.is_negative() => {
                    Some(Credit::from_return_note(n, &query.customer))
                }
                _ => None,
            })
            .collect())
    }
}

fn currency_mismatch(credit: &Credit, currency: &str) -> SkippedCredit {
    SkippedCredit {
        credit: credit.reference.clone(),
        kind: SkipKind::CurrencyMismatch,
        reason: format!(
            "{} {} is in {}, but the run settles {}.",
            credit.kind.label(),
            credit.reference,
            credit.currency(),
            currency
        ),
    }
}

#[derive(Debug, Default)]
struct PostingStats {
    attempts: usize,
    unavailable: usize,
    committed: usize,
}

impl PostingStats {
    /// postings were tried and every one failed to reach the ledger
    fn ledger_unreachable(&self) -> bool {
        self.attempts > 0 && self.committed == 0 && self.unavailable == self.attempts
    }
}

/// state of one run; owns the receivables exclusively
struct Session<'a> {
    run_id: RunId,
    currency: &'a str,
    ledger: &'a dyn Ledger,
    submitter: &'a dyn DocumentSubmitter,
    config: &'a ReconcileConfig,
    executor: &'a ReconciliationExecutor,
    time: &'a SafeTimeProvider,
    events: &'a mut EventStore,
    receivables: ReceivableSet,
    summary: SummaryBuilder,
    stats: PostingStats,
}

impl Session<'_> {
    fn started(&mut self, customer: &str, company: &str) {
        info!(
            open_invoices = self.receivables.open_count(),
            outstanding = %self.receivables.total_outstanding(),
            "run started"
        );
        self.events.emit(Event::RunStarted {
            run_id: self.run_id,
            customer: customer.to_string(),
            company: company.to_string(),
            open_invoices: self.receivables.open_count(),
            total_outstanding: self.receivables.total_outstanding(),
            timestamp: self.time.now(),
        });
    }

    fn phase_started(&mut self, phase: CreditPhase, credits: usize) {
        debug!(?phase, credits, "phase started");
        self.events.emit(Event::PhaseStarted {
            run_id: self.run_id,
            phase,
            credits,
            timestamp: self.time.now(),
        });
    }

    fn payment_created(&mut self, reference: &str, amount: Money, mode_of_payment: &str) {
        self.summary.record_new_payment(reference.to_string());
        self.events.emit(Event::PaymentCreated {
            run_id: self.run_id,
            credit: reference.to_string(),
            amount,
            mode_of_payment: mode_of_payment.to_string(),
            timestamp: self.time.now(),
        });
    }

    /// skip a credit that never reached the executor
    fn skip(&mut self, credit: impl Into<CreditRef>, kind: SkipKind, reason: impl Into<String>, state: CreditState) {
        let credit = credit.into();
        let reason = reason.into();
        warn!(credit = %credit, ?kind, "{}", reason);
        self.events.emit(Event::CreditSkipped {
            run_id: self.run_id,
            credit: credit.clone(),
            reason: reason.clone(),
            timestamp: self.time.now(),
        });
        self.summary.record_final_state(credit.clone(), state);
        self.summary.record_skip(credit, kind, reason);
    }

    /// create one new payment document; failures are recorded as skips
    async fn mint_payment(&mut self, request: &ReconcileRequest, instruction: &PaymentInstruction) -> Option<Credit> {
        if !instruction.amount.is_positive() {
            self.skip(
                instruction.label(),
                SkipKind::NoCreditBalance,
                format!(
                    "{} of {} was not created: amount must be greater than zero.",
                    instruction.label(),
                    instruction.amount
                ),
                CreditState::Pending,
            );
            return None;
        }

        let bank_currency = instruction.bank_currency.as_deref().unwrap_or(&request.currency);
        let amounts = paid_and_received(
            &request.currency,
            bank_currency,
            instruction.amount,
            PaymentDirection::Receive,
            instruction.bank_amount,
            instruction.exchange_rate.unwrap_or_default(),
        );
        let draft = PaymentDraft {
            amount: amounts.paid,
            received_amount: amounts.received,
            mode_of_payment: instruction.mode_of_payment.clone(),
            customer: request.customer.clone(),
            company: request.company.clone(),
            currency: request.currency.clone(),
            posting_date: self.time.now().date_naive(),
            reference_no: request.shift.clone(),
            cost_center: self.config.cost_center.clone(),
        };

        match bounded(self.config.posting_timeout, self.submitter.create_payment(&draft)).await {
            Ok(document) => {
                info!(payment = %document.name, amount = %document.paid_amount, "payment created");
                self.payment_created(&document.name, document.paid_amount, &document.mode_of_payment);
                Some(Credit::from_payment_document(document, &request.customer))
            }
            Err(e) => {
                self.skip(
                    instruction.label(),
                    SkipKind::CreationFailed,
                    format!("Could not create {} of {}: {}", instruction.label(), instruction.amount, e),
                    CreditState::Pending,
                );
                None
            }
        }
    }

    async fn process(&mut self, mut credit: Credit) {
        self.summary.record_processed();

        if credit.currency() != self.currency {
            let skip = currency_mismatch(&credit, self.currency);
            self.skip(skip.credit, skip.kind, skip.reason, CreditState::Pending);
            return;
        }

        let mut scope = RunScope {
            run_id: self.run_id,
            time: self.time,
            events: &mut *self.events,
        };
        let execution = self
            .executor
            .execute(self.ledger, &mut credit, &mut self.receivables, &mut scope)
            .await;

        if execution.posting_attempted {
            self.stats.attempts += 1;
        }
        if execution.ledger_unavailable() {
            self.stats.unavailable += 1;
        }
        self.summary
            .record_final_state(credit.reference.clone(), execution.lifecycle.state);

        match execution.outcome {
            ExecutionOutcome::Committed { allocation, issue } => {
                self.stats.committed += 1;
                if let Some(issue) = issue {
                    self.summary.record_issue(issue);
                }
                self.summary.record_allocation(allocation);
            }
            ExecutionOutcome::Skipped { kind, reason, .. } => {
                self.summary.record_skip(credit.reference, kind, reason);
            }
        }
    }

    fn cancelled(mut self, unprocessed: Vec<CreditRef>) -> ReconciliationSummary {
        warn!(unprocessed = unprocessed.len(), "run cancelled");
        self.summary.mark_cancelled(unprocessed);
        self.complete(true)
    }

    fn finish(self) -> Result<ReconciliationSummary> {
        if self.stats.ledger_unreachable() {
            error!(attempts = self.stats.attempts, "ledger unreachable for every posting");
            return Err(ReconcileError::LedgerUnreachable {
                attempts: self.stats.attempts,
                new_payments: self.summary.new_payments().to_vec(),
            });
        }
        Ok(self.complete(false))
    }

    fn complete(self, cancelled: bool) -> ReconciliationSummary {
        let total_allocated = self.summary.total_allocated();
        let reconciled = self.summary.reconciled();
        let skipped = self.summary.skipped();
        self.events.emit(Event::RunCompleted {
            run_id: self.run_id,
            total_allocated,
            reconciled,
            skipped,
            cancelled,
            timestamp: self.time.now(),
        });
        let summary = self
            .summary
            .finalize(&self.receivables, self.currency, self.config.precision);
        info!(
            allocated = %summary.total_allocated,
            reconciled = summary.reconciled_count,
            skipped = summary.skipped_payments.len(),
            "{}",
            summary.message
        );
        summary
    }
}
