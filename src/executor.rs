use std::time::Duration;

use hourglass_rs::SafeTimeProvider;
use tracing::{debug, error, info, warn};

use crate::allocation::{AllocationPlan, AllocationPlanner, SkipReason};
use crate::credits::Credit;
use crate::decimal::Money;
use crate::errors::{LedgerError, ReconcileError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{bounded, Ledger, PostingRequest};
use crate::receivables::ReceivableSet;
use crate::state::{CreditLifecycle, CreditState};
use crate::summary::{ConsistencyIssue, CreditAllocation, InvoiceAllocation, SkipKind};
use crate::types::{InvoiceRef, RunId};

/// what happened to one credit
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Committed {
        allocation: CreditAllocation,
        issue: Option<ConsistencyIssue>,
    },
    Skipped {
        kind: SkipKind,
        reason: String,
        /// collaborator failure behind a posting skip
        failure: Option<LedgerError>,
    },
}

#[derive(Debug, Clone)]
pub struct CreditExecution {
    pub lifecycle: CreditLifecycle,
    pub outcome: ExecutionOutcome,
    /// a posting request reached the ledger (or timed out on the way)
    pub posting_attempted: bool,
}

impl CreditExecution {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Committed { .. })
    }

    /// posting failed because the ledger could not be reached
    pub fn ledger_unavailable(&self) -> bool {
        matches!(
            &self.outcome,
            ExecutionOutcome::Skipped { failure: Some(e), .. } if e.is_unavailable()
        )
    }
}

/// per-run inputs shared by every credit
pub struct RunScope<'a> {
    pub run_id: RunId,
    pub time: &'a SafeTimeProvider,
    pub events: &'a mut EventStore,
}

/// turns one credit's plan into ledger state, atomically per credit
///
/// The plan is applied to the in-memory receivables and credit first, then sent
/// to the ledger as a single posting. A rejected, failed or timed out posting
/// restores both sides to exactly where they were before the credit was
/// touched. Nothing here aborts the batch.
#[derive(Debug, Clone)]
pub struct ReconciliationExecutor {
    planner: AllocationPlanner,
    timeout: Duration,
    tolerance: Money,
}

impl ReconciliationExecutor {
    pub fn new(timeout: Duration, tolerance: Money) -> Self {
        Self {
            planner: AllocationPlanner,
            timeout,
            tolerance,
        }
    }

    pub fn planner(&self) -> &AllocationPlanner {
        &self.planner
    }

    pub async fn execute(
        &self,
        ledger: &dyn Ledger,
        credit: &mut Credit,
        receivables: &mut ReceivableSet,
        scope: &mut RunScope<'_>,
    ) -> CreditExecution {
        let mut lifecycle = CreditLifecycle::new(credit.reference.clone());
        let mut posting_attempted = false;

        let outcome = match self
            .run(ledger, credit, receivables, scope, &mut lifecycle, &mut posting_attempted)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(credit = %credit.reference, error = %e, "credit aborted");
                ExecutionOutcome::Skipped {
                    kind: skip_kind_of(&e),
                    reason: e.to_string(),
                    failure: None,
                }
            }
        };

        if let ExecutionOutcome::Skipped { reason, .. } = &outcome {
            scope.events.emit(Event::CreditSkipped {
                run_id: scope.run_id,
                credit: credit.reference.clone(),
                reason: reason.clone(),
                timestamp: scope.time.now(),
            });
        }

        CreditExecution {
            lifecycle,
            outcome,
            posting_attempted,
        }
    }

    async fn run(
        &self,
        ledger: &dyn Ledger,
        credit: &mut Credit,
        receivables: &mut ReceivableSet,
        scope: &mut RunScope<'_>,
        lifecycle: &mut CreditLifecycle,
        posting_attempted: &mut bool,
    ) -> Result<ExecutionOutcome> {
        let plan = self.planner.plan(receivables, credit);
        lifecycle.advance(CreditState::Planned, scope.time.now())?;
        scope.events.emit(Event::CreditPlanned {
            run_id: scope.run_id,
            credit: credit.reference.clone(),
            invoices: plan.records.iter().map(|r| r.invoice.clone()).collect(),
            planned: plan.total(),
            leftover: plan.leftover,
            timestamp: scope.time.now(),
        });

        if let Some(reason) = plan.skip {
            debug!(credit = %credit.reference, ?reason, "nothing to allocate");
            return Ok(ExecutionOutcome::Skipped {
                kind: match reason {
                    SkipReason::NoCreditBalance => SkipKind::NoCreditBalance,
                    SkipReason::NoOutstandingInvoices => SkipKind::NoOutstandingInvoices,
                },
                reason: reason.describe(credit),
                failure: None,
            });
        }

        // tentative phase
        let unreconciled = credit.amount_available();
        lifecycle.advance(CreditState::TentativelyApplied, scope.time.now())?;
        let mut applied: Vec<(InvoiceRef, Money)> = Vec::with_capacity(plan.records.len());
        if let Err(e) = apply_plan(&plan, credit, receivables, &mut applied) {
            self.roll_back(credit, receivables, &applied, lifecycle, scope, &e.to_string())?;
            return Ok(ExecutionOutcome::Skipped {
                kind: SkipKind::Invariant,
                reason: e.to_string(),
                failure: None,
            });
        }
        scope.events.emit(Event::CreditApplied {
            run_id: scope.run_id,
            credit: credit.reference.clone(),
            amount: plan.total(),
            timestamp: scope.time.now(),
        });

        let request = PostingRequest {
            run_id: scope.run_id,
            credit: credit.reference.clone(),
            credit_kind: credit.kind.label().to_string(),
            context: credit.as_posting_context().clone(),
            unreconciled_amount: unreconciled,
            total_allocated: plan.total(),
            records: plan.records.clone(),
        };
        if !request.is_balanced(self.tolerance) {
            let message = format!("posting for {} is not balanced", credit.reference);
            self.roll_back(credit, receivables, &applied, lifecycle, scope, &message)?;
            return Ok(ExecutionOutcome::Skipped {
                kind: SkipKind::Invariant,
                reason: message,
                failure: None,
            });
        }

        // commit phase
        *posting_attempted = true;
        let posted = match bounded(self.timeout, ledger.post_reconciliation(&request)).await {
            Ok(receipt) if receipt.posted => Ok(receipt.ledger_delta),
            Ok(receipt) => Err(LedgerError::Rejected(
                receipt.error.unwrap_or_else(|| "posting was not accepted".to_string()),
            )),
            Err(e) => Err(e),
        };

        let reported = match posted {
            Ok(reported) => reported,
            Err(failure) => {
                let err = ReconcileError::Posting {
                    credit: credit.reference.clone(),
                    message: failure.to_string(),
                };
                warn!(credit = %credit.reference, error = %failure, "posting failed, rolling back");
                self.roll_back(credit, receivables, &applied, lifecycle, scope, &failure.to_string())?;
                return Ok(ExecutionOutcome::Skipped {
                    kind: SkipKind::Posting,
                    reason: err.to_string(),
                    failure: Some(failure),
                });
            }
        };

        lifecycle.advance(CreditState::Committed, scope.time.now())?;
        info!(
            credit = %credit.reference,
            amount = %plan.total(),
            unapplied = %credit.amount_available(),
            invoices = plan.records.len(),
            "credit committed"
        );
        scope.events.emit(Event::CreditCommitted {
            run_id: scope.run_id,
            credit: credit.reference.clone(),
            amount: plan.total(),
            unapplied: credit.amount_available(),
            timestamp: scope.time.now(),
        });

        let issue = self
            .check_consistency(ledger, credit, unreconciled, plan.total(), reported, scope)
            .await;

        Ok(ExecutionOutcome::Committed {
            allocation: CreditAllocation {
                credit: credit.reference.clone(),
                credit_kind: credit.kind.label().to_string(),
                allocated_amount: plan.total(),
                unapplied: credit.amount_available(),
                allocations: plan.records.iter().map(InvoiceAllocation::from).collect(),
            },
            issue,
        })
    }

    /// undo this credit's tentative mutations, newest first
    fn roll_back(
        &self,
        credit: &mut Credit,
        receivables: &mut ReceivableSet,
        applied: &[(InvoiceRef, Money)],
        lifecycle: &mut CreditLifecycle,
        scope: &mut RunScope<'_>,
        reason: &str,
    ) -> Result<()> {
        let mut total = Money::ZERO;
        for (invoice, amount) in applied.iter().rev() {
            receivables.restore(invoice, *amount)?;
            credit.refund(*amount)?;
            total += *amount;
        }
        lifecycle.advance(CreditState::RolledBack, scope.time.now())?;
        debug!(credit = %credit.reference, amount = %total, "tentative allocation restored");
        scope.events.emit(Event::CreditRolledBack {
            run_id: scope.run_id,
            credit: credit.reference.clone(),
            amount: total,
            reason: reason.to_string(),
            timestamp: scope.time.now(),
        });
        Ok(())
    }

    /// compare the local allocation with what the ledger says moved
    async fn check_consistency(
        &self,
        ledger: &dyn Ledger,
        credit: &Credit,
        unreconciled: Money,
        allocated: Money,
        reported: Money,
        scope: &mut RunScope<'_>,
    ) -> Option<ConsistencyIssue> {
        // the receipt's own delta is checked before the balance is re-read
        let delta = if !reported.within(allocated, self.tolerance) {
            reported
        } else {
            match bounded(self.timeout, ledger.read_unallocated(&credit.reference)).await {
                Ok(after) => unreconciled - after,
                Err(e) => {
                    warn!(credit = %credit.reference, error = %e, "could not re-read unallocated balance");
                    return Some(ConsistencyIssue {
                        credit: credit.reference.clone(),
                        local: allocated,
                        ledger: None,
                        message: format!("could not re-read unallocated balance: {}", e),
                    });
                }
            }
        };

        if delta.within(allocated, self.tolerance) {
            return None;
        }

        let err = ReconcileError::Consistency {
            credit: credit.reference.clone(),
            local: allocated,
            ledger: delta,
        };
        warn!(credit = %credit.reference, local = %allocated, ledger = %delta, "{}", err);
        scope.events.emit(Event::ConsistencyMismatch {
            run_id: scope.run_id,
            credit: credit.reference.clone(),
            local: allocated,
            ledger: delta,
            timestamp: scope.time.now(),
        });
        Some(ConsistencyIssue {
            credit: credit.reference.clone(),
            local: allocated,
            ledger: Some(delta),
            message: err.to_string(),
        })
    }
}

fn apply_plan(
    plan: &AllocationPlan,
    credit: &mut Credit,
    receivables: &mut ReceivableSet,
    applied: &mut Vec<(InvoiceRef, Money)>,
) -> Result<()> {
    for record in &plan.records {
        receivables.apply(&record.invoice, record.allocated_amount)?;
        if let Err(e) = credit.consume(record.allocated_amount) {
            receivables.restore(&record.invoice, record.allocated_amount)?;
            return Err(e);
        }
        applied.push((record.invoice.clone(), record.allocated_amount));
    }
    Ok(())
}

fn skip_kind_of(err: &ReconcileError) -> SkipKind {
    match err {
        ReconcileError::NotFound { .. } => SkipKind::NotFound,
        ReconcileError::Posting { .. } => SkipKind::Posting,
        _ => SkipKind::Invariant,
    }
}
