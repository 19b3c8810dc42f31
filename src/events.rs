use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CreditPhase, CreditRef, InvoiceRef, RunId};

/// audit events emitted while a run progresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // run events
    RunStarted {
        run_id: RunId,
        customer: String,
        company: String,
        open_invoices: usize,
        total_outstanding: Money,
        timestamp: DateTime<Utc>,
    },
    PhaseStarted {
        run_id: RunId,
        phase: CreditPhase,
        credits: usize,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        total_allocated: Money,
        reconciled: usize,
        skipped: usize,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },

    // credit lifecycle events
    PaymentCreated {
        run_id: RunId,
        credit: CreditRef,
        amount: Money,
        mode_of_payment: String,
        timestamp: DateTime<Utc>,
    },
    CreditPlanned {
        run_id: RunId,
        credit: CreditRef,
        invoices: Vec<InvoiceRef>,
        planned: Money,
        leftover: Money,
        timestamp: DateTime<Utc>,
    },
    CreditApplied {
        run_id: RunId,
        credit: CreditRef,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    CreditCommitted {
        run_id: RunId,
        credit: CreditRef,
        amount: Money,
        unapplied: Money,
        timestamp: DateTime<Utc>,
    },
    CreditRolledBack {
        run_id: RunId,
        credit: CreditRef,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    CreditSkipped {
        run_id: RunId,
        credit: CreditRef,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ConsistencyMismatch {
        run_id: RunId,
        credit: CreditRef,
        local: Money,
        ledger: Money,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// the credit an event concerns; run-level events have none
    pub fn credit(&self) -> Option<&CreditRef> {
        match self {
            Event::RunStarted { .. } | Event::PhaseStarted { .. } | Event::RunCompleted { .. } => None,
            Event::PaymentCreated { credit, .. }
            | Event::CreditPlanned { credit, .. }
            | Event::CreditApplied { credit, .. }
            | Event::CreditCommitted { credit, .. }
            | Event::CreditRolledBack { credit, .. }
            | Event::CreditSkipped { credit, .. }
            | Event::ConsistencyMismatch { credit, .. } => Some(credit),
        }
    }
}

/// append-only buffer of run events, drained by the caller
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// events touching one credit, in emission order
    pub fn for_credit<'a>(&'a self, credit: &'a CreditRef) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.credit() == Some(credit))
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
