use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ReconcileError, Result};
use crate::types::CreditRef;

/// lifecycle of one credit within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditState {
    /// queued, nothing computed yet
    Pending,
    /// allocation plan computed, nothing mutated
    Planned,
    /// plan applied to in-memory balances, ledger not yet written
    TentativelyApplied,
    /// ledger accepted the posting
    Committed,
    /// in-memory mutations undone
    RolledBack,
}

impl CreditState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CreditState::Committed | CreditState::RolledBack)
    }

    /// allowed forward edges of the state machine
    pub fn can_transition_to(&self, next: CreditState) -> bool {
        use CreditState::*;
        matches!(
            (self, next),
            (Pending, Planned)
                | (Planned, TentativelyApplied)
                | (TentativelyApplied, Committed)
                | (TentativelyApplied, RolledBack)
        )
    }
}

impl std::fmt::Display for CreditState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// a recorded transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: CreditState,
    pub to: CreditState,
    pub timestamp: DateTime<Utc>,
}

/// per-credit state machine with its transition history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditLifecycle {
    pub credit: CreditRef,
    pub state: CreditState,
    pub history: Vec<Transition>,
}

impl CreditLifecycle {
    pub fn new(credit: CreditRef) -> Self {
        Self {
            credit,
            state: CreditState::Pending,
            history: Vec::new(),
        }
    }

    /// move to the next state, refusing anything off the state machine
    pub fn advance(&mut self, next: CreditState, timestamp: DateTime<Utc>) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ReconcileError::IllegalTransition {
                credit: self.credit.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.history.push(Transition {
            from: self.state,
            to: next,
            timestamp,
        });
        self.state = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
