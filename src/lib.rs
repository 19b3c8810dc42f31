pub mod allocation;
pub mod config;
pub mod coordinator;
pub mod credits;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod executor;
pub mod ledger;
pub mod receivables;
pub mod state;
pub mod summary;
pub mod telemetry;
pub mod types;

// re-export key types
pub use allocation::{AllocationPlan, AllocationPlanner, AllocationRecord, SkipReason};
pub use config::ReconcileConfig;
pub use coordinator::{PaymentInstruction, PaymentIntakeCoordinator, ReconcileRequest, ReconciliationPreview};
pub use credits::{Credit, CreditKind, CreditQueue};
pub use decimal::{ExchangeRate, Money, Precision};
pub use errors::{LedgerError, ReconcileError, Result, ValidationError};
pub use events::{Event, EventStore};
pub use executor::{CreditExecution, ExecutionOutcome, ReconciliationExecutor};
pub use ledger::{
    CreditRecord, DocumentSubmitter, Ledger, PaymentDocument, PaymentDraft, PostingReceipt,
    PostingRequest, ReturnNote, SettlementGateway, SettlementRecord, UnallocatedPayment,
};
pub use receivables::{Invoice, ReceivableSet};
pub use state::{CreditLifecycle, CreditState};
pub use summary::{
    ConsistencyIssue, CreditAllocation, InvoiceAllocation, ReconciliationSummary, SkipKind,
    SkippedCredit,
};
pub use types::{CreditPhase, CreditRef, InvoiceRef, PostingContext, ReceivableQuery, RunId};

// re-export external dependencies that users will need
pub use async_trait::async_trait;
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use tokio_util::sync::CancellationToken;
pub use uuid::Uuid;
