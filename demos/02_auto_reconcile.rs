/// auto reconcile - sweep every unallocated credit a customer holds
#[path = "support/mod.rs"]
mod support;

use std::sync::Arc;

use pos_reconcile::{telemetry, PaymentIntakeCoordinator, ReconcileConfig, SafeTimeProvider, TimeSource};
use support::{date, Books};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init("pos_reconcile=info")?;

    let books = Arc::new(Books::default());
    books.invoice("SINV-0201", 90, date(1, 10));
    books.invoice("SINV-0202", 140, date(2, 3));
    books.payment("ACC-PAY-1001", 60, date(2, 5));
    books.credit_note("SINV-RET-0011", 45, date(1, 28));
    books.payment("ACC-PAY-1002", 100, date(3, 1));

    let config = ReconcileConfig::from_json(
        r#"{
            "payments_enabled": true,
            "allow_settlement_credits": false,
            "allow_existing_credits": true,
            "allow_new_payments": false,
            "posting_timeout": 5000
        }"#,
    )?;
    let mut coordinator = PaymentIntakeCoordinator::new(
        books.clone(),
        books.clone(),
        books.clone(),
        config,
        SafeTimeProvider::new(TimeSource::System),
    )?;

    let summary = coordinator
        .auto_reconcile("Kamau Pharmacy", "Nairobi Retail", Some("KES"), None)
        .await?;
    println!("{}", summary.message);
    for allocation in &summary.allocations {
        println!(
            "  {} {} -> {} (unapplied {})",
            allocation.credit_kind, allocation.credit, allocation.allocated_amount, allocation.unapplied
        );
    }

    // a second sweep finds nothing left to do
    let again = coordinator
        .auto_reconcile("Kamau Pharmacy", "Nairobi Retail", Some("KES"), None)
        .await?;
    println!("{}", again.message);

    Ok(())
}
