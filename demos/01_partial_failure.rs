/// partial failure - one locked credit is rolled back, the rest still settle
#[path = "support/mod.rs"]
mod support;

use std::sync::Arc;

use pos_reconcile::chrono::{TimeZone, Utc};
use pos_reconcile::{
    telemetry, Event, PaymentIntakeCoordinator, ReconcileConfig, ReconcileRequest,
    SafeTimeProvider, TimeSource,
};
use support::{date, Books};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init("pos_reconcile=debug")?;

    let books = Arc::new(Books::default());
    books.invoice("SINV-0101", 300, date(3, 1));
    books.invoice("SINV-0102", 450, date(3, 15));
    books.settlement("MPESA-8841", "MP-0007", 200, date(5, 2));
    books.payment("ACC-PAY-0950", 250, date(4, 20));
    books.credit_note("SINV-RET-0009", 180, date(4, 22));
    books.lock("ACC-PAY-0950");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 5, 6, 9, 30, 0).unwrap()));
    let mut coordinator = PaymentIntakeCoordinator::new(
        books.clone(),
        books.clone(),
        books.clone(),
        ReconcileConfig::standard().with_cost_center("Main - NR"),
        time,
    )?;

    let request = ReconcileRequest::new("Otieno Hardware", "Nairobi Retail", "KES")
        .shift("POS-SHIFT-0043")
        .settlement("MPESA-8841")
        .existing("ACC-PAY-0950")
        .existing("SINV-RET-0009");

    let preview = coordinator.preview(&request).await?;
    println!("preview: {} planned across {} credit(s)", preview.total_planned, preview.plans.len());

    let summary = coordinator.reconcile(request).await?;
    println!("{}", summary.message);
    for skipped in &summary.skipped_payments {
        println!("  skipped {}: {}", skipped.credit, skipped.reason);
    }
    books.print_invoices();

    for event in coordinator.take_events() {
        if let Event::CreditRolledBack { credit, amount, reason, .. } = event {
            println!("rolled back {credit} ({amount}): {reason}");
        }
    }

    Ok(())
}
