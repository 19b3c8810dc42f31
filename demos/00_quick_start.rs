/// quick start - settle two invoices with an existing payment and cash at the till
#[path = "support/mod.rs"]
mod support;

use std::sync::Arc;

use pos_reconcile::{
    telemetry, Money, PaymentInstruction, PaymentIntakeCoordinator, ReconcileConfig,
    ReconcileRequest, SafeTimeProvider, TimeSource,
};
use support::{date, Books};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init("pos_reconcile=info")?;

    let books = Arc::new(Books::default());
    books.invoice("SINV-0001", 1_200, date(4, 2));
    books.invoice("SINV-0002", 800, date(4, 9));
    books.payment("ACC-PAY-0900", 500, date(4, 12));

    let mut coordinator = PaymentIntakeCoordinator::new(
        books.clone(),
        books.clone(),
        books.clone(),
        ReconcileConfig::standard(),
        SafeTimeProvider::new(TimeSource::System),
    )?;

    let request = ReconcileRequest::new("Wanjiru Stores", "Nairobi Retail", "KES")
        .shift("POS-SHIFT-0042")
        .pos_profile("Front Counter")
        .existing("ACC-PAY-0900")
        .new_payment(PaymentInstruction::new(Money::from_major(1_000), "Cash"));

    let summary = coordinator.reconcile(request).await?;

    println!("{}", summary.message);
    books.print_invoices();
    println!("{}", summary.to_json_pretty()?);

    Ok(())
}
