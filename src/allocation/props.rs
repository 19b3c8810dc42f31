//! Property-based tests for allocation planning.
//!
//! - conservation: a plan never moves more than the credit holds, nor more than
//!   any invoice owes
//! - round trip: applying a plan and restoring it leaves the receivables untouched

use chrono::NaiveDate;
use proptest::prelude::*;

use super::planner::AllocationPlanner;
use crate::credits::{Credit, CreditKind};
use crate::decimal::{ExchangeRate, Money};
use crate::receivables::{Invoice, ReceivableSet};
use crate::types::PostingContext;

/// amounts from 0.01 to 10,000.00
fn amount() -> impl Strategy<Value = Money> {
    (1i64..1_000_000i64).prop_map(|cents| Money::from_minor(cents, 2))
}

fn invoices() -> impl Strategy<Value = Vec<Invoice>> {
    prop::collection::vec((amount(), 1u32..28), 0..12).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (outstanding, day))| {
                Invoice::new(
                    format!("SINV-{i:03}"),
                    outstanding,
                    NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                    "KES",
                )
            })
            .collect()
    })
}

fn credit(amount: Money) -> Credit {
    Credit::new(
        "PE-PROP",
        CreditKind::ExistingPayment { mode_of_payment: None },
        amount,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        PostingContext {
            account: "Debtors".to_string(),
            party: "CUST".to_string(),
            currency: "KES".to_string(),
            exchange_rate: ExchangeRate::PAR,
            cost_center: None,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_plan_conserves_credit_and_outstanding(invoices in invoices(), available in amount()) {
        let set = ReceivableSet::new(invoices);
        let credit = credit(available);
        let plan = AllocationPlanner.plan(&set, &credit);

        prop_assert!(plan.total() <= available);
        prop_assert_eq!(plan.total() + plan.leftover, available);
        for record in &plan.records {
            prop_assert!(record.allocated_amount.is_positive());
            prop_assert!(record.allocated_amount <= set.remaining(&record.invoice).unwrap());
        }
        prop_assert_eq!(plan.total(), available.min(set.total_outstanding()));
    }

    #[test]
    fn prop_apply_then_restore_is_identity(invoices in invoices(), available in amount()) {
        let mut set = ReceivableSet::new(invoices);
        let before = set.balances();
        let plan = AllocationPlanner.plan(&set, &credit(available));

        for record in &plan.records {
            set.apply(&record.invoice, record.allocated_amount).unwrap();
        }
        for record in plan.records.iter().rev() {
            set.restore(&record.invoice, record.allocated_amount).unwrap();
        }
        prop_assert_eq!(set.balances(), before);
    }

    #[test]
    fn prop_plan_is_deterministic(invoices in invoices(), available in amount()) {
        let set = ReceivableSet::new(invoices);
        let credit = credit(available);
        prop_assert_eq!(AllocationPlanner.plan(&set, &credit), AllocationPlanner.plan(&set, &credit));
    }
}
