use std::cmp::Ordering;

use crate::types::CreditPhase;

use super::Credit;

/// credits of one run, kept in processing order
///
/// Phases run settlement, existing, new. Within the existing phase credit notes
/// and payments interleave by posting date then reference; the other phases keep
/// the order the credits were gathered in.
#[derive(Debug, Clone, Default)]
pub struct CreditQueue {
    credits: Vec<Credit>,
    next_order: u64,
}

impl CreditQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a credit, stamping its creation order
    pub fn push(&mut self, mut credit: Credit) {
        credit.creation_order = self.next_order;
        self.next_order += 1;
        self.credits.push(credit);
    }

    pub fn len(&self) -> usize {
        self.credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.credits.iter().any(|c| c.reference == reference)
    }

    /// drain the queue in processing order
    pub fn into_ordered(mut self) -> Vec<Credit> {
        self.credits.sort_by(processing_order);
        self.credits
    }

    /// credits of one phase, in processing order
    pub fn phase(&self, phase: CreditPhase) -> Vec<&Credit> {
        let mut credits: Vec<&Credit> = self.credits.iter().filter(|c| c.phase() == phase).collect();
        credits.sort_by(|a, b| processing_order(a, b));
        credits
    }
}

/// total order over credits of a run
pub fn processing_order(a: &Credit, b: &Credit) -> Ordering {
    a.phase().cmp(&b.phase()).then_with(|| match a.phase() {
        CreditPhase::Existing => chronological(a, b),
        _ => a.creation_order.cmp(&b.creation_order),
    })
}

/// posting date, then reference
pub fn chronological(a: &Credit, b: &Credit) -> Ordering {
    a.posting_date
        .cmp(&b.posting_date)
        .then_with(|| a.reference.cmp(&b.reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::CreditKind;
    use crate::decimal::{ExchangeRate, Money};
    use crate::types::PostingContext;
    use chrono::NaiveDate;

    fn ctx() -> PostingContext {
        PostingContext {
            account: "Debtors".to_string(),
            party: "CUST-1".to_string(),
            currency: "KES".to_string(),
            exchange_rate: ExchangeRate::PAR,
            cost_center: None,
        }
    }

    fn credit(reference: &str, kind: CreditKind, day: u32) -> Credit {
        Credit::new(
            reference,
            kind,
            Money::from_major(10),
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            ctx(),
        )
    }

    fn payment(reference: &str, day: u32) -> Credit {
        credit(reference, CreditKind::ExistingPayment { mode_of_payment: None }, day)
    }

    fn note(reference: &str, day: u32) -> Credit {
        credit(reference, CreditKind::CreditNote { return_against: None }, day)
    }

    #[test]
    fn test_phase_order() {
        let mut queue = CreditQueue::new();
        queue.push(credit(
            "NEW-1",
            CreditKind::CashPayment {
                mode_of_payment: "Cash".to_string(),
                received_amount: Money::from_major(10),
            },
            1,
        ));
        queue.push(payment("PE-1", 1));
        queue.push(credit(
            "MPESA-1",
            CreditKind::SettlementPayment {
                transaction_id: "TX".to_string(),
            },
            9,
        ));

        let refs: Vec<_> = queue.into_ordered().into_iter().map(|c| c.reference).collect();
        assert_eq!(refs, vec!["MPESA-1", "PE-1", "NEW-1"]);
    }

    #[test]
    fn test_existing_credits_interleave_by_posting_date() {
        let mut queue = CreditQueue::new();
        queue.push(payment("PE-2", 5));
        queue.push(note("RET-1", 2));
        queue.push(payment("PE-1", 3));
        queue.push(note("RET-2", 5));

        let refs: Vec<_> = queue.into_ordered().into_iter().map(|c| c.reference).collect();
        assert_eq!(refs, vec!["RET-1", "PE-1", "PE-2", "RET-2"]);
    }

    #[test]
    fn test_new_payments_keep_instruction_order() {
        let mut queue = CreditQueue::new();
        for reference in ["NEW-B", "NEW-A"] {
            queue.push(credit(
                reference,
                CreditKind::CashPayment {
                    mode_of_payment: "Card".to_string(),
                    received_amount: Money::from_major(10),
                },
                1,
            ));
        }
        let refs: Vec<_> = queue
            .phase(CreditPhase::NewPayment)
            .into_iter()
            .map(|c| c.reference.clone())
            .collect();
        assert_eq!(refs, vec!["NEW-B", "NEW-A"]);
    }
}
