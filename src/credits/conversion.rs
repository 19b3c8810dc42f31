use serde::{Deserialize, Serialize};

use crate::decimal::{ExchangeRate, Money};

/// direction of money relative to the company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentDirection {
    Receive,
    Pay,
}

/// amounts on both sides of a payment document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidAmounts {
    /// in the party account currency
    pub paid: Money,
    /// in the bank account currency
    pub received: Money,
}

/// split a payment amount into party-side and bank-side figures
///
/// With matching currencies both sides equal the absolute amount. Otherwise the
/// party side carries the amount and the bank side is converted at `rate`,
/// unless the caller already knows the bank amount.
pub fn paid_and_received(
    party_currency: &str,
    bank_currency: &str,
    amount: Money,
    direction: PaymentDirection,
    bank_amount: Option<Money>,
    rate: ExchangeRate,
) -> PaidAmounts {
    let amount = amount.abs();
    if party_currency == bank_currency {
        return PaidAmounts {
            paid: amount,
            received: amount,
        };
    }

    match direction {
        PaymentDirection::Receive => PaidAmounts {
            paid: amount,
            received: bank_amount.unwrap_or_else(|| rate.convert(amount)),
        },
        PaymentDirection::Pay => PaidAmounts {
            paid: bank_amount.unwrap_or_else(|| rate.convert(amount)),
            received: amount,
        },
    }
}
