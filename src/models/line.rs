//! Document line arithmetic.
//!
//! One place computes discount and total for a line; every quantity,
//! price, or discount edit goes back through [`recalc_line`] so a stored
//! `total` can never go stale. All functions are pure and deterministic.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Derived money fields of a single line. Never edited independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub discount_amount: Decimal,
    pub total: Decimal,
}

/// Inputs the aggregator needs from each line.
#[derive(Debug, Clone, Copy)]
pub struct LineView {
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_pct: Decimal,
    pub vat_pct: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

/// Document-level sums over all lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub total_amount: Decimal,
    pub discount_total: Decimal,
    pub vat_amount: Decimal,
    pub quantity_total: i64,
}

/// Money values round to 2 decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Recomputes the derived fields of one line.
///
/// `discount_amount = round(quantity * price * discount_pct / 100)` and
/// `total = round(quantity * price - discount_amount)`. Rejects
/// non-positive quantity/price and a discount outside `0..=100`; the
/// message names the offending field so callers can point at it.
pub fn recalc_line(
    quantity: i32,
    unit_price: Decimal,
    discount_pct: Decimal,
) -> Result<LineAmounts, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    if unit_price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "price must be positive, got {unit_price}"
        )));
    }
    if discount_pct < Decimal::ZERO || discount_pct > HUNDRED {
        return Err(ServiceError::ValidationError(format!(
            "discount_pct must be between 0 and 100, got {discount_pct}"
        )));
    }

    let gross = Decimal::from(quantity) * unit_price;
    let discount_amount = round_money(gross * discount_pct / HUNDRED);
    let total = round_money(gross - discount_amount);
    Ok(LineAmounts {
        discount_amount,
        total,
    })
}

/// Sums line totals into document totals.
///
/// VAT is computed on the discounted net of each line:
/// `quantity * price * (1 - discount/100) * vat/100`.
pub fn aggregate(lines: &[LineView]) -> DocumentTotals {
    let mut totals = DocumentTotals {
        total_amount: Decimal::ZERO,
        discount_total: Decimal::ZERO,
        vat_amount: Decimal::ZERO,
        quantity_total: 0,
    };
    for line in lines {
        totals.total_amount += line.total;
        totals.discount_total += line.discount_amount;
        totals.quantity_total += i64::from(line.quantity);
        let net = Decimal::from(line.quantity)
            * line.unit_price
            * (Decimal::ONE - line.discount_pct / HUNDRED);
        totals.vat_amount += net * line.vat_pct / HUNDRED;
    }
    totals.vat_amount = round_money(totals.vat_amount);
    totals
}

/// Base-currency equivalent of an amount, derived on demand.
///
/// Documents store amounts in their own currency plus the exchange rate;
/// the base figure is never stored as a second source of truth.
pub fn base_equivalent(amount: Decimal, exchange_rate: Decimal) -> Decimal {
    round_money(amount * exchange_rate)
}
