//! Per-line validation

use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::iso::Currency;
use smallvec::SmallVec;

use crate::{
    breakdown::PriceBreakdown,
    cart::{CartLine, PurchaseMode},
    persistence::{StoredBreakdown, StoredCartLine},
    prices::Price,
    products::Product,
    reconcile::{InvalidReason, LineChange, Lookup},
    solvers::price_line,
};

/// A line that passed validation, repriced from current data.
#[derive(Debug)]
pub(super) struct Checked {
    pub(super) line: CartLine,

    /// Stored quantity, when it had to be reduced
    pub(super) clamped_from: Option<u32>,

    /// Current unit price for the stored quantities, in minor units
    pub(super) current_unit_price: Option<Decimal>,
}

/// Validate and reprice a stored line against a product lookup.
pub(super) fn check(
    stored: &StoredCartLine,
    lookup: &Lookup,
    currency: &'static Currency,
    now: Timestamp,
) -> Result<Checked, InvalidReason> {
    let product = match lookup {
        Ok(Some(product)) => product,
        Ok(None) => return Err(InvalidReason::ProductUnavailable),
        Err(err) => return Err(InvalidReason::LookupFailed(err.to_string())),
    };

    if !product.in_stock {
        return Err(InvalidReason::OutOfStock);
    }

    if product.currency() != currency {
        return Err(InvalidReason::PricingFailed(format!(
            "product is priced in {}, cart uses {}",
            product.currency().iso_alpha_code,
            currency.iso_alpha_code
        )));
    }

    let quantity = available_quantity(stored, product)?;

    let mut line = CartLine::priced(
        stored.id,
        stored.key(),
        quantity,
        product,
        stored.added_at,
    )
    .map_err(|err| InvalidReason::PricingFailed(err.to_string()))?;

    line.validated_at = Some(now);

    let priced = stored.priced_at();

    let current_unit_price = if priced == [quantity] {
        implied_unit_price(&line.breakdown)
    } else {
        current_unit_price_for(product, stored.mode, &priced)
    };

    Ok(Checked {
        clamped_from: (quantity != stored.quantity).then_some(stored.quantity),
        line,
        current_unit_price,
    })
}

/// Changes to report for a line that passed validation.
pub(super) fn changes(
    stored: &StoredCartLine,
    checked: &Checked,
    tolerance: Decimal,
) -> SmallVec<[LineChange; 2]> {
    let mut changes = SmallVec::new();

    if let Some(from) = checked.clamped_from {
        changes.push(LineChange::QuantityClamped {
            from,
            to: checked.line.quantity,
        });
    }

    let currency = checked.line.breakdown.currency();

    if stored.breakdown.currency != currency.iso_alpha_code {
        return changes;
    }

    let moved = match (
        stored.breakdown.implied_unit_price(),
        checked.current_unit_price,
    ) {
        (Some(previous), Some(current)) if (previous - current).abs() > tolerance => {
            unit_price(previous, currency).zip(unit_price(current, currency))
        }
        _ => None,
    };

    if let Some((previous, current)) = moved {
        changes.push(LineChange::PriceChanged { previous, current });
    }

    changes
}

/// Quantity that can be kept given current stock and sets.
fn available_quantity(stored: &StoredCartLine, product: &Product) -> Result<u32, InvalidReason> {
    if product.allows_bulk {
        set_size(stored, product)?;

        return Ok(stored.quantity);
    }

    let stock = product.stock_quantity;

    if stock == 0 {
        return Err(InvalidReason::OutOfStock);
    }

    let pieces_per_unit = set_size(stored, product)?.unwrap_or(1);
    let most = stock.checked_div(pieces_per_unit).unwrap_or(0);

    if most == 0 {
        return Err(InvalidReason::InsufficientStockForSet {
            set_size: pieces_per_unit,
            stock,
        });
    }

    Ok(stored.quantity.min(most))
}

/// Size of the chosen set, or `None` for piece purchases.
fn set_size(stored: &StoredCartLine, product: &Product) -> Result<Option<u32>, InvalidReason> {
    match stored.mode {
        PurchaseMode::Piece => Ok(None),
        PurchaseMode::Set { set } => product
            .set(set)
            .map(|set| Some(set.size))
            .ok_or(InvalidReason::SetUnavailable),
    }
}

/// Current price per piece of buying each of `quantities` on its own.
fn current_unit_price_for(
    product: &Product,
    mode: PurchaseMode,
    quantities: &[u32],
) -> Option<Decimal> {
    let mut total = StoredBreakdown {
        currency: product.currency().iso_alpha_code.to_string(),
        total_price: 0,
        original_price: 0,
        total_pieces: 0,
    };

    for &quantity in quantities {
        let breakdown = price_line(product, mode, quantity).ok()?;

        total.total_price = total
            .total_price
            .checked_add(breakdown.total_price().to_minor_units())?;
        total.total_pieces = total.total_pieces.checked_add(breakdown.total_pieces())?;
    }

    total.implied_unit_price()
}

fn implied_unit_price(breakdown: &PriceBreakdown) -> Option<Decimal> {
    StoredBreakdown::from(breakdown).implied_unit_price()
}

fn unit_price(minor_units: Decimal, currency: &'static Currency) -> Option<Price> {
    minor_units
        .round_dp(0)
        .to_i64()
        .map(|minor_units| Price::from_minor(minor_units, currency))
}
