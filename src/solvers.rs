//! Quantity Solvers
//!
//! Prices a requested quantity as the cheapest combination of whole pieces and sets.

use rusty_money::MoneyError;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    breakdown::{BreakdownLine, PriceBreakdown},
    cart::lines::PurchaseMode,
    ids::SetUuid,
    prices::Price,
    pricing::PricingOption,
    products::{Product, ProductSet},
};

pub mod chosen_set;
pub mod table;

pub use chosen_set::optimize_for_chosen_set;

/// Solver Errors
#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    /// The piece price must be above zero.
    #[error("unit price must be positive, got {minor_units} minor units")]
    NonPositivePrice {
        /// Offending price in minor units
        minor_units: i64,
    },

    /// A set multiplier of zero was requested.
    #[error("set multiplier must be at least 1")]
    ZeroMultiplier,

    /// The chosen set is not offered for the product.
    #[error("set {0} is not offered for this product")]
    UnknownSet(SetUuid),

    /// The chosen set is too small to be bought as a set.
    #[error("set {set} has size {size}; sets must contain at least two pieces")]
    InvalidSetSize {
        /// Offending set
        set: SetUuid,
        /// Its size
        size: u32,
    },

    /// Options are priced in different currencies.
    #[error("pricing options use currency {found}, expected {expected}")]
    CurrencyMismatch {
        /// Currency of the piece price
        expected: &'static str,
        /// Currency found on a set
        found: &'static str,
    },

    /// The quantity is beyond what the table solver is sized for.
    #[error("quantity {quantity} exceeds the solver limit of {limit} pieces")]
    QuantityTooLarge {
        /// Requested quantity
        quantity: u32,
        /// Largest supported quantity
        limit: u32,
    },

    /// Totals do not fit in minor units.
    #[error("price arithmetic overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// Cheapest breakdown of exactly `quantity` pieces.
///
/// `reference_unit_price` is the undiscounted piece price used for
/// [`PriceBreakdown::original_price`]; when it is below the discounted price the
/// discounted price is used instead, so savings never go negative.
///
/// # Errors
///
/// Returns a [`SolverError`] when the piece price is not positive, options are
/// priced in different currencies, or totals overflow.
pub fn optimal_price(
    quantity: u32,
    discounted_unit_price: Price,
    reference_unit_price: Price,
    sets: &[ProductSet],
) -> Result<PriceBreakdown, SolverError> {
    let options = PricingOption::ordered(discounted_unit_price, sets);

    solve_options(
        quantity,
        &options,
        discounted_unit_price,
        reference_unit_price,
    )
}

/// Price a cart line for a product.
///
/// In [`PurchaseMode::Piece`] `quantity` counts pieces; in [`PurchaseMode::Set`] it is
/// the number of the chosen set.
///
/// # Errors
///
/// Returns a [`SolverError`] if the product cannot be priced for the mode.
pub fn price_line(
    product: &Product,
    mode: PurchaseMode,
    quantity: u32,
) -> Result<PriceBreakdown, SolverError> {
    match mode {
        PurchaseMode::Piece => optimal_price(
            quantity,
            product.discounted_unit_price,
            product.reference_unit_price,
            &product.sets,
        ),
        PurchaseMode::Set { set } => optimize_for_chosen_set(product, set, quantity),
    }
}

pub(crate) fn solve_options(
    quantity: u32,
    options: &[PricingOption],
    discounted_unit_price: Price,
    reference_unit_price: Price,
) -> Result<PriceBreakdown, SolverError> {
    let currency = discounted_unit_price.currency();
    let piece_minor = discounted_unit_price.to_minor_units();

    if piece_minor <= 0 {
        return Err(SolverError::NonPositivePrice {
            minor_units: piece_minor,
        });
    }

    if let Some(other) = options
        .iter()
        .map(|option| option.price().currency())
        .find(|option_currency| *option_currency != currency)
    {
        return Err(SolverError::CurrencyMismatch {
            expected: currency.iso_alpha_code,
            found: other.iso_alpha_code,
        });
    }

    if quantity == 0 {
        return Ok(PriceBreakdown::zero(currency));
    }

    let counts = table::solve(quantity, options)?;

    let mut lines: SmallVec<[BreakdownLine; 4]> = SmallVec::new();
    let mut total_minor = 0_i64;

    for (option, count) in options.iter().zip(counts) {
        if count == 0 {
            continue;
        }

        let line = breakdown_line(option, count)?;

        total_minor = total_minor
            .checked_add(line.line_total().to_minor_units())
            .ok_or(SolverError::Overflow)?;

        lines.push(line);
    }

    let reference_minor = reference_unit_price.to_minor_units().max(piece_minor);
    let original_minor = times(reference_minor, quantity)?;

    debug!(
        quantity,
        total_minor,
        original_minor,
        rows = lines.len(),
        "priced quantity"
    );

    Ok(PriceBreakdown::new(
        quantity,
        lines,
        Price::from_minor(total_minor, currency),
        Price::from_minor(original_minor, currency),
    )?)
}

pub(crate) fn breakdown_line(
    option: &PricingOption,
    count: u32,
) -> Result<BreakdownLine, SolverError> {
    let unit_price = option.price();
    let line_total = Price::from_minor(
        times(unit_price.to_minor_units(), count)?,
        unit_price.currency(),
    );

    Ok(match option {
        PricingOption::Piece { .. } => BreakdownLine::Pieces {
            quantity: count,
            unit_price,
            line_total,
        },
        PricingOption::Set {
            set, label, size, ..
        } => BreakdownLine::Sets {
            set: *set,
            label: label.clone(),
            quantity: count,
            set_size: *size,
            unit_price,
            line_total,
        },
    })
}

pub(crate) fn times(minor_units: i64, count: u32) -> Result<i64, SolverError> {
    minor_units
        .checked_mul(i64::from(count))
        .ok_or(SolverError::Overflow)
}

#[cfg(test)]
mod tests {
    use rusty_money::{
        Money,
        iso::{INR, USD},
    };
    use testresult::TestResult;

    use super::*;

    fn inr(minor: i64) -> Price {
        Money::from_minor(minor, INR)
    }

    fn set(size: u32, minor: i64) -> ProductSet {
        ProductSet {
            id: SetUuid::now_v7(),
            name: None,
            size,
            discounted_price: inr(minor),
            reference_price: inr(minor),
        }
    }

    fn tiers() -> [ProductSet; 2] {
        [set(2, 640), set(4, 1250)]
    }

    #[test]
    fn six_pieces_use_a_set_of_four_and_a_set_of_two() -> TestResult {
        let breakdown = optimal_price(6, inr(330), inr(360), &tiers())?;

        assert_eq!(breakdown.total_pieces(), 6);
        assert_eq!(breakdown.total_price(), inr(1890));
        assert_eq!(breakdown.original_price(), inr(2160));
        assert_eq!(breakdown.savings(), inr(270));

        let sizes: Vec<(u32, u64)> = breakdown
            .lines()
            .iter()
            .map(|line| (line.quantity(), line.pieces()))
            .collect();

        assert_eq!(sizes, vec![(1, 4), (1, 2)]);

        Ok(())
    }

    #[test]
    fn zero_quantity_is_zero_breakdown() -> TestResult {
        let breakdown = optimal_price(0, inr(330), inr(360), &tiers())?;

        assert_eq!(breakdown, PriceBreakdown::zero(INR));

        Ok(())
    }

    #[test]
    fn no_sets_prices_every_piece() -> TestResult {
        let breakdown = optimal_price(7, inr(330), inr(360), &[])?;

        assert_eq!(breakdown.total_price(), inr(2310));
        assert_eq!(breakdown.lines().len(), 1);
        assert!(matches!(
            breakdown.lines().first(),
            Some(BreakdownLine::Pieces { quantity: 7, .. })
        ));

        Ok(())
    }

    #[test]
    fn odd_remainder_falls_back_to_a_piece() -> TestResult {
        let breakdown = optimal_price(7, inr(330), inr(360), &tiers())?;

        // 4 + 2 + 1
        assert_eq!(breakdown.total_price(), inr(1250 + 640 + 330));
        assert!(matches!(
            breakdown.lines().last(),
            Some(BreakdownLine::Pieces { quantity: 1, .. })
        ));

        Ok(())
    }

    #[test]
    fn dominated_set_is_never_used() -> TestResult {
        // A set of 3 priced above three pieces.
        let breakdown = optimal_price(3, inr(330), inr(360), &[set(3, 1200)])?;

        assert_eq!(breakdown.total_price(), inr(990));
        assert!(matches!(
            breakdown.lines(),
            [BreakdownLine::Pieces { quantity: 3, .. }]
        ));

        Ok(())
    }

    #[test]
    fn equal_cost_prefers_fewer_units() -> TestResult {
        // Set of 2 costs exactly two pieces.
        let breakdown = optimal_price(2, inr(330), inr(360), &[set(2, 660)])?;

        assert!(matches!(
            breakdown.lines(),
            [BreakdownLine::Sets { quantity: 1, .. }]
        ));

        Ok(())
    }

    #[test]
    fn reference_below_discounted_is_clamped() -> TestResult {
        let breakdown = optimal_price(2, inr(330), inr(300), &[])?;

        assert_eq!(breakdown.original_price(), inr(660));
        assert_eq!(breakdown.savings(), inr(0));

        Ok(())
    }

    #[test]
    fn non_positive_piece_price_is_rejected() {
        let result = optimal_price(2, inr(0), inr(0), &[]);

        assert_eq!(result, Err(SolverError::NonPositivePrice { minor_units: 0 }));
    }

    #[test]
    fn mixed_currency_sets_are_rejected() {
        let mut foreign = set(2, 640);
        foreign.discounted_price = Money::from_minor(640, USD);

        let result = optimal_price(2, inr(330), inr(360), &[foreign]);

        assert!(matches!(result, Err(SolverError::CurrencyMismatch { .. })));
    }

    #[test]
    fn overflowing_totals_are_reported() {
        let result = optimal_price(2, inr(i64::MAX), inr(i64::MAX), &[]);

        assert_eq!(result, Err(SolverError::Overflow));
    }

    #[test]
    fn quantities_beyond_the_table_limit_are_rejected() {
        let result = optimal_price(table::MAX_QUANTITY + 1, inr(330), inr(360), &[]);

        assert_eq!(
            result,
            Err(SolverError::QuantityTooLarge {
                quantity: table::MAX_QUANTITY + 1,
                limit: table::MAX_QUANTITY,
            })
        );
    }
}
