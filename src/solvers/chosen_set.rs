//! Chosen set pricing
//!
//! The buyer asked for "N sets of size S". The total is always the optimal price
//! for `N × S` pieces; the literal selection is only priced to explain the result.

use smallvec::smallvec;
use tracing::debug;

use crate::{
    breakdown::{OptimizationNote, PriceBreakdown},
    formatting::summary,
    ids::SetUuid,
    prices::Price,
    pricing::PricingOption,
    products::Product,
    solvers::{SolverError, breakdown_line, solve_options, times},
};

/// Price `multiplier` sets of the chosen set, optimised over all of the product's options.
///
/// # Errors
///
/// Returns [`SolverError::ZeroMultiplier`] for a zero multiplier,
/// [`SolverError::UnknownSet`] if the product does not offer the set, and any error
/// from the underlying solver.
pub fn optimize_for_chosen_set(
    product: &Product,
    set: SetUuid,
    multiplier: u32,
) -> Result<PriceBreakdown, SolverError> {
    if multiplier == 0 {
        return Err(SolverError::ZeroMultiplier);
    }

    let chosen = product.set(set).ok_or(SolverError::UnknownSet(set))?;

    if chosen.size < 2 {
        return Err(SolverError::InvalidSetSize {
            set,
            size: chosen.size,
        });
    }

    let total_pieces = chosen
        .size
        .checked_mul(multiplier)
        .ok_or(SolverError::Overflow)?;

    let options = product.pricing_options();
    let optimized = solve_options(
        total_pieces,
        &options,
        product.discounted_unit_price,
        product.reference_unit_price,
    )?;

    let literal_option = PricingOption::from(chosen);
    let literal_minor = times(chosen.discounted_price.to_minor_units(), multiplier)?;
    let optimized_minor = optimized.total_price().to_minor_units();

    if optimized_minor < literal_minor {
        let literal_price = Price::from_minor(literal_minor, product.currency());
        let saving = literal_price.sub(optimized.total_price())?;
        let literal = breakdown_line(&literal_option, multiplier)?;

        let message = format!(
            "Optimized to {}, saving {saving} over {} × {}",
            summary(&optimized),
            multiplier,
            literal.label()
        );

        debug!(%set, multiplier, literal_minor, optimized_minor, "chosen set repriced");

        return Ok(optimized.with_optimization(OptimizationNote {
            literal_price,
            message,
        }));
    }

    // Same cost: keep the buyer's own decomposition.
    let literal = breakdown_line(&literal_option, multiplier)?;

    Ok(PriceBreakdown::new(
        total_pieces,
        smallvec![literal],
        optimized.total_price(),
        optimized.original_price(),
    )?)
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};
    use testresult::TestResult;

    use crate::{
        breakdown::BreakdownLine,
        ids::ProductUuid,
        products::ProductSet,
    };

    use super::*;

    fn inr(minor: i64) -> Price {
        Money::from_minor(minor, INR)
    }

    fn tier(size: u32, minor: i64) -> ProductSet {
        ProductSet {
            id: SetUuid::now_v7(),
            name: None,
            size,
            discounted_price: inr(minor),
            reference_price: inr(minor),
        }
    }

    fn product(sets: &[ProductSet]) -> Product {
        Product {
            id: ProductUuid::now_v7(),
            name: "Cotton napkin".to_string(),
            in_stock: true,
            allows_bulk: true,
            stock_quantity: 0,
            discounted_unit_price: inr(330),
            reference_unit_price: inr(360),
            sets: sets.iter().cloned().collect(),
        }
    }

    #[test]
    fn three_sets_of_two_are_repriced() -> TestResult {
        let pair = tier(2, 640);
        let product = product(&[pair.clone(), tier(4, 1250)]);

        let breakdown = optimize_for_chosen_set(&product, pair.id, 3)?;

        assert_eq!(breakdown.total_pieces(), 6);
        assert_eq!(breakdown.total_price(), inr(1890));
        assert!(breakdown.is_optimized());

        let note = breakdown.optimization().map(|note| note.literal_price);

        assert_eq!(note, Some(inr(1920)));
        assert!(
            breakdown
                .optimization_note()
                .is_some_and(|message| message.contains("3 × Set of 2")),
            "note should mention the literal selection: {:?}",
            breakdown.optimization_note()
        );

        Ok(())
    }

    #[test]
    fn literal_selection_kept_when_already_cheapest() -> TestResult {
        let quad = tier(4, 1250);
        let product = product(&[tier(2, 640), quad.clone()]);

        let breakdown = optimize_for_chosen_set(&product, quad.id, 2)?;

        assert!(!breakdown.is_optimized());
        assert_eq!(breakdown.total_price(), inr(2500));
        assert!(matches!(
            breakdown.lines(),
            [BreakdownLine::Sets {
                quantity: 2,
                set_size: 4,
                ..
            }]
        ));

        Ok(())
    }

    #[test]
    fn equal_cost_alternative_keeps_literal_lines() -> TestResult {
        // Two sets of two cost exactly the same as one set of four.
        let pair = tier(2, 600);
        let product = product(&[pair.clone(), tier(4, 1200)]);

        let breakdown = optimize_for_chosen_set(&product, pair.id, 2)?;

        assert!(!breakdown.is_optimized());
        assert!(matches!(
            breakdown.lines(),
            [BreakdownLine::Sets {
                quantity: 2,
                set_size: 2,
                ..
            }]
        ));

        Ok(())
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let pair = tier(2, 640);
        let product = product(&[pair.clone()]);

        assert_eq!(
            optimize_for_chosen_set(&product, pair.id, 0),
            Err(SolverError::ZeroMultiplier)
        );
    }

    #[test]
    fn unknown_set_is_rejected() {
        let product = product(&[tier(2, 640)]);
        let missing = SetUuid::now_v7();

        assert_eq!(
            optimize_for_chosen_set(&product, missing, 1),
            Err(SolverError::UnknownSet(missing))
        );
    }

    #[test]
    fn undersized_set_is_rejected() {
        let single = tier(1, 300);
        let product = product(&[single.clone()]);

        assert!(matches!(
            optimize_for_chosen_set(&product, single.id, 2),
            Err(SolverError::InvalidSetSize { size: 1, .. })
        ));
    }

    #[test]
    fn literal_price_mirrors_set_price() -> TestResult {
        let pair = tier(2, 640);
        let product = product(&[pair.clone()]);
        let breakdown = optimize_for_chosen_set(&product, pair.id, 1)?;

        assert_eq!(breakdown.lines().len(), 1);
        assert_eq!(breakdown.original_price(), inr(720));
        assert_eq!(breakdown.savings(), inr(80));

        Ok(())
    }
}
