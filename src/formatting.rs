//! Breakdown Formatting
//!
//! Presentation helpers over a [`PriceBreakdown`]. Nothing here affects pricing.

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};

use crate::breakdown::{BreakdownLine, PriceBreakdown};

/// Savings as a fraction of the original price; zero when nothing was priced.
pub fn savings_percent(breakdown: &PriceBreakdown) -> Percentage {
    let original_minor = breakdown.original_price().to_minor_units();

    if original_minor == 0 {
        return Percentage::from(Decimal::ZERO);
    }

    let savings_dec =
        Decimal::from_i64(breakdown.savings().to_minor_units()).unwrap_or(Decimal::ZERO);
    let original_dec = Decimal::from_i64(original_minor).unwrap_or(Decimal::ONE);

    Percentage::from(savings_dec / original_dec)
}

/// Discount in whole percent points, rounded half away from zero.
pub fn discount_percent(breakdown: &PriceBreakdown) -> u32 {
    percent_points(savings_percent(breakdown))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Rows joined for display, e.g. "2 × Set of 4 + 1 × Individual piece".
pub fn summary(breakdown: &PriceBreakdown) -> String {
    breakdown
        .lines()
        .iter()
        .map(|line| format!("{} × {}", line.quantity(), line.label()))
        .collect::<Vec<_>>()
        .join(" + ")
}

/// A sentence describing the savings, if there are any.
pub fn savings_sentence(breakdown: &PriceBreakdown) -> Option<String> {
    if breakdown.savings().to_minor_units() <= 0 {
        return None;
    }

    Some(format!(
        "You save {} ({}% off)",
        breakdown.savings(),
        discount_percent(breakdown)
    ))
}

/// Render a breakdown as a table followed by its totals.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_breakdown(mut out: impl io::Write, breakdown: &PriceBreakdown) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["Qty", "Unit", "Pieces", "Unit Price", "Line Total"]);

    for line in breakdown.lines() {
        builder.push_record([
            line.quantity().to_string(),
            line.label().to_string(),
            line.pieces().to_string(),
            format!("{}", line.unit_price()),
            format!("{}", line.line_total()),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..5), Alignment::right());

    for (idx, line) in breakdown.lines().iter().enumerate() {
        if is_set_row(line) {
            table.modify((idx + 1, 1), Color::FG_GREEN);
        }
    }

    writeln!(out, "\n{table}")?;
    writeln!(out, " Pieces:   {}", breakdown.total_pieces())?;
    writeln!(out, " Original: {}", breakdown.original_price())?;
    writeln!(out, " Total:    {}", breakdown.total_price())?;
    writeln!(
        out,
        " Savings:  ({}%) {}",
        discount_percent(breakdown),
        breakdown.savings()
    )?;

    if let Some(note) = breakdown.optimization_note() {
        writeln!(out, " Note:     {note}")?;
    }

    Ok(())
}

fn is_set_row(line: &BreakdownLine) -> bool {
    matches!(line, BreakdownLine::Sets { .. })
}

/// Converts a fractional percentage to percent points.
fn percent_points(percentage: Percentage) -> Decimal {
    (percentage * Decimal::ONE) * Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};
    use testresult::TestResult;

    use crate::{ids::SetUuid, products::ProductSet, solvers::optimal_price};

    use super::*;

    fn scenario() -> Result<PriceBreakdown, crate::solvers::SolverError> {
        let set = |size, minor| ProductSet {
            id: SetUuid::now_v7(),
            name: None,
            size,
            discounted_price: Money::from_minor(minor, INR),
            reference_price: Money::from_minor(minor, INR),
        };

        optimal_price(
            6,
            Money::from_minor(330, INR),
            Money::from_minor(360, INR),
            &[set(2, 640), set(4, 1250)],
        )
    }

    #[test]
    fn discount_percent_rounds_half_up() -> TestResult {
        // 270 / 2160 = 12.5%
        assert_eq!(discount_percent(&scenario()?), 13);

        Ok(())
    }

    #[test]
    fn discount_percent_is_zero_for_empty_breakdown() {
        assert_eq!(discount_percent(&PriceBreakdown::zero(INR)), 0);
    }

    #[test]
    fn summary_lists_sets_before_pieces() -> TestResult {
        assert_eq!(summary(&scenario()?), "1 × Set of 4 + 1 × Set of 2");

        let three = optimal_price(
            3,
            Money::from_minor(330, INR),
            Money::from_minor(360, INR),
            &[],
        )?;

        assert_eq!(summary(&three), "3 × Individual piece");

        Ok(())
    }

    #[test]
    fn savings_sentence_mentions_amount_and_percent() -> TestResult {
        let breakdown = scenario()?;
        let expected = format!("You save {} (13% off)", Money::from_minor(270, INR));

        assert_eq!(savings_sentence(&breakdown), Some(expected));
        assert_eq!(savings_sentence(&PriceBreakdown::zero(INR)), None);

        Ok(())
    }

    #[test]
    fn write_breakdown_renders_rows_and_totals() -> TestResult {
        let breakdown = scenario()?;
        let mut out = Vec::new();

        write_breakdown(&mut out, &breakdown)?;

        let rendered = String::from_utf8(out)?;

        assert!(rendered.contains("Set of 4"), "missing set row: {rendered}");
        assert!(rendered.contains("Set of 2"), "missing set row: {rendered}");
        assert!(rendered.contains("(13%)"), "missing discount: {rendered}");
        assert!(!rendered.contains("Note:"), "unexpected note: {rendered}");

        Ok(())
    }

    #[test]
    fn set_rows_are_detected() -> TestResult {
        let breakdown = scenario()?;

        assert!(breakdown.lines().iter().all(is_set_row));

        Ok(())
    }
}
