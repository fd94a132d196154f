//! Demand table
//!
//! Bounded dynamic program over demand `0..=quantity`. Each cell holds the cheapest
//! `(cost, units)` pair for that exact demand and the option that achieved it.
//! Minimising the pair lexicographically means equal-cost decompositions resolve to
//! the one with fewer purchased units; remaining ties go to the earliest option in
//! search order because only a strictly better candidate replaces the current best.
//!
//! Work is `O(quantity × options)`. Quantities are small user-entered numbers, so
//! [`MAX_QUANTITY`] bounds the table rather than switching to an approximation.

use smallvec::{SmallVec, smallvec};

use crate::{pricing::PricingOption, solvers::SolverError};

/// Largest quantity the table is built for.
pub const MAX_QUANTITY: u32 = 100_000;

#[derive(Debug, Clone, Copy)]
struct Cell {
    cost: i64,
    units: u64,
    option: Option<usize>,
}

impl Cell {
    fn beats(&self, other: &Cell) -> bool {
        (self.cost, self.units) < (other.cost, other.units)
    }
}

/// Solve for exactly `quantity` pieces, returning how many of each option to buy.
///
/// The returned counts are index-aligned with `options`.
///
/// # Errors
///
/// Returns a [`SolverError`] if the quantity is above [`MAX_QUANTITY`], the option
/// list cannot reach the quantity, or costs overflow.
pub fn solve(
    quantity: u32,
    options: &[PricingOption],
) -> Result<SmallVec<[u32; 5]>, SolverError> {
    if quantity > MAX_QUANTITY {
        return Err(SolverError::QuantityTooLarge {
            quantity,
            limit: MAX_QUANTITY,
        });
    }

    let demand = to_index(quantity)?;
    let sizes: SmallVec<[usize; 5]> = options
        .iter()
        .map(|option| to_index(option.size()))
        .collect::<Result<_, _>>()?;

    let mut table: Vec<Cell> = Vec::with_capacity(demand + 1);

    table.push(Cell {
        cost: 0,
        units: 0,
        option: None,
    });

    for current in 1..=demand {
        let mut best: Option<Cell> = None;

        for (idx, (option, size)) in options.iter().zip(&sizes).enumerate() {
            if *size == 0 || *size > current {
                continue;
            }

            let previous = table.get(current - size).ok_or(SolverError::InvariantViolation {
                message: "demand table is missing an earlier cell",
            })?;

            let candidate = Cell {
                cost: previous
                    .cost
                    .checked_add(option.price().to_minor_units())
                    .ok_or(SolverError::Overflow)?,
                units: previous.units + 1,
                option: Some(idx),
            };

            if best.is_none_or(|best| candidate.beats(&best)) {
                best = Some(candidate);
            }
        }

        table.push(best.ok_or(SolverError::InvariantViolation {
            message: "no option can reach the requested demand",
        })?);
    }

    reconstruct(&table, &sizes, demand)
}

/// Walk the table back from `demand` to zero, counting the options used.
fn reconstruct(
    table: &[Cell],
    sizes: &[usize],
    demand: usize,
) -> Result<SmallVec<[u32; 5]>, SolverError> {
    let mut counts: SmallVec<[u32; 5]> = smallvec![0; sizes.len()];
    let mut remaining = demand;

    while remaining > 0 {
        let idx = table
            .get(remaining)
            .and_then(|cell| cell.option)
            .ok_or(SolverError::InvariantViolation {
                message: "demand table has no choice for a reachable cell",
            })?;

        let (count, size) = counts
            .get_mut(idx)
            .zip(sizes.get(idx))
            .ok_or(SolverError::InvariantViolation {
                message: "demand table refers to an unknown option",
            })?;

        *count += 1;
        remaining = remaining
            .checked_sub(*size)
            .ok_or(SolverError::InvariantViolation {
                message: "option is larger than the remaining demand",
            })?;
    }

    Ok(counts)
}

fn to_index(value: u32) -> Result<usize, SolverError> {
    usize::try_from(value).map_err(|_err| SolverError::Overflow)
}
