//! Cart State

use rusty_money::iso::Currency;

use crate::{
    cart::{CartError, CartLine, OwnerContext},
    ids::LineUuid,
    prices::{Price, zero},
};

/// Aggregate totals, always derived from the lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartTotals {
    /// Pieces across all lines
    pub total_quantity: u64,

    /// Amount payable
    pub total_price: Price,

    /// Savings against reference prices
    pub total_savings: Price,

    /// Amount at reference prices
    pub total_original_price: Price,
}

impl CartTotals {
    fn zero(currency: &'static Currency) -> Self {
        Self {
            total_quantity: 0,
            total_price: zero(currency),
            total_savings: zero(currency),
            total_original_price: zero(currency),
        }
    }
}

/// Cart contents for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct CartState {
    lines: Vec<CartLine>,
    totals: CartTotals,
    owner: OwnerContext,
    currency: &'static Currency,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn new(owner: OwnerContext, currency: &'static Currency) -> Self {
        Self {
            lines: Vec::new(),
            totals: CartTotals::zero(currency),
            owner,
            currency,
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Aggregate totals.
    #[must_use]
    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    /// Who the cart belongs to.
    #[must_use]
    pub fn owner(&self) -> OwnerContext {
        self.owner
    }

    /// Currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by id.
    #[must_use]
    pub fn line(&self, id: LineUuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<CartLine> {
        &mut self.lines
    }

    pub(crate) fn set_owner(&mut self, owner: OwnerContext) {
        self.owner = owner;
    }

    /// Recompute totals by summing every line.
    pub(crate) fn recompute_totals(&mut self) -> Result<(), CartError> {
        let mut totals = CartTotals::zero(self.currency);

        for line in &self.lines {
            let breakdown = &line.breakdown;

            if breakdown.currency() != self.currency {
                return Err(CartError::CurrencyMismatch {
                    expected: self.currency.iso_alpha_code,
                    found: breakdown.currency().iso_alpha_code,
                });
            }

            totals.total_quantity += u64::from(breakdown.total_pieces());
            totals.total_price = totals.total_price.add(breakdown.total_price())?;
            totals.total_savings = totals.total_savings.add(breakdown.savings())?;
            totals.total_original_price = totals
                .total_original_price
                .add(breakdown.original_price())?;
        }

        self.totals = totals;

        Ok(())
    }
}
