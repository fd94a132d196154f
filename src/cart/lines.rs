//! Cart Lines

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    breakdown::PriceBreakdown,
    cart::CartError,
    ids::{LineUuid, ProductUuid, SetUuid},
    products::Product,
    solvers::price_line,
};

/// How the buyer is purchasing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PurchaseMode {
    /// Quantity counts individual pieces.
    Piece,

    /// Quantity counts sets of the chosen set.
    Set {
        /// Chosen set
        set: SetUuid,
    },
}

/// Identity of a line: re-adding the same key increments the existing line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    /// Product being bought
    pub product: ProductUuid,

    /// Purchase mode, including the chosen set
    pub mode: PurchaseMode,

    /// Selected colour, if the product has colours
    pub color: Option<String>,
}

/// A priced cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    /// Line identifier
    pub id: LineUuid,

    /// Line identity
    pub key: LineKey,

    /// Pieces or sets, depending on the mode
    pub quantity: u32,

    /// Cached pricing for `quantity`
    pub breakdown: PriceBreakdown,

    /// When the line was first added
    pub added_at: Timestamp,

    /// When the line was last checked against the catalog
    pub validated_at: Option<Timestamp>,
}

impl CartLine {
    /// Price a new line from current product data.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the quantity is zero, the product is not the
    /// line's product, or pricing fails.
    pub fn priced(
        id: LineUuid,
        key: LineKey,
        quantity: u32,
        product: &Product,
        added_at: Timestamp,
    ) -> Result<Self, CartError> {
        let breakdown = price_for(&key, product, quantity)?;

        Ok(Self {
            id,
            key,
            quantity,
            breakdown,
            added_at,
            validated_at: None,
        })
    }

    /// Change the quantity and recompute the breakdown from `product`.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the quantity is zero, the product is not the
    /// line's product, or pricing fails. The line is unchanged on error.
    pub fn reprice(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        self.breakdown = price_for(&self.key, product, quantity)?;
        self.quantity = quantity;

        Ok(())
    }

    /// Pieces on this line.
    #[must_use]
    pub fn pieces(&self) -> u32 {
        self.breakdown.total_pieces()
    }
}

/// A line about to be added to the cart.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    /// Identifier to use if a new line is created
    pub id: LineUuid,

    /// Current product data
    pub product: Product,

    /// Purchase mode
    pub mode: PurchaseMode,

    /// Selected colour
    pub color: Option<String>,

    /// Quantity to add
    pub quantity: u32,

    /// Time of the add
    pub added_at: Timestamp,
}

impl NewCartLine {
    /// A new line with a fresh id, added now.
    #[must_use]
    pub fn new(product: Product, mode: PurchaseMode, color: Option<String>, quantity: u32) -> Self {
        Self {
            id: LineUuid::now_v7(),
            product,
            mode,
            color,
            quantity,
            added_at: Timestamp::now(),
        }
    }

    /// Identity of the line being added.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product: self.product.id,
            mode: self.mode,
            color: self.color.clone(),
        }
    }
}

fn price_for(key: &LineKey, product: &Product, quantity: u32) -> Result<PriceBreakdown, CartError> {
    if quantity == 0 {
        return Err(CartError::ZeroQuantity);
    }

    if product.id != key.product {
        return Err(CartError::ProductMismatch {
            expected: key.product,
            found: product.id,
        });
    }

    Ok(price_line(product, key.mode, quantity)?)
}
