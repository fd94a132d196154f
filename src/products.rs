//! Products

use rusty_money::iso::Currency;
use smallvec::SmallVec;

use crate::{
    ids::{ProductUuid, SetUuid},
    prices::Price,
    pricing::PricingOption,
};

/// Current catalog truth for a single product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Product identifier
    pub id: ProductUuid,

    /// Display name
    pub name: String,

    /// Whether the product can be bought at all
    pub in_stock: bool,

    /// Bulk-enabled products are not limited by `stock_quantity`
    pub allows_bulk: bool,

    /// Pieces currently available
    pub stock_quantity: u32,

    /// Price of a single piece
    pub discounted_unit_price: Price,

    /// Undiscounted price of a single piece, used for savings
    pub reference_unit_price: Price,

    /// Bulk set tiers offered for this product
    pub sets: SmallVec<[ProductSet; 4]>,
}

/// A named, fixed-size bundle of pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSet {
    /// Set identifier
    pub id: SetUuid,

    /// Optional display name
    pub name: Option<String>,

    /// Pieces in one set
    pub size: u32,

    /// Price of one set
    pub discounted_price: Price,

    /// Undiscounted price of one set
    pub reference_price: Price,
}

impl ProductSet {
    /// Display label, e.g. "Set of 4".
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Set of {}", self.size))
    }
}

impl Product {
    /// Currency the product is priced in.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.discounted_unit_price.currency()
    }

    /// Find a set by id.
    #[must_use]
    pub fn set(&self, id: SetUuid) -> Option<&ProductSet> {
        self.sets.iter().find(|set| set.id == id)
    }

    /// Purchasable options in search order: sets by descending size, then pieces.
    #[must_use]
    pub fn pricing_options(&self) -> SmallVec<[PricingOption; 5]> {
        PricingOption::ordered(self.discounted_unit_price, &self.sets)
    }
}
