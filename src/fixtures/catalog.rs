//! Catalog Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::{
    fixtures::FixtureError,
    ids::{ProductUuid, SetUuid},
    prices::parse_price,
    products::{Product, ProductSet},
};

/// Wrapper for products in YAML
#[derive(Debug, Deserialize)]
pub struct CatalogFixture {
    /// Map of product key -> product fixture
    pub products: FxHashMap<String, ProductFixture>,
}

/// Product Fixture
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Fixed identifier; generated when omitted
    #[serde(default)]
    pub id: Option<Uuid>,

    /// Product name
    pub name: String,

    /// Whether the product can be bought
    #[serde(default = "in_stock_default")]
    pub in_stock: bool,

    /// Whether stock limits are ignored
    #[serde(default)]
    pub allows_bulk: bool,

    /// Pieces available
    #[serde(default)]
    pub stock_quantity: u32,

    /// Piece price (e.g., "330 INR")
    pub price: String,

    /// Undiscounted piece price; the piece price when omitted
    #[serde(default)]
    pub reference_price: Option<String>,

    /// Set tiers, in declaration order
    #[serde(default)]
    pub sets: Vec<SetFixture>,
}

/// Set Fixture
#[derive(Debug, Deserialize)]
pub struct SetFixture {
    /// Key used by cart fixtures and the CLI
    pub key: String,

    /// Fixed identifier; generated when omitted
    #[serde(default)]
    pub id: Option<Uuid>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Pieces in the set
    pub size: u32,

    /// Set price (e.g., "640 INR")
    pub price: String,

    /// Undiscounted set price; the set price when omitted
    #[serde(default)]
    pub reference_price: Option<String>,
}

fn in_stock_default() -> bool {
    true
}

impl ProductFixture {
    /// Build the product, returning it with its set keys.
    ///
    /// # Errors
    ///
    /// Returns an error if a price cannot be parsed.
    pub fn into_product(self) -> Result<(Product, Vec<(String, SetUuid)>), FixtureError> {
        let discounted_unit_price = parse_price(&self.price)?;
        let reference_unit_price = match &self.reference_price {
            Some(price) => parse_price(price)?,
            None => discounted_unit_price,
        };

        let mut set_keys = Vec::with_capacity(self.sets.len());
        let mut sets = SmallVec::new();

        for fixture in self.sets {
            let id = fixture.id.map_or_else(SetUuid::now_v7, SetUuid::from_uuid);
            let discounted_price = parse_price(&fixture.price)?;
            let reference_price = match &fixture.reference_price {
                Some(price) => parse_price(price)?,
                None => discounted_price,
            };

            set_keys.push((fixture.key, id));
            sets.push(ProductSet {
                id,
                name: fixture.name,
                size: fixture.size,
                discounted_price,
                reference_price,
            });
        }

        let product = Product {
            id: self.id.map_or_else(ProductUuid::now_v7, ProductUuid::from_uuid),
            name: self.name,
            in_stock: self.in_stock,
            allows_bulk: self.allows_bulk,
            stock_quantity: self.stock_quantity,
            discounted_unit_price,
            reference_unit_price,
            sets,
        };

        Ok((product, set_keys))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn builds_product_with_defaults() -> TestResult {
        let fixture: ProductFixture = serde_norway::from_str(
            r"
name: Cotton napkin
price: 3.30 INR
reference_price: 3.60 INR
sets:
  - key: pair
    size: 2
    price: 6.40 INR
",
        )?;

        let (product, set_keys) = fixture.into_product()?;

        assert!(product.in_stock);
        assert!(!product.allows_bulk);
        assert_eq!(product.discounted_unit_price, Money::from_minor(330, INR));
        assert_eq!(product.reference_unit_price, Money::from_minor(360, INR));

        let set = product.sets.first().ok_or("missing set")?;

        assert_eq!(set.reference_price, Money::from_minor(640, INR));
        assert_eq!(set_keys, vec![("pair".to_string(), set.id)]);

        Ok(())
    }
}
