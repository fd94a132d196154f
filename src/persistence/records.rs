//! Stored cart records
//!
//! The serialized form of cart lines. Only enough of the breakdown is kept to
//! detect price drift; the breakdown itself is always recomputed on load.

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    breakdown::PriceBreakdown,
    cart::{CartLine, LineKey, PurchaseMode},
    ids::{LineUuid, ProductUuid},
};

/// Pricing summary captured when a line was last priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBreakdown {
    /// ISO code of the currency the line was priced in
    pub currency: String,

    /// Total paid, in minor units
    pub total_price: i64,

    /// Total at reference prices, in minor units
    pub original_price: i64,

    /// Pieces priced
    pub total_pieces: u32,
}

impl StoredBreakdown {
    /// Average price of one piece, in minor units.
    ///
    /// `None` when no pieces were priced.
    #[must_use]
    pub fn implied_unit_price(&self) -> Option<Decimal> {
        if self.total_pieces == 0 {
            return None;
        }

        Decimal::from(self.total_price).checked_div(Decimal::from(self.total_pieces))
    }
}

impl From<&PriceBreakdown> for StoredBreakdown {
    fn from(breakdown: &PriceBreakdown) -> Self {
        Self {
            currency: breakdown.currency().iso_alpha_code.to_string(),
            total_price: breakdown.total_price().to_minor_units(),
            original_price: breakdown.original_price().to_minor_units(),
            total_pieces: breakdown.total_pieces(),
        }
    }
}

/// A cart line as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCartLine {
    /// Line identifier
    pub id: LineUuid,

    /// Product on the line
    pub product: ProductUuid,

    /// Purchase mode
    pub mode: PurchaseMode,

    /// Selected colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Pieces or sets, depending on the mode
    pub quantity: u32,

    /// Pricing when last saved
    pub breakdown: StoredBreakdown,

    /// When the line was first added
    pub added_at: Timestamp,

    /// When the line was last checked against the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<Timestamp>,

    /// Quantities the stored breakdown was priced at, when it sums merged lines
    ///
    /// Empty for a line priced at its own `quantity`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub priced_quantities: Vec<u32>,
}

impl StoredCartLine {
    /// Identity used to merge lines.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product: self.product,
            mode: self.mode,
            color: self.color.clone(),
        }
    }

    /// Quantities the stored breakdown covers, one per priced line.
    #[must_use]
    pub fn priced_at(&self) -> Vec<u32> {
        if self.priced_quantities.is_empty() {
            vec![self.quantity]
        } else {
            self.priced_quantities.clone()
        }
    }
}

impl From<&CartLine> for StoredCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            product: line.key.product,
            mode: line.key.mode,
            color: line.key.color.clone(),
            quantity: line.quantity,
            breakdown: StoredBreakdown::from(&line.breakdown),
            added_at: line.added_at,
            validated_at: line.validated_at,
            priced_quantities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};
    use smallvec::SmallVec;
    use testresult::TestResult;

    use crate::{cart::NewCartLine, ids::SetUuid, products::Product};

    use super::*;

    #[test]
    fn stored_line_keeps_identity_and_pricing() -> TestResult {
        let product = Product {
            id: ProductUuid::now_v7(),
            name: "Cotton napkin".to_string(),
            in_stock: true,
            allows_bulk: true,
            stock_quantity: 0,
            discounted_unit_price: Money::from_minor(330, INR),
            reference_unit_price: Money::from_minor(360, INR),
            sets: SmallVec::new(),
        };

        let new_line = NewCartLine::new(product.clone(), PurchaseMode::Piece, Some("red".into()), 3);
        let line = CartLine::priced(new_line.id, new_line.key(), 3, &product, new_line.added_at)?;
        let stored = StoredCartLine::from(&line);

        assert_eq!(stored.key(), line.key);
        assert_eq!(stored.breakdown.currency, "INR");
        assert_eq!(stored.breakdown.total_price, 990);
        assert_eq!(stored.breakdown.original_price, 1080);
        assert_eq!(stored.breakdown.implied_unit_price(), Some(Decimal::from(330)));

        Ok(())
    }

    #[test]
    fn serializes_tagged_purchase_mode() -> TestResult {
        let set = SetUuid::now_v7();
        let stored = StoredCartLine {
            id: LineUuid::now_v7(),
            product: ProductUuid::now_v7(),
            mode: PurchaseMode::Set { set },
            color: None,
            quantity: 2,
            breakdown: StoredBreakdown {
                currency: "INR".to_string(),
                total_price: 1280,
                original_price: 1440,
                total_pieces: 4,
            },
            added_at: Timestamp::UNIX_EPOCH,
            validated_at: None,
            priced_quantities: Vec::new(),
        };

        let json = serde_json::to_value(&stored)?;

        assert_eq!(json["mode"]["kind"], "set");
        assert_eq!(json["mode"]["set"], set.to_string());
        assert!(json.get("color").is_none());
        assert!(json.get("priced_quantities").is_none());

        let parsed: StoredCartLine = serde_json::from_value(json)?;

        assert_eq!(parsed, stored);

        Ok(())
    }

    #[test]
    fn implied_unit_price_of_empty_breakdown_is_none() {
        let breakdown = StoredBreakdown {
            currency: "INR".to_string(),
            total_price: 0,
            original_price: 0,
            total_pieces: 0,
        };

        assert_eq!(breakdown.implied_unit_price(), None);
    }
}
