//! Pricing Options

use smallvec::SmallVec;
use tracing::warn;

use crate::{ids::SetUuid, prices::Price, products::ProductSet};

/// One purchasable unit type of a product.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingOption {
    /// A single piece.
    Piece {
        /// Price of one piece
        price: Price,
    },

    /// A fixed-size named set.
    Set {
        /// Catalog set this option was derived from
        set: SetUuid,

        /// Display label
        label: String,

        /// Pieces in one set
        size: u32,

        /// Price of one set
        price: Price,
    },
}

impl PricingOption {
    /// Build the options for a product in search order.
    ///
    /// Sets come first by descending size (declaration order for equal sizes), pieces
    /// last. Sets smaller than two pieces are not offered.
    pub fn ordered(piece_price: Price, sets: &[ProductSet]) -> SmallVec<[PricingOption; 5]> {
        let mut options: SmallVec<[PricingOption; 5]> = sets
            .iter()
            .filter(|set| {
                if set.size < 2 {
                    warn!(set = %set.id, size = set.size, "ignoring set smaller than two pieces");

                    return false;
                }

                true
            })
            .map(PricingOption::from)
            .collect();

        // Stable sort keeps declaration order for equal sizes.
        options.sort_by(|a, b| b.size().cmp(&a.size()));
        options.push(PricingOption::Piece { price: piece_price });

        options
    }

    /// Number of pieces this option contributes.
    #[must_use]
    pub fn size(&self) -> u32 {
        match self {
            PricingOption::Piece { .. } => 1,
            PricingOption::Set { size, .. } => *size,
        }
    }

    /// Price of one unit of this option.
    #[must_use]
    pub fn price(&self) -> Price {
        match self {
            PricingOption::Piece { price } | PricingOption::Set { price, .. } => *price,
        }
    }
}

impl From<&ProductSet> for PricingOption {
    fn from(set: &ProductSet) -> Self {
        PricingOption::Set {
            set: set.id,
            label: set.label(),
            size: set.size,
            price: set.discounted_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};

    use super::*;

    fn set(size: u32, minor: i64) -> ProductSet {
        ProductSet {
            id: SetUuid::now_v7(),
            name: None,
            size,
            discounted_price: Money::from_minor(minor, INR),
            reference_price: Money::from_minor(minor, INR),
        }
    }

    #[test]
    fn ordered_puts_largest_sets_first_and_pieces_last() {
        let options = PricingOption::ordered(
            Money::from_minor(330, INR),
            &[set(2, 640), set(6, 1800), set(4, 1250)],
        );

        let sizes: Vec<u32> = options.iter().map(PricingOption::size).collect();

        assert_eq!(sizes, vec![6, 4, 2, 1]);
        assert!(matches!(options.last(), Some(PricingOption::Piece { .. })));
    }

    #[test]
    fn ordered_keeps_declaration_order_for_equal_sizes() {
        let first = set(3, 900);
        let second = set(3, 850);

        let options = PricingOption::ordered(
            Money::from_minor(330, INR),
            &[first.clone(), second.clone()],
        );

        assert!(matches!(options.first(), Some(PricingOption::Set { set, .. }) if *set == first.id));
        assert!(matches!(options.get(1), Some(PricingOption::Set { set, .. }) if *set == second.id));
    }

    #[test]
    fn ordered_drops_undersized_sets() {
        let options =
            PricingOption::ordered(Money::from_minor(330, INR), &[set(1, 300), set(0, 0)]);

        assert_eq!(options.len(), 1);
        assert_eq!(options.first().map(PricingOption::price), Some(Money::from_minor(330, INR)));
    }
}
