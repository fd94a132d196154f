//! Price Breakdown

use rusty_money::{MoneyError, iso::Currency};
use smallvec::SmallVec;

use crate::{ids::SetUuid, prices::Price, prices::zero};

/// One row of a breakdown: a number of identical purchase units.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakdownLine {
    /// Individually priced pieces.
    Pieces {
        /// Number of pieces
        quantity: u32,

        /// Price of one piece
        unit_price: Price,

        /// `quantity × unit_price`
        line_total: Price,
    },

    /// Whole sets.
    Sets {
        /// Catalog set
        set: SetUuid,

        /// Display label
        label: String,

        /// Number of sets
        quantity: u32,

        /// Pieces in one set
        set_size: u32,

        /// Price of one set
        unit_price: Price,

        /// `quantity × unit_price`
        line_total: Price,
    },
}

impl BreakdownLine {
    /// Number of purchase units on this row.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        match self {
            BreakdownLine::Pieces { quantity, .. } | BreakdownLine::Sets { quantity, .. } => {
                *quantity
            }
        }
    }

    /// Number of pieces this row accounts for.
    #[must_use]
    pub fn pieces(&self) -> u64 {
        match self {
            BreakdownLine::Pieces { quantity, .. } => u64::from(*quantity),
            BreakdownLine::Sets {
                quantity, set_size, ..
            } => u64::from(*quantity) * u64::from(*set_size),
        }
    }

    /// Price of one unit on this row.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        match self {
            BreakdownLine::Pieces { unit_price, .. } | BreakdownLine::Sets { unit_price, .. } => {
                *unit_price
            }
        }
    }

    /// Total for this row.
    #[must_use]
    pub fn line_total(&self) -> Price {
        match self {
            BreakdownLine::Pieces { line_total, .. } | BreakdownLine::Sets { line_total, .. } => {
                *line_total
            }
        }
    }

    /// Display label for one unit of this row.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            BreakdownLine::Pieces { .. } => "Individual piece",
            BreakdownLine::Sets { label, .. } => label,
        }
    }
}

/// Explanation attached when the buyer's literal set selection was repriced.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationNote {
    /// What the buyer's literal selection would have cost
    pub literal_price: Price,

    /// Human readable explanation
    pub message: String,
}

/// Cheapest decomposition of a requested quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    total_price: Price,
    total_pieces: u32,
    lines: SmallVec<[BreakdownLine; 4]>,
    original_price: Price,
    savings: Price,
    optimization: Option<OptimizationNote>,
}

impl PriceBreakdown {
    /// Create a breakdown, deriving savings from the original and total prices.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the prices are in different currencies.
    pub fn new(
        total_pieces: u32,
        lines: SmallVec<[BreakdownLine; 4]>,
        total_price: Price,
        original_price: Price,
    ) -> Result<Self, MoneyError> {
        let savings = original_price.sub(total_price)?;

        Ok(Self {
            total_price,
            total_pieces,
            lines,
            original_price,
            savings,
            optimization: None,
        })
    }

    /// The breakdown for zero pieces.
    #[must_use]
    pub fn zero(currency: &'static Currency) -> Self {
        Self {
            total_price: zero(currency),
            total_pieces: 0,
            lines: SmallVec::new(),
            original_price: zero(currency),
            savings: zero(currency),
            optimization: None,
        }
    }

    /// Attach an optimization note.
    #[must_use]
    pub fn with_optimization(mut self, note: OptimizationNote) -> Self {
        self.optimization = Some(note);
        self
    }

    /// Total price paid
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.total_price
    }

    /// Total pieces; always the requested quantity
    #[must_use]
    pub fn total_pieces(&self) -> u32 {
        self.total_pieces
    }

    /// Rows, largest sets first and pieces last
    #[must_use]
    pub fn lines(&self) -> &[BreakdownLine] {
        &self.lines
    }

    /// Pieces priced at the undiscounted reference unit price
    #[must_use]
    pub fn original_price(&self) -> Price {
        self.original_price
    }

    /// `original_price - total_price`
    #[must_use]
    pub fn savings(&self) -> Price {
        self.savings
    }

    /// Currency of every amount in this breakdown
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.total_price.currency()
    }

    /// Whether the buyer's literal selection was replaced by a cheaper one
    #[must_use]
    pub fn is_optimized(&self) -> bool {
        self.optimization.is_some()
    }

    /// The optimization details, when repriced
    #[must_use]
    pub fn optimization(&self) -> Option<&OptimizationNote> {
        self.optimization.as_ref()
    }

    /// The optimization message, when repriced
    #[must_use]
    pub fn optimization_note(&self) -> Option<&str> {
        self.optimization.as_ref().map(|note| note.message.as_str())
    }
}
