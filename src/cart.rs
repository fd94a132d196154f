//! Cart
//!
//! In-memory cart lines, their aggregate totals, and the reducer that mutates them.

use rusty_money::MoneyError;
use thiserror::Error;

use crate::{
    ids::{LineUuid, ProductUuid},
    solvers::SolverError,
};

pub mod actions;
pub mod lines;
pub mod owner;
pub mod state;
pub mod store;

pub use actions::{CartAction, apply};
pub use lines::{CartLine, LineKey, NewCartLine, PurchaseMode};
pub use owner::OwnerContext;
pub use state::{CartState, CartTotals};
pub use store::{CartSnapshot, CartStore};

/// Errors raised while applying cart actions.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// Lines must hold at least one unit.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// Line was not found in the cart.
    #[error("line {0} not found")]
    LineNotFound(LineUuid),

    /// Two lines with the same identity were loaded.
    #[error("line {0} duplicates another line for the same product, mode and colour")]
    DuplicateLine(LineUuid),

    /// The product snapshot does not belong to the line.
    #[error("product {found} does not match line product {expected}")]
    ProductMismatch {
        /// Product on the line
        expected: ProductUuid,
        /// Product supplied with the action
        found: ProductUuid,
    },

    /// A line is priced in a different currency from the cart.
    #[error("line has currency {found}, but cart has currency {expected}")]
    CurrencyMismatch {
        /// Cart currency
        expected: &'static str,
        /// Line currency
        found: &'static str,
    },

    /// Quantity arithmetic overflowed.
    #[error("quantity overflowed")]
    QuantityOverflow,

    /// Wrapped pricing error.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// Wrapped money arithmetic error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}
