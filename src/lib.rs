//! Bulkcart
//!
//! Bulkcart prices purchase quantities as the cheapest mix of single pieces and bulk
//! sets, and keeps a shopping cart priced, persisted and reconciled against the
//! catalog across anonymous and signed-in sessions.

pub mod breakdown;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod fixtures;
pub mod formatting;
pub mod ids;
pub mod logging;
pub mod persistence;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod products;
pub mod reconcile;
pub mod session;
pub mod solvers;
