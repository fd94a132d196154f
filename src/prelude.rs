//! Bulkcart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    breakdown::{BreakdownLine, OptimizationNote, PriceBreakdown},
    cart::{
        CartAction, CartError, CartLine, CartSnapshot, CartState, CartStore, CartTotals, LineKey,
        NewCartLine, OwnerContext, PurchaseMode, apply,
    },
    catalog::{CatalogError, InMemoryCatalog, ProductCatalog},
    config::{CartConfig, ConfigError},
    formatting::{discount_percent, savings_percent, savings_sentence, summary, write_breakdown},
    ids::{LineUuid, ProductUuid, SetUuid, UserUuid},
    persistence::{
        CartPersistence, CartStorage, FileStorage, MemoryStorage, SaveOutcome, SaveScheduler,
        StorageError, StoredCartLine,
    },
    prices::{Price, parse_price},
    pricing::PricingOption,
    products::{Product, ProductSet},
    reconcile::{
        AdjustedLine, InvalidLine, InvalidReason, LineChange, ReconcileSettings, Reconciler,
        Reconciliation, merge_lines,
    },
    session::{CartSession, SessionError, SwitchOutcome},
    solvers::{SolverError, optimal_price, optimize_for_chosen_set, price_line},
};
