//! Cart Reconciliation
//!
//! Revalidates stored cart lines against current catalog data. Every surviving
//! line is repriced; lines that can no longer be bought are returned with the
//! reason, and lines that survive with changes are reported alongside.

use std::{fmt, sync::Arc};

use futures::future::join_all;
use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use rusty_money::iso::Currency;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cart::CartLine,
    catalog::{CatalogError, ProductCatalog},
    ids::{LineUuid, ProductUuid},
    persistence::StoredCartLine,
    prices::Price,
    products::Product,
};

pub mod merge;
mod validate;

pub use merge::merge_lines;

/// Why a stored line was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The catalog no longer has the product.
    ProductUnavailable,

    /// The product cannot be bought at the moment.
    OutOfStock,

    /// Remaining stock does not cover one whole set.
    InsufficientStockForSet {
        /// Pieces in the set
        set_size: u32,

        /// Pieces in stock
        stock: u32,
    },

    /// The chosen set is no longer offered.
    SetUnavailable,

    /// The product could not be looked up.
    LookupFailed(String),

    /// The line could not be priced from current data.
    PricingFailed(String),
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::ProductUnavailable => f.write_str("product no longer available"),
            InvalidReason::OutOfStock => f.write_str("out of stock"),
            InvalidReason::InsufficientStockForSet { set_size, stock } => write!(
                f,
                "not enough stock for a full set ({stock} in stock, set of {set_size})"
            ),
            InvalidReason::SetUnavailable => f.write_str("set no longer available"),
            InvalidReason::LookupFailed(message) => write!(f, "lookup failed: {message}"),
            InvalidReason::PricingFailed(message) => write!(f, "pricing failed: {message}"),
        }
    }
}

/// A change made to a surviving line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineChange {
    /// Quantity reduced to what is in stock.
    QuantityClamped {
        /// Stored quantity
        from: u32,

        /// Quantity kept
        to: u32,
    },

    /// The price of a piece moved since the line was priced.
    PriceChanged {
        /// Unit price implied by the stored line
        previous: Price,

        /// Unit price now
        current: Price,
    },
}

impl fmt::Display for LineChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineChange::QuantityClamped { from, to } => {
                write!(f, "quantity reduced from {from} to {to} to match available stock")
            }
            LineChange::PriceChanged { previous, current } => {
                write!(f, "price changed from {previous} to {current} per piece")
            }
        }
    }
}

/// A stored line that could not be kept.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidLine {
    /// The line as stored
    pub line: StoredCartLine,

    /// Why it was dropped
    pub reason: InvalidReason,
}

/// A change made to a line in [`Reconciliation::valid`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedLine {
    /// Line that changed
    pub line: LineUuid,

    /// What changed
    pub change: LineChange,
}

/// Result of reconciling a stored cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Lines to keep, freshly priced, in stored order
    pub valid: Vec<CartLine>,

    /// Lines dropped
    pub invalid: Vec<InvalidLine>,

    /// Changes made to kept lines
    pub adjusted: Vec<AdjustedLine>,
}

/// Tuning for [`Reconciler`].
#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    /// Lines validated more recently than this may reuse cached product data
    pub freshness_window: SignedDuration,

    /// Unit price differences up to this many minor units are not reported
    pub price_tolerance_minor: Decimal,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            freshness_window: SignedDuration::from_mins(5),
            price_tolerance_minor: Decimal::ONE,
        }
    }
}

type Lookup = Result<Option<Product>, CatalogError>;

/// Revalidates stored carts against the catalog.
pub struct Reconciler {
    catalog: Arc<dyn ProductCatalog>,
    currency: &'static Currency,
    settings: ReconcileSettings,
    cache: Mutex<FxHashMap<ProductUuid, (Product, Timestamp)>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("currency", &self.currency.iso_alpha_code)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler for carts priced in `currency`.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        currency: &'static Currency,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            catalog,
            currency,
            settings,
            cache: Mutex::default(),
        }
    }

    /// Reconcile `lines` against the catalog now.
    pub async fn reconcile(&self, lines: Vec<StoredCartLine>) -> Reconciliation {
        self.reconcile_at(lines, Timestamp::now()).await
    }

    /// Reconcile `lines` as of `now`.
    ///
    /// Duplicate identities are collapsed first. Product lookups run concurrently,
    /// one per distinct product.
    pub async fn reconcile_at(&self, lines: Vec<StoredCartLine>, now: Timestamp) -> Reconciliation {
        let lines = merge_lines(Vec::new(), lines);
        let lookups = self.lookup_all(&lines, now).await;

        let mut reconciliation = Reconciliation::default();

        for stored in lines {
            let checked = match lookups.get(&stored.product) {
                Some(lookup) => validate::check(&stored, lookup, self.currency, now),
                None => Err(InvalidReason::LookupFailed(
                    "product was not looked up".to_string(),
                )),
            };

            match checked {
                Ok(checked) => {
                    let changes =
                        validate::changes(&stored, &checked, self.settings.price_tolerance_minor);

                    for change in changes {
                        debug!(line = %stored.id, %change, "line adjusted");

                        reconciliation.adjusted.push(AdjustedLine {
                            line: stored.id,
                            change,
                        });
                    }

                    reconciliation.valid.push(checked.line);
                }
                Err(reason) => {
                    debug!(line = %stored.id, %reason, "line dropped");

                    reconciliation.invalid.push(InvalidLine {
                        line: stored,
                        reason,
                    });
                }
            }
        }

        info!(
            valid = reconciliation.valid.len(),
            adjusted = reconciliation.adjusted.len(),
            invalid = reconciliation.invalid.len(),
            "reconciled cart"
        );

        reconciliation
    }

    async fn lookup_all(
        &self,
        lines: &[StoredCartLine],
        now: Timestamp,
    ) -> FxHashMap<ProductUuid, Lookup> {
        let mut lookups = FxHashMap::default();
        let mut stale = FxHashSet::default();

        {
            let cache = self.cache.lock().await;

            for line in lines {
                let cached = cache
                    .get(&line.product)
                    .filter(|(_, fetched_at)| self.is_fresh(Some(*fetched_at), now))
                    .filter(|_| self.is_fresh(line.validated_at, now));

                match cached {
                    Some((product, _)) if !stale.contains(&line.product) => {
                        lookups.insert(line.product, Ok(Some(product.clone())));
                    }
                    _ => {
                        lookups.remove(&line.product);
                        stale.insert(line.product);
                    }
                }
            }
        }

        let fetched = join_all(stale.into_iter().map(|product| async move {
            (product, self.catalog.get_product(product).await)
        }))
        .await;

        let mut cache = self.cache.lock().await;

        for (product, lookup) in fetched {
            match &lookup {
                Ok(Some(found)) => {
                    cache.insert(product, (found.clone(), now));
                }
                Ok(None) => {
                    cache.remove(&product);
                }
                Err(err) => {
                    warn!(%product, error = %err, "product lookup failed");
                }
            }

            lookups.insert(product, lookup);
        }

        lookups
    }

    fn is_fresh(&self, at: Option<Timestamp>, now: Timestamp) -> bool {
        at.is_some_and(|at| {
            let age = now.duration_since(at);

            !age.is_negative() && age <= self.settings.freshness_window
        })
    }
}
