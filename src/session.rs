//! Cart Session
//!
//! Wires the store, persistence, reconciliation and the catalog together for one
//! browser session. Owner switches (login, logout) reconcile off to the side and
//! commit in one step; a switch overtaken by a newer one commits nothing.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    cart::{
        CartAction, CartError, CartSnapshot, CartState, CartStore, NewCartLine, OwnerContext,
        PurchaseMode,
    },
    catalog::{CatalogError, ProductCatalog},
    config::{CartConfig, ConfigError},
    ids::{LineUuid, ProductUuid, UserUuid},
    persistence::{CartPersistence, CartStorage, SaveScheduler, StoredCartLine},
    products::Product,
    reconcile::{Reconciler, Reconciliation, merge_lines},
};

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The cart rejected the change.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The catalog could not be queried.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The session could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductUuid),

    /// The line is not in the cart.
    #[error("line {0} not found")]
    LineNotFound(LineUuid),
}

/// Result of an owner switch.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// The reconciled cart was committed.
    Switched(Reconciliation),

    /// A newer switch started first; nothing was committed.
    Superseded,
}

/// One browser session's cart.
pub struct CartSession {
    store: Mutex<CartStore>,
    persistence: Arc<CartPersistence>,
    reconciler: Reconciler,
    catalog: Arc<dyn ProductCatalog>,
    scheduler: SaveScheduler,
    generation: AtomicU64,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("reconciler", &self.reconciler)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// Start an anonymous session with an empty cart.
    ///
    /// Must be called within a Tokio runtime; saves run on a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        storage: Arc<dyn CartStorage>,
        config: &CartConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let currency = config.currency()?;
        let store = CartStore::create(OwnerContext::Anonymous, currency);
        let persistence = Arc::new(CartPersistence::new(storage, config.eviction_batch));
        let scheduler =
            SaveScheduler::spawn(persistence.clone(), store.subscribe(), config.debounce());

        Ok(Self {
            store: Mutex::new(store),
            persistence,
            reconciler: Reconciler::new(catalog.clone(), currency, config.reconcile_settings()),
            catalog,
            scheduler,
            generation: AtomicU64::new(0),
        })
    }

    /// Load and reconcile the stored cart for `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reconciled lines cannot be loaded into the cart.
    pub async fn bootstrap(&self, owner: OwnerContext) -> Result<SwitchOutcome, SessionError> {
        let generation = self.begin_switch();
        let lines = self.lines_for(owner).await;
        let reconciliation = self.reconciler.reconcile(lines).await;

        self.commit(generation, owner, reconciliation).await
    }

    /// Sign `user` in, merging the anonymous cart into theirs.
    ///
    /// The merged cart is saved under the user's key and the anonymous cart is
    /// cleared. A cart already signed in to another user is saved under that
    /// user's key first.
    ///
    /// # Errors
    ///
    /// Returns an error if the reconciled lines cannot be loaded into the cart.
    pub async fn login(&self, user: UserUuid) -> Result<SwitchOutcome, SessionError> {
        let generation = self.begin_switch();
        let owner = OwnerContext::User { user };

        self.flush_signed_in().await;

        let anonymous = self.lines_for(OwnerContext::Anonymous).await;
        let signed_in = self.lines_for(owner).await;
        let merged = merge_lines(signed_in, anonymous);

        debug!(%owner, lines = merged.len(), "merged anonymous cart");

        let reconciliation = self.reconciler.reconcile(merged).await;
        let outcome = self.commit(generation, owner, reconciliation).await?;

        if matches!(outcome, SwitchOutcome::Switched(_)) {
            let snapshot = self.snapshot().await;

            self.persistence.save(&snapshot.lines, owner).await;
            self.persistence.clear(OwnerContext::Anonymous).await;
        }

        Ok(outcome)
    }

    /// Sign out, switching to the anonymous cart.
    ///
    /// The user's cart stays stored under their key.
    ///
    /// # Errors
    ///
    /// Returns an error if the reconciled lines cannot be loaded into the cart.
    pub async fn logout(&self) -> Result<SwitchOutcome, SessionError> {
        let generation = self.begin_switch();

        self.flush_signed_in().await;

        let lines = self.lines_for(OwnerContext::Anonymous).await;
        let reconciliation = self.reconciler.reconcile(lines).await;

        self.commit(generation, OwnerContext::Anonymous, reconciliation)
            .await
    }

    /// Add `quantity` of a product, priced from current catalog data.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be found or the cart rejects the line.
    pub async fn add(
        &self,
        product: ProductUuid,
        mode: PurchaseMode,
        color: Option<String>,
        quantity: u32,
    ) -> Result<CartState, SessionError> {
        let product = self.product(product).await?;
        let line = NewCartLine::new(product, mode, color, quantity);

        self.dispatch(CartAction::Add(line)).await
    }

    /// Change a line's quantity, repricing from current catalog data.
    ///
    /// # Errors
    ///
    /// Returns an error if the line or its product cannot be found.
    pub async fn set_quantity(
        &self,
        line: LineUuid,
        quantity: u32,
    ) -> Result<CartState, SessionError> {
        if quantity == 0 {
            return self.remove(line).await;
        }

        let product = self
            .state()
            .await
            .line(line)
            .map(|found| found.key.product)
            .ok_or(SessionError::LineNotFound(line))?;

        let product = self.product(product).await?;

        self.dispatch(CartAction::SetQuantity {
            line,
            quantity,
            product,
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not in the cart.
    pub async fn remove(&self, line: LineUuid) -> Result<CartState, SessionError> {
        self.dispatch(CartAction::Remove { line }).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart rejects the change.
    pub async fn clear(&self) -> Result<CartState, SessionError> {
        self.dispatch(CartAction::Clear).await
    }

    /// Empty the cart after a successful payment and drop the stored copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart rejects the change.
    pub async fn complete_checkout(&self) -> Result<CartState, SessionError> {
        let state = self.clear().await?;

        self.persistence.clear(state.owner()).await;

        info!(owner = %state.owner(), "checkout completed");

        Ok(state)
    }

    /// Current cart.
    pub async fn state(&self) -> CartState {
        self.store.lock().await.state().clone()
    }

    /// End the session, waiting for the final save.
    pub async fn dispose(self) -> CartSnapshot {
        let snapshot = self.store.into_inner().dispose();

        self.scheduler.finish().await;

        snapshot
    }

    fn begin_switch(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// In-memory lines when `owner` is current, stored lines otherwise.
    async fn lines_for(&self, owner: OwnerContext) -> Vec<StoredCartLine> {
        let current = self.snapshot().await;

        if current.owner == owner {
            current.lines
        } else {
            self.persistence.load_raw(owner).await
        }
    }

    /// Write a signed-in cart now instead of waiting for the debounced save.
    async fn flush_signed_in(&self) {
        let current = self.snapshot().await;

        if !current.owner.is_anonymous() {
            self.persistence.save(&current.lines, current.owner).await;
        }
    }

    async fn snapshot(&self) -> CartSnapshot {
        self.store.lock().await.snapshot()
    }

    async fn commit(
        &self,
        generation: u64,
        owner: OwnerContext,
        reconciliation: Reconciliation,
    ) -> Result<SwitchOutcome, SessionError> {
        let mut store = self.store.lock().await;

        if self.generation.load(Ordering::SeqCst) != generation {
            info!(%owner, "owner switch superseded; discarding reconciliation");

            return Ok(SwitchOutcome::Superseded);
        }

        store.dispatch_all([
            CartAction::SetOwner(owner),
            CartAction::Load {
                lines: reconciliation.valid.clone(),
            },
        ])?;

        info!(
            %owner,
            lines = reconciliation.valid.len(),
            dropped = reconciliation.invalid.len(),
            "cart owner switched"
        );

        Ok(SwitchOutcome::Switched(reconciliation))
    }

    async fn dispatch(&self, action: CartAction) -> Result<CartState, SessionError> {
        let mut store = self.store.lock().await;

        Ok(store.dispatch(action)?.clone())
    }

    async fn product(&self, product: ProductUuid) -> Result<Product, SessionError> {
        self.catalog
            .get_product(product)
            .await?
            .ok_or(SessionError::ProductNotFound(product))
    }
}
