//! Cart Store
//!
//! Owns the single [`CartState`] of a session and publishes a snapshot after every
//! successful action. Persistence subscribes to those snapshots; the store itself
//! never performs I/O.

use rusty_money::iso::Currency;
use tokio::sync::watch;

use crate::{
    cart::{CartAction, CartError, CartState, OwnerContext, apply},
    persistence::records::StoredCartLine,
};

/// Serializable view of the cart published after each change.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    /// Owner the lines belong to
    pub owner: OwnerContext,

    /// Lines in storage form
    pub lines: Vec<StoredCartLine>,
}

impl From<&CartState> for CartSnapshot {
    fn from(state: &CartState) -> Self {
        Self {
            owner: state.owner(),
            lines: state.lines().iter().map(StoredCartLine::from).collect(),
        }
    }
}

/// The session's cart.
#[derive(Debug)]
pub struct CartStore {
    state: CartState,
    changes: watch::Sender<CartSnapshot>,
}

impl CartStore {
    /// Create an empty store for `owner`.
    #[must_use]
    pub fn create(owner: OwnerContext, currency: &'static Currency) -> Self {
        let state = CartState::new(owner, currency);
        let (changes, _) = watch::channel(CartSnapshot::from(&state));

        Self { state, changes }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// Apply an action and publish the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the action was rejected; nothing is published then.
    pub fn dispatch(&mut self, action: CartAction) -> Result<&CartState, CartError> {
        apply(&mut self.state, action)?;

        self.changes.send_replace(CartSnapshot::from(&self.state));

        Ok(&self.state)
    }

    /// Apply several actions as one change.
    ///
    /// Subscribers see a single snapshot with every action applied, or nothing if
    /// any action was rejected.
    ///
    /// # Errors
    ///
    /// Returns the first [`CartError`]; the state is unchanged then.
    pub fn dispatch_all(
        &mut self,
        actions: impl IntoIterator<Item = CartAction>,
    ) -> Result<&CartState, CartError> {
        let mut next = self.state.clone();

        for action in actions {
            apply(&mut next, action)?;
        }

        self.state = next;
        self.changes.send_replace(CartSnapshot::from(&self.state));

        Ok(&self.state)
    }

    /// Receive a snapshot after every change made from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.changes.subscribe()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from(&self.state)
    }

    /// Tear the store down, closing every subscription.
    ///
    /// Returns the final snapshot.
    #[must_use]
    pub fn dispose(self) -> CartSnapshot {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};
    use smallvec::SmallVec;
    use testresult::TestResult;

    use crate::{
        cart::{NewCartLine, PurchaseMode},
        ids::{LineUuid, ProductUuid},
        products::Product,
    };

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductUuid::now_v7(),
            name: "Cotton napkin".to_string(),
            in_stock: true,
            allows_bulk: true,
            stock_quantity: 0,
            discounted_unit_price: Money::from_minor(330, INR),
            reference_unit_price: Money::from_minor(360, INR),
            sets: SmallVec::new(),
        }
    }

    #[test]
    fn dispatch_publishes_snapshot() -> TestResult {
        let mut store = CartStore::create(OwnerContext::Anonymous, INR);
        let mut changes = store.subscribe();

        assert!(!changes.has_changed()?);

        store.dispatch(CartAction::Add(NewCartLine::new(
            product(),
            PurchaseMode::Piece,
            None,
            2,
        )))?;

        assert!(changes.has_changed()?);

        let snapshot = changes.borrow_and_update().clone();

        assert_eq!(snapshot.owner, OwnerContext::Anonymous);
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines.first().map(|line| line.quantity), Some(2));

        Ok(())
    }

    #[test]
    fn rejected_action_publishes_nothing() -> TestResult {
        let mut store = CartStore::create(OwnerContext::Anonymous, INR);
        let changes = store.subscribe();

        let result = store.dispatch(CartAction::Remove {
            line: LineUuid::now_v7(),
        });

        assert!(result.is_err());
        assert!(!changes.has_changed()?);

        Ok(())
    }

    #[test]
    fn batches_publish_once_or_not_at_all() -> TestResult {
        let mut store = CartStore::create(OwnerContext::Anonymous, INR);
        let mut changes = store.subscribe();
        let user = OwnerContext::User {
            user: crate::ids::UserUuid::now_v7(),
        };

        let rejected = store.dispatch_all([
            CartAction::SetOwner(user),
            CartAction::Remove {
                line: LineUuid::now_v7(),
            },
        ]);

        assert!(rejected.is_err());
        assert!(!changes.has_changed()?);
        assert_eq!(store.state().owner(), OwnerContext::Anonymous);

        store.dispatch_all([
            CartAction::SetOwner(user),
            CartAction::Add(NewCartLine::new(product(), PurchaseMode::Piece, None, 1)),
        ])?;

        let snapshot = changes.borrow_and_update().clone();

        assert_eq!(snapshot.owner, user);
        assert_eq!(snapshot.lines.len(), 1);

        Ok(())
    }

    #[test]
    fn dispose_closes_subscriptions() {
        let store = CartStore::create(OwnerContext::Anonymous, INR);
        let changes = store.subscribe();

        let snapshot = store.dispose();

        assert!(snapshot.lines.is_empty());
        assert!(changes.has_changed().is_err());
    }
}
