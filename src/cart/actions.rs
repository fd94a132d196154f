//! Cart Actions
//!
//! [`apply`] is the only way cart state changes. Each action carries the data it
//! needs, so applying one never performs I/O. Actions are applied to a copy of the
//! state and committed only when they succeed, and totals are recomputed from the
//! lines every time.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::{
    cart::{CartError, CartLine, CartState, NewCartLine, OwnerContext},
    ids::LineUuid,
    products::Product,
};

/// A change to the cart.
#[derive(Debug, Clone)]
pub enum CartAction {
    /// Add units, merging into an existing line with the same identity.
    Add(NewCartLine),

    /// Remove a line.
    Remove {
        /// Line to remove
        line: LineUuid,
    },

    /// Change a line's quantity, repricing it from current product data.
    ///
    /// A quantity of zero removes the line.
    SetQuantity {
        /// Line to change
        line: LineUuid,

        /// New quantity
        quantity: u32,

        /// Current product data for the line
        product: Product,
    },

    /// Remove every line.
    Clear,

    /// Replace every line.
    Load {
        /// Lines to load
        lines: Vec<CartLine>,
    },

    /// Change the owner of the cart.
    SetOwner(OwnerContext),
}

/// Apply an action to the cart.
///
/// # Errors
///
/// Returns a [`CartError`] if the action is invalid for the current state; the
/// state is unchanged in that case.
pub fn apply(state: &mut CartState, action: CartAction) -> Result<(), CartError> {
    let mut next = state.clone();

    match action {
        CartAction::Add(new_line) => add(&mut next, new_line)?,
        CartAction::Remove { line } => remove(&mut next, line)?,
        CartAction::SetQuantity {
            line,
            quantity: 0,
            ..
        } => remove(&mut next, line)?,
        CartAction::SetQuantity {
            line,
            quantity,
            product,
        } => set_quantity(&mut next, line, quantity, &product)?,
        CartAction::Clear => next.lines_mut().clear(),
        CartAction::Load { lines } => load(&mut next, lines)?,
        CartAction::SetOwner(owner) => next.set_owner(owner),
    }

    next.recompute_totals()?;

    *state = next;

    Ok(())
}

fn add(state: &mut CartState, new_line: NewCartLine) -> Result<(), CartError> {
    if new_line.quantity == 0 {
        return Err(CartError::ZeroQuantity);
    }

    let key = new_line.key();

    if let Some(existing) = state.lines_mut().iter_mut().find(|line| line.key == key) {
        let quantity = existing
            .quantity
            .checked_add(new_line.quantity)
            .ok_or(CartError::QuantityOverflow)?;

        debug!(line = %existing.id, quantity, "merging add into existing line");

        return existing.reprice(&new_line.product, quantity);
    }

    let line = CartLine::priced(
        new_line.id,
        key,
        new_line.quantity,
        &new_line.product,
        new_line.added_at,
    )?;

    state.lines_mut().push(line);

    Ok(())
}

fn remove(state: &mut CartState, id: LineUuid) -> Result<(), CartError> {
    let lines = state.lines_mut();
    let position = lines
        .iter()
        .position(|line| line.id == id)
        .ok_or(CartError::LineNotFound(id))?;

    lines.remove(position);

    Ok(())
}

fn set_quantity(
    state: &mut CartState,
    id: LineUuid,
    quantity: u32,
    product: &Product,
) -> Result<(), CartError> {
    state
        .lines_mut()
        .iter_mut()
        .find(|line| line.id == id)
        .ok_or(CartError::LineNotFound(id))?
        .reprice(product, quantity)
}

fn load(state: &mut CartState, lines: Vec<CartLine>) -> Result<(), CartError> {
    if let Some(duplicate) = first_duplicate(&lines) {
        return Err(CartError::DuplicateLine(duplicate));
    }

    *state.lines_mut() = lines;

    Ok(())
}

fn first_duplicate(lines: &[CartLine]) -> Option<LineUuid> {
    let mut seen = FxHashSet::default();

    lines
        .iter()
        .find(|line| !seen.insert(&line.key))
        .map(|line| line.id)
}
