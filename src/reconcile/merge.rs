//! Cart merging

use rustc_hash::FxHashMap;

use crate::{cart::LineKey, persistence::StoredCartLine};

/// Union a user's stored cart with an anonymous one.
///
/// Lines with the same identity are combined: quantities and stored totals are
/// summed, the user's line id is kept along with the earliest `added_at`, and the
/// line is marked for revalidation. The quantities each total was priced at are
/// kept so price drift is measured per original line. Duplicates within either cart collapse the
/// same way. Order is first appearance, user lines first.
#[must_use]
pub fn merge_lines(
    user: Vec<StoredCartLine>,
    anonymous: Vec<StoredCartLine>,
) -> Vec<StoredCartLine> {
    let mut merged: Vec<StoredCartLine> = Vec::with_capacity(user.len() + anonymous.len());
    let mut positions: FxHashMap<LineKey, usize> = FxHashMap::default();

    for line in user.into_iter().chain(anonymous) {
        let existing = positions
            .get(&line.key())
            .and_then(|&position| merged.get_mut(position));

        match existing {
            Some(existing) => combine(existing, &line),
            None => {
                positions.insert(line.key(), merged.len());
                merged.push(line);
            }
        }
    }

    merged
}

fn combine(into: &mut StoredCartLine, other: &StoredCartLine) {
    let mut priced = into.priced_at();

    priced.extend(other.priced_at());

    into.priced_quantities = priced;
    into.quantity = into.quantity.saturating_add(other.quantity);
    into.added_at = into.added_at.min(other.added_at);
    into.validated_at = None;

    let breakdown = &mut into.breakdown;

    breakdown.total_price = breakdown
        .total_price
        .saturating_add(other.breakdown.total_price);
    breakdown.original_price = breakdown
        .original_price
        .saturating_add(other.breakdown.original_price);
    breakdown.total_pieces = breakdown
        .total_pieces
        .saturating_add(other.breakdown.total_pieces);
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use crate::{
        cart::PurchaseMode,
        ids::{LineUuid, ProductUuid, SetUuid},
        persistence::StoredBreakdown,
    };

    use super::*;

    fn line(product: ProductUuid, mode: PurchaseMode, quantity: u32, added_at: i64) -> StoredCartLine {
        StoredCartLine {
            id: LineUuid::now_v7(),
            product,
            mode,
            color: None,
            quantity,
            breakdown: StoredBreakdown {
                currency: "INR".to_string(),
                total_price: i64::from(quantity) * 330,
                original_price: i64::from(quantity) * 360,
                total_pieces: quantity,
            },
            added_at: Timestamp::from_second(added_at).unwrap_or(Timestamp::UNIX_EPOCH),
            validated_at: Some(Timestamp::UNIX_EPOCH),
            priced_quantities: Vec::new(),
        }
    }

    #[test]
    fn anonymous_lines_fold_into_matching_user_lines() {
        let a = ProductUuid::now_v7();
        let b = ProductUuid::now_v7();

        let user_a = line(a, PurchaseMode::Piece, 3, 200);
        let user_b = line(b, PurchaseMode::Piece, 1, 300);
        let anonymous_a = line(a, PurchaseMode::Piece, 2, 100);

        let merged = merge_lines(vec![user_a.clone(), user_b.clone()], vec![anonymous_a]);

        assert_eq!(merged.len(), 2);

        let first = merged.first();

        assert_eq!(first.map(|line| line.id), Some(user_a.id));
        assert_eq!(first.map(|line| line.quantity), Some(5));
        assert_eq!(first.map(|line| line.breakdown.total_price), Some(1650));
        assert_eq!(first.map(|line| line.added_at.as_second()), Some(100));
        assert_eq!(first.and_then(|line| line.validated_at), None);
        assert_eq!(
            first.map(|line| line.priced_quantities.clone()),
            Some(vec![3, 2])
        );
        assert_eq!(merged.get(1), Some(&user_b));
    }

    #[test]
    fn different_modes_stay_separate() {
        let product = ProductUuid::now_v7();
        let set = PurchaseMode::Set {
            set: SetUuid::now_v7(),
        };

        let merged = merge_lines(
            vec![line(product, PurchaseMode::Piece, 2, 0)],
            vec![line(product, set, 1, 0)],
        );

        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn duplicates_within_one_cart_collapse() {
        let product = ProductUuid::now_v7();

        let merged = merge_lines(
            Vec::new(),
            vec![
                line(product, PurchaseMode::Piece, 2, 0),
                line(product, PurchaseMode::Piece, u32::MAX, 0),
            ],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.first().map(|line| line.quantity), Some(u32::MAX));

        let merged = merge_lines(merged.clone(), vec![line(product, PurchaseMode::Piece, 4, 0)]);

        assert_eq!(
            merged.first().map(|line| line.priced_quantities.clone()),
            Some(vec![2, u32::MAX, 4])
        );
    }
}
