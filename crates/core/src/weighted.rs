//! Cumulative-weight random selection.

use crate::seed::MapRng;

/// Picks one item with probability `|weight(item)| / sum(|weight|)`.
///
/// Returns `None` for an empty slice or when every weight is zero; the caller owns the
/// fallback in that case.
pub fn weighted_choice<'a, T>(
    items: &'a [T],
    rng: &mut MapRng,
    weight: impl Fn(&T) -> i32,
) -> Option<&'a T> {
    let total: u64 = items.iter().map(|item| u64::from(weight(item).unsigned_abs())).sum();
    if total == 0 {
        return None;
    }

    let choice = rng.below(total);
    let mut cumulative = 0_u64;
    for item in items {
        cumulative += u64::from(weight(item).unsigned_abs());
        if cumulative > choice {
            return Some(item);
        }
    }
    None
}
