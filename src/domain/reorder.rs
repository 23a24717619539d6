//! Sibling reordering driven by a resolved drop locus.
//!
//! Pixel geometry never reaches this module: the host resolves the pointer position
//! to "before" or "after" a target sibling and passes only that decision.

use serde::{Deserialize, Serialize};

/// Which side of the target sibling the dragged item lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    After,
}

/// Resolved drop decision: insert relative to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropLocus<K> {
    pub target: K,
    pub placement: Placement,
}

impl<K> DropLocus<K> {
    pub fn before(target: K) -> Self {
        Self {
            target,
            placement: Placement::Before,
        }
    }

    pub fn after(target: K) -> Self {
        Self {
            target,
            placement: Placement::After,
        }
    }
}

/// Index the source lands on once it has been removed from the sequence.
///
/// The target index was measured before removal, so it shifts down by one when the
/// source preceded it.
pub fn insertion_index(source_index: usize, target_index: usize, placement: Placement) -> usize {
    let corrected = if target_index > source_index {
        target_index - 1
    } else {
        target_index
    };
    match placement {
        Placement::Before => corrected,
        Placement::After => corrected + 1,
    }
}

/// Move `items[source_index]` before or after `items[target_index]`.
///
/// Returns whether the order changed. Out-of-range indices and dropping an item onto
/// itself leave the sequence untouched.
pub fn move_item<T>(
    items: &mut Vec<T>,
    source_index: usize,
    target_index: usize,
    placement: Placement,
) -> bool {
    if source_index >= items.len() || target_index >= items.len() || source_index == target_index {
        return false;
    }
    let at = insertion_index(source_index, target_index, placement);
    if at == source_index {
        return false;
    }
    let item = items.remove(source_index);
    items.insert(at.min(items.len()), item);
    true
}

/// Move `items[source_index]` into the gap `slot`, where slot `k` means "before the item
/// currently at `k`" and `items.len()` means the end.
pub fn move_to_slot<T>(items: &mut Vec<T>, source_index: usize, slot: usize) -> bool {
    if source_index >= items.len() {
        return false;
    }
    let slot = slot.min(items.len());
    let at = if slot > source_index { slot - 1 } else { slot };
    if at == source_index {
        return false;
    }
    let item = items.remove(source_index);
    items.insert(at, item);
    true
}

/// Identity-based reorder returning a new sequence.
///
/// Items are matched by `key`; an unknown source or target yields the input unchanged.
pub fn reorder_by<T, K, F>(items: &[T], source: &K, locus: &DropLocus<K>, key: F) -> Vec<T>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut reordered = items.to_vec();
    let source_index = items.iter().position(|item| key(item) == *source);
    let target_index = items.iter().position(|item| key(item) == locus.target);
    if let (Some(s), Some(t)) = (source_index, target_index) {
        move_item(&mut reordered, s, t, locus.placement);
    }
    reordered
}
