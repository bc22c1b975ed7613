//! Array-backed binary min-heap of pooled entries, keyed by order.
//!
//! [`OrderedFreeHeap`] is the pool's free list. Each entry records its
//! own position (its *slot*) so that an arbitrary entry can be removed
//! in O(log n) given only a reference to it, which is what the reaper
//! needs when a payload is reclaimed behind the pool's back.
//!
//! The heap never looks at payloads. It only orders entries by
//! [`HeapSlot::order`] and keeps each entry's slot in sync with its
//! position in the backing vector.
//!
//! ```text
//!            slot 0 (order 4)
//!           /                \
//!    slot 1 (order 8)    slot 2 (order 6)
//!       /        \
//!  slot 3 (9)  slot 4 (12)
//! ```

use std::fmt;
use std::sync::Arc;

/// Slot value meaning "this entry is not in any heap".
pub const SLOT_NONE: usize = usize::MAX;

/// An item that can live in an [`OrderedFreeHeap`].
///
/// The slot is interior-mutable because entries are shared (`Arc`) with
/// the leases and reclamation notices that point at them. It is written
/// only by the heap, and the heap is only mutated under its owner's lock.
pub trait HeapSlot {
    /// The sort key. Immutable for the entry's lifetime.
    fn order(&self) -> usize;

    /// Current position in the backing vector, or [`SLOT_NONE`].
    fn slot(&self) -> usize;

    /// Record a new position.
    fn set_slot(&self, slot: usize);
}

/// Result of [`OrderedFreeHeap::find_by_order`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Found {
    /// Slot of the matching entry.
    pub slot: usize,
    /// Where a follow-up search should start once the match is removed.
    ///
    /// Either the match's own slot or, when the last descent step had to
    /// break a tie between two equal-order children, the slot of their
    /// parent, so that the sibling is still reachable.
    pub resume: usize,
}

/// Min-heap on [`HeapSlot::order`] with delete-by-slot.
pub struct OrderedFreeHeap<E> {
    entries: Vec<Arc<E>>,
}

impl<E: HeapSlot> Default for OrderedFreeHeap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: HeapSlot> OrderedFreeHeap<E> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `slot`, if any.
    pub fn get(&self, slot: usize) -> Option<&Arc<E>> {
        self.entries.get(slot)
    }

    /// Iterate entries in slot order (not sorted order).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<E>> {
        self.entries.iter()
    }

    /// Append `entry` and sift it toward the root. O(log n).
    ///
    /// Returns the slot the entry settled in.
    pub fn insert(&mut self, entry: Arc<E>) -> usize {
        let slot = self.entries.len();
        entry.set_slot(slot);
        self.entries.push(entry);
        self.sift_up(slot)
    }

    /// Remove the entry at `slot`. O(log n).
    ///
    /// The hole is pushed down to a leaf by repeatedly pulling up the
    /// smaller-order child (the right one on a tie). The last entry then
    /// fills the leaf and is sifted up. The removed entry's slot is reset
    /// to [`SLOT_NONE`]. Returns `None` for [`SLOT_NONE`] or any slot past
    /// the end.
    pub fn remove_at(&mut self, slot: usize) -> Option<Arc<E>> {
        if slot == SLOT_NONE || slot >= self.entries.len() {
            return None;
        }
        let last = self.entries.len() - 1;
        let mut hole = slot;

        loop {
            let right = (hole + 1) << 1;
            let left = right - 1;
            let child = if right <= last {
                if self.entries[left].order() >= self.entries[right].order() {
                    right
                } else {
                    left
                }
            } else if left <= last {
                left
            } else {
                break;
            };
            self.swap(hole, child);
            hole = child;
        }

        if hole != last {
            self.swap(hole, last);
            self.sift_up(hole);
        }

        let removed = self.entries.pop()?;
        removed.set_slot(SLOT_NONE);
        Some(removed)
    }

    /// Look for an entry whose order equals `order`, descending from `from`.
    ///
    /// At each node a child is a candidate only if its order does not
    /// exceed `order`. Between two candidates the larger order wins (the
    /// left one on a tie). The search stops with `None` when no child
    /// qualifies.
    ///
    /// This is bounded recall: the walk follows a single root-to-leaf
    /// path, so it is O(log n) but can miss an exact match sitting in a
    /// branch it did not take. Callers treat `None` as "construct a new
    /// value", never as "no such order exists".
    pub fn find_by_order(&self, order: usize, from: usize) -> Option<Found> {
        let len = self.entries.len();
        let mut idx = from;
        if idx >= len {
            return None;
        }
        let mut tie_parent = None;

        while self.entries[idx].order() != order {
            let right = (idx + 1) << 1;
            let left = right - 1;
            let eligible = |i: usize| i < len && self.entries[i].order() <= order;

            let next = match (eligible(left), eligible(right)) {
                (false, false) => return None,
                (true, true) => {
                    let (lo, ro) = (self.entries[left].order(), self.entries[right].order());
                    tie_parent = (lo == ro).then_some(idx);
                    if lo < ro {
                        right
                    } else {
                        left
                    }
                }
                (true, false) => {
                    tie_parent = None;
                    left
                }
                (false, true) => {
                    tie_parent = None;
                    right
                }
            };
            idx = next;
        }

        Some(Found {
            slot: idx,
            resume: tie_parent.unwrap_or(idx),
        })
    }

    /// Check the heap property and slot bookkeeping for every entry.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.slot() != i {
                return Err(format!("entry at slot {i} records slot {}", entry.slot()));
            }
            if i > 0 {
                let parent = (i - 1) / 2;
                let (po, eo) = (self.entries[parent].order(), entry.order());
                if po > eo {
                    return Err(format!(
                        "heap property violated: parent slot {parent} order {po} > child slot {i} order {eo}"
                    ));
                }
            }
        }
        Ok(())
    }

    fn sift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.entries[parent].order() <= self.entries[idx].order() {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
        }
        idx
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.entries[a].set_slot(a);
        self.entries[b].set_slot(b);
    }
}

impl<E: HeapSlot> fmt::Debug for OrderedFreeHeap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.order()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Item {
        order: usize,
        slot: AtomicUsize,
    }

    impl Item {
        fn new(order: usize) -> Arc<Self> {
            Arc::new(Self {
                order,
                slot: AtomicUsize::new(SLOT_NONE),
            })
        }
    }

    impl HeapSlot for Item {
        fn order(&self) -> usize {
            self.order
        }
        fn slot(&self) -> usize {
            self.slot.load(Ordering::Relaxed)
        }
        fn set_slot(&self, slot: usize) {
            self.slot.store(slot, Ordering::Relaxed);
        }
    }

    fn heap_of(orders: &[usize]) -> (OrderedFreeHeap<Item>, Vec<Arc<Item>>) {
        let mut heap = OrderedFreeHeap::new();
        let items: Vec<_> = orders.iter().map(|&o| Item::new(o)).collect();
        for item in &items {
            heap.insert(Arc::clone(item));
        }
        (heap, items)
    }

    #[test]
    fn insert_keeps_min_at_root() {
        let (heap, _) = heap_of(&[9, 4, 7, 1, 8]);
        assert_eq!(heap.len(), 5);
        assert_eq!(heap.get(0).unwrap().order(), 1);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn insert_returns_settled_slot() {
        let mut heap = OrderedFreeHeap::new();
        assert_eq!(heap.insert(Item::new(5)), 0);
        assert_eq!(heap.insert(Item::new(9)), 1);
        // Smaller than the root: bubbles all the way up.
        let small = Item::new(1);
        assert_eq!(heap.insert(Arc::clone(&small)), 0);
        assert_eq!(small.slot(), 0);
    }

    #[test]
    fn remove_none_sentinel_is_noop() {
        let (mut heap, _) = heap_of(&[3, 1, 2]);
        assert!(heap.remove_at(SLOT_NONE).is_none());
        assert!(heap.remove_at(3).is_none());
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn remove_root_promotes_next_smallest() {
        let (mut heap, items) = heap_of(&[5, 3, 8, 1, 4]);
        let removed = heap.remove_at(0).unwrap();
        assert_eq!(removed.order(), 1);
        assert_eq!(removed.slot(), SLOT_NONE);
        assert_eq!(heap.get(0).unwrap().order(), 3);
        heap.check_invariants().unwrap();
        assert_eq!(items.iter().filter(|i| i.slot() != SLOT_NONE).count(), 4);
    }

    #[test]
    fn remove_interior_by_slot() {
        let (mut heap, items) = heap_of(&[1, 10, 2, 11, 12, 3, 4, 13]);
        let target = Arc::clone(&items[1]);
        let removed = heap.remove_at(target.slot()).unwrap();
        assert!(Arc::ptr_eq(&removed, &target));
        assert_eq!(heap.len(), 7);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn remove_last_slot() {
        let (mut heap, _) = heap_of(&[1, 2, 3]);
        let removed = heap.remove_at(2).unwrap();
        assert_eq!(removed.order(), 3);
        assert_eq!(heap.len(), 2);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn remove_only_entry() {
        let (mut heap, items) = heap_of(&[7]);
        heap.remove_at(0).unwrap();
        assert!(heap.is_empty());
        assert_eq!(items[0].slot(), SLOT_NONE);
    }

    #[test]
    fn remove_prefers_right_child_on_tie() {
        // Root 1 with two children of order 5: the right child moves up.
        let (mut heap, _) = heap_of(&[1, 5, 5]);
        let right = Arc::clone(heap.get(2).unwrap());
        heap.remove_at(0).unwrap();
        assert!(Arc::ptr_eq(heap.get(0).unwrap(), &right));
        heap.check_invariants().unwrap();
    }

    #[test]
    fn find_exact_match_at_root() {
        let (heap, _) = heap_of(&[4, 6, 8]);
        assert_eq!(heap.find_by_order(4, 0), Some(Found { slot: 0, resume: 0 }));
    }

    #[test]
    fn find_descends_toward_larger_eligible_child() {
        // slots: 0:1, 1:3, 2:5, 3:4, 4:9
        let (heap, _) = heap_of(&[1, 3, 5, 4, 9]);
        let orders: Vec<_> = heap.iter().map(|e| e.order()).collect();
        assert_eq!(orders, vec![1, 3, 5, 4, 9]);
        let found = heap.find_by_order(5, 0).unwrap();
        assert_eq!(heap.get(found.slot).unwrap().order(), 5);
        assert_eq!(found.resume, found.slot);
    }

    #[test]
    fn find_records_tie_parent() {
        // slots: 0:1, 1:2, 2:2, 3:3
        let (heap, _) = heap_of(&[1, 2, 2, 3]);

        // Tie at the root, then a single-candidate step: the hint is cleared.
        let found = heap.find_by_order(3, 0).unwrap();
        assert_eq!(found, Found { slot: 3, resume: 3 });

        // Tie at the root and the match is the left child: resume at the root.
        let found = heap.find_by_order(2, 0).unwrap();
        assert_eq!(found, Found { slot: 1, resume: 0 });
    }

    #[test]
    fn find_misses_when_root_too_large() {
        let (heap, _) = heap_of(&[10, 20]);
        assert_eq!(heap.find_by_order(5, 0), None);
    }

    #[test]
    fn find_from_past_end_is_none() {
        let (heap, _) = heap_of(&[1, 2]);
        assert_eq!(heap.find_by_order(2, 2), None);
    }

    #[test]
    fn find_follows_eligible_children() {
        // slots: 0:1, 1:2, 2:4, 3:3, 4:3, 5:5
        let (heap, _) = heap_of(&[1, 2, 4, 3, 3, 5]);
        let orders: Vec<_> = heap.iter().map(|e| e.order()).collect();
        assert_eq!(orders, vec![1, 2, 4, 3, 3, 5]);
        assert_eq!(heap.find_by_order(5, 0).map(|f| f.slot), Some(5));
        assert_eq!(heap.find_by_order(3, 0).map(|f| f.slot), Some(3));

        // slots: 0:1, 1:3, 2:2, ... -- order 3 is ineligible when looking for 2.
        let (heap, _) = heap_of(&[1, 3, 2, 4, 9, 2]);
        assert_eq!(heap.find_by_order(2, 0).map(|f| f.slot), Some(2));
    }

    #[test]
    fn find_has_bounded_recall() {
        // slots: 0:1, 1:2, 2:3, 3:4, 4:4, 5:5
        let (heap, _) = heap_of(&[1, 2, 3, 4, 4, 5]);
        let orders: Vec<_> = heap.iter().map(|e| e.order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 4, 5]);
        // Looking for 4, the root's larger eligible child (3) wins; its
        // only child is 5, so the two 4s under slot 1 are never visited.
        assert_eq!(heap.find_by_order(4, 0), None);
        assert!(heap.iter().any(|e| e.order() == 4));
    }

    #[test]
    fn check_invariants_catches_bad_slot() {
        let (heap, items) = heap_of(&[1, 2]);
        items[1].set_slot(7);
        assert!(heap.check_invariants().is_err());
    }

    // ── Property tests ──────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Insert(usize),
        Remove(usize),
        Take(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0usize..32).prop_map(Op::Insert),
            1 => (0usize..64).prop_map(Op::Remove),
            1 => (0usize..32).prop_map(Op::Take),
        ]
    }

    proptest! {
        #[test]
        fn heap_property_survives_any_op_sequence(ops in prop::collection::vec(arb_op(), 1..200)) {
            let mut heap = OrderedFreeHeap::new();
            let mut live: Vec<Arc<Item>> = Vec::new();
            for op in ops {
                match op {
                    Op::Insert(order) => {
                        let item = Item::new(order);
                        heap.insert(Arc::clone(&item));
                        live.push(item);
                    }
                    Op::Remove(pick) => {
                        if !live.is_empty() {
                            let item = live.swap_remove(pick % live.len());
                            let removed = heap.remove_at(item.slot()).unwrap();
                            prop_assert!(Arc::ptr_eq(&removed, &item));
                            prop_assert_eq!(item.slot(), SLOT_NONE);
                        }
                    }
                    Op::Take(order) => {
                        if let Some(found) = heap.find_by_order(order, 0) {
                            let removed = heap.remove_at(found.slot).unwrap();
                            prop_assert_eq!(removed.order(), order);
                            live.retain(|i| !Arc::ptr_eq(i, &removed));
                        }
                    }
                }
                prop_assert_eq!(heap.len(), live.len());
                if let Err(msg) = heap.check_invariants() {
                    return Err(TestCaseError::fail(msg));
                }
            }
        }

        #[test]
        fn find_never_returns_wrong_order(
            orders in prop::collection::vec(0usize..16, 0..64),
            want in 0usize..16,
        ) {
            let (heap, _) = heap_of(&orders);
            if let Some(found) = heap.find_by_order(want, 0) {
                prop_assert_eq!(heap.get(found.slot).unwrap().order(), want);
                prop_assert!(found.resume <= found.slot);
            }
        }

        #[test]
        fn minimum_order_is_always_found(orders in prop::collection::vec(0usize..16, 1..64)) {
            let (heap, _) = heap_of(&orders);
            let min = *orders.iter().min().unwrap();
            prop_assert_eq!(heap.find_by_order(min, 0).map(|f| f.slot), Some(0));
        }
    }
}
