//! The lane primitive: a short run of item slots with sub-slot offsets.
//!
//! A [`Segment`] is one side (left or right) of a belt node. It holds 1-3
//! slots; each slot is either empty or carries one item plus an offset in
//! `0..steps`. Slot 0 is the front (ready to leave the lane), the last slot
//! is the back (entry point), and offsets count down as an item approaches
//! the front.
//!
//! Segments know nothing about topology. The per-step transition
//! ([`Segment::update`]) is handed its downstream segment and optional
//! side-injection target by the belt-level walk, and every operation is a
//! total function reporting success as a plain `bool`; a full lane is not
//! an error.

use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// Maximum slots a lane can carry.
pub const MAX_SLOTS: usize = 3;

/// One slot of a lane: an optional item and its offset within the slot's
/// step window. `item.is_some()` iff the slot is occupied; an empty slot
/// always has offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub item: Option<ItemTypeId>,
    pub offset: u32,
}

impl Slot {
    const EMPTY: Slot = Slot {
        item: None,
        offset: 0,
    };
}

/// Outcome of one [`Segment::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneProgress {
    /// At least one slot changed (offset stepped, promotion, or hand-off).
    pub moved: bool,
    /// Nothing moved and at least one slot is occupied.
    pub blocked: bool,
    /// Nothing moved and every slot is occupied. A saturated lane has no
    /// forward progress capacity left; callers use this to advance the
    /// belt's first-active marker or detect a fully static circle.
    pub saturated: bool,
}

/// A lane with a fixed slot count and step resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    slots: Vec<Slot>,
    steps: u32,
}

impl Segment {
    /// Create an empty lane. `slot_count` must be in `1..=MAX_SLOTS` and
    /// `steps` at least 1.
    pub fn new(slot_count: usize, steps: u32) -> Self {
        assert!(
            (1..=MAX_SLOTS).contains(&slot_count),
            "lane slot count {slot_count} out of range 1..={MAX_SLOTS}"
        );
        assert!(steps >= 1, "lane needs at least one step position");
        Self {
            slots: vec![Slot::EMPTY; slot_count],
            steps,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// The offset at which the front slot pauses for external hand-off.
    pub fn handoff_offset(&self) -> u32 {
        self.steps / 2
    }

    /// Inspect a slot. Out-of-range indices read as empty.
    pub fn slot(&self, index: usize) -> Slot {
        self.slots.get(index).copied().unwrap_or(Slot::EMPTY)
    }

    // -----------------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------------

    /// Place `item` into `slot` if it is empty. Interior slots receive the
    /// item at the mid-point step; the back slot receives it at the entry
    /// step (`steps - 1`). Returns whether the insert happened.
    pub fn insert(&mut self, slot: usize, item: ItemTypeId) -> bool {
        if slot >= self.slots.len() || self.slots[slot].item.is_some() {
            return false;
        }
        let offset = if slot == self.slots.len() - 1 {
            self.steps - 1
        } else {
            self.steps / 2
        };
        self.slots[slot] = Slot {
            item: Some(item),
            offset,
        };
        true
    }

    /// Place `item` at the back of the lane (the entry point).
    pub fn deliver(&mut self, item: ItemTypeId) -> bool {
        self.insert(self.slots.len() - 1, item)
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Remove the first slot holding `item`, clearing its offset.
    pub fn remove(&mut self, item: ItemTypeId) -> bool {
        self.remove_from(0, item)
    }

    /// Like [`remove`](Self::remove) but never touches the front slot.
    pub fn remove_back(&mut self, item: ItemTypeId) -> bool {
        self.remove_from(1, item)
    }

    fn remove_from(&mut self, start: usize, item: ItemTypeId) -> bool {
        for slot in self.slots.iter_mut().skip(start) {
            if slot.item == Some(item) {
                *slot = Slot::EMPTY;
                return true;
            }
        }
        false
    }

    /// Remove the first occupied slot regardless of item type.
    pub fn remove_any(&mut self) -> Option<ItemTypeId> {
        self.remove_any_from(0)
    }

    /// Like [`remove_any`](Self::remove_any), skipping the front slot.
    pub fn remove_any_back(&mut self) -> Option<ItemTypeId> {
        self.remove_any_from(1)
    }

    fn remove_any_from(&mut self, start: usize) -> Option<ItemTypeId> {
        for slot in self.slots.iter_mut().skip(start) {
            if let Some(item) = slot.item.take() {
                slot.offset = 0;
                return Some(item);
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Hand-off window
    // -----------------------------------------------------------------------

    /// The item paused at the hand-off window, if any: front slot occupied
    /// with offset exactly `steps / 2`.
    pub fn offloading(&self) -> Option<ItemTypeId> {
        let front = self.slots[0];
        if front.offset == self.handoff_offset() {
            front.item
        } else {
            None
        }
    }

    /// Consume `item` from the hand-off window. Fails unless the front slot
    /// holds exactly this item at exactly the hand-off offset.
    pub fn offload(&mut self, item: ItemTypeId) -> bool {
        if self.offloading() == Some(item) {
            self.slots[0] = Slot::EMPTY;
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Occupancy queries
    // -----------------------------------------------------------------------

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.item.is_some()).count()
    }

    /// Occupied slots excluding the front slot.
    pub fn count_back(&self) -> usize {
        self.slots[1..].iter().filter(|s| s.item.is_some()).count()
    }

    /// Occupied slots excluding the back slot.
    pub fn count_front(&self) -> usize {
        let back = self.slots.len() - 1;
        self.slots[..back].iter().filter(|s| s.item.is_some()).count()
    }

    fn occupied_all(&self) -> bool {
        self.slots.iter().all(|s| s.item.is_some())
    }

    // -----------------------------------------------------------------------
    // Per-step transition
    // -----------------------------------------------------------------------

    /// Whether an upstream front item at `offset` (out of `steps`) may keep
    /// closing on this lane's back slot: the back slot is empty, or its item
    /// is strictly further from the boundary by truncated percentage.
    ///
    /// The percentage comparison (rather than raw offsets) keeps the
    /// tie-break correct across lanes with different step resolutions.
    pub fn rear_clearance(&self, offset: u32, steps: u32) -> bool {
        let back = self.slots[self.slots.len() - 1];
        match back.item {
            None => true,
            Some(_) => back.offset * 100 / self.steps > offset * 100 / steps,
        }
    }

    /// Whether `slot` exists and is empty (side-injection gate).
    pub fn slot_free(&self, slot: usize) -> bool {
        slot < self.slots.len() && self.slots[slot].item.is_none()
    }

    /// Advance this lane by one step.
    ///
    /// - `next`: the downstream segment this lane feeds straight into.
    /// - `side`: an optional side-injection target and the slot items land in.
    ///
    /// The front slot steps down while the downstream gate holds (back slot
    /// clearance or an open side slot) and hands off at offset 0 via
    /// `next.deliver` or `side.insert`. Interior slots promote into an empty
    /// slot ahead at the terminal step, or close the gap one unit while the
    /// item ahead is strictly further along its own window.
    pub fn update(
        &mut self,
        mut next: Option<&mut Segment>,
        mut side: Option<(&mut Segment, usize)>,
    ) -> LaneProgress {
        let mut moved = false;

        if let Some(item) = self.slots[0].item {
            let offset = self.slots[0].offset;
            if offset == 0 {
                let mut placed = false;
                if let Some(n) = next.as_deref_mut() {
                    placed = n.deliver(item);
                }
                if !placed {
                    if let Some((s, slot)) = side.as_mut() {
                        placed = s.insert(*slot, item);
                    }
                }
                if placed {
                    self.slots[0] = Slot::EMPTY;
                    moved = true;
                }
            } else {
                let next_gate = next
                    .as_deref()
                    .is_some_and(|n| n.rear_clearance(offset, self.steps));
                let side_gate = side
                    .as_ref()
                    .is_some_and(|(s, slot)| s.slot_free(*slot));
                if next_gate || side_gate {
                    self.slots[0].offset -= 1;
                    moved = true;
                }
            }
        }

        // Upstream slots, nearest-first, so a slot freed above is usable
        // within the same step.
        for k in 1..self.slots.len() {
            if self.slots[k].item.is_none() {
                continue;
            }
            if self.slots[k - 1].item.is_none() {
                self.slots[k - 1] = Slot {
                    item: self.slots[k].item.take(),
                    offset: self.steps - 1,
                };
                self.slots[k].offset = 0;
                moved = true;
            } else if self.slots[k - 1].offset < self.slots[k].offset {
                self.slots[k].offset -= 1;
                moved = true;
            }
        }

        let occupied = self.count() > 0;
        LaneProgress {
            moved,
            blocked: !moved && occupied,
            saturated: !moved && self.occupied_all(),
        }
    }

    // -----------------------------------------------------------------------
    // Raw access for the circular deadlock breaker
    // -----------------------------------------------------------------------

    /// Pop the front slot, returning the item and its offset unchanged.
    pub(crate) fn take_front(&mut self) -> Option<(ItemTypeId, u32)> {
        let front = self.slots[0];
        front.item.map(|item| {
            self.slots[0] = Slot::EMPTY;
            (item, front.offset)
        })
    }

    /// Re-place an item at an exact slot and offset. Fails if occupied.
    pub(crate) fn restore(&mut self, slot: usize, item: ItemTypeId, offset: u32) -> bool {
        if slot >= self.slots.len() || self.slots[slot].item.is_some() {
            return false;
        }
        self.slots[slot] = Slot {
            item: Some(item),
            offset,
        };
        true
    }

    /// Index of the first empty slot, if any.
    pub(crate) fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.item.is_none())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
