//! Belt records: the rebuilt, contiguous ownership units of the transport
//! phase.
//!
//! A [`BeltRecord`] owns value copies of every node in one chain, ordered
//! front-first: index 0 is the leader (the node with no `next`), index
//! `i + 1` is the `prev` of index `i`. Copies keep the per-step walk on a
//! contiguous array; the engine's redirection table maps a node id back to
//! its `(belt, offset)` so external lookups still land on the live copy.
//!
//! Records are never patched in place. Any membership change dissolves the
//! record and the topology pass builds a fresh one.

use crate::direction::Lane;
use crate::id::{ItemTypeId, NodeId};
use crate::node::BeltNode;
use crate::segment::{LaneProgress, Segment};
use serde::{Deserialize, Serialize};

/// Lane processing order for a given tick parity. Alternating the order
/// avoids a persistent directional bias between the two lanes.
pub(crate) fn lane_order(parity: u64) -> [Lane; 2] {
    if parity % 2 == 0 {
        [Lane::Left, Lane::Right]
    } else {
        [Lane::Right, Lane::Left]
    }
}

/// One straight chain or circular loop of belt nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeltRecord {
    /// The node anchoring the rebuild walk: no `next` for straight belts,
    /// the flood-fill start point for circular ones.
    pub leader: NodeId,
    /// Node copies, front-first. `nodes[i + 1]` is the `prev` of `nodes[i]`.
    pub nodes: Vec<BeltNode>,
    /// Whether the `prev` chain loops back to the leader.
    pub circular: bool,

    /// Side-injection target of the leader, if any.
    pub side_target: Option<NodeId>,
    /// Which lane of the target the leader injects into.
    pub side_lane: Option<Lane>,
    /// Which slot of that lane items land in.
    pub side_slot: usize,

    /// Per-lane first offset still doing work; fully saturated static nodes
    /// in front of it are skipped on subsequent steps.
    pub first_active: [usize; 2],
    /// Offset of the bulk energy-consumption representative: the first node
    /// on the belt that drains energy independently.
    pub energy_rep: Option<usize>,
}

impl BeltRecord {
    pub fn new(leader: NodeId, nodes: Vec<BeltNode>, circular: bool) -> Self {
        assert!(!nodes.is_empty(), "belt record must own at least one node");
        assert_eq!(nodes[0].id, leader, "leader must sit at offset 0");
        let energy_rep = nodes.iter().position(|n| !n.externally_powered);
        Self {
            leader,
            nodes,
            circular,
            side_target: None,
            side_lane: None,
            side_slot: 0,
            first_active: [0, 0],
            energy_rep,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, offset: usize) -> &BeltNode {
        &self.nodes[offset]
    }

    pub fn node_mut(&mut self, offset: usize) -> &mut BeltNode {
        &mut self.nodes[offset]
    }

    /// Reset the first-active markers. Called whenever an external
    /// collaborator mutates any lane of the belt.
    pub fn wake(&mut self) {
        self.first_active = [0, 0];
    }

    /// Bulk energy drained by this belt per step: the representative's cost
    /// times the member count, charged once instead of per node.
    pub fn energy_use(&self) -> u64 {
        match self.energy_rep {
            Some(rep) => self.nodes[rep].energy_cost as u64 * self.nodes.len() as u64,
            None => 0,
        }
    }

    // -----------------------------------------------------------------------
    // Per-step transport
    // -----------------------------------------------------------------------

    /// Advance a belt with no side-injection target. Safe to run in
    /// parallel with other belts: the walk touches only this record.
    pub fn step_isolated(&mut self, parity: u64) {
        for lane in lane_order(parity) {
            self.walk_lane(lane, None);
        }
    }

    /// Advance a belt whose leader side-injects into `target` (a lane
    /// segment of another belt's node). Must run serially: several belts
    /// may share one target.
    pub fn step_side(&mut self, parity: u64, target: &mut Segment) {
        let slot = self.side_slot;
        for lane in lane_order(parity) {
            self.walk_lane(lane, Some((&mut *target, slot)));
        }
    }

    /// Walk one lane from its first active offset toward the back,
    /// updating each node's segment against its downstream neighbor.
    fn walk_lane(&mut self, lane: Lane, mut side: Option<(&mut Segment, usize)>) {
        let len = self.nodes.len();
        let li = lane.index();
        let throttled = !self.circular && side.is_none();
        let start = if throttled {
            self.first_active[li].min(len)
        } else {
            0
        };
        if start >= len {
            return;
        }

        // Circular deadlock breaker, phase 1: pop the leader's front item
        // when it sits exactly at the hand-off offset, so a 100% full loop
        // still has one hole to march through.
        let mut popped: Option<(ItemTypeId, u32)> = None;
        if self.circular {
            let seg = self.nodes[0].lane_mut(lane);
            let front = seg.slot(0);
            if front.item.is_some() && front.offset == seg.handoff_offset() {
                popped = seg.take_front();
            }
        }

        let mut head_progress = LaneProgress::default();
        for i in start..len {
            let progress = if i == 0 {
                if self.circular && len > 1 {
                    // The leader of a loop feeds the back of the chain.
                    let (first, rest) = self.nodes.split_first_mut().expect("non-empty belt");
                    let down = rest.last_mut().expect("len > 1");
                    first.lane_mut(lane).update(Some(down.lane_mut(lane)), None)
                } else {
                    self.nodes[0].lane_mut(lane).update(None, side.take())
                }
            } else {
                let (down, rest) = self.nodes.split_at_mut(i);
                rest[0]
                    .lane_mut(lane)
                    .update(Some(down[i - 1].lane_mut(lane)), None)
            };
            if i == start {
                head_progress = progress;
            }
        }

        // Circular deadlock breaker, phase 2: re-insert the popped item.
        if let Some((item, offset)) = popped {
            self.reinsert_circular(lane, item, offset);
        }

        // A saturated, static node at the head of the walk stays that way
        // until something external drains it; stop re-examining it.
        if throttled && head_progress.saturated {
            self.first_active[li] = start + 1;
        }
    }

    /// Lossless re-insertion for the circular breaker: the downstream
    /// neighbor's back slot first, the vacated front slot second, the first
    /// free slot anywhere on the lane last. A free slot must exist because
    /// exactly one item was removed before the walk.
    fn reinsert_circular(&mut self, lane: Lane, item: ItemTypeId, offset: u32) {
        let last = self.nodes.len() - 1;
        if self.nodes[last].lane_mut(lane).deliver(item) {
            return;
        }
        if self.nodes[0].lane_mut(lane).restore(0, item, offset) {
            return;
        }
        for node in &mut self.nodes {
            let seg = node.lane_mut(lane);
            if let Some(slot) = seg.first_free_slot() {
                let placed = seg.insert(slot, item);
                assert!(placed, "free slot rejected circular re-insertion");
                return;
            }
        }
        panic!("circular lane dropped an item during deadlock breaking");
    }

    /// Total items on one lane across all member nodes.
    pub fn lane_count(&self, lane: Lane) -> usize {
        self.nodes.iter().map(|n| n.lane(lane).count()).sum()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
