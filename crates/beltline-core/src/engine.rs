//! The world context: owns every belt node, the rebuilt belt records, and
//! the per-step transport pipeline.
//!
//! # Step pipeline
//!
//! Each [`Engine::step`] runs three phases:
//!
//! 1. **Topology** -- if the change-set is non-empty, flood-fill the touched
//!    chains and replace their belt records (single-threaded; see
//!    [`crate::topology`]).
//! 2. **Transport** -- belts with no side-injection target are advanced in
//!    four contiguous chunks on scoped workers (`parallel` feature; a plain
//!    loop otherwise), then side-loading belts run strictly sequentially
//!    because several of them may share one target belt.
//! 3. **Energy + bookkeeping** -- one bulk drain per belt against its cached
//!    representative, then the tick counter advances.
//!
//! # Storage
//!
//! Nodes live in a `SlotMap` backing store keyed by [`NodeId`]. Managed
//! nodes additionally have a live copy inside their owning [`BeltRecord`];
//! the `redirect` `SecondaryMap` maps id to `(belt, offset)` and is the one
//! structure that must stay consistent across rebuilds. It is rebuilt only
//! during the single-threaded topology phase, so the parallel transport
//! phase may read it freely.

use crate::belt::BeltRecord;
use crate::direction::{Direction, Lane, approach_lanes};
use crate::id::{BeltId, ItemTypeId, NodeId};
use crate::node::{BeltNode, LaneSpec};
use slotmap::{Key, SecondaryMap, SlotMap};
use std::collections::BTreeSet;

/// Workers the no-side-load belt partition is split across.
pub const TRANSPORT_WORKERS: usize = 4;

/// Where a managed node's live copy sits: which belt, at which offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeltSlot {
    pub belt: BeltId,
    pub offset: usize,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A deterministic FNV-1a hash of simulation state for desync detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The transport simulation world.
#[derive(Debug)]
pub struct Engine {
    /// Backing store: one record per placed node. Links and facing are
    /// authoritative here; lane contents of managed nodes live in the belt
    /// copy until the record is dissolved.
    pub(crate) nodes: SlotMap<NodeId, BeltNode>,

    /// Live belt records, wholly rebuilt on membership change.
    pub(crate) belts: SlotMap<BeltId, BeltRecord>,

    /// id -> (belt, offset) for every managed node.
    pub(crate) redirect: SecondaryMap<NodeId, BeltSlot>,

    /// Node ids touched since the last rebuild. Drained fully each rebuild.
    pub(crate) change_set: BTreeSet<NodeId>,

    /// Belts invalidated by node removal, dissolved on the next rebuild.
    pub(crate) stale_belts: BTreeSet<BeltId>,

    /// Reverse side links: for a node T, every node whose `side` is T.
    /// Rotating or removing T must re-queue those feeders.
    pub(crate) side_sources: SecondaryMap<NodeId, BTreeSet<NodeId>>,

    tick: u64,
    energy_drained: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            belts: SlotMap::with_key(),
            redirect: SecondaryMap::new(),
            change_set: BTreeSet::new(),
            stale_belts: BTreeSet::new(),
            side_sources: SecondaryMap::new(),
            tick: 0,
            energy_drained: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn belt_count(&self) -> usize {
        self.belts.len()
    }

    /// Energy drained by all belts since the last take.
    pub fn take_energy_drained(&mut self) -> u64 {
        std::mem::take(&mut self.energy_drained)
    }

    /// Untaken drained energy, preserved across snapshots.
    pub(crate) fn energy_pending(&self) -> u64 {
        self.energy_drained
    }

    /// Build an engine around a restored node store. The caller re-queues
    /// every node so the first step rebuilds all belt records.
    pub(crate) fn from_store(nodes: SlotMap<NodeId, BeltNode>, tick: u64, energy_drained: u64) -> Self {
        Self {
            nodes,
            belts: SlotMap::with_key(),
            redirect: SecondaryMap::new(),
            change_set: BTreeSet::new(),
            stale_belts: BTreeSet::new(),
            side_sources: SecondaryMap::new(),
            tick,
            energy_drained,
        }
    }

    // -----------------------------------------------------------------------
    // Placement surface (driven by the external spatial system)
    // -----------------------------------------------------------------------

    /// Place a new, unlinked node. It stays unmanaged until the next step's
    /// rebuild folds it into a (possibly single-node) belt.
    pub fn place_node(&mut self, facing: Direction, spec: LaneSpec, energy_cost: u32) -> NodeId {
        let id = self
            .nodes
            .insert_with_key(|id| BeltNode::new(id, facing, spec, energy_cost));
        self.side_sources.insert(id, BTreeSet::new());
        self.change_set.insert(id);
        id
    }

    /// Remove a node: unlink every neighbor reference to it, stale its
    /// belt, and queue the survivors for rebuild.
    pub fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        if let Some(slot) = self.redirect.remove(id) {
            self.stale_belts.insert(slot.belt);
        }
        if let Some(prev) = node.prev {
            self.nodes[prev].next = None;
            self.change_set.insert(prev);
        }
        if let Some(next) = node.next {
            self.nodes[next].prev = None;
            self.change_set.insert(next);
        }
        if let Some(side) = node.side {
            if self.nodes.contains_key(side) {
                self.side_sources[side].remove(&id);
            }
        }
        // Belts that were side-loading into the dead node lose their target.
        if let Some(feeders) = self.side_sources.remove(id) {
            for feeder in feeders {
                self.nodes[feeder].side = None;
                self.change_set.insert(feeder);
            }
        }
        self.change_set.remove(&id);
    }

    /// Rotate a node in place. Its own chain and every belt side-loading
    /// into it are re-queued (the side-load lane depends on this facing).
    pub fn rotate_node(&mut self, id: NodeId, facing: Direction) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.facing == facing {
            return;
        }
        node.facing = facing;
        self.change_set.insert(id);
        for &feeder in &self.side_sources[id] {
            self.change_set.insert(feeder);
        }
    }

    /// Link `a` straight into `b` (`a.next = b`, `b.prev = a`), displacing
    /// any previous links on either end.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        assert!(a != b, "a node cannot feed straight into itself");
        if self.nodes[a].next == Some(b) {
            return;
        }
        if let Some(old) = self.nodes[a].next {
            self.nodes[old].prev = None;
            self.change_set.insert(old);
        }
        if let Some(old) = self.nodes[b].prev {
            self.nodes[old].next = None;
            self.change_set.insert(old);
        }
        self.nodes[a].next = Some(b);
        self.nodes[b].prev = Some(a);
        self.change_set.insert(a);
        self.change_set.insert(b);
    }

    /// Break the straight link out of `a`, if any.
    pub fn disconnect_next(&mut self, a: NodeId) {
        if let Some(b) = self.nodes[a].next.take() {
            self.nodes[b].prev = None;
            self.change_set.insert(a);
            self.change_set.insert(b);
        }
    }

    /// Point `a`'s side injection at `target`.
    pub fn set_side(&mut self, a: NodeId, target: NodeId) {
        assert!(a != target, "a node cannot side-load into itself");
        if let Some(old) = self.nodes[a].side {
            self.side_sources[old].remove(&a);
        }
        self.nodes[a].side = Some(target);
        self.side_sources[target].insert(a);
        self.change_set.insert(a);
    }

    /// Clear `a`'s side injection.
    pub fn clear_side(&mut self, a: NodeId) {
        if let Some(old) = self.nodes[a].side.take() {
            self.side_sources[old].remove(&a);
            self.change_set.insert(a);
        }
    }

    // -----------------------------------------------------------------------
    // Live-copy resolution
    // -----------------------------------------------------------------------

    /// Read-only view of a node's live state (belt copy when managed,
    /// backing store otherwise).
    pub fn node(&self, id: NodeId) -> Option<&BeltNode> {
        match self.redirect.get(id) {
            Some(slot) => self.belts.get(slot.belt).map(|b| b.node(slot.offset)),
            None => self.nodes.get(id),
        }
    }

    pub fn is_managed(&self, id: NodeId) -> bool {
        self.redirect.contains_key(id)
    }

    /// Where a managed node currently sits.
    pub fn belt_of(&self, id: NodeId) -> Option<BeltSlot> {
        self.redirect.get(id).copied()
    }

    pub fn belt(&self, id: BeltId) -> Option<&BeltRecord> {
        self.belts.get(id)
    }

    pub fn belt_ids(&self) -> Vec<BeltId> {
        self.belts.keys().collect()
    }

    /// Mutable live view, waking the owning belt: an external mutation may
    /// un-stick a lane the first-active marker had skipped.
    fn live_node_mut(&mut self, id: NodeId) -> Option<&mut BeltNode> {
        match self.redirect.get(id).copied() {
            Some(slot) => {
                let belt = self.belts.get_mut(slot.belt)?;
                belt.wake();
                Some(belt.node_mut(slot.offset))
            }
            None => self.nodes.get_mut(id),
        }
    }

    // -----------------------------------------------------------------------
    // Item surface (arms, loaders, balancers)
    // -----------------------------------------------------------------------

    /// Insert into a specific slot of one lane. Boolean result, never an
    /// error: a full slot is normal operation.
    pub fn insert_lane(&mut self, id: NodeId, lane: Lane, slot: usize, item: ItemTypeId) -> bool {
        self.live_node_mut(id)
            .is_some_and(|n| n.lane_mut(lane).insert(slot, item))
    }

    /// Insert at the back of one lane.
    pub fn deliver_lane(&mut self, id: NodeId, lane: Lane, item: ItemTypeId) -> bool {
        self.live_node_mut(id)
            .is_some_and(|n| n.lane_mut(lane).deliver(item))
    }

    pub fn remove_lane(&mut self, id: NodeId, lane: Lane, item: ItemTypeId) -> bool {
        self.live_node_mut(id)
            .is_some_and(|n| n.lane_mut(lane).remove(item))
    }

    pub fn remove_back_lane(&mut self, id: NodeId, lane: Lane, item: ItemTypeId) -> bool {
        self.live_node_mut(id)
            .is_some_and(|n| n.lane_mut(lane).remove_back(item))
    }

    pub fn remove_any_lane(&mut self, id: NodeId, lane: Lane) -> Option<ItemTypeId> {
        self.live_node_mut(id)
            .and_then(|n| n.lane_mut(lane).remove_any())
    }

    pub fn remove_any_back_lane(&mut self, id: NodeId, lane: Lane) -> Option<ItemTypeId> {
        self.live_node_mut(id)
            .and_then(|n| n.lane_mut(lane).remove_any_back())
    }

    pub fn offload_lane(&mut self, id: NodeId, lane: Lane, item: ItemTypeId) -> bool {
        self.live_node_mut(id)
            .is_some_and(|n| n.lane_mut(lane).offload(item))
    }

    pub fn offloading_lane(&self, id: NodeId, lane: Lane) -> Option<ItemTypeId> {
        self.node(id).and_then(|n| n.lane(lane).offloading())
    }

    pub fn count_lane(&self, id: NodeId, lane: Lane) -> usize {
        self.node(id).map_or(0, |n| n.lane(lane).count())
    }

    pub fn count_back_lane(&self, id: NodeId, lane: Lane) -> usize {
        self.node(id).map_or(0, |n| n.lane(lane).count_back())
    }

    pub fn count_front_lane(&self, id: NodeId, lane: Lane) -> usize {
        self.node(id).map_or(0, |n| n.lane(lane).count_front())
    }

    // Left/right convenience wrappers, the surface arm/loader code calls.

    pub fn insert_left(&mut self, id: NodeId, slot: usize, item: ItemTypeId) -> bool {
        self.insert_lane(id, Lane::Left, slot, item)
    }

    pub fn insert_right(&mut self, id: NodeId, slot: usize, item: ItemTypeId) -> bool {
        self.insert_lane(id, Lane::Right, slot, item)
    }

    pub fn deliver_left(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.deliver_lane(id, Lane::Left, item)
    }

    pub fn deliver_right(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.deliver_lane(id, Lane::Right, item)
    }

    pub fn remove_left(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.remove_lane(id, Lane::Left, item)
    }

    pub fn remove_right(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.remove_lane(id, Lane::Right, item)
    }

    pub fn remove_any_left(&mut self, id: NodeId) -> Option<ItemTypeId> {
        self.remove_any_lane(id, Lane::Left)
    }

    pub fn remove_any_right(&mut self, id: NodeId) -> Option<ItemTypeId> {
        self.remove_any_lane(id, Lane::Right)
    }

    pub fn remove_back_left(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.remove_back_lane(id, Lane::Left, item)
    }

    pub fn remove_back_right(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.remove_back_lane(id, Lane::Right, item)
    }

    pub fn offload_left(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.offload_lane(id, Lane::Left, item)
    }

    pub fn offload_right(&mut self, id: NodeId, item: ItemTypeId) -> bool {
        self.offload_lane(id, Lane::Right, item)
    }

    pub fn offloading_left(&self, id: NodeId) -> Option<ItemTypeId> {
        self.offloading_lane(id, Lane::Left)
    }

    pub fn offloading_right(&self, id: NodeId) -> Option<ItemTypeId> {
        self.offloading_lane(id, Lane::Right)
    }

    pub fn count_left(&self, id: NodeId) -> usize {
        self.count_lane(id, Lane::Left)
    }

    pub fn count_right(&self, id: NodeId) -> usize {
        self.count_lane(id, Lane::Right)
    }

    // Approach-relative wrappers: `near`/`far` resolve against the caller's
    // travel direction, so an arm reaching over a belt does not need to know
    // the belt's facing.

    pub fn insert_near(
        &mut self,
        id: NodeId,
        approach: Direction,
        slot: usize,
        item: ItemTypeId,
    ) -> bool {
        let Some(facing) = self.node(id).map(|n| n.facing) else {
            return false;
        };
        let (near, _) = approach_lanes(approach, facing);
        self.insert_lane(id, near, slot, item)
    }

    pub fn insert_far(
        &mut self,
        id: NodeId,
        approach: Direction,
        slot: usize,
        item: ItemTypeId,
    ) -> bool {
        let Some(facing) = self.node(id).map(|n| n.facing) else {
            return false;
        };
        let (_, far) = approach_lanes(approach, facing);
        self.insert_lane(id, far, slot, item)
    }

    pub fn remove_near(&mut self, id: NodeId, approach: Direction, item: ItemTypeId) -> bool {
        let Some(facing) = self.node(id).map(|n| n.facing) else {
            return false;
        };
        let (near, _) = approach_lanes(approach, facing);
        self.remove_lane(id, near, item)
    }

    pub fn remove_far(&mut self, id: NodeId, approach: Direction, item: ItemTypeId) -> bool {
        let Some(facing) = self.node(id).map(|n| n.facing) else {
            return false;
        };
        let (_, far) = approach_lanes(approach, facing);
        self.remove_lane(id, far, item)
    }

    // -----------------------------------------------------------------------
    // Step pipeline
    // -----------------------------------------------------------------------

    /// Advance the simulation by one step.
    pub fn step(&mut self) {
        self.rebuild_topology();
        let parity = self.tick;
        self.step_isolated_belts(parity);
        self.step_side_belts(parity);
        self.energy_drained += self.belts.values().map(|b| b.energy_use()).sum::<u64>();
        self.tick += 1;
    }

    /// Belts with no side-injection target never touch another record, so
    /// they are split into contiguous chunks and advanced on scoped
    /// workers. The scope join is the completion barrier.
    #[cfg(feature = "parallel")]
    fn step_isolated_belts(&mut self, parity: u64) {
        let mut solo: Vec<&mut BeltRecord> = self
            .belts
            .values_mut()
            .filter(|b| b.side_target.is_none())
            .collect();
        if solo.is_empty() {
            return;
        }
        let chunk = solo.len().div_ceil(TRANSPORT_WORKERS);
        rayon::scope(|scope| {
            for part in solo.chunks_mut(chunk) {
                scope.spawn(move |_| {
                    for belt in part.iter_mut() {
                        belt.step_isolated(parity);
                    }
                });
            }
        });
    }

    #[cfg(not(feature = "parallel"))]
    fn step_isolated_belts(&mut self, parity: u64) {
        for belt in self.belts.values_mut().filter(|b| b.side_target.is_none()) {
            belt.step_isolated(parity);
        }
    }

    /// Side-loading belts run strictly sequentially: several belts may
    /// share one target, so they must not race for its slots. Ordered by
    /// leader id, not map order, so contention resolves identically in any
    /// world with the same nodes; map order depends on churn history and
    /// would break state-hash lockstep across a snapshot round trip.
    fn step_side_belts(&mut self, parity: u64) {
        let mut feeders: Vec<(NodeId, BeltId)> = self
            .belts
            .iter()
            .filter(|(_, b)| b.side_target.is_some())
            .map(|(k, b)| (b.leader, k))
            .collect();
        feeders.sort_unstable();
        for (_, belt_id) in feeders {
            let record = &self.belts[belt_id];
            let target = record.side_target.expect("feeder partition");
            let lane = record.side_lane.expect("side lane resolved at rebuild");
            let slot = self.redirect[target];
            if slot.belt == belt_id {
                // A chain side-loading into its own member; walk without the
                // side gate rather than alias the record.
                self.belts[belt_id].step_isolated(parity);
                continue;
            }
            let [src, dst] = self
                .belts
                .get_disjoint_mut([belt_id, slot.belt])
                .expect("feeder and target are distinct live belts");
            let segment = dst.node_mut(slot.offset).lane_mut(lane);
            src.step_side(parity, segment);
            // The target may have received items behind its first-active
            // marker.
            dst.wake();
        }
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// Deterministic hash of live simulation state, for desync detection.
    pub fn state_hash(&self) -> u64 {
        let mut hash = StateHash::new();
        hash.write_u64(self.tick);
        hash.write_u64(self.nodes.len() as u64);
        for id in self.nodes.keys() {
            let node = self.node(id).expect("backing store key");
            hash.write_u64(id.data().as_ffi());
            hash.write_u64(link_bits(node.prev));
            hash.write_u64(link_bits(node.next));
            hash.write_u64(link_bits(node.side));
            hash.write_u32(node.facing as u32);
            for lane in [Lane::Left, Lane::Right] {
                let segment = node.lane(lane);
                for k in 0..segment.slot_count() {
                    let slot = segment.slot(k);
                    hash.write_u32(slot.item.map_or(u32::MAX, |i| i.0));
                    hash.write_u32(slot.offset);
                }
            }
        }
        hash.finish()
    }
}

fn link_bits(link: Option<NodeId>) -> u64 {
    link.map_or(0, |id| id.data().as_ffi())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32) -> ItemTypeId {
        ItemTypeId(n)
    }

    fn spec() -> LaneSpec {
        LaneSpec::new(1, 10)
    }

    fn place(engine: &mut Engine) -> NodeId {
        engine.place_node(Direction::North, spec(), 1)
    }

    #[test]
    fn placed_node_is_unmanaged_until_step() {
        let mut engine = Engine::new();
        let a = place(&mut engine);
        assert!(!engine.is_managed(a));
        engine.step();
        assert!(engine.is_managed(a));
        assert_eq!(engine.belt_count(), 1);
    }

    #[test]
    fn insert_then_remove_round_trip() {
        let mut engine = Engine::new();
        let a = place(&mut engine);
        engine.step();
        assert!(engine.insert_left(a, 0, item(1)));
        assert!(engine.remove_left(a, item(1)));
        assert_eq!(engine.count_lane(a, Lane::Left), 0);
    }

    #[test]
    fn item_api_resolves_through_redirection() {
        let mut engine = Engine::new();
        let a = place(&mut engine);
        let b = place(&mut engine);
        engine.connect(a, b);
        engine.step();
        // Both nodes are belt copies now; the API must land on them.
        assert!(engine.deliver_left(a, item(3)));
        assert_eq!(engine.count_lane(a, Lane::Left), 1);
        assert_eq!(engine.count_lane(b, Lane::Left), 0);
    }

    #[test]
    fn external_insert_wakes_a_throttled_belt() {
        let mut engine = Engine::new();
        let a = place(&mut engine);
        let b = place(&mut engine);
        engine.connect(a, b);
        engine.step();
        // Saturate the leader so the first-active marker advances.
        assert!(engine.insert_left(b, 0, item(1)));
        for _ in 0..40 {
            engine.step();
        }
        let slot = engine.belt_of(b).unwrap();
        assert!(engine.belt(slot.belt).unwrap().first_active[0] > 0);
        // The insert resets the marker so the new item gets processed.
        assert!(engine.deliver_left(a, item(2)));
        let slot = engine.belt_of(a).unwrap();
        assert_eq!(engine.belt(slot.belt).unwrap().first_active, [0, 0]);
    }

    #[test]
    fn near_far_resolution_follows_approach() {
        let mut engine = Engine::new();
        let a = place(&mut engine); // facing north
        engine.step();
        // Heading east = approaching from the belt's left side.
        assert!(engine.insert_near(a, Direction::East, 0, item(1)));
        assert_eq!(engine.count_lane(a, Lane::Left), 1);
        assert!(engine.insert_far(a, Direction::East, 0, item(2)));
        assert_eq!(engine.count_lane(a, Lane::Right), 1);
        assert!(engine.remove_near(a, Direction::East, item(1)));
        assert!(engine.remove_far(a, Direction::East, item(2)));
    }

    #[test]
    fn operations_on_missing_nodes_fail_quietly() {
        let mut engine = Engine::new();
        let a = place(&mut engine);
        engine.step();
        engine.remove_node(a);
        assert!(!engine.insert_left(a, 0, item(1)));
        assert!(!engine.remove_left(a, item(1)));
        assert_eq!(engine.remove_any_left(a), None);
        assert_eq!(engine.count_lane(a, Lane::Left), 0);
    }

    #[test]
    fn energy_is_charged_per_belt_per_step() {
        let mut engine = Engine::new();
        let a = place(&mut engine);
        let b = place(&mut engine);
        engine.connect(a, b);
        engine.step(); // rebuild + first charge: one belt of two nodes
        assert_eq!(engine.take_energy_drained(), 2);
        engine.step();
        engine.step();
        assert_eq!(engine.take_energy_drained(), 4);
    }

    #[test]
    fn state_hash_is_deterministic_and_sensitive() {
        let build = || {
            let mut engine = Engine::new();
            let a = engine.place_node(Direction::East, spec(), 1);
            let b = engine.place_node(Direction::East, spec(), 1);
            engine.connect(a, b);
            engine.step();
            (engine, a)
        };
        let (engine_one, a1) = build();
        let (mut engine_two, a2) = build();
        assert_eq!(engine_one.state_hash(), engine_two.state_hash());
        assert!(engine_two.deliver_left(a2, item(1)));
        assert_ne!(engine_one.state_hash(), engine_two.state_hash());
        let _ = a1;
    }
}
