//! Incremental belt rebuilding: change-set flood fill, record dissolution,
//! and chain claiming.
//!
//! Belt records are never patched. When any node in a chain is placed,
//! removed, rotated, or re-linked, the whole chain's record is dissolved
//! (lane contents written back to the backing store) and a fresh record is
//! built from the current links. The pass runs single-threaded at the start
//! of each step, before any transport work, so the redirection table is
//! frozen during the parallel phase.
//!
//! Structural invariants (single ownership, chain consistency, circular
//! leaders carrying both links) are enforced with fatal assertions: a
//! violation is a logic defect, not a recoverable condition.

use crate::belt::BeltRecord;
use crate::direction::side_load_lane;
use crate::engine::{BeltSlot, Engine};
use crate::id::NodeId;
use std::collections::BTreeSet;

impl Engine {
    /// Rebuild every belt touched by the change-set. No-op when nothing
    /// changed since the last step.
    pub(crate) fn rebuild_topology(&mut self) {
        let changed = std::mem::take(&mut self.change_set);
        let mut stale = std::mem::take(&mut self.stale_belts);
        if changed.is_empty() && stale.is_empty() {
            return;
        }

        // Phase 1: flood from every changed node to the full extent of its
        // current chain. Walking `next` to the terminus (or around a loop)
        // then `prev` all the way back collects every member exactly once.
        let mut affected: BTreeSet<NodeId> = BTreeSet::new();
        for &id in &changed {
            if !self.nodes.contains_key(id) || affected.contains(&id) {
                continue;
            }
            let (terminus, circular) = self.forward_terminus(id);
            let mut walk = terminus;
            loop {
                if !affected.insert(walk) {
                    // Another changed id already flooded this chain.
                    break;
                }
                if let Some(slot) = self.redirect.get(walk) {
                    stale.insert(slot.belt);
                }
                match self.nodes[walk].prev {
                    Some(prev) if circular && prev == terminus => break,
                    Some(prev) => walk = prev,
                    None => break,
                }
            }
        }

        // Phase 2: dissolve stale records. Lane contents flow from the live
        // copy back into the backing store; links and facing were
        // authoritative in the store all along.
        for belt_id in stale {
            let Some(record) = self.belts.remove(belt_id) else {
                continue;
            };
            for copy in record.nodes {
                self.redirect.remove(copy.id);
                if let Some(store) = self.nodes.get_mut(copy.id) {
                    store.lanes = copy.lanes;
                    store.managed = false;
                }
            }
        }

        // Phase 3: claim chains. Straight leaders (no `next`) first; every
        // node left unclaimed afterward must sit on a circular loop.
        let mut claimed: BTreeSet<NodeId> = BTreeSet::new();
        let mut chains: Vec<(Vec<NodeId>, bool)> = Vec::new();
        for &id in &affected {
            if self.nodes[id].next.is_none() {
                let mut members = Vec::new();
                let mut walk = Some(id);
                while let Some(node) = walk {
                    assert!(claimed.insert(node), "node claimed by two belt chains");
                    members.push(node);
                    walk = self.nodes[node].prev;
                }
                chains.push((members, false));
            }
        }
        for &id in &affected {
            if claimed.contains(&id) {
                continue;
            }
            let node = &self.nodes[id];
            assert!(
                node.next.is_some() && node.prev.is_some(),
                "circular leader missing a link"
            );
            assert!(claimed.insert(id), "node claimed by two belt chains");
            let mut members = vec![id];
            let mut walk = node.prev;
            while let Some(step) = walk {
                if step == id {
                    break;
                }
                assert!(claimed.insert(step), "node claimed by two belt chains");
                members.push(step);
                walk = self.nodes[step].prev;
            }
            assert!(walk.is_some(), "circular chain terminated mid-loop");
            chains.push((members, true));
        }

        // Phase 4: build the fresh records and repoint the redirection
        // table. Side-injection is resolved from the leader's facing against
        // the target's facing; only perpendicular pairs qualify.
        for (members, circular) in chains {
            let leader = members[0];
            let copies = members
                .iter()
                .map(|&id| {
                    let mut copy = self.nodes[id].clone();
                    copy.managed = true;
                    copy
                })
                .collect();
            let mut record = BeltRecord::new(leader, copies, circular);
            if !circular {
                if let Some(target) = self.nodes[leader].side {
                    let leader_facing = self.nodes[leader].facing;
                    if let Some(t) = self.nodes.get(target) {
                        if let Some(lane) = side_load_lane(leader_facing, t.facing) {
                            record.side_target = Some(target);
                            record.side_lane = Some(lane);
                            record.side_slot = t.spec.slots / 2;
                        }
                    }
                }
            }
            let belt = self.belts.insert(record);
            for (offset, &id) in members.iter().enumerate() {
                self.redirect.insert(id, BeltSlot { belt, offset });
                self.nodes[id].managed = true;
            }
        }
    }

    /// Follow `next` links from `start` to the chain's terminus. Returns the
    /// terminus and whether the walk looped back to `start` (a circular
    /// chain; the terminus is then `start` itself).
    fn forward_terminus(&self, start: NodeId) -> (NodeId, bool) {
        let mut current = start;
        let mut hops = 0usize;
        loop {
            match self.nodes[current].next {
                Some(next) if next == start => return (start, true),
                Some(next) => {
                    assert!(
                        self.nodes.contains_key(next),
                        "next link points at a removed node"
                    );
                    current = next;
                }
                None => return (current, false),
            }
            hops += 1;
            assert!(hops <= self.nodes.len(), "forward walk failed to terminate");
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::{Direction, Lane};
    use crate::id::ItemTypeId;
    use crate::node::LaneSpec;

    fn item(n: u32) -> ItemTypeId {
        ItemTypeId(n)
    }

    fn place(engine: &mut Engine, facing: Direction) -> NodeId {
        engine.place_node(facing, LaneSpec::new(1, 10), 1)
    }

    fn belt_members(engine: &Engine, id: NodeId) -> Vec<NodeId> {
        let slot = engine.belt_of(id).unwrap();
        engine
            .belt(slot.belt)
            .unwrap()
            .nodes
            .iter()
            .map(|n| n.id)
            .collect()
    }

    #[test]
    fn chain_builds_front_first() {
        let mut engine = Engine::new();
        let a = place(&mut engine, Direction::North);
        let b = place(&mut engine, Direction::North);
        let c = place(&mut engine, Direction::North);
        engine.connect(a, b);
        engine.connect(b, c);
        engine.step();

        assert_eq!(engine.belt_count(), 1);
        assert_eq!(belt_members(&engine, a), vec![c, b, a]);
        assert_eq!(engine.belt_of(c).unwrap().offset, 0);
        assert_eq!(engine.belt_of(a).unwrap().offset, 2);
    }

    #[test]
    fn chain_consistency_holds_after_rebuild() {
        let mut engine = Engine::new();
        let ids: Vec<NodeId> = (0..5).map(|_| place(&mut engine, Direction::East)).collect();
        for pair in ids.windows(2) {
            engine.connect(pair[0], pair[1]);
        }
        engine.step();

        let slot = engine.belt_of(ids[0]).unwrap();
        let record = engine.belt(slot.belt).unwrap();
        for i in 1..record.nodes.len() {
            assert_eq!(record.nodes[i - 1].prev, Some(record.nodes[i].id));
            assert_eq!(record.nodes[i].next, Some(record.nodes[i - 1].id));
        }
    }

    #[test]
    fn connecting_two_belts_merges_them() {
        let mut engine = Engine::new();
        let a = place(&mut engine, Direction::North);
        let b = place(&mut engine, Direction::North);
        let c = place(&mut engine, Direction::North);
        let d = place(&mut engine, Direction::North);
        engine.connect(a, b);
        engine.connect(c, d);
        engine.step();
        assert_eq!(engine.belt_count(), 2);

        engine.connect(b, c);
        engine.step();
        assert_eq!(engine.belt_count(), 1);
        assert_eq!(belt_members(&engine, a), vec![d, c, b, a]);
    }

    #[test]
    fn disconnecting_splits_a_belt_in_two() {
        let mut engine = Engine::new();
        let ids: Vec<NodeId> = (0..4).map(|_| place(&mut engine, Direction::North)).collect();
        for pair in ids.windows(2) {
            engine.connect(pair[0], pair[1]);
        }
        engine.step();
        assert_eq!(engine.belt_count(), 1);

        engine.disconnect_next(ids[1]);
        engine.step();
        assert_eq!(engine.belt_count(), 2);
        assert_eq!(belt_members(&engine, ids[0]), vec![ids[1], ids[0]]);
        assert_eq!(belt_members(&engine, ids[3]), vec![ids[3], ids[2]]);
    }

    #[test]
    fn removal_rebuilds_the_survivors() {
        let mut engine = Engine::new();
        let a = place(&mut engine, Direction::North);
        let b = place(&mut engine, Direction::North);
        let c = place(&mut engine, Direction::North);
        engine.connect(a, b);
        engine.connect(b, c);
        engine.step();

        engine.remove_node(b);
        engine.step();
        assert_eq!(engine.belt_count(), 2);
        assert_eq!(belt_members(&engine, a), vec![a]);
        assert_eq!(belt_members(&engine, c), vec![c]);
        assert!(engine.node(b).is_none());
    }

    #[test]
    fn dissolution_preserves_lane_contents() {
        let mut engine = Engine::new();
        let a = place(&mut engine, Direction::North);
        let b = place(&mut engine, Direction::North);
        engine.connect(a, b);
        engine.step();
        assert!(engine.insert_left(a, 0, item(7)));

        // Extending the chain dissolves and rebuilds; the item must ride
        // through the rebuild.
        let c = place(&mut engine, Direction::North);
        engine.connect(b, c);
        engine.step();
        assert_eq!(engine.count_lane(a, Lane::Left), 1);
        assert_eq!(belt_members(&engine, a), vec![c, b, a]);
    }

    #[test]
    fn closing_a_loop_builds_a_circular_record() {
        let mut engine = Engine::new();
        let ids: Vec<NodeId> = (0..4).map(|_| place(&mut engine, Direction::North)).collect();
        for pair in ids.windows(2) {
            engine.connect(pair[0], pair[1]);
        }
        engine.step();
        assert!(!engine.belt(engine.belt_of(ids[0]).unwrap().belt).unwrap().circular);

        engine.connect(ids[3], ids[0]);
        engine.step();
        assert_eq!(engine.belt_count(), 1);
        let slot = engine.belt_of(ids[0]).unwrap();
        let record = engine.belt(slot.belt).unwrap();
        assert!(record.circular);
        assert_eq!(record.nodes.len(), 4);
    }

    #[test]
    fn breaking_a_loop_goes_back_to_straight() {
        let mut engine = Engine::new();
        let ids: Vec<NodeId> = (0..3).map(|_| place(&mut engine, Direction::North)).collect();
        engine.connect(ids[0], ids[1]);
        engine.connect(ids[1], ids[2]);
        engine.connect(ids[2], ids[0]);
        engine.step();
        assert!(engine.belt(engine.belt_of(ids[0]).unwrap().belt).unwrap().circular);

        engine.disconnect_next(ids[2]);
        engine.step();
        let record = engine.belt(engine.belt_of(ids[0]).unwrap().belt).unwrap();
        assert!(!record.circular);
        assert_eq!(record.nodes[0].id, ids[2], "terminus leads the rebuilt chain");
    }

    #[test]
    fn rotation_rebuilds_without_changing_membership() {
        let mut engine = Engine::new();
        let a = place(&mut engine, Direction::North);
        let b = place(&mut engine, Direction::North);
        engine.connect(a, b);
        engine.step();
        let before = engine.belt_of(a).unwrap();

        engine.rotate_node(a, Direction::East);
        engine.step();
        let after = engine.belt_of(a).unwrap();
        assert_ne!(before.belt, after.belt, "record is rebuilt, not patched");
        assert_eq!(belt_members(&engine, a), vec![b, a]);
        assert_eq!(engine.node(a).unwrap().facing, Direction::East);
    }

    #[test]
    fn perpendicular_side_link_resolves_lane_and_slot() {
        let mut engine = Engine::new();
        // Feeder runs east, target runs north: the feeder crosses the
        // target left-to-right.
        let feeder = place(&mut engine, Direction::East);
        let target = engine.place_node(Direction::North, LaneSpec::new(3, 10), 1);
        engine.set_side(feeder, target);
        engine.step();

        let record = engine.belt(engine.belt_of(feeder).unwrap().belt).unwrap();
        assert_eq!(record.side_target, Some(target));
        assert_eq!(record.side_lane, Some(Lane::Left));
        assert_eq!(record.side_slot, 1);
    }

    #[test]
    fn opposed_side_link_is_ignored() {
        let mut engine = Engine::new();
        let feeder = place(&mut engine, Direction::North);
        let target = place(&mut engine, Direction::South);
        engine.set_side(feeder, target);
        engine.step();

        let record = engine.belt(engine.belt_of(feeder).unwrap().belt).unwrap();
        assert_eq!(record.side_target, None);
        assert_eq!(record.side_lane, None);
    }

    #[test]
    fn rotating_a_side_target_requeues_the_feeder() {
        let mut engine = Engine::new();
        let feeder = place(&mut engine, Direction::East);
        let target = place(&mut engine, Direction::North);
        engine.set_side(feeder, target);
        engine.step();
        assert_eq!(
            engine.belt(engine.belt_of(feeder).unwrap().belt).unwrap().side_lane,
            Some(Lane::Left)
        );

        // Flip the target; the feeder now meets its other flank.
        engine.rotate_node(target, Direction::South);
        engine.step();
        assert_eq!(
            engine.belt(engine.belt_of(feeder).unwrap().belt).unwrap().side_lane,
            Some(Lane::Right)
        );
    }

    #[test]
    fn removing_a_side_target_clears_the_feeder_link() {
        let mut engine = Engine::new();
        let feeder = place(&mut engine, Direction::East);
        let target = place(&mut engine, Direction::North);
        engine.set_side(feeder, target);
        engine.step();

        engine.remove_node(target);
        engine.step();
        assert_eq!(engine.node(feeder).unwrap().side, None);
        let record = engine.belt(engine.belt_of(feeder).unwrap().belt).unwrap();
        assert_eq!(record.side_target, None);
    }

    #[test]
    fn no_ghost_belts_after_churn() {
        let mut engine = Engine::new();
        let ids: Vec<NodeId> = (0..6).map(|_| place(&mut engine, Direction::North)).collect();
        for pair in ids.windows(2) {
            engine.connect(pair[0], pair[1]);
        }
        engine.step();
        engine.remove_node(ids[2]);
        engine.remove_node(ids[4]);
        engine.step();

        // Every node is managed, every belt's members point back at it.
        let mut seen = 0;
        for belt_id in engine.belt_ids() {
            let record = engine.belt(belt_id).unwrap();
            for (offset, node) in record.nodes.iter().enumerate() {
                let slot = engine.belt_of(node.id).unwrap();
                assert_eq!(slot.belt, belt_id);
                assert_eq!(slot.offset, offset);
                seen += 1;
            }
        }
        assert_eq!(seen, engine.node_count());
    }
}
