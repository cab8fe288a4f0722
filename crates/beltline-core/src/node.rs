//! The placed belt entity: two lanes plus neighbor links.
//!
//! A node is pure data. Topology (which belt owns it, at what offset) lives
//! in the engine's redirection table; the node only records its link ids,
//! the way `NodeData` in a production graph records adjacency.

use crate::direction::{Direction, Lane};
use crate::id::NodeId;
use crate::segment::Segment;
use serde::{Deserialize, Serialize};

/// Slot count and step resolution shared by both lanes of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSpec {
    /// Slots per lane, `1..=3`.
    pub slots: usize,
    /// Discrete step positions per slot.
    pub steps: u32,
}

impl LaneSpec {
    pub fn new(slots: usize, steps: u32) -> Self {
        Self { slots, steps }
    }
}

/// One placed belt entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeltNode {
    /// The node's own key in the backing store. Carried in record copies so
    /// a copy can always name itself.
    pub id: NodeId,
    /// Direction items travel across this node.
    pub facing: Direction,
    pub spec: LaneSpec,

    /// The node feeding this one.
    pub prev: Option<NodeId>,
    /// The node this one feeds straight through.
    pub next: Option<NodeId>,
    /// A node this one side-injects into when lanes do not align.
    pub side: Option<NodeId>,

    /// Whether the node currently belongs to a belt record. Mirrors the
    /// redirection table; persisted so a load pass can re-queue managed
    /// nodes for rebuild.
    pub managed: bool,

    /// Energy drained per node per step when this node is the belt's bulk
    /// consumption representative.
    pub energy_cost: u32,
    /// Nodes powered through some other role are skipped when choosing the
    /// representative.
    pub externally_powered: bool,

    /// Left and right lanes, indexed by [`Lane::index`].
    pub lanes: [Segment; 2],
}

impl BeltNode {
    pub fn new(id: NodeId, facing: Direction, spec: LaneSpec, energy_cost: u32) -> Self {
        Self {
            id,
            facing,
            spec,
            prev: None,
            next: None,
            side: None,
            managed: false,
            energy_cost,
            externally_powered: false,
            lanes: [
                Segment::new(spec.slots, spec.steps),
                Segment::new(spec.slots, spec.steps),
            ],
        }
    }

    pub fn lane(&self, lane: Lane) -> &Segment {
        &self.lanes[lane.index()]
    }

    pub fn lane_mut(&mut self, lane: Lane) -> &mut Segment {
        &mut self.lanes[lane.index()]
    }
}
