//! Snapshot support: binary serialization via `bitcode` with a versioned
//! header.
//!
//! Only the backing node store is persisted. Belt records are derived
//! state: on restore, every node is queued into the change-set and the
//! first step's topology pass rebuilds every record from the persisted
//! links. This keeps the wire format independent of record layout and makes
//! a restored world bit-identical in behavior to the original.

use crate::engine::Engine;
use crate::id::NodeId;
use crate::node::BeltNode;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a beltline world snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xBE17_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("snapshot from version {0} (this build supports only {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot format
// ---------------------------------------------------------------------------

/// Header embedded in every snapshot. Checked before the payload is
/// trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version != FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// The persisted world: node store plus counters. Belt records, the
/// redirection table, and the reverse side index are all derived and
/// rebuilt on restore.
#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    nodes: SlotMap<NodeId, BeltNode>,
    energy_drained: u64,
}

impl Engine {
    /// Serialize the world to bytes. Lane contents of managed nodes are
    /// folded from the live belt copies into the persisted store.
    pub fn snapshot(&self) -> Result<Vec<u8>, SerializeError> {
        let mut nodes = self.nodes.clone();
        for (id, slot) in &self.redirect {
            let live = &self.belts[slot.belt].node(slot.offset).lanes;
            nodes[id].lanes = live.clone();
        }
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.tick()),
            nodes,
            energy_drained: self.energy_pending(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Rebuild a world from snapshot bytes. Every node is queued for the
    /// next step's topology pass; the first `step()` after a restore
    /// rebuilds all belt records before moving anything.
    pub fn restore(data: &[u8]) -> Result<Engine, DeserializeError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let mut engine = Engine::from_store(
            snapshot.nodes,
            snapshot.header.tick,
            snapshot.energy_drained,
        );
        let ids: Vec<NodeId> = engine.nodes.keys().collect();
        for id in ids {
            engine.nodes[id].managed = false;
            engine.side_sources.insert(id, Default::default());
            engine.change_set.insert(id);
        }
        // Rebuild the reverse side index from the persisted forward links.
        let links: Vec<(NodeId, NodeId)> = engine
            .nodes
            .iter()
            .filter_map(|(id, n)| n.side.map(|t| (id, t)))
            .collect();
        for (feeder, target) in links {
            engine.side_sources[target].insert(feeder);
        }
        Ok(engine)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
