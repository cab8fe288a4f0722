//! Beltline Core -- the conveyor transport engine for factory-building
//! games.
//!
//! This crate provides two-lane belt segments with sub-slot item offsets,
//! incrementally rebuilt belt records, a deterministic tick transport
//! engine with side-loading and circular-deadlock breaking, and a generic
//! round-robin activity scheduler.
//!
//! # Per-Step Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the world by one step
//! through three phases:
//!
//! 1. **Topology** -- Chains touched since the last step are flood-filled
//!    from the change-set, their records dissolved and rebuilt.
//! 2. **Transport** -- Belts without a side-load target advance in four
//!    parallel chunks (`parallel` feature); side-loading belts follow,
//!    strictly sequentially.
//! 3. **Bookkeeping** -- Bulk per-belt energy is charged against each
//!    belt's representative node and the tick counter advances.
//!
//! # Rebuild-Not-Patch Pattern
//!
//! Belt records are never edited in place. Placement, removal, rotation,
//! and re-linking only mark node ids in a change-set; the next step's
//! topology phase dissolves every touched record (writing lane contents
//! back to the node store) and builds fresh ones from the current links.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- World context, placement and item APIs, the
//!   step pipeline, and the deterministic state hash.
//! - [`belt::BeltRecord`] -- One straight chain or circular loop, owning
//!   front-first value copies of its member nodes.
//! - [`segment::Segment`] -- A single lane: 1-3 slots with offsets
//!   counting down toward the front.
//! - [`node::BeltNode`] -- A placed belt entity: two lanes plus `prev`,
//!   `next`, and `side` links.
//! - [`scheduler::ActiveSet`] -- Width-bucketed round-robin scheduler for
//!   entities that only need periodic attention.
//! - [`serialize`] -- Versioned snapshot support via bitcode.

pub mod belt;
pub mod direction;
pub mod engine;
pub mod id;
pub mod node;
pub mod scheduler;
pub mod segment;
pub mod serialize;
pub mod topology;
