//! Facing directions and the side-load decision table.
//!
//! Side-loading (one belt feeding another broadside instead of straight
//! through) picks a lane of the target belt purely from the two facing
//! directions involved. The mapping is kept as a flat decision table over
//! the eight valid perpendicular pairs: data, not a type hierarchy.

use serde::{Deserialize, Serialize};

/// One of the two lanes of a belt node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Right,
}

impl Lane {
    /// Index into a `[Segment; 2]` pair.
    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Right => 1,
        }
    }

    pub fn other(self) -> Lane {
        match self {
            Lane::Left => Lane::Right,
            Lane::Right => Lane::Left,
        }
    }
}

/// Cardinal facing of a belt node. Items travel in this direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn rotate_cw(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub fn rotate_ccw(self) -> Direction {
        self.rotate_cw().rotate_cw().rotate_cw()
    }

    pub fn opposite(self) -> Direction {
        self.rotate_cw().rotate_cw()
    }
}

/// Which lane of `target` a feeder facing `feeder` side-loads into.
///
/// A feeder approaching from the target's left injects into the target's
/// left lane; from the right, the right lane. Parallel and anti-parallel
/// pairs are not side-load geometry and yield `None`.
pub fn side_load_lane(feeder: Direction, target: Direction) -> Option<Lane> {
    if feeder == target.rotate_cw() {
        // Feeder crosses the target left-to-right.
        Some(Lane::Left)
    } else if feeder == target.rotate_ccw() {
        // Feeder crosses the target right-to-left.
        Some(Lane::Right)
    } else {
        None
    }
}

/// Resolve the (near, far) lane pair for a collaborator approaching a node
/// from `approach`. Perpendicular approaches put `near` on the approach
/// side; approaches along the belt axis default to (Right, Left).
pub fn approach_lanes(approach: Direction, facing: Direction) -> (Lane, Lane) {
    match side_load_lane(approach, facing) {
        Some(lane) => (lane, lane.other()),
        None => (Lane::Right, Lane::Left),
    }
}
