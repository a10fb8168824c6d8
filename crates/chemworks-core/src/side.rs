//! Block faces and the side-to-tank mapping.

use serde::{Deserialize, Serialize};

/// One of the six faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Rotate clockwise about the vertical axis, seen from above.
    /// Vertical directions are unchanged.
    pub fn rotate_y(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            vertical => vertical,
        }
    }

    /// Rotate counter-clockwise about the vertical axis.
    pub fn rotate_y_ccw(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
            vertical => vertical,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Down | Direction::Up)
    }
}

/// The three tanks of an infuser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TankSlot {
    Left,
    Right,
    Center,
}

/// The face feeding the left input tank.
pub fn left_of(facing: Direction) -> Direction {
    facing.rotate_y()
}

/// The face feeding the right input tank.
pub fn right_of(facing: Direction) -> Direction {
    facing.rotate_y_ccw()
}

/// Which tank, if any, is exposed on `side` of a machine facing `facing`.
///
/// The facing side itself exposes the output tank. Top, bottom and back
/// expose nothing.
pub fn reservoir_for_side(facing: Direction, side: Direction) -> Option<TankSlot> {
    if side == left_of(facing) {
        Some(TankSlot::Left)
    } else if side == right_of(facing) {
        Some(TankSlot::Right)
    } else if side == facing {
        Some(TankSlot::Center)
    } else {
        None
    }
}
