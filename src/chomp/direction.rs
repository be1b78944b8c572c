use crate::chomp::prelude::*;

/// The eight compass directions a player can move in, in wire order:
/// 0 is up, and successive values rotate clockwise.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
}

impl Direction {
    /// Decodes a wire octet. Only the values 0..=7 name a direction; anything
    /// above is an invalid move by contract.
    pub fn from_octet(octet: u8) -> Option<Direction> {
        match octet {
            0 => Some(Direction::Up),
            1 => Some(Direction::UpRight),
            2 => Some(Direction::Right),
            3 => Some(Direction::DownRight),
            4 => Some(Direction::Down),
            5 => Some(Direction::DownLeft),
            6 => Some(Direction::Left),
            7 => Some(Direction::UpLeft),
            _ => None,
        }
    }

    /// The octet this direction is written as on a player channel.
    pub fn octet(self) -> u8 {
        self as u8
    }

    /// The unit displacement of this direction. `y` grows downwards.
    pub fn offset(self) -> OffsetCoord {
        match self {
            Direction::Up => OffsetCoord::new(0, -1),
            Direction::UpRight => OffsetCoord::new(1, -1),
            Direction::Right => OffsetCoord::new(1, 0),
            Direction::DownRight => OffsetCoord::new(1, 1),
            Direction::Down => OffsetCoord::new(0, 1),
            Direction::DownLeft => OffsetCoord::new(-1, 1),
            Direction::Left => OffsetCoord::new(-1, 0),
            Direction::UpLeft => OffsetCoord::new(-1, -1),
        }
    }

    /// All directions in wire order.
    pub fn all() -> [Direction; 8] {
        [
            Direction::Up,
            Direction::UpRight,
            Direction::Right,
            Direction::DownRight,
            Direction::Down,
            Direction::DownLeft,
            Direction::Left,
            Direction::UpLeft,
        ]
    }
}
