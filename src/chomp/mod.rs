/*
 *  The ChompChamps game domain: shared state layout, move rules, scoring.
 */

pub(crate) mod board;
pub(crate) mod consts;
pub mod coords;
pub mod direction;

pub mod prelude {
    pub(crate) use crate::utils::prelude::*;

    pub use super::{
        board::{BoardSegment, GameState, MoveResult, PlayerRecord, Standings, captured_by, owner_of},
        consts::*,
        coords::{self, *},
        direction::Direction,
    };
}
