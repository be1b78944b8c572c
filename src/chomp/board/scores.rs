use std::fmt::Write as _;

use crate::chomp::prelude::*;

/// The winner set under the three-key tiebreak.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standings {
    pub highest_score: u32,
    pub winners: Vec<usize>,
}

impl GameState {
    /// Resolves the winners: highest score, then fewest valid moves (the
    /// same territory in fewer steps ranks higher), then fewest invalid
    /// moves. Every player matching all three keys is a winner.
    pub fn standings(&self) -> Standings {
        let players = self.players();

        let highest_score = players.iter().map(|p| p.score).max().unwrap_or(0);
        let at_top = |p: &&PlayerRecord| p.score == highest_score;

        let fewest_valid = players
            .iter()
            .filter(at_top)
            .map(|p| p.valid_moves)
            .min()
            .unwrap_or(0);
        let fewest_invalid = players
            .iter()
            .filter(at_top)
            .filter(|p| p.valid_moves == fewest_valid)
            .map(|p| p.invalid_moves)
            .min()
            .unwrap_or(0);

        let winners = players
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.score == highest_score
                    && p.valid_moves == fewest_valid
                    && p.invalid_moves == fewest_invalid
            })
            .map(|(i, _)| i)
            .collect();

        Standings {
            highest_score,
            winners,
        }
    }

    /// The final winner block printed by the master.
    pub fn winner_block(&self) -> String {
        let standings = self.standings();
        let mut out = String::new();
        let _ = writeln!(out, "Game over! Highest score: {}", standings.highest_score);
        let _ = writeln!(out, "Winners:");
        for &i in &standings.winners {
            let p = &self.players[i];
            let _ = writeln!(
                out,
                "- {} (Score: {}, Valid Moves: {}, Invalid Moves: {})",
                p.name(),
                p.score,
                p.valid_moves,
                p.invalid_moves
            );
        }
        out
    }
}
