//! Detox puzzles: cognitive micro-challenges offered when a limit hits.
//!
//! Generation is pure and seedable; solving is tracked by
//! [`PuzzleSession`] (attempts, hints, score) and outcomes land in the
//! persisted [`PuzzleHistory`].

mod generator;
mod session;

pub use generator::PuzzleGenerator;
pub use session::{
    score, PuzzleHistory, PuzzleOutcome, PuzzleSession, PuzzleStats, Verdict, HISTORY_CAP,
    HISTORY_KEY,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleCategory {
    #[default]
    Math,
    Memory,
    Logic,
}

impl fmt::Display for PuzzleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PuzzleCategory::Math => "math",
            PuzzleCategory::Memory => "memory",
            PuzzleCategory::Logic => "logic",
        };
        f.write_str(s)
    }
}

impl FromStr for PuzzleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(PuzzleCategory::Math),
            "memory" => Ok(PuzzleCategory::Memory),
            "logic" => Ok(PuzzleCategory::Logic),
            other => Err(format!("unknown puzzle category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Score multiplier applied to the 1000-point base.
    pub fn multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.5,
            Difficulty::Hard => 2.0,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// What the solver must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Answer {
    Number { value: i64 },
    Word { value: String },
    Numbers { values: Vec<i64> },
    Words { values: Vec<String> },
}

/// A generated puzzle: what to show and what counts as correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub category: PuzzleCategory,
    pub difficulty: Difficulty,
    /// Question text shown to the solver.
    pub prompt: String,
    /// Content shown briefly and then hidden (memory puzzles).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Options to pick from, when the puzzle is multiple choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    pub solution: Answer,
    /// Category-appropriate hint, revealed on request at a score cost.
    pub hint: String,
}
