//! Puzzle solving: attempt tracking, scoring and persisted history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::error::StorageError;
use crate::storage::KvStore;

use super::{Answer, Difficulty, Puzzle, PuzzleCategory};

/// Storage key holding the outcome history.
pub const HISTORY_KEY: &str = "puzzles";

/// Only the most recent outcomes are kept.
pub const HISTORY_CAP: usize = 100;

/// Verdict for one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Correct { score: u32 },
    Incorrect { attempts: u32 },
}

/// A finished (or abandoned) puzzle as kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleOutcome {
    pub category: PuzzleCategory,
    pub difficulty: Difficulty,
    pub solved: bool,
    pub score: u32,
    pub attempts: u32,
    pub hints_used: u32,
    pub time_secs: u64,
    pub at: DateTime<Utc>,
}

/// One interactive solve: the puzzle plus attempt and hint counters.
pub struct PuzzleSession {
    puzzle: Puzzle,
    attempts: u32,
    hints_used: u32,
    started_at: Instant,
}

impl PuzzleSession {
    pub fn new(puzzle: Puzzle) -> Self {
        Self {
            puzzle,
            attempts: 0,
            hints_used: 0,
            started_at: Instant::now(),
        }
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    /// Reveal the hint, counting it against the score.
    pub fn hint(&mut self) -> &str {
        self.hints_used += 1;
        &self.puzzle.hint
    }

    /// Judge an answer. Every submission counts as an attempt.
    pub fn submit(&mut self, answer: &Answer) -> Verdict {
        self.attempts += 1;
        if answers_match(&self.puzzle.solution, answer) {
            Verdict::Correct {
                score: score(
                    self.puzzle.difficulty,
                    self.started_at.elapsed().as_secs(),
                    self.attempts,
                    self.hints_used,
                ),
            }
        } else {
            Verdict::Incorrect {
                attempts: self.attempts,
            }
        }
    }

    /// Snapshot an outcome for history. `score` comes from the winning
    /// verdict; abandoned puzzles record zero.
    pub fn outcome(&self, solved: bool, score: u32) -> PuzzleOutcome {
        PuzzleOutcome {
            category: self.puzzle.category,
            difficulty: self.puzzle.difficulty,
            solved,
            score,
            attempts: self.attempts,
            hints_used: self.hints_used,
            time_secs: self.started_at.elapsed().as_secs(),
            at: Utc::now(),
        }
    }
}

/// Score formula: 1000 points scaled by difficulty, minus 2 per second
/// past the first 30, 100 per extra attempt and 50 per hint. Solving
/// always pays at least 10.
pub fn score(difficulty: Difficulty, time_secs: u64, attempts: u32, hints_used: u32) -> u32 {
    let base = (1000.0 * difficulty.multiplier()) as i64;
    let time_penalty = 2 * time_secs.saturating_sub(30) as i64;
    let attempt_penalty = 100 * i64::from(attempts.saturating_sub(1));
    let hint_penalty = 50 * i64::from(hints_used);
    (base - time_penalty - attempt_penalty - hint_penalty).max(10) as u32
}

fn answers_match(expected: &Answer, given: &Answer) -> bool {
    match (expected, given) {
        (Answer::Number { value: a }, Answer::Number { value: b }) => a == b,
        (Answer::Numbers { values: a }, Answer::Numbers { values: b }) => a == b,
        (Answer::Word { value: a }, Answer::Word { value: b }) => normalize(a) == normalize(b),
        (Answer::Words { values: a }, Answer::Words { values: b }) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| normalize(x) == normalize(y))
        }
        _ => false,
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Aggregate view over the outcome history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleStats {
    pub total: u32,
    pub solved: u32,
    pub average_score: f64,
    pub best_score: u32,
    pub by_category: HashMap<PuzzleCategory, u32>,
}

/// Persisted outcome history, capped at [`HISTORY_CAP`] entries.
pub struct PuzzleHistory {
    store: Arc<dyn KvStore>,
}

impl PuzzleHistory {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Append an outcome, dropping the oldest entries past the cap.
    ///
    /// # Errors
    ///
    /// Returns an error when the history cannot be written back.
    pub fn append(&self, outcome: &PuzzleOutcome) -> Result<(), StorageError> {
        let mut all = self.all();
        all.push(outcome.clone());
        if all.len() > HISTORY_CAP {
            let excess = all.len() - HISTORY_CAP;
            all.drain(..excess);
        }
        self.store.set(HISTORY_KEY, &serde_json::to_value(&all)?)?;
        Ok(())
    }

    /// Outcomes oldest-first. Missing or unreadable history reads as empty.
    pub fn all(&self) -> Vec<PuzzleOutcome> {
        match self.store.get(HISTORY_KEY) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(error = %e, "puzzle history is corrupt, treating as empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read puzzle history");
                Vec::new()
            }
        }
    }

    pub fn stats(&self) -> PuzzleStats {
        let all = self.all();
        let mut stats = PuzzleStats {
            total: all.len() as u32,
            ..PuzzleStats::default()
        };
        let mut score_sum: u64 = 0;
        for outcome in &all {
            *stats.by_category.entry(outcome.category).or_insert(0) += 1;
            if outcome.solved {
                stats.solved += 1;
                score_sum += u64::from(outcome.score);
                stats.best_score = stats.best_score.max(outcome.score);
            }
        }
        if stats.solved > 0 {
            stats.average_score = score_sum as f64 / f64::from(stats.solved);
        }
        stats
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(HISTORY_KEY)
    }
}
