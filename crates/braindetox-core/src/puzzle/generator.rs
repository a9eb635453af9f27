//! Puzzle content generation.
//!
//! Generators are a pure function of RNG state: two generators built
//! with the same seed produce identical puzzles, which front-ends use
//! for shareable dailies and tests use for determinism.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::{Answer, Difficulty, Puzzle, PuzzleCategory};

pub struct PuzzleGenerator {
    rng: Pcg64,
}

impl PuzzleGenerator {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Pcg64::from_entropy(),
        }
    }

    /// Deterministic generator: the same seed yields the same puzzles.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self, category: PuzzleCategory, difficulty: Difficulty) -> Puzzle {
        match category {
            PuzzleCategory::Math => self.math(difficulty),
            PuzzleCategory::Memory => self.memory(difficulty),
            PuzzleCategory::Logic => self.logic(difficulty),
        }
    }

    // ── Math ─────────────────────────────────────────────────────────────

    fn math(&mut self, difficulty: Difficulty) -> Puzzle {
        let (mut a, mut b, op) = match difficulty {
            Difficulty::Easy => (
                self.rng.gen_range(1..=10),
                self.rng.gen_range(1..=10),
                self.pick(&['+', '-']),
            ),
            Difficulty::Medium => (
                self.rng.gen_range(5..=25),
                self.rng.gen_range(2..=15),
                self.pick(&['+', '-', '*']),
            ),
            Difficulty::Hard => {
                let op = self.pick(&['+', '-', '*', '/']);
                if op == '/' {
                    // Construct the dividend so the quotient is whole.
                    let divisor = self.rng.gen_range(2..=12);
                    let quotient = self.rng.gen_range(2..=8);
                    (divisor * quotient, divisor, op)
                } else {
                    (self.rng.gen_range(10..=50), self.rng.gen_range(2..=12), op)
                }
            }
        };
        // Subtraction never goes negative.
        if op == '-' && b > a {
            std::mem::swap(&mut a, &mut b);
        }
        let value: i64 = match op {
            '+' => a + b,
            '-' => a - b,
            '*' => a * b,
            _ => a / b,
        };
        let hint = match op {
            '+' => "Add the numbers one place at a time.",
            '-' => "Count down from the larger number.",
            '*' => "Break the multiplication into smaller products.",
            _ => "How many times does the divisor fit?",
        };
        Puzzle {
            category: PuzzleCategory::Math,
            difficulty,
            prompt: format!("What is {a} {op} {b}?"),
            display: None,
            choices: Vec::new(),
            solution: Answer::Number { value },
            hint: hint.to_string(),
        }
    }

    // ── Memory ───────────────────────────────────────────────────────────

    fn memory(&mut self, difficulty: Difficulty) -> Puzzle {
        if self.rng.gen_bool(0.5) {
            self.memory_digits(difficulty)
        } else {
            self.memory_words(difficulty)
        }
    }

    fn memory_digits(&mut self, difficulty: Difficulty) -> Puzzle {
        let (length, range) = match difficulty {
            Difficulty::Easy => (4, 1..=5),
            Difficulty::Medium => (6, 1..=9),
            Difficulty::Hard => (8, 0..=9),
        };
        let values: Vec<i64> = (0..length)
            .map(|_| self.rng.gen_range(range.clone()))
            .collect();
        let shown = values
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let hint = format!("It starts with {}.", values[0]);
        Puzzle {
            category: PuzzleCategory::Memory,
            difficulty,
            prompt: "Memorize the number sequence, then repeat it in order.".to_string(),
            display: Some(shown),
            choices: Vec::new(),
            solution: Answer::Numbers { values },
            hint,
        }
    }

    fn memory_words(&mut self, difficulty: Difficulty) -> Puzzle {
        let (count, pool): (usize, &[&str]) = match difficulty {
            Difficulty::Easy => (
                4,
                &["cat", "sun", "tree", "book", "fish", "moon", "door", "cake"],
            ),
            Difficulty::Medium => (
                5,
                &[
                    "river", "candle", "garden", "pillow", "window", "basket", "mirror", "ladder",
                    "bottle", "carpet",
                ],
            ),
            Difficulty::Hard => (
                6,
                &[
                    "lantern", "compass", "harvest", "whisper", "journey", "miracle", "thunder",
                    "velvet", "horizon", "satchel", "quarrel", "ember",
                ],
            ),
        };
        let values: Vec<String> = pool
            .choose_multiple(&mut self.rng, count)
            .map(|w| w.to_string())
            .collect();
        let shown = values.join(" ");
        let hint = format!("The first word is \"{}\".", values[0]);
        Puzzle {
            category: PuzzleCategory::Memory,
            difficulty,
            prompt: "Memorize the words, then repeat them in order.".to_string(),
            display: Some(shown),
            choices: Vec::new(),
            solution: Answer::Words { values },
            hint,
        }
    }

    // ── Logic ────────────────────────────────────────────────────────────

    fn logic(&mut self, difficulty: Difficulty) -> Puzzle {
        if self.rng.gen_bool(0.5) {
            self.letter_pattern(difficulty)
        } else {
            self.number_pattern(difficulty)
        }
    }

    fn letter_pattern(&mut self, difficulty: Difficulty) -> Puzzle {
        let (alphabet, shown_len): (&[&str], usize) = match difficulty {
            Difficulty::Easy => (&["A", "B", "C"], 4),
            Difficulty::Medium => (&["A", "B", "C", "D"], 6),
            Difficulty::Hard => (&["A", "B", "C", "D", "E"], 8),
        };
        let kind = self.rng.gen_range(0..3);
        let seq: Vec<&str> = match kind {
            // A B A B ...
            0 => {
                let mut pair = alphabet.choose_multiple(&mut self.rng, 2).copied();
                let (x, y) = (pair.next().unwrap_or("A"), pair.next().unwrap_or("B"));
                (0..=shown_len)
                    .map(|i| if i % 2 == 0 { x } else { y })
                    .collect()
            }
            // A A B A A B ...
            1 => {
                let mut pair = alphabet.choose_multiple(&mut self.rng, 2).copied();
                let (x, y) = (pair.next().unwrap_or("A"), pair.next().unwrap_or("B"));
                (0..=shown_len)
                    .map(|i| if i % 3 == 2 { y } else { x })
                    .collect()
            }
            // A B C D ... cycling through the alphabet
            _ => {
                let start = self.rng.gen_range(0..alphabet.len());
                (0..=shown_len)
                    .map(|i| alphabet[(start + i) % alphabet.len()])
                    .collect()
            }
        };
        let hint = match kind {
            0 => "Two letters take turns.",
            1 => "A short block repeats.",
            _ => "Each step moves one letter forward.",
        };
        let shown = seq[..shown_len].join(" ");
        let next = seq[shown_len];
        Puzzle {
            category: PuzzleCategory::Logic,
            difficulty,
            prompt: format!("Which letter comes next: {shown} ?"),
            display: None,
            choices: alphabet.iter().map(|s| s.to_string()).collect(),
            solution: Answer::Word {
                value: next.to_string(),
            },
            hint: hint.to_string(),
        }
    }

    fn number_pattern(&mut self, difficulty: Difficulty) -> Puzzle {
        let kind = match difficulty {
            Difficulty::Easy => 0,
            Difficulty::Medium => self.rng.gen_range(0..2),
            Difficulty::Hard => self.rng.gen_range(0..3),
        };
        let seq: Vec<i64> = match kind {
            // Arithmetic progression.
            0 => {
                let start = self.rng.gen_range(1..=10);
                let step = self.rng.gen_range(2..=5);
                (0..5).map(|i| start + step * i).collect()
            }
            // Geometric progression.
            1 => {
                let base = self.rng.gen_range(2..=4);
                let ratio = self.rng.gen_range(2..=3);
                let mut term = base;
                (0..5)
                    .map(|_| {
                        let current = term;
                        term *= ratio;
                        current
                    })
                    .collect()
            }
            // Fibonacci-style: each term is the sum of the previous two.
            _ => {
                let mut a = self.rng.gen_range(1..=3);
                let mut b = a + self.rng.gen_range(1..=2);
                let mut seq = vec![a, b];
                while seq.len() < 5 {
                    let next = a + b;
                    seq.push(next);
                    a = b;
                    b = next;
                }
                seq
            }
        };
        let hint = match kind {
            0 => "Look at the difference between neighbours.",
            1 => "Each term is multiplied by the same factor.",
            _ => "Each term is the sum of the previous two.",
        };
        let shown = seq[..4]
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Puzzle {
            category: PuzzleCategory::Logic,
            difficulty,
            prompt: format!("What number comes next: {shown}, ...?"),
            display: None,
            choices: Vec::new(),
            solution: Answer::Number { value: seq[4] },
            hint: hint.to_string(),
        }
    }

    fn pick(&mut self, ops: &[char]) -> char {
        ops.choose(&mut self.rng).copied().unwrap_or('+')
    }
}

impl Default for PuzzleGenerator {
    fn default() -> Self {
        Self::new()
    }
}
