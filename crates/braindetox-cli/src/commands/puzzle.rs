use std::error::Error;
use std::io::{self, BufRead, Write};

use braindetox_core::puzzle::{
    Answer, Difficulty, Puzzle, PuzzleCategory, PuzzleGenerator, PuzzleSession, Verdict,
};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PuzzleAction {
    /// Generate and solve a puzzle interactively
    New {
        /// math, memory or logic (defaults to the configured category)
        #[arg(long)]
        category: Option<PuzzleCategory>,
        /// easy, medium or hard (defaults to the configured difficulty)
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Seed for a reproducible puzzle
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Solving statistics, as JSON
    Stats,
}

pub fn run(action: PuzzleAction) -> Result<(), Box<dyn Error>> {
    match action {
        PuzzleAction::New {
            category,
            difficulty,
            seed,
        } => solve(category, difficulty, seed),
        PuzzleAction::Stats => stats(),
    }
}

fn stats() -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    println!("{}", serde_json::to_string_pretty(&svc.puzzles().stats())?);
    Ok(())
}

fn solve(
    category: Option<PuzzleCategory>,
    difficulty: Option<Difficulty>,
    seed: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    let category = category.unwrap_or(svc.config().puzzles.default_category);
    let difficulty = difficulty.unwrap_or(svc.config().puzzles.default_difficulty);
    let mut generator = match seed {
        Some(seed) => PuzzleGenerator::seeded(seed),
        None => PuzzleGenerator::new(),
    };
    let puzzle = generator.generate(category, difficulty);

    println!("{category} puzzle ({difficulty})");
    if let Some(display) = &puzzle.display {
        println!("\n  {display}\n");
        print!("press Enter when memorized... ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        // Push the sequence out of view.
        print!("{}", "\n".repeat(40));
    }
    println!("{}", puzzle.prompt);
    if !puzzle.choices.is_empty() {
        println!("options: {}", puzzle.choices.join(" "));
    }
    println!("(type 'hint' for a hint, 'quit' to give up)");

    let mut session = PuzzleSession::new(puzzle);
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        let bytes = io::stdin().lock().read_line(&mut line)?;
        let input = line.trim();
        if bytes == 0 || input == "quit" {
            println!("the answer was: {}", describe(&session.puzzle().solution));
            svc.puzzles().append(&session.outcome(false, 0))?;
            return Ok(());
        }
        match input {
            "" => continue,
            "hint" => println!("hint: {}", session.hint()),
            _ => {
                let Some(answer) = parse_answer(session.puzzle(), input) else {
                    println!("could not read that as an answer, try again");
                    continue;
                };
                match session.submit(&answer) {
                    Verdict::Correct { score } => {
                        println!("correct! score: {score}");
                        svc.puzzles().append(&session.outcome(true, score))?;
                        return Ok(());
                    }
                    Verdict::Incorrect { attempts } => {
                        println!("not quite (attempt {attempts}), try again");
                    }
                }
            }
        }
    }
}

/// Read the input in the shape the solution expects.
fn parse_answer(puzzle: &Puzzle, input: &str) -> Option<Answer> {
    let tokens = || {
        input
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
    };
    match &puzzle.solution {
        Answer::Number { .. } => input.parse().ok().map(|value| Answer::Number { value }),
        Answer::Word { .. } => Some(Answer::Word {
            value: input.to_string(),
        }),
        Answer::Numbers { .. } => {
            let values: Option<Vec<i64>> = tokens().map(|t| t.parse().ok()).collect();
            values.map(|values| Answer::Numbers { values })
        }
        Answer::Words { .. } => Some(Answer::Words {
            values: tokens().map(str::to_string).collect(),
        }),
    }
}

fn describe(answer: &Answer) -> String {
    match answer {
        Answer::Number { value } => value.to_string(),
        Answer::Word { value } => value.clone(),
        Answer::Numbers { values } => values
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(" "),
        Answer::Words { values } => values.join(" "),
    }
}
