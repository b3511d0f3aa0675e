use clap::Subcommand;
use focusbreak_core::error::Result;
use focusbreak_core::exercise::catalog::builtin_exercises;
use focusbreak_core::{ExerciseProvider, ShuffledCatalog};

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// List the built-in exercises
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pick exercises the way a session would
    Next {
        /// How many to pick
        #[arg(long, default_value = "1")]
        count: usize,
        /// Seed for a reproducible order
        #[arg(long)]
        seed: Option<u64>,
    },
}

pub fn run(action: ExerciseAction) -> Result<()> {
    match action {
        ExerciseAction::List { json } => {
            let exercises = builtin_exercises();
            if json {
                println!("{}", serde_json::to_string_pretty(&exercises)?);
            } else {
                for exercise in &exercises {
                    println!("{:>2}  {}", exercise.id, exercise.name);
                }
            }
        }
        ExerciseAction::Next { count, seed } => {
            let mut catalog = ShuffledCatalog::builtin();
            if let Some(seed) = seed {
                catalog = catalog.with_seed(seed);
            }
            for _ in 0..count {
                let Some(exercise) = catalog.next_exercise() else {
                    break;
                };
                println!("{} ({}s)", exercise.name, exercise.duration_secs);
                println!("  {}", exercise.instructions);
            }
        }
    }
    Ok(())
}
