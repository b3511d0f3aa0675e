//! Exercise gate.
//!
//! When a work session ends the timer does not roll into the break by
//! itself. The gate fetches one exercise, holds it until the user confirms
//! they did it, and only then is the break armed.

pub mod catalog;

use serde::{Deserialize, Serialize};

pub use catalog::ShuffledCatalog;

/// A short mobility exercise shown between work and break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: u32,
    pub name: String,
    pub instructions: String,
    pub duration_secs: u32,
}

/// Source of exercises for the gate.
///
/// Implementations should not repeat an item until every item has been
/// handed out.
pub trait ExerciseProvider: Send {
    fn next_exercise(&mut self) -> Option<Exercise>;
}

/// Holds the exercise for the pending break.
pub struct ExerciseGate {
    provider: Box<dyn ExerciseProvider>,
    pending: Option<Exercise>,
}

impl std::fmt::Debug for ExerciseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExerciseGate")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl ExerciseGate {
    pub fn new(provider: Box<dyn ExerciseProvider>) -> Self {
        Self {
            provider,
            pending: None,
        }
    }

    /// Pick the exercise for the break that was just earned.
    ///
    /// A provider that has nothing to offer does not block the gate; the
    /// acknowledgement still goes through.
    pub fn present(&mut self) -> Option<Exercise> {
        self.pending = self.provider.next_exercise();
        match &self.pending {
            Some(exercise) => tracing::info!(id = exercise.id, name = %exercise.name, "exercise presented"),
            None => tracing::warn!("exercise provider returned nothing"),
        }
        self.pending.clone()
    }

    pub fn pending(&self) -> Option<&Exercise> {
        self.pending.as_ref()
    }

    /// Take the pending exercise, if any.
    pub fn acknowledge(&mut self) -> Option<Exercise> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Exercise>);

    impl ExerciseProvider for Fixed {
        fn next_exercise(&mut self) -> Option<Exercise> {
            self.0.pop()
        }
    }

    fn exercise(id: u32) -> Exercise {
        Exercise {
            id,
            name: format!("Exercise {id}"),
            instructions: "Move.".into(),
            duration_secs: 60,
        }
    }

    #[test]
    fn present_then_acknowledge() {
        let mut gate = ExerciseGate::new(Box::new(Fixed(vec![exercise(1)])));
        assert!(gate.pending().is_none());

        let shown = gate.present().unwrap();
        assert_eq!(shown.id, 1);
        assert_eq!(gate.pending(), Some(&shown));

        assert_eq!(gate.acknowledge(), Some(shown));
        assert!(gate.pending().is_none());
    }

    #[test]
    fn empty_provider_still_acknowledges() {
        let mut gate = ExerciseGate::new(Box::new(Fixed(Vec::new())));
        assert!(gate.present().is_none());
        assert!(gate.acknowledge().is_none());
    }
}
