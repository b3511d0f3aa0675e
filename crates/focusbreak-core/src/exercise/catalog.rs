//! Built-in catalog of one-minute desk mobility exercises.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::{Exercise, ExerciseProvider};
use crate::error::ValidationError;

const BUILTIN: &[(&str, &str)] = &[
    (
        "Neck Rotation",
        "Sit with your spine straight. Slowly turn your head to the right until you feel a light stretch. Return to center and repeat to the left. 10 repetitions per side.",
    ),
    (
        "Shoulder Stretch",
        "Cross your right arm in front of your body. Use your left hand to gently pull the right elbow toward your chest. Hold 15 seconds and switch sides. Repeat twice.",
    ),
    (
        "Wrist Rotation",
        "Extend your arms in front of you. Make circles with your wrists, 10 times in each direction.",
    ),
    (
        "Finger Stretch",
        "Open and close your hands fully 10 times. Then extend each finger individually and hold for 3 seconds.",
    ),
    (
        "Shoulder Shrugs",
        "Sit upright. Raise your shoulders toward your ears, hold 5 seconds and relax completely. Repeat 8 times.",
    ),
    (
        "Seated Trunk Rotation",
        "Keep your feet on the floor. Rotate your trunk to the right holding the back of the chair. Hold 10 seconds and repeat on the other side. 3 times each.",
    ),
    (
        "Side Stretch",
        "Standing, interlace your fingers and stretch your arms overhead. Lean slowly to the right and hold 15 seconds. Return and repeat to the left. Twice each side.",
    ),
    (
        "Wrist Flexion",
        "Extend your right arm palm up. With the left hand gently pull the fingers down. Hold 15 seconds, then switch arms. Twice each.",
    ),
    (
        "Shoulder Circles",
        "Make full circles with your shoulders, 10 forward and 10 backward. Keep the movement slow and controlled.",
    ),
    (
        "Lower Back Release",
        "Seated, lean forward slowly and let your arms hang toward the floor. Hold 20 seconds and come back up slowly. Repeat 3 times.",
    ),
    (
        "Spine Extension",
        "Seated, place your hands behind your head. Gently arch your upper back and look at the ceiling. Hold 10 seconds. Repeat 4 times.",
    ),
    (
        "Ankle Rotation",
        "Seated, lift one foot off the floor. Circle the ankle 10 times in each direction. Repeat with the other foot.",
    ),
    (
        "Quad Stretch",
        "Standing (hold on to something if needed), bend your right knee bringing the foot toward your glutes and hold it. Hold 20 seconds. Switch legs. Twice each.",
    ),
    (
        "Neck Flexion",
        "Sitting tall, tilt your head forward bringing the chin toward the chest. Hold 10 seconds. Return, then tilt gently back. Repeat 3 times.",
    ),
    (
        "Chest Opener",
        "Standing, interlace your hands behind your back. Straighten the arms and lift gently, opening the chest. Hold 20 seconds. Repeat 3 times.",
    ),
    (
        "Seated Leg Raise",
        "Seated, extend one leg straight out parallel to the floor. Hold 10 seconds and lower it. Alternate legs, 5 times each.",
    ),
    (
        "Hip Circles",
        "Standing with hands on your waist, make wide circles with your hips, 10 in each direction. Keep your feet planted.",
    ),
    (
        "Forearm Stretch",
        "Extend your right arm palm down. With the left hand pull the fingers up and back. Hold 15 seconds. Switch. Twice each arm.",
    ),
    (
        "Deep Breathing Stretch",
        "Sitting upright, breathe in through the nose while raising your arms out to the sides. Hold 3 seconds at the top. Breathe out through the mouth lowering the arms. Repeat 8 times.",
    ),
    (
        "Seated Cat-Cow",
        "Sitting at the edge of the chair, breathe in arching the spine and looking up. Breathe out rounding the spine, chin to chest. Repeat 8 times slowly.",
    ),
];

/// Random, non-repeating exercise source.
///
/// Picks uniformly among the exercises not shown yet; once every exercise
/// has been shown the history is cleared and the cycle starts again.
#[derive(Debug, Clone)]
pub struct ShuffledCatalog {
    items: Vec<Exercise>,
    used: HashSet<u32>,
    rng: Pcg64,
}

impl ShuffledCatalog {
    /// The built-in catalog of twenty one-minute exercises.
    pub fn builtin() -> Self {
        let items = builtin_exercises();
        Self {
            items,
            used: HashSet::new(),
            rng: Pcg64::from_entropy(),
        }
    }

    /// A catalog over custom items.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyCollection` if `items` is empty and
    /// `ValidationError::InvalidValue` if two items share an id.
    pub fn new(items: Vec<Exercise>) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyCollection("exercise catalog".into()));
        }
        let mut ids = HashSet::new();
        if let Some(dup) = items.iter().find(|exercise| !ids.insert(exercise.id)) {
            return Err(ValidationError::InvalidValue {
                field: "id".into(),
                message: format!("duplicate exercise id {}", dup.id),
            });
        }
        Ok(Self {
            items,
            used: HashSet::new(),
            rng: Pcg64::from_entropy(),
        })
    }

    /// Deterministic selection order, for tests and reproducible demos.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg64::seed_from_u64(seed);
        self
    }

    pub fn items(&self) -> &[Exercise] {
        &self.items
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn reset_history(&mut self) {
        self.used.clear();
    }

    fn draw(&mut self) -> Option<Exercise> {
        if self.items.is_empty() {
            return None;
        }
        if self.used.len() >= self.items.len() {
            tracing::debug!("all exercises shown, starting a new cycle");
            self.used.clear();
        }
        let available: Vec<&Exercise> = self
            .items
            .iter()
            .filter(|exercise| !self.used.contains(&exercise.id))
            .collect();
        let picked = available[self.rng.gen_range(0..available.len())].clone();
        self.used.insert(picked.id);
        Some(picked)
    }
}

impl ExerciseProvider for ShuffledCatalog {
    fn next_exercise(&mut self) -> Option<Exercise> {
        self.draw()
    }
}

pub fn builtin_exercises() -> Vec<Exercise> {
    BUILTIN
        .iter()
        .zip(1u32..)
        .map(|((name, instructions), id)| Exercise {
            id,
            name: (*name).to_string(),
            instructions: (*instructions).to_string(),
            duration_secs: 60,
        })
        .collect()
}
