use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

pub const GROUP_COUNT: u8 = 6;
pub const LETTERS: [char; 3] = ['a', 'b', 'c'];

const BUILTIN_EXERCISES: [(&str, &str); 18] = [
    ("1a", "Bench Press"),
    ("1b", "Incline Press"),
    ("1c", "Flyes"),
    ("2a", "Squats"),
    ("2b", "Leg Press"),
    ("2c", "Lunges"),
    ("3a", "Deadlifts"),
    ("3b", "Rows"),
    ("3c", "Pull-ups"),
    ("4a", "Shoulder Press"),
    ("4b", "Lateral Raises"),
    ("4c", "Rear Delts"),
    ("5a", "Bicep Curls"),
    ("5b", "Hammer Curls"),
    ("5c", "Cable Curls"),
    ("6a", "Tricep Dips"),
    ("6b", "Overhead Extension"),
    ("6c", "Pushdowns"),
];

/// Values a fresh form is pre-filled with.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutineDefaults {
    exercises: HashMap<String, String>,
    pub sets: String,
    pub reps: String,
    pub rest: String,
}

impl Default for RoutineDefaults {
    fn default() -> Self {
        RoutineDefaults {
            exercises: BUILTIN_EXERCISES
                .iter()
                .map(|(slot, name)| (slot.to_string(), name.to_string()))
                .collect(),
            sets: "3".to_string(),
            reps: "8-12".to_string(),
            rest: "60s".to_string(),
        }
    }
}

impl RoutineDefaults {
    /// Default exercise name for `{group}{letter}`, empty when the table has none.
    pub fn exercise(&self, group: u8, letter: char) -> &str {
        self.exercises
            .get(&format!("{group}{letter}"))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RoutineFile {
    exercises: HashMap<String, String>,
    sets: Option<String>,
    reps: Option<String>,
    rest: Option<String>,
}

/// Overlay a routine file on the built-in table.
///
/// Unknown slots are ignored; a file that doesn't parse leaves the built-ins untouched.
pub fn load_routine_defaults(routine_json: &str) -> RoutineDefaults {
    let mut defaults = RoutineDefaults::default();
    let file: RoutineFile = match serde_json::from_str(routine_json) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "routine file is not valid JSON, using built-in defaults");
            return defaults;
        }
    };

    for (slot, name) in file.exercises {
        if defaults.exercises.contains_key(&slot) {
            defaults.exercises.insert(slot, name);
        } else {
            warn!(slot = %slot, "ignoring unknown routine slot");
        }
    }
    if let Some(sets) = file.sets {
        defaults.sets = sets;
    }
    if let Some(reps) = file.reps {
        defaults.reps = reps;
    }
    if let Some(rest) = file.rest {
        defaults.rest = rest;
    }
    defaults
}
