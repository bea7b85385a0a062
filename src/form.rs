//! Typed view-model for the workout form.
//!
//! Every input the editor draws lives here, so collection and validation
//! never depend on widget lookups.

use chrono::{Local, NaiveDate};

use crate::models::{sparse_map, WorkoutPayload};
use crate::routines::{RoutineDefaults, GROUP_COUNT, LETTERS};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The document template only declares `sets-bonus-1`, so both bonus slots
/// write their sets under it and slot 2 overwrites slot 1.
const BONUS_SETS_KEY: &str = "sets-bonus-1";

const HEADER_NAME_LIMIT: usize = 18;

#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseGroup {
    pub number: u8,
    pub exercises: [String; 3],
    pub sets: String,
    pub reps: String,
    pub rest: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BonusSlot {
    pub number: u8,
    pub exercise: String,
    pub sets: String,
    pub reps: String,
    pub rest: String,
}

/// Fields carrying a declared constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    WorkoutName,
    WorkoutDate,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validation {
    pub invalid: Vec<FormField>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn flags(&self, field: FormField) -> bool {
        self.invalid.contains(&field)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutForm {
    pub workout_name: String,
    pub workout_date: String,
    /// Selected server template (V1 only).
    pub template: String,
    pub groups: Vec<ExerciseGroup>,
    pub bonus: [BonusSlot; 2],
}

impl WorkoutForm {
    pub fn new(defaults: &RoutineDefaults) -> Self {
        Self::with_date(defaults, Local::now().date_naive())
    }

    pub fn with_date(defaults: &RoutineDefaults, today: NaiveDate) -> Self {
        let groups = (1..=GROUP_COUNT)
            .map(|number| ExerciseGroup {
                number,
                exercises: LETTERS.map(|letter| defaults.exercise(number, letter).to_string()),
                sets: defaults.sets.clone(),
                reps: defaults.reps.clone(),
                rest: defaults.rest.clone(),
            })
            .collect();

        WorkoutForm {
            workout_name: String::new(),
            workout_date: today.format(DATE_FORMAT).to_string(),
            template: String::new(),
            groups,
            bonus: [
                BonusSlot { number: 1, ..Default::default() },
                BonusSlot { number: 2, ..Default::default() },
            ],
        }
    }

    /// Restore every field to its default, keeping the template selection.
    pub fn reset(&mut self, defaults: &RoutineDefaults) {
        let template = std::mem::take(&mut self.template);
        *self = Self::new(defaults);
        self.template = template;
    }

    /// Check the declared constraints: a required name and a `YYYY-MM-DD` date.
    pub fn validate(&self) -> Validation {
        let mut invalid = Vec::new();
        if self.workout_name.trim().is_empty() {
            invalid.push(FormField::WorkoutName);
        }
        if self.parsed_date().is_none() {
            invalid.push(FormField::WorkoutDate);
        }
        Validation { invalid }
    }

    /// The date field as a calendar date. Only the zero-padded `YYYY-MM-DD`
    /// spelling counts, since the text is sent to the backend verbatim.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.workout_date.trim();
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .ok()
            .filter(|date| date.format(DATE_FORMAT).to_string() == raw)
    }

    /// Build a fresh payload from the current field values.
    pub fn collect(&self, template_name: &str) -> WorkoutPayload {
        let exercises = sparse_map(self.groups.iter().flat_map(|g| {
            LETTERS
                .iter()
                .zip(g.exercises.iter())
                .map(move |(letter, value)| (format!("exercise-{}{}", g.number, letter), value))
        }));
        let sets = sparse_map(self.groups.iter().map(|g| (format!("sets-{}", g.number), &g.sets)));
        let reps = sparse_map(self.groups.iter().map(|g| (format!("reps-{}", g.number), &g.reps)));
        let rest = sparse_map(self.groups.iter().map(|g| (format!("rest-{}", g.number), &g.rest)));

        let bonus_exercises = sparse_map(
            self.bonus
                .iter()
                .map(|b| (format!("exercise-bonus-{}", b.number), &b.exercise)),
        );
        let bonus_sets = sparse_map(self.bonus.iter().map(|b| (BONUS_SETS_KEY, &b.sets)));
        let bonus_reps =
            sparse_map(self.bonus.iter().map(|b| (format!("reps-bonus-{}", b.number), &b.reps)));
        let bonus_rest =
            sparse_map(self.bonus.iter().map(|b| (format!("rest_bonus-{}", b.number), &b.rest)));

        WorkoutPayload {
            workout_name: self.workout_name.trim().to_string(),
            workout_date: self.workout_date.trim().to_string(),
            template_name: template_name.to_string(),
            exercises,
            sets,
            reps,
            rest,
            bonus_exercises,
            bonus_sets,
            bonus_reps,
            bonus_rest,
        }
    }

    /// Summary shown as a group's header: `Bench Press • Incline Press • Flyes`.
    pub fn group_header(&self, number: u8) -> String {
        let Some(group) = self.group(number) else {
            return String::new();
        };
        LETTERS
            .iter()
            .zip(group.exercises.iter())
            .map(|(letter, value)| {
                let value = value.trim();
                if value.is_empty() {
                    format!("Exercise {number}{letter}")
                } else {
                    truncate_exercise_name(value, HEADER_NAME_LIMIT)
                }
            })
            .collect::<Vec<_>>()
            .join(" • ")
    }

    /// Full exercise names, only when the header had to shorten or substitute them.
    pub fn group_header_tooltip(&self, number: u8) -> Option<String> {
        let group = self.group(number)?;
        let full: Vec<&str> = group
            .exercises
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect();
        if full.is_empty() {
            return None;
        }
        let full = full.join(" • ");
        (full != self.group_header(number)).then_some(full)
    }

    fn group(&self, number: u8) -> Option<&ExerciseGroup> {
        self.groups.iter().find(|g| g.number == number)
    }
}

/// Shorten `name` to `max` chars, preferring a word boundary past 60% of the limit.
pub fn truncate_exercise_name(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let truncated: String = name.chars().take(max).collect();
    match truncated.rfind(' ') {
        Some(space) if truncated[..space].chars().count() as f64 > max as f64 * 0.6 => {
            format!("{}...", &truncated[..space])
        }
        _ => format!("{truncated}..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> WorkoutForm {
        let date = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let mut form = WorkoutForm::with_date(&RoutineDefaults::default(), date);
        form.workout_name = "Push Day".into();
        form
    }

    fn blank_everything(form: &mut WorkoutForm) {
        for group in &mut form.groups {
            group.exercises = Default::default();
            group.sets.clear();
            group.reps.clear();
            group.rest.clear();
        }
    }

    #[test]
    fn new_form_is_prefilled_from_defaults() {
        let form = form();
        assert_eq!(form.workout_date, "2025-03-17");
        assert_eq!(form.groups.len(), 6);
        assert_eq!(form.groups[0].exercises[0], "Bench Press");
        assert_eq!(form.groups[5].rest, "60s");
        assert!(form.bonus.iter().all(|b| b.exercise.is_empty()));
    }

    #[test]
    fn collect_default_form_fills_every_slot() {
        let payload = form().collect("log.docx");
        assert_eq!(payload.exercises.len(), 18);
        assert_eq!(payload.exercises["exercise-3c"], "Pull-ups");
        assert_eq!(payload.sets["sets-4"], "3");
        assert_eq!(payload.reps["reps-6"], "8-12");
        assert_eq!(payload.template_name, "log.docx");
        assert!(payload.bonus_exercises.is_empty());
    }

    #[test]
    fn blank_fields_produce_empty_maps() {
        let mut form = form();
        blank_everything(&mut form);
        let payload = form.collect("t");
        assert!(payload.exercises.is_empty());
        assert!(payload.sets.is_empty());
        assert!(payload.reps.is_empty());
        assert!(payload.rest.is_empty());
    }

    #[test]
    fn whitespace_only_fields_are_omitted() {
        let mut form = form();
        blank_everything(&mut form);
        form.groups[1].exercises[2] = "   ".into();
        form.groups[1].sets = "\t".into();
        let payload = form.collect("t");
        assert!(payload.exercises.is_empty());
        assert!(payload.sets.is_empty());
    }

    #[test]
    fn values_are_trimmed() {
        let mut form = form();
        form.workout_name = "  Leg Day ".into();
        form.groups[0].exercises[1] = "  Dips  ".into();
        form.groups[0].rest = " 90s ".into();
        let payload = form.collect("t");
        assert_eq!(payload.workout_name, "Leg Day");
        assert_eq!(payload.exercises["exercise-1b"], "Dips");
        assert_eq!(payload.rest["rest-1"], "90s");
    }

    #[test]
    fn bonus_two_sets_overwrites_bonus_one() {
        let mut form = form();
        form.bonus[0].sets = "4".into();
        form.bonus[1].sets = "5".into();
        let payload = form.collect("t");
        assert_eq!(payload.bonus_sets.len(), 1);
        assert_eq!(payload.bonus_sets["sets-bonus-1"], "5");
    }

    #[test]
    fn bonus_keys_follow_template_names() {
        let mut form = form();
        form.bonus[0].exercise = "Farmer Carry".into();
        form.bonus[1].exercise = "Plank".into();
        form.bonus[0].reps = "40m".into();
        form.bonus[1].reps = "60s".into();
        form.bonus[0].rest = "90s".into();
        form.bonus[1].rest = "30s".into();
        let payload = form.collect("t");
        assert_eq!(payload.bonus_exercises["exercise-bonus-1"], "Farmer Carry");
        assert_eq!(payload.bonus_exercises["exercise-bonus-2"], "Plank");
        assert_eq!(payload.bonus_reps["reps-bonus-2"], "60s");
        assert_eq!(payload.bonus_rest["rest_bonus-1"], "90s");
        assert_eq!(payload.bonus_rest["rest_bonus-2"], "30s");
    }

    #[test]
    fn validation_requires_name_and_iso_date() {
        let mut form = form();
        assert!(form.validate().is_valid());

        form.workout_name = "   ".into();
        form.workout_date = "17/03/2025".into();
        let validation = form.validate();
        assert!(!validation.is_valid());
        assert!(validation.flags(FormField::WorkoutName));
        assert!(validation.flags(FormField::WorkoutDate));
    }

    #[test]
    fn dates_must_be_zero_padded() {
        let mut form = form();
        for loose in ["2025-3-7", "2025-03-7", "25-03-07", "+2025-03-07", "2025-02-30"] {
            form.workout_date = loose.into();
            assert!(form.validate().flags(FormField::WorkoutDate), "{loose} accepted");
        }

        form.workout_date = " 2025-03-07 ".into();
        assert!(form.validate().is_valid());
        assert_eq!(form.collect("t").workout_date, "2025-03-07");
    }

    #[test]
    fn reset_keeps_template_and_restores_defaults() {
        let mut form = form();
        form.template = "log.docx".into();
        form.groups[0].exercises[0].clear();
        form.reset(&RoutineDefaults::default());
        assert_eq!(form.template, "log.docx");
        assert_eq!(form.groups[0].exercises[0], "Bench Press");
        assert!(form.workout_name.is_empty());
    }

    #[test]
    fn truncation_prefers_word_boundary() {
        assert_eq!(truncate_exercise_name("Overhead Extension", 18), "Overhead Extension");
        assert_eq!(
            truncate_exercise_name("Romanian Deadlift Variation", 18),
            "Romanian Deadlift..."
        );
        assert_eq!(
            truncate_exercise_name("Supercalifragilistic Curl", 18),
            "Supercalifragilist..."
        );
        // Boundary too early in the string: hard cut instead.
        assert_eq!(truncate_exercise_name("Db Supercalifragilistic", 18), "Db Supercalifragil...");
    }

    #[test]
    fn group_header_substitutes_blank_slots() {
        let mut form = form();
        form.groups[1].exercises[1].clear();
        assert_eq!(form.group_header(2), "Squats • Exercise 2b • Lunges");
        assert_eq!(form.group_header_tooltip(2).as_deref(), Some("Squats • Lunges"));
        assert_eq!(form.group_header_tooltip(1), None);
    }
}
