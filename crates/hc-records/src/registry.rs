use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::fields::{Fields, ValidationError};
use crate::kind::RecordKind;
use crate::record::{CoachingSession, Habit, HabitCompletion, HealthMetric, Meal, NewRecord, Workout};
use crate::schema::{self, RecordSchema};

type ParseFn = fn(&Fields<'_>) -> Result<NewRecord, ValidationError>;

/// How one record type is validated and described to the model.
pub struct RecordSpec {
    pub kind: RecordKind,
    pub description: &'static str,
    parse: ParseFn,
    parameters: fn() -> Value,
}

impl RecordSpec {
    pub fn validate(&self, fields: &Map<String, Value>) -> Result<NewRecord, ValidationError> {
        (self.parse)(&Fields::new(fields))
    }

    pub fn schema(&self) -> RecordSchema {
        RecordSchema {
            name: self.kind.as_str().to_string(),
            description: self.description.to_string(),
            parameters: (self.parameters)(),
        }
    }
}

/// Record-type dispatch table. Built once at startup; adding a record type is
/// one more entry in [`RecordRegistry::standard`].
pub struct RecordRegistry {
    specs: HashMap<RecordKind, RecordSpec>,
}

impl RecordRegistry {
    pub fn standard() -> Self {
        let specs = [
            RecordSpec {
                kind: RecordKind::HealthMetric,
                description: "Log body measurements for a day: weight, body fat, resting heart rate, sleep, steps.",
                parse: |f| HealthMetric::from_fields(f).map(NewRecord::HealthMetric),
                parameters: schema::health_metric,
            },
            RecordSpec {
                kind: RecordKind::Meal,
                description: "Log a meal with its category and optional nutrition estimates.",
                parse: |f| Meal::from_fields(f).map(NewRecord::Meal),
                parameters: schema::meal,
            },
            RecordSpec {
                kind: RecordKind::Workout,
                description: "Log a workout session, optionally with the individual exercises performed.",
                parse: |f| Workout::from_fields(f).map(NewRecord::Workout),
                parameters: schema::workout,
            },
            RecordSpec {
                kind: RecordKind::CoachingSession,
                description: "Save a note summarizing a coaching conversation and agreed action items.",
                parse: |f| CoachingSession::from_fields(f).map(NewRecord::CoachingSession),
                parameters: schema::coaching_session,
            },
            RecordSpec {
                kind: RecordKind::Habit,
                description: "Define a new habit to track.",
                parse: |f| Habit::from_fields(f).map(NewRecord::Habit),
                parameters: schema::habit,
            },
            RecordSpec {
                kind: RecordKind::HabitCompletion,
                description: "Mark a habit as done on a given day.",
                parse: |f| HabitCompletion::from_fields(f).map(NewRecord::HabitCompletion),
                parameters: schema::habit_completion,
            },
        ];
        Self {
            specs: specs.into_iter().map(|spec| (spec.kind, spec)).collect(),
        }
    }

    pub fn get(&self, kind: RecordKind) -> Option<&RecordSpec> {
        self.specs.get(&kind)
    }

    /// Resolve a record-type tag (or alias) to its spec.
    pub fn resolve(&self, record_type: &str) -> Result<&RecordSpec, String> {
        let kind: RecordKind = record_type.parse()?;
        self.get(kind)
            .ok_or_else(|| format!("Record type {} is not supported", kind))
    }

    /// One callable schema per record type, in a stable order.
    pub fn schemas(&self) -> Vec<RecordSchema> {
        RecordKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind))
            .map(RecordSpec::schema)
            .collect()
    }
}

impl Default for RecordRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_has_a_spec() {
        let registry = RecordRegistry::standard();
        for kind in RecordKind::ALL {
            assert_eq!(registry.get(kind).map(|s| s.kind), Some(kind));
        }
    }

    #[test]
    fn resolve_dispatches_to_matching_parser() {
        let registry = RecordRegistry::standard();
        let spec = registry.resolve("meal_entry").unwrap();
        let fields = json!({"date": "2024-06-01", "meal_type": "lunch"});
        let record = spec.validate(fields.as_object().unwrap()).unwrap();
        assert_eq!(record.kind(), RecordKind::Meal);
    }

    #[test]
    fn resolve_rejects_unknown_type() {
        let registry = RecordRegistry::standard();
        let err = registry.resolve("mood_board").err().unwrap();
        assert!(err.contains("Unknown record type"));
    }

    #[test]
    fn schemas_are_named_by_tag() {
        let names: Vec<String> = RecordRegistry::standard()
            .schemas()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "health_metric",
                "meal",
                "workout",
                "coaching_session",
                "habit",
                "habit_completion"
            ]
        );
    }
}
