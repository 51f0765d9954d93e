use chrono::NaiveDate;
use serde::Serialize;

use crate::fields::{Fields, ValidationError};
use crate::kind::RecordKind;

pub const MEAL_TYPES: [&str; 4] = ["breakfast", "lunch", "dinner", "snack"];
pub const INTENSITIES: [&str; 3] = ["low", "moderate", "high"];
pub const FREQUENCIES: [&str; 2] = ["daily", "weekly"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthMetric {
    pub date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub resting_heart_rate: Option<u32>,
    pub sleep_hours: Option<f64>,
    pub steps: Option<u32>,
    pub notes: Option<String>,
}

impl HealthMetric {
    pub fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        let metric = Self {
            date: f.required_date("date")?,
            weight_kg: f.optional_f64("weight_kg", 1.0, 500.0)?,
            body_fat_pct: f.optional_f64("body_fat_pct", 0.0, 100.0)?,
            resting_heart_rate: f.optional_u32("resting_heart_rate", 20, 250)?,
            sleep_hours: f.optional_f64("sleep_hours", 0.0, 24.0)?,
            steps: f.optional_u32("steps", 0, 200_000)?,
            notes: f.optional_str("notes")?,
        };
        let has_measurement = metric.weight_kg.is_some()
            || metric.body_fat_pct.is_some()
            || metric.resting_heart_rate.is_some()
            || metric.sleep_hours.is_some()
            || metric.steps.is_some();
        if !has_measurement {
            return Err(ValidationError::NothingToRecord(
                "weight_kg, body_fat_pct, resting_heart_rate, sleep_hours, steps".to_string(),
            ));
        }
        Ok(metric)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meal {
    pub date: NaiveDate,
    pub meal_type: &'static str,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub notes: Option<String>,
}

impl Meal {
    pub fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            date: f.required_date("date")?,
            meal_type: f.required_choice("meal_type", &MEAL_TYPES)?,
            description: f.optional_str("description")?,
            calories: f.optional_f64("calories", 0.0, 10_000.0)?,
            protein_g: f.optional_f64("protein_g", 0.0, 1000.0)?,
            carbs_g: f.optional_f64("carbs_g", 0.0, 1000.0)?,
            fat_g: f.optional_f64("fat_g", 0.0, 1000.0)?,
            notes: f.optional_str("notes")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exercise {
    pub name: String,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub duration_seconds: Option<u32>,
    pub distance_km: Option<f64>,
    pub notes: Option<String>,
}

impl Exercise {
    fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: f.required_str("name")?,
            sets: f.optional_u32("sets", 0, 100)?,
            reps: f.optional_u32("reps", 0, 1000)?,
            weight_kg: f.optional_f64("weight_kg", 0.0, 1000.0)?,
            duration_seconds: f.optional_u32("duration_seconds", 0, 86_400)?,
            distance_km: f.optional_f64("distance_km", 0.0, 1000.0)?,
            notes: f.optional_str("notes")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workout {
    pub date: NaiveDate,
    pub workout_type: String,
    pub duration_minutes: Option<u32>,
    pub intensity: Option<&'static str>,
    pub notes: Option<String>,
    pub exercises: Vec<Exercise>,
}

impl Workout {
    pub fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        let date = f.required_date("date")?;
        let workout_type = f.required_str("workout_type")?;
        let duration_minutes = f.optional_u32("duration_minutes", 0, 1440)?;
        let intensity = f.optional_choice("intensity", &INTENSITIES)?;
        let notes = f.optional_str("notes")?;
        let exercises = f
            .object_list("exercises")?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Exercise::from_fields(item).map_err(|e| ValidationError::Nested {
                    list: "exercises",
                    index: i + 1,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            date,
            workout_type,
            duration_minutes,
            intensity,
            notes,
            exercises,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingSession {
    pub date: NaiveDate,
    pub summary: String,
    pub action_items: Vec<String>,
    pub mood: Option<u32>,
}

impl CoachingSession {
    pub fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            date: f.required_date("date")?,
            summary: f.required_str("summary")?,
            action_items: f.str_list("action_items")?,
            mood: f.optional_u32("mood", 1, 10)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Habit {
    pub name: String,
    pub frequency: &'static str,
    pub target_count: u32,
    pub description: Option<String>,
    pub active: bool,
}

impl Habit {
    pub fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: f.required_str("name")?,
            frequency: f.optional_choice("frequency", &FREQUENCIES)?.unwrap_or("daily"),
            target_count: f.optional_u32("target_count", 1, 100)?.unwrap_or(1),
            description: f.optional_str("description")?,
            active: f.optional_bool("active")?.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitCompletion {
    pub habit_name: String,
    pub date: NaiveDate,
    pub count: u32,
    pub notes: Option<String>,
}

impl HabitCompletion {
    pub fn from_fields(f: &Fields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            habit_name: f.required_str("habit_name")?,
            date: f.required_date("date")?,
            count: f.optional_u32("count", 1, 100)?.unwrap_or(1),
            notes: f.optional_str("notes")?,
        })
    }
}

/// A validated record ready to be staged with the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum NewRecord {
    HealthMetric(HealthMetric),
    Meal(Meal),
    Workout(Workout),
    CoachingSession(CoachingSession),
    Habit(Habit),
    HabitCompletion(HabitCompletion),
}

impl NewRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            NewRecord::HealthMetric(_) => RecordKind::HealthMetric,
            NewRecord::Meal(_) => RecordKind::Meal,
            NewRecord::Workout(_) => RecordKind::Workout,
            NewRecord::CoachingSession(_) => RecordKind::CoachingSession,
            NewRecord::Habit(_) => RecordKind::Habit,
            NewRecord::HabitCompletion(_) => RecordKind::HabitCompletion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn health_metric_needs_a_measurement() {
        let m = map(json!({"date": "2024-05-01", "notes": "felt fine"}));
        let err = HealthMetric::from_fields(&Fields::new(&m)).unwrap_err();
        assert!(matches!(err, ValidationError::NothingToRecord(_)));
    }

    #[test]
    fn health_metric_rejects_zero_weight() {
        let m = map(json!({"date": "2024-05-01", "weight_kg": 0}));
        assert!(HealthMetric::from_fields(&Fields::new(&m)).is_err());
    }

    #[test]
    fn health_metric_coerces_strings() {
        let m = map(json!({"date": "2024-05-01", "weight_kg": "80.2", "steps": "12000"}));
        let metric = HealthMetric::from_fields(&Fields::new(&m)).unwrap();
        assert_eq!(metric.weight_kg, Some(80.2));
        assert_eq!(metric.steps, Some(12000));
    }

    #[test]
    fn meal_requires_category() {
        let m = map(json!({"date": "2024-05-01", "description": "oats"}));
        let err = Meal::from_fields(&Fields::new(&m)).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("meal_type".to_string()));
    }

    #[test]
    fn workout_parses_nested_exercises() {
        let m = map(json!({
            "date": "2024-05-02",
            "workout_type": "strength",
            "intensity": "HIGH",
            "exercises": [
                {"name": "squat", "sets": 5, "reps": 5, "weight_kg": 100},
                {"name": "plank", "duration_seconds": "60"}
            ]
        }));
        let workout = Workout::from_fields(&Fields::new(&m)).unwrap();
        assert_eq!(workout.intensity, Some("high"));
        assert_eq!(workout.exercises.len(), 2);
        assert_eq!(workout.exercises[1].duration_seconds, Some(60));
    }

    #[test]
    fn workout_reports_bad_exercise_position() {
        let m = map(json!({
            "date": "2024-05-02",
            "workout_type": "strength",
            "exercises": [{"name": "squat"}, {"sets": 3}]
        }));
        let err = Workout::from_fields(&Fields::new(&m)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "exercises entry 2: missing required field 'name'"
        );
    }

    #[test]
    fn workout_reports_missing_date_before_exercises() {
        let m = map(json!({
            "workout_type": "strength",
            "exercises": [{"sets": 3}]
        }));
        let err = Workout::from_fields(&Fields::new(&m)).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("date".to_string()));
    }

    #[test]
    fn habit_defaults() {
        let m = map(json!({"name": "Meditate"}));
        let habit = Habit::from_fields(&Fields::new(&m)).unwrap();
        assert_eq!(habit.frequency, "daily");
        assert_eq!(habit.target_count, 1);
        assert!(habit.active);
    }

    #[test]
    fn habit_can_be_created_inactive() {
        let m = map(json!({"name": "Cold shower", "active": "no"}));
        let habit = Habit::from_fields(&Fields::new(&m)).unwrap();
        assert!(!habit.active);

        let m = map(json!({"name": "Cold shower", "active": "sometimes"}));
        assert!(Habit::from_fields(&Fields::new(&m)).is_err());
    }

    #[test]
    fn coaching_session_collects_action_items() {
        let m = map(json!({
            "date": "2024-05-03",
            "summary": "Talked about sleep",
            "action_items": ["lights out by 11", "no screens"],
            "mood": 7
        }));
        let session = CoachingSession::from_fields(&Fields::new(&m)).unwrap();
        assert_eq!(session.action_items.len(), 2);
        assert_eq!(session.mood, Some(7));
    }

    #[test]
    fn new_record_serializes_with_tag() {
        let m = map(json!({"habit_name": "Meditate", "date": "2024-05-03"}));
        let record = NewRecord::HabitCompletion(HabitCompletion::from_fields(&Fields::new(&m)).unwrap());
        assert_eq!(record.kind(), RecordKind::HabitCompletion);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record_type"], "habit_completion");
        assert_eq!(json["count"], 1);
    }
}
