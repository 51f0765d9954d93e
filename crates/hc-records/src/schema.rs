use serde::Serialize;
use serde_json::{json, Value};

use crate::record::{FREQUENCIES, INTENSITIES, MEAL_TYPES};

/// A callable function declaration the model can use to propose a record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn date_param() -> Value {
    json!({"type": "string", "description": "Calendar date in YYYY-MM-DD format"})
}

pub(crate) fn health_metric() -> Value {
    json!({
        "type": "object",
        "properties": {
            "date": date_param(),
            "weight_kg": {"type": "number", "description": "Body weight in kilograms"},
            "body_fat_pct": {"type": "number", "description": "Body fat percentage"},
            "resting_heart_rate": {"type": "integer", "description": "Resting heart rate in beats per minute"},
            "sleep_hours": {"type": "number", "description": "Hours slept"},
            "steps": {"type": "integer", "description": "Step count for the day"},
            "notes": {"type": "string"}
        },
        "required": ["date"]
    })
}

pub(crate) fn meal() -> Value {
    json!({
        "type": "object",
        "properties": {
            "date": date_param(),
            "meal_type": {"type": "string", "enum": MEAL_TYPES},
            "description": {"type": "string", "description": "What was eaten"},
            "calories": {"type": "number"},
            "protein_g": {"type": "number"},
            "carbs_g": {"type": "number"},
            "fat_g": {"type": "number"},
            "notes": {"type": "string"}
        },
        "required": ["date", "meal_type"]
    })
}

pub(crate) fn workout() -> Value {
    json!({
        "type": "object",
        "properties": {
            "date": date_param(),
            "workout_type": {"type": "string", "description": "e.g. strength, run, cycling, yoga"},
            "duration_minutes": {"type": "integer"},
            "intensity": {"type": "string", "enum": INTENSITIES},
            "notes": {"type": "string"},
            "exercises": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "sets": {"type": "integer"},
                        "reps": {"type": "integer"},
                        "weight_kg": {"type": "number"},
                        "duration_seconds": {"type": "integer"},
                        "distance_km": {"type": "number"},
                        "notes": {"type": "string"}
                    },
                    "required": ["name"]
                }
            }
        },
        "required": ["date", "workout_type"]
    })
}

pub(crate) fn coaching_session() -> Value {
    json!({
        "type": "object",
        "properties": {
            "date": date_param(),
            "summary": {"type": "string"},
            "action_items": {"type": "array", "items": {"type": "string"}},
            "mood": {"type": "integer", "description": "Self-reported mood from 1 to 10"}
        },
        "required": ["date", "summary"]
    })
}

pub(crate) fn habit() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "frequency": {"type": "string", "enum": FREQUENCIES},
            "target_count": {"type": "integer"},
            "description": {"type": "string"},
            "active": {"type": "boolean"}
        },
        "required": ["name"]
    })
}

pub(crate) fn habit_completion() -> Value {
    json!({
        "type": "object",
        "properties": {
            "habit_name": {"type": "string"},
            "date": date_param(),
            "count": {"type": "integer"},
            "notes": {"type": "string"}
        },
        "required": ["habit_name", "date"]
    })
}
