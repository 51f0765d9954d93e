use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    HealthMetric,
    Meal,
    Workout,
    CoachingSession,
    Habit,
    HabitCompletion,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::HealthMetric,
        RecordKind::Meal,
        RecordKind::Workout,
        RecordKind::CoachingSession,
        RecordKind::Habit,
        RecordKind::HabitCompletion,
    ];

    /// Canonical tag, also used as the structured-call name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::HealthMetric => "health_metric",
            RecordKind::Meal => "meal",
            RecordKind::Workout => "workout",
            RecordKind::CoachingSession => "coaching_session",
            RecordKind::Habit => "habit",
            RecordKind::HabitCompletion => "habit_completion",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "health_metric" | "health_metrics" | "health" => Ok(RecordKind::HealthMetric),
            "meal" | "meal_entry" | "meals" => Ok(RecordKind::Meal),
            "workout" | "workout_session" | "workouts" => Ok(RecordKind::Workout),
            "coaching_session" | "coaching_note" | "coaching" => Ok(RecordKind::CoachingSession),
            "habit" | "habit_definition" | "habits" => Ok(RecordKind::Habit),
            "habit_completion" | "habit_log" | "habit_check_in" => {
                Ok(RecordKind::HabitCompletion)
            }
            _ => Err(format!("Unknown record type: {}", s)),
        }
    }
}
