use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::fields::DATE_FORMAT;
use crate::kind::RecordKind;
use crate::migrations;
use crate::record::NewRecord;

/// Opaque reference to a record that has been staged but not yet written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecordHandle(Uuid);

impl RecordHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no staged record for handle {0}")]
    UnknownHandle(Uuid),
}

/// Storage collaborator used by the batch processor.
///
/// `stage` only reserves a record; nothing is visible until `commit`, which
/// writes every given handle in one transaction or none of them.
pub trait RecordStore: Send + Sync {
    fn stage(&self, record: NewRecord) -> Result<RecordHandle, StoreError>;
    /// Returns the row id of each committed record, in handle order.
    fn commit(&self, handles: &[RecordHandle]) -> Result<Vec<i64>, StoreError>;
    fn discard(&self, handles: &[RecordHandle]);
}

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    staged: Mutex<HashMap<Uuid, NewRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            staged: Mutex::new(HashMap::new()),
        }
    }

    pub fn staged_count(&self) -> usize {
        lock(&self.staged).len()
    }

    /// Committed rows per record type.
    pub fn record_counts(&self) -> Result<BTreeMap<RecordKind, i64>, StoreError> {
        let conn = lock(&self.conn);
        let mut counts = BTreeMap::new();
        for kind in RecordKind::ALL {
            let sql = format!("SELECT COUNT(*) FROM {}", table_name(kind));
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }

    /// Exercise names for a committed workout, in the order they were logged.
    pub fn workout_exercises(&self, workout_id: i64) -> Result<Vec<String>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT name FROM workout_exercises WHERE workout_id = ?1 ORDER BY position",
        )?;
        let names = stmt
            .query_map([workout_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

impl RecordStore for SqliteRecordStore {
    fn stage(&self, record: NewRecord) -> Result<RecordHandle, StoreError> {
        let id = Uuid::new_v4();
        lock(&self.staged).insert(id, record);
        Ok(RecordHandle(id))
    }

    fn commit(&self, handles: &[RecordHandle]) -> Result<Vec<i64>, StoreError> {
        let records: Vec<NewRecord> = {
            let mut staged = lock(&self.staged);
            if let Some(missing) = handles.iter().find(|h| !staged.contains_key(&h.0)) {
                return Err(StoreError::UnknownHandle(missing.0));
            }
            handles
                .iter()
                .filter_map(|h| staged.remove(&h.0))
                .collect()
        };

        let mut conn = lock(&self.conn);
        let tx = conn.transaction()?;
        let ids = records
            .iter()
            .map(|record| insert_record(&tx, record))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;

        tracing::debug!(count = ids.len(), "Committed staged records");
        Ok(ids)
    }

    fn discard(&self, handles: &[RecordHandle]) {
        let mut staged = lock(&self.staged);
        for handle in handles {
            staged.remove(&handle.0);
        }
    }
}

fn table_name(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::HealthMetric => "health_metrics",
        RecordKind::Meal => "meals",
        RecordKind::Workout => "workouts",
        RecordKind::CoachingSession => "coaching_sessions",
        RecordKind::Habit => "habits",
        RecordKind::HabitCompletion => "habit_completions",
    }
}

fn insert_record(tx: &Transaction<'_>, record: &NewRecord) -> Result<i64, StoreError> {
    match record {
        NewRecord::HealthMetric(m) => {
            tx.execute(
                "INSERT INTO health_metrics (date, weight_kg, body_fat_pct, resting_heart_rate, sleep_hours, steps, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    m.date.format(DATE_FORMAT).to_string(),
                    m.weight_kg,
                    m.body_fat_pct,
                    m.resting_heart_rate,
                    m.sleep_hours,
                    m.steps,
                    m.notes,
                ],
            )?;
        }
        NewRecord::Meal(m) => {
            tx.execute(
                "INSERT INTO meals (date, meal_type, description, calories, protein_g, carbs_g, fat_g, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    m.date.format(DATE_FORMAT).to_string(),
                    m.meal_type,
                    m.description,
                    m.calories,
                    m.protein_g,
                    m.carbs_g,
                    m.fat_g,
                    m.notes,
                ],
            )?;
        }
        NewRecord::Workout(w) => {
            tx.execute(
                "INSERT INTO workouts (date, workout_type, duration_minutes, intensity, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    w.date.format(DATE_FORMAT).to_string(),
                    w.workout_type,
                    w.duration_minutes,
                    w.intensity,
                    w.notes,
                ],
            )?;
            let workout_id = tx.last_insert_rowid();
            for (position, e) in w.exercises.iter().enumerate() {
                tx.execute(
                    "INSERT INTO workout_exercises (workout_id, position, name, sets, reps, weight_kg, duration_seconds, distance_km, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        workout_id,
                        position as i64,
                        e.name,
                        e.sets,
                        e.reps,
                        e.weight_kg,
                        e.duration_seconds,
                        e.distance_km,
                        e.notes,
                    ],
                )?;
            }
            return Ok(workout_id);
        }
        NewRecord::CoachingSession(s) => {
            tx.execute(
                "INSERT INTO coaching_sessions (date, summary, action_items, mood)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    s.date.format(DATE_FORMAT).to_string(),
                    s.summary,
                    serde_json::to_string(&s.action_items)?,
                    s.mood,
                ],
            )?;
        }
        NewRecord::Habit(h) => {
            tx.execute(
                "INSERT INTO habits (name, frequency, target_count, description, active)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![h.name, h.frequency, h.target_count, h.description, h.active],
            )?;
        }
        NewRecord::HabitCompletion(c) => {
            tx.execute(
                "INSERT INTO habit_completions (habit_name, date, count, notes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    c.habit_name,
                    c.date.format(DATE_FORMAT).to_string(),
                    c.count,
                    c.notes,
                ],
            )?;
        }
    }
    Ok(tx.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Exercise, Habit, Workout};
    use chrono::NaiveDate;

    fn habit(name: &str) -> NewRecord {
        NewRecord::Habit(Habit {
            name: name.to_string(),
            frequency: "daily",
            target_count: 1,
            description: None,
            active: true,
        })
    }

    #[test]
    fn staged_records_are_invisible_until_commit() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let handle = store.stage(habit("Stretch")).unwrap();
        assert_eq!(store.record_counts().unwrap()[&RecordKind::Habit], 0);
        assert_eq!(store.staged_count(), 1);

        let ids = store.commit(&[handle]).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.record_counts().unwrap()[&RecordKind::Habit], 1);
        assert_eq!(store.staged_count(), 0);
    }

    #[test]
    fn discard_drops_staged_records() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let handle = store.stage(habit("Read")).unwrap();
        store.discard(&[handle]);
        assert_eq!(store.staged_count(), 0);
        assert!(matches!(
            store.commit(&[handle]),
            Err(StoreError::UnknownHandle(_))
        ));
        assert_eq!(store.record_counts().unwrap()[&RecordKind::Habit], 0);
    }

    #[test]
    fn unknown_handle_leaves_other_staged_records_alone() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let good = store.stage(habit("Walk")).unwrap();
        let bogus = RecordHandle(Uuid::new_v4());
        assert!(store.commit(&[good, bogus]).is_err());
        assert_eq!(store.staged_count(), 1);
        store.commit(&[good]).unwrap();
    }

    #[test]
    fn workout_commit_writes_exercises() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let workout = NewRecord::Workout(Workout {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            workout_type: "strength".to_string(),
            duration_minutes: Some(45),
            intensity: Some("high"),
            notes: None,
            exercises: ["bench", "row"]
                .iter()
                .map(|name| Exercise {
                    name: name.to_string(),
                    sets: Some(3),
                    reps: Some(8),
                    weight_kg: None,
                    duration_seconds: None,
                    distance_km: None,
                    notes: None,
                })
                .collect(),
        });
        let handle = store.stage(workout).unwrap();
        let ids = store.commit(&[handle]).unwrap();
        assert_eq!(store.workout_exercises(ids[0]).unwrap(), vec!["bench", "row"]);
    }

    #[test]
    fn open_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let store = SqliteRecordStore::open(&path).unwrap();
            let h = store.stage(habit("Journal")).unwrap();
            store.commit(&[h]).unwrap();
        }
        let reopened = SqliteRecordStore::open(&path).unwrap();
        assert_eq!(reopened.record_counts().unwrap()[&RecordKind::Habit], 1);
    }
}
