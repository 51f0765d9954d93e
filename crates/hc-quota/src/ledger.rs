use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One model that is currently sitting out its quota window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExhaustedModel {
    pub model: String,
    pub seconds_remaining: i64,
}

/// Process-wide record of which models are rate limited and until when.
///
/// Entries are never persisted. An entry whose expiry has passed is treated as
/// absent and removed the next time it is looked at, so no sweeper task is
/// needed. The lock is only held for the map access itself.
pub struct QuotaLedger {
    exhausted_until: Mutex<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl QuotaLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            exhausted_until: Mutex::new(HashMap::new()),
            clock,
        }
    }

    // A poisoned lock still holds a consistent map; bookkeeping must never fail.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.exhausted_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records that `model` is unavailable for the next `retry_delay_secs`
    /// seconds. A later call for the same model replaces the earlier one.
    pub fn mark_exhausted(&self, model: &str, retry_delay_secs: u64) {
        let delay = i64::try_from(retry_delay_secs).unwrap_or(i64::MAX);
        let now = self.clock.now();
        let until = now
            .checked_add_signed(Duration::try_seconds(delay).unwrap_or(Duration::MAX))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries().insert(model.to_string(), until);
        tracing::warn!(
            model = %model,
            retry_delay_secs,
            available_at = %until,
            "Model quota exhausted"
        );
    }

    pub fn is_available(&self, model: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(model) {
            None => true,
            Some(until) if *until <= now => {
                entries.remove(model);
                tracing::info!(model = %model, "Model quota reset");
                true
            }
            Some(_) => false,
        }
    }

    /// Smallest wait, in whole seconds rounded up, before any exhausted model
    /// becomes available again. `None` when nothing is exhausted.
    pub fn seconds_until_next_reset(&self) -> Option<i64> {
        let now = self.clock.now();
        let mut entries = self.entries();
        entries.retain(|_, until| *until > now);
        entries
            .values()
            .map(|until| remaining_secs(*until, now))
            .min()
    }

    /// All currently exhausted models, soonest reset first.
    pub fn snapshot(&self) -> Vec<ExhaustedModel> {
        let now = self.clock.now();
        let mut entries = self.entries();
        entries.retain(|_, until| *until > now);
        let mut models: Vec<ExhaustedModel> = entries
            .iter()
            .map(|(model, until)| ExhaustedModel {
                model: model.clone(),
                seconds_remaining: remaining_secs(*until, now),
            })
            .collect();
        models.sort_by(|a, b| {
            a.seconds_remaining
                .cmp(&b.seconds_remaining)
                .then_with(|| a.model.cmp(&b.model))
        });
        models
    }

    pub fn clear_all(&self) {
        self.entries().clear();
    }
}

impl Default for QuotaLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn remaining_secs(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds().max(0);
    (millis + 999) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn ledger() -> (QuotaLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (QuotaLedger::with_clock(clock.clone()), clock)
    }

    #[test]
    fn unknown_model_is_available() {
        let (ledger, _) = ledger();
        assert!(ledger.is_available("gemini-2.5-flash"));
    }

    #[test]
    fn exhausted_model_recovers_after_delay() {
        let (ledger, clock) = ledger();
        ledger.mark_exhausted("m1", 30);
        assert!(!ledger.is_available("m1"));

        clock.advance(Duration::seconds(29));
        assert!(!ledger.is_available("m1"));

        clock.advance(Duration::seconds(2));
        assert!(ledger.is_available("m1"));
        assert_eq!(ledger.seconds_until_next_reset(), None);
    }

    #[test]
    fn later_mark_wins() {
        let (ledger, clock) = ledger();
        ledger.mark_exhausted("m1", 3600);
        ledger.mark_exhausted("m1", 10);
        clock.advance(Duration::seconds(11));
        assert!(ledger.is_available("m1"));
    }

    #[test]
    fn zero_delay_is_immediately_available() {
        let (ledger, _) = ledger();
        ledger.mark_exhausted("m1", 0);
        assert!(ledger.is_available("m1"));
    }

    #[test]
    fn next_reset_is_minimum_across_models() {
        let (ledger, clock) = ledger();
        assert_eq!(ledger.seconds_until_next_reset(), None);

        ledger.mark_exhausted("slow", 600);
        ledger.mark_exhausted("fast", 45);
        assert_eq!(ledger.seconds_until_next_reset(), Some(45));

        clock.advance(Duration::seconds(50));
        assert_eq!(ledger.seconds_until_next_reset(), Some(550));

        clock.advance(Duration::seconds(600));
        assert_eq!(ledger.seconds_until_next_reset(), None);
    }

    #[test]
    fn next_reset_rounds_partial_seconds_up() {
        let (ledger, clock) = ledger();
        ledger.mark_exhausted("m1", 10);
        clock.advance(Duration::milliseconds(9_500));
        assert_eq!(ledger.seconds_until_next_reset(), Some(1));
    }

    #[test]
    fn snapshot_orders_by_remaining_time() {
        let (ledger, _) = ledger();
        ledger.mark_exhausted("b", 100);
        ledger.mark_exhausted("a", 20);
        let snapshot = ledger.snapshot();
        assert_eq!(
            snapshot,
            vec![
                ExhaustedModel {
                    model: "a".to_string(),
                    seconds_remaining: 20
                },
                ExhaustedModel {
                    model: "b".to_string(),
                    seconds_remaining: 100
                },
            ]
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json[0]["model"], "a");
    }

    #[test]
    fn clear_all_resets_everything() {
        let (ledger, _) = ledger();
        ledger.mark_exhausted("m1", 100);
        ledger.mark_exhausted("m2", 100);
        ledger.clear_all();
        assert!(ledger.is_available("m1"));
        assert!(ledger.is_available("m2"));
        assert_eq!(ledger.seconds_until_next_reset(), None);
    }

    #[test]
    fn huge_delay_does_not_panic() {
        let (ledger, _) = ledger();
        ledger.mark_exhausted("m1", u64::MAX);
        assert!(!ledger.is_available("m1"));
        assert!(ledger.seconds_until_next_reset().unwrap() > 0);
    }

    #[test]
    fn concurrent_marks_are_safe() {
        let ledger = Arc::new(QuotaLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let model = format!("m{}", (i + j) % 4);
                        ledger.mark_exhausted(&model, 60);
                        let _ = ledger.is_available(&model);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.snapshot().len(), 4);
    }
}
