use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::registry::RecordRegistry;
use crate::store::{RecordHandle, RecordStore, StoreError};

/// One record-creation intent: a record-type tag plus its raw field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalItem {
    pub record_type: String,
    #[serde(rename = "data", alias = "fields", default)]
    pub fields: Map<String, Value>,
}

impl ProposalItem {
    pub fn new(record_type: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            record_type: record_type.into(),
            fields,
        }
    }
}

/// Ordered list of proposals processed independently of one another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchProposal(pub Vec<ProposalItem>);

impl BatchProposal {
    pub fn new(items: Vec<ProposalItem>) -> Self {
        Self(items)
    }

    pub fn items(&self) -> &[ProposalItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ProposalItem> for BatchProposal {
    fn from_iter<I: IntoIterator<Item = ProposalItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Row ids of the committed records, in proposal order.
    pub record_ids: Vec<i64>,
}

impl BatchResult {
    /// Short user-facing line describing the outcome.
    pub fn summary(&self) -> String {
        let noun = if self.total == 1 { "record" } else { "records" };
        if self.failed == 0 {
            format!("Saved {} {}.", self.successful, noun)
        } else {
            format!(
                "Saved {} of {} {} ({} failed).",
                self.successful, self.total, noun, self.failed
            )
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Batch cannot be empty: provide at least one record")]
    Empty,
    #[error("All records failed ({} of {total}): {}", .errors.len(), .errors.join("; "))]
    AllFailed { total: usize, errors: Vec<String> },
    #[error("Failed to save records: {0}")]
    Store(#[from] StoreError),
}

/// Validates and persists a [`BatchProposal`].
///
/// Each item is validated on its own; bad items are reported and skipped.
/// If anything validated, the valid subset is committed in one write. If
/// nothing did, nothing is written and the batch fails as a whole.
pub struct BatchProcessor {
    registry: RecordRegistry,
    store: Arc<dyn RecordStore>,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_registry(RecordRegistry::standard(), store)
    }

    pub fn with_registry(registry: RecordRegistry, store: Arc<dyn RecordStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &RecordRegistry {
        &self.registry
    }

    pub fn process(&self, batch: &BatchProposal) -> Result<BatchResult, BatchError> {
        if batch.is_empty() {
            return Err(BatchError::Empty);
        }

        let total = batch.len();
        let mut staged: Vec<RecordHandle> = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (i, item) in batch.items().iter().enumerate() {
            match self.stage_item(item) {
                Ok(handle) => staged.push(handle),
                Err(reason) => {
                    let message = describe_failure(i + 1, item, &reason);
                    tracing::warn!(index = i + 1, record_type = %item.record_type, "{}", message);
                    errors.push(message);
                }
            }
        }

        if staged.is_empty() {
            self.store.discard(&staged);
            return Err(BatchError::AllFailed { total, errors });
        }

        let record_ids = match self.store.commit(&staged) {
            Ok(ids) => ids,
            Err(e) => {
                self.store.discard(&staged);
                tracing::error!(error = %e, "Batch commit failed");
                return Err(BatchError::Store(e));
            }
        };

        let result = BatchResult {
            total,
            successful: staged.len(),
            failed: errors.len(),
            errors,
            record_ids,
        };
        tracing::info!(
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            "Batch committed"
        );
        Ok(result)
    }

    fn stage_item(&self, item: &ProposalItem) -> Result<RecordHandle, String> {
        let spec = self.registry.resolve(&item.record_type)?;
        let record = spec.validate(&item.fields).map_err(|e| e.to_string())?;
        self.store.stage(record).map_err(|e| e.to_string())
    }
}

fn describe_failure(position: usize, item: &ProposalItem, reason: &str) -> String {
    let date = item
        .fields
        .get("date")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty());
    match date {
        Some(date) => format!(
            "Record {} ({}, {}): {}",
            position, item.record_type, date, reason
        ),
        None => format!("Record {} ({}): {}", position, item.record_type, reason),
    }
}
