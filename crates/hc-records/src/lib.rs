pub mod fields;
pub mod kind;
pub mod migrations;
pub mod processor;
pub mod record;
pub mod registry;
pub mod schema;
pub mod store;

pub use fields::{Fields, ValidationError};
pub use kind::RecordKind;
pub use processor::{BatchError, BatchProcessor, BatchProposal, BatchResult, ProposalItem};
pub use record::NewRecord;
pub use registry::{RecordRegistry, RecordSpec};
pub use schema::RecordSchema;
pub use store::{RecordHandle, RecordStore, SqliteRecordStore, StoreError};
