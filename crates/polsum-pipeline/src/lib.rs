pub mod assemble;
pub mod runner;
pub mod store;

pub use assemble::{default_cascade, default_strategies};
pub use runner::{JobError, JobRunner, PipelineConfig, RegenerateError};
pub use store::{DocumentRecord, DocumentStore, DocumentUpdate, MemoryStore, StoreError};
