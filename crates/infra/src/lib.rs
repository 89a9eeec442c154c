//! Infrastructure layer: document store, configuration, caching, file storage
//! and background jobs.

pub mod cache;
pub mod cleanup;
pub mod config;
pub mod storage;
pub mod store;

pub use cache::{Generation, TranslationCache};
pub use cleanup::{CleanupJob, CleanupReport};
pub use config::{AppConfig, ConfigError};
pub use storage::{
    FallbackStorage, FileStorage, HttpObjectStorage, LocalFileStorage, StorageError, StoredFile,
    object_key,
};
pub use store::{
    DocumentStore, MemoryDocumentStore, PostgresDocumentStore, Repository, StoreError,
    StoredDocument, WriteBatch, WriteOp,
};
