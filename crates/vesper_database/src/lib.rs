//! PostgreSQL persistence for the Vesper content pipeline.
//!
//! The pipeline never touches SQL directly. It depends on the repository
//! traits in this crate, implemented by [`PgStore`] for production and by
//! [`InMemoryStore`] for tests and dry runs.

mod connection;
mod memory;
mod models;
mod pg;
mod repository;

pub mod schema;

pub use connection::{DbPool, MIGRATIONS, create_pool, database_url, run_migrations};
pub use memory::InMemoryStore;
pub use models::{
    ArticleRow, ContentCategoryRow, ContentRow, NewTranslationRow, NewUsedSourceRow, RunLogRow,
    ScheduleRow, TranslationRow, TranslationTaskRow, VerseRow, WebStoryRow,
};
pub use pg::PgStore;
pub use repository::{
    ContentRepository, RunLogRepository, ScheduleRepository, SourceRepository, Store,
    TranslationOutbox,
};

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, vesper_error::DatabaseError>;
