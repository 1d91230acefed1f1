//! Similarity store implementations for LoreAgent.
//!
//! Two backend shapes exist:
//! - naive: load candidate rows and compute cosine similarity in-process
//!   ([`MemoryStore`], [`SqliteStore`])
//! - native: push the similarity computation into the database
//!   ([`PgVectorStore`] via pgvector)
//!
//! Both produce identical observable behavior: inclusive thresholds,
//! similarity-descending ordering, timestamp-descending metadata lookup.

pub mod in_memory;
pub mod similarity;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::MemoryStore;
pub use similarity::{cosine_similarity, rank_hits};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use postgres::PgVectorStore;
