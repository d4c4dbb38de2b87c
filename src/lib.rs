//! # Tern
//!
//! An incremental indexing engine for versioned, linked record stores.
//!
//! Given a declarative mapping configuration, Tern derives search-index
//! documents from records and keeps those documents consistent as records
//! and the records they link to change, without full rebuilds and without
//! two workers indexing the same record concurrently.
//!
//! ## Components
//!
//! - Mapping compiler: validates the configuration into an immutable
//!   [`MappingModel`](mapping::MappingModel)
//! - Dependency walker: derives document fields and the dependency set of
//!   an index entry by following configured link relationships
//! - Record indexing lock: distributed, reentrant, at-most-one-indexer-
//!   per-record mutual exclusion over a coordination service
//! - Index updater: thin orchestration tying the three together per
//!   change event

pub mod document;
pub mod error;
pub mod indexer;
pub mod lock;
pub mod mapping;
pub mod record;
pub mod walker;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
