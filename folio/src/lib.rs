//! Folio - post search, ranking and paging for a blog engine
//!
//! Given a free-text query, folio finds published posts whose title,
//! description, categories or body contain any of the query terms, ranks them
//! with fixed per-field weights, and returns one page of results with the
//! metadata needed to render pagination links. Without a query it serves the
//! plain newest-first listing.
//!
//! Storage is pluggable through [`PostRepository`]; an in-memory and a SQLite
//! implementation are included.

pub mod config;
pub mod database;
pub mod filter;
pub mod interface;
pub mod memory;
pub mod models;
pub mod pager;
pub mod ranking;
pub mod search;
mod store;
pub mod urls;

pub use interface::*;
pub use store::PostStore;
