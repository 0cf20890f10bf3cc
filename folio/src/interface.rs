//! Folio public interface
//!
//! Shared request/response types, the error type, and the storage seam
//! (`PostRepository`) that the query handler talks to.

use crate::filter::Filter;
use crate::models::Post;
use crate::pager::Pager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Which flow produced a post list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostListType {
    /// Plain listing: published posts, newest first, paged in storage
    #[default]
    Blog,
    /// Ranked search results, paged in memory
    Search,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A request for one page of posts, optionally filtered by a search text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQuery {
    /// Requested page, 1-based. Values below 1 are treated as 1.
    pub page: i64,
    /// Overrides the configured items-per-page when set to a positive value
    pub items_per_page: Option<u32>,
    /// Raw search text. Blank or absent selects the listing flow.
    pub search_query: Option<String>,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            page: 1,
            items_per_page: None,
            search_query: None,
        }
    }
}

impl PostQuery {
    /// Listing query for the given page
    pub fn page(page: i64) -> Self {
        Self { page, ..Self::default() }
    }

    /// Search query for the given text, first page
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search_query: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn with_items_per_page(mut self, items_per_page: u32) -> Self {
        self.items_per_page = Some(items_per_page);
        self
    }

    /// The search text if it contains anything but whitespace
    pub fn search_text(&self) -> Option<&str> {
        self.search_query
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Blog header shown above every post list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlogModel {
    pub title: String,
    pub description: String,
    pub cover_url: Option<String>,
    pub cover_caption: Option<String>,
    pub cover_link: Option<String>,
}

/// One page of posts plus everything needed to render its pagination links
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostListModel {
    pub blog: BlogModel,
    pub posts: Vec<Post>,
    pub pager: Pager,
    pub post_list_type: PostListType,
    /// The raw search text on the search flow, empty on the listing flow
    pub search_query: String,
}

/// Error type for folio operations
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Operation cancelled")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Storage collaborator used by the query handler.
///
/// Implementations evaluate a [`Filter`] however suits the backing store and
/// must honor the cancellation token on every call. Posts come back newest
/// published first, ties broken by descending id.
#[async_trait::async_trait]
pub trait PostRepository: Send + Sync {
    /// Number of posts satisfying `filter`
    async fn count(&self, filter: &Filter, token: &CancellationToken) -> Result<u64, FolioError>;

    /// Posts satisfying `filter`, skipping the first `skip` and returning at
    /// most `take`. `usize::MAX` means no upper bound.
    async fn fetch(
        &self,
        filter: &Filter,
        skip: usize,
        take: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Post>, FolioError>;
}

impl From<crate::database::DatabaseError> for FolioError {
    fn from(e: crate::database::DatabaseError) -> Self {
        match e {
            crate::database::DatabaseError::Interrupted => FolioError::Cancelled,
            other => FolioError::DatabaseError(other.to_string()),
        }
    }
}
