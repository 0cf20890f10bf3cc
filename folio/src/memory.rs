//! In-memory post repository
//!
//! Interprets [`Filter`] trees directly against stored posts. Used by tests and
//! by embedders that keep a small blog in memory.

use crate::filter::Filter;
use crate::interface::{FolioError, PostRepository};
use crate::models::Post;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    posts: RwLock<Vec<Post>>,
    count_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from posts, assigning ids in order starting at 1
    pub fn with_posts(posts: impl IntoIterator<Item = Post>) -> Self {
        let repo = Self::new();
        for post in posts {
            repo.insert_post(post);
        }
        repo
    }

    /// Store a post, assigning the next id when it has none. Returns the id.
    pub fn insert_post(&self, mut post: Post) -> i64 {
        let mut posts = self.posts.write();
        let id = match post.id {
            Some(id) => id,
            None => posts.iter().filter_map(|p| p.id).max().unwrap_or(0) + 1,
        };
        post.id = Some(id);
        posts.push(post);
        id
    }

    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }

    /// `(count calls, fetch calls)` served so far
    pub fn call_counts(&self) -> (usize, usize) {
        (
            self.count_calls.load(AtomicOrdering::Relaxed),
            self.fetch_calls.load(AtomicOrdering::Relaxed),
        )
    }
}

/// Newest published first, drafts last, then descending id
fn storage_order(a: &Post, b: &Post) -> Ordering {
    b.published
        .cmp(&a.published)
        .then_with(|| b.id.cmp(&a.id))
}

#[async_trait::async_trait]
impl PostRepository for MemoryRepository {
    async fn count(&self, filter: &Filter, token: &CancellationToken) -> Result<u64, FolioError> {
        self.count_calls.fetch_add(1, AtomicOrdering::Relaxed);
        if token.is_cancelled() {
            return Err(FolioError::Cancelled);
        }
        let posts = self.posts.read();
        Ok(posts.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn fetch(
        &self,
        filter: &Filter,
        skip: usize,
        take: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Post>, FolioError> {
        self.fetch_calls.fetch_add(1, AtomicOrdering::Relaxed);
        if token.is_cancelled() {
            return Err(FolioError::Cancelled);
        }
        let mut matching: Vec<Post> = {
            let posts = self.posts.read();
            posts.iter().filter(|p| filter.matches(p)).cloned().collect()
        };
        matching.sort_by(storage_order);
        Ok(matching.into_iter().skip(skip).take(take).collect())
    }
}
