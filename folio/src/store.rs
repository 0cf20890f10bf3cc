//! PostStore - query handler for post listings and search
//!
//! Two flows, chosen by whether the search text is blank:
//!
//! - Listing: filter `Published`, count in storage, configure the pager, fetch
//!   exactly the pager's window from storage.
//! - Search: filter `Published AND terms`, fetch every match, rank the full
//!   set, configure the pager from the ranked set, then slice the window in
//!   memory. Ranking needs all candidates before any page can be cut, so this
//!   flow never pages in storage.
//!
//! Async Cancellation Architecture:
//! Callers pass a CancellationToken that is forwarded to every storage call.
//! `search_posts_uncancellable` creates its own token behind a DropGuard, so
//! dropping the future still aborts in-flight storage work.

use crate::config::BlogConfig;
use crate::filter::Filter;
use crate::interface::{FolioError, PostListModel, PostListType, PostQuery, PostRepository};
use crate::models::Post;
use crate::pager::Pager;
use crate::ranking::{Ranker, WeightedRanker};
use crate::search::parse_terms;
use crate::urls::{BaseUrlRewriter, UrlRewriter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// RAII guard that cancels a token when dropped.
/// When the caller drops the future, this guard is dropped with it and
/// in-flight storage calls observe the cancellation.
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Query handler over a post repository
///
/// Holds no per-request state; one store can serve concurrent requests.
pub struct PostStore<R> {
    repo: Arc<R>,
    config: BlogConfig,
    ranker: Arc<dyn Ranker>,
    rewriter: Arc<dyn UrlRewriter>,
}

impl<R: PostRepository> PostStore<R> {
    /// Store with the weighted ranker and a base-URL rewriter from `config`
    pub fn new(repo: Arc<R>, config: BlogConfig) -> Result<Self, FolioError> {
        config.validate()?;
        let rewriter = BaseUrlRewriter::new(&config.base_url, config.url_placeholder.clone())?;
        Ok(Self {
            repo,
            config,
            ranker: Arc::new(WeightedRanker),
            rewriter: Arc::new(rewriter),
        })
    }

    pub fn with_ranker(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn UrlRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn config(&self) -> &BlogConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Handle one page request.
    ///
    /// Storage failures propagate unchanged; an empty result is still a success.
    pub async fn search_posts(
        &self,
        query: PostQuery,
        token: &CancellationToken,
    ) -> Result<PostListModel, FolioError> {
        let items_per_page = query
            .items_per_page
            .filter(|n| *n > 0)
            .unwrap_or(self.config.items_per_page);
        let mut pager = Pager::new(query.page, items_per_page);

        let result = match query.search_text() {
            Some(search_text) => self.search_branch(search_text, &mut pager, token).await,
            None => self.listing_branch(&mut pager, token).await,
        };
        let posts = match result {
            Ok(posts) => posts,
            Err(FolioError::Cancelled) => {
                warn!(page = query.page, "post query cancelled");
                return Err(FolioError::Cancelled);
            }
            Err(e) => return Err(e),
        };

        let posts: Vec<Post> = posts
            .into_iter()
            .map(|post| self.rewriter.rewrite_post(post))
            .collect();

        let mut blog = self.config.blog_model();
        blog.cover_url = blog.cover_url.map(|url| self.rewriter.rewrite_url(&url));

        let (post_list_type, search_query) = match query.search_text() {
            Some(_) => (
                PostListType::Search,
                query.search_query.clone().unwrap_or_default(),
            ),
            None => (PostListType::Blog, String::new()),
        };

        Ok(PostListModel {
            blog,
            posts,
            pager,
            post_list_type,
            search_query,
        })
    }

    /// Like [`search_posts`](Self::search_posts), cancelled when the future is dropped
    pub async fn search_posts_uncancellable(&self, query: PostQuery) -> Result<PostListModel, FolioError> {
        let token = CancellationToken::new();
        let _guard = DropGuard::new(token.clone());
        self.search_posts(query, &token).await
    }

    async fn listing_branch(
        &self,
        pager: &mut Pager,
        token: &CancellationToken,
    ) -> Result<Vec<Post>, FolioError> {
        let filter = Filter::published();
        debug_assert!(filter.requires_published());

        let count = self.repo.count(&filter, token).await?;
        pager.configure(count, self.config.paging_url_part_format.clone());

        let (skip, take) = pager.window();
        let posts = self.repo.fetch(&filter, skip, take, token).await?;

        debug!(
            branch = "listing",
            page = pager.current_page(),
            total = count,
            returned = posts.len(),
            "served post listing"
        );
        Ok(posts)
    }

    async fn search_branch(
        &self,
        search_text: &str,
        pager: &mut Pager,
        token: &CancellationToken,
    ) -> Result<Vec<Post>, FolioError> {
        let terms = parse_terms(search_text);
        let filter = Filter::search(&terms);
        debug_assert!(filter.requires_published());

        let candidates = self.repo.fetch(&filter, 0, usize::MAX, token).await?;
        let ranked = self.ranker.rank(candidates, &terms);

        pager.configure(ranked.len() as u64, self.config.search_url_format(search_text));
        let total = ranked.len();
        let posts = pager.page_of(ranked);

        debug!(
            branch = "search",
            terms = terms.len(),
            page = pager.current_page(),
            total,
            returned = posts.len(),
            "served post search"
        );
        Ok(posts)
    }
}
