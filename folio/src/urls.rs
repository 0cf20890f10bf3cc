//! Base-URL rewriting for posts and cover images
//!
//! Stored posts may reference files relative to the blog, or through a
//! placeholder token (`%URL%` by default) that stands for the public base URL.
//! Rewriting resolves both against the configured base. Absolute URLs pass
//! through unchanged, so rewriting is idempotent.

use crate::interface::FolioError;
use crate::models::Post;
use url::Url;

/// Applies the public base URL to stored URLs
pub trait UrlRewriter: Send + Sync {
    fn rewrite_url(&self, url: &str) -> String;

    /// Rewrite the cover URL and any placeholder tokens in the body
    fn rewrite_post(&self, post: Post) -> Post;
}

#[derive(Debug, Clone)]
pub struct BaseUrlRewriter {
    base: Url,
    placeholder: String,
}

impl BaseUrlRewriter {
    pub fn new(base_url: &str, placeholder: impl Into<String>) -> Result<Self, FolioError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| FolioError::Config(format!("invalid base_url {:?}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(FolioError::Config(format!(
                "base_url {:?} cannot be used as a base",
                base_url
            )));
        }
        // Url::join drops the last path segment unless it ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            placeholder: placeholder.into(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Base URL without the trailing slash, as substituted for the placeholder
    fn base_prefix(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn replace_placeholder(&self, text: &str) -> String {
        if self.placeholder.is_empty() || !text.contains(&self.placeholder) {
            return text.to_string();
        }
        text.replace(&self.placeholder, self.base_prefix())
    }
}

impl UrlRewriter for BaseUrlRewriter {
    fn rewrite_url(&self, url: &str) -> String {
        let url = self.replace_placeholder(url.trim());
        if url.is_empty() || Url::parse(&url).is_ok() {
            return url;
        }
        // Protocol-relative: another host, borrow only the base's scheme
        if url.starts_with("//") {
            return match self.base.join(&url) {
                Ok(joined) => joined.to_string(),
                Err(_) => url,
            };
        }
        // Root-relative and path-relative references both resolve under the base path
        let relative = url.trim_start_matches('/');
        match self.base.join(relative) {
            Ok(joined) => joined.to_string(),
            Err(_) => url,
        }
    }

    fn rewrite_post(&self, mut post: Post) -> Post {
        post.cover_url = post.cover_url.map(|url| self.rewrite_url(&url));
        post.content = self.replace_placeholder(&post.content);
        post
    }
}

/// Leaves every URL untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl UrlRewriter for IdentityRewriter {
    fn rewrite_url(&self, url: &str) -> String {
        url.to_string()
    }

    fn rewrite_post(&self, post: Post) -> Post {
        post
    }
}
