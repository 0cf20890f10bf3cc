//! Blog configuration consumed by the query handler
//!
//! Passed explicitly into [`crate::PostStore`]; nothing reads it from global
//! state. Loaded from TOML, every key optional:
//!
//! ```toml
//! title = "My Blog"
//! items_per_page = 5
//! paging_url_part_format = "page={page}"
//! search_query_url_part_format = "q={query}"
//! base_url = "https://example.com/blog"
//! ```

use crate::interface::{BlogModel, FolioError};
use crate::pager::PAGE_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder replaced by the URL-encoded search text
pub const QUERY_PLACEHOLDER: &str = "{query}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    pub title: String,
    pub description: String,
    pub cover_url: Option<String>,
    pub cover_caption: Option<String>,
    pub cover_link: Option<String>,
    /// Page size when a query does not override it
    pub items_per_page: u32,
    /// Query-string part for paging links, must contain `{page}`
    pub paging_url_part_format: String,
    /// Query-string part appended to paging links on search, must contain `{query}`
    pub search_query_url_part_format: String,
    /// Public base URL that relative file URLs resolve against
    pub base_url: String,
    /// Token in stored URLs and content that stands for `base_url`
    pub url_placeholder: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            description: String::new(),
            cover_url: None,
            cover_caption: None,
            cover_link: None,
            items_per_page: 5,
            paging_url_part_format: "page={page}".to_string(),
            search_query_url_part_format: "q={query}".to_string(),
            base_url: "http://localhost/".to_string(),
            url_placeholder: "%URL%".to_string(),
        }
    }
}

impl BlogConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, FolioError> {
        let config: Self = toml::from_str(raw)
            .map_err(|err| FolioError::Config(format!("parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, FolioError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| FolioError::Config(format!("read config {}: {err}", path.display())))?;
        Self::from_toml_str(&raw)
            .map_err(|err| FolioError::Config(format!("{}: {err}", path.display())))
    }

    pub fn validate(&self) -> Result<(), FolioError> {
        if self.items_per_page == 0 {
            return Err(FolioError::Config("items_per_page must be positive".to_string()));
        }
        if !self.paging_url_part_format.contains(PAGE_PLACEHOLDER) {
            return Err(FolioError::Config(format!(
                "paging_url_part_format must contain {PAGE_PLACEHOLDER}"
            )));
        }
        if !self.search_query_url_part_format.contains(QUERY_PLACEHOLDER) {
            return Err(FolioError::Config(format!(
                "search_query_url_part_format must contain {QUERY_PLACEHOLDER}"
            )));
        }
        url::Url::parse(&self.base_url)
            .map_err(|err| FolioError::Config(format!("invalid base_url {:?}: {err}", self.base_url)))?;
        Ok(())
    }

    /// Paging link template for a search, with the search text form-encoded
    pub fn search_url_format(&self, search_query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(search_query.as_bytes()).collect();
        format!(
            "{}&{}",
            self.paging_url_part_format,
            self.search_query_url_part_format.replace(QUERY_PLACEHOLDER, &encoded)
        )
    }

    pub fn blog_model(&self) -> BlogModel {
        BlogModel {
            title: self.title.clone(),
            description: self.description.clone(),
            cover_url: self.cover_url.clone(),
            cover_caption: self.cover_caption.clone(),
            cover_link: self.cover_link.clone(),
        }
    }
}
