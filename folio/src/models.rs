//! Core data models for folio

use crate::filter::Field;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// POST
// ─────────────────────────────────────────────────────────────────────────────

/// A blog post as owned by the storage layer.
///
/// The search path never mutates a post in place; URL rewriting consumes it and
/// returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// `None` until the post has been inserted
    pub id: Option<i64>,
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Category tags joined with commas, e.g. `"rust,search"`
    pub categories: String,
    pub content: String,
    pub cover_url: Option<String>,
    /// Publication time; `None` marks a draft
    pub published: Option<DateTime<Utc>>,
}

impl Post {
    /// Create an unpublished post. The slug is derived from the title.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: None,
            slug: slugify(&title),
            title,
            description: String::new(),
            categories: String::new(),
            content: String::new(),
            cover_url: None,
            published: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_categories(mut self, categories: impl Into<String>) -> Self {
        self.categories = categories.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }

    pub fn published_at(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    pub fn is_published(&self) -> bool {
        self.published.is_some()
    }

    /// Raw text of a searchable field
    pub fn field_text(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::Categories => &self.categories,
            Field::Content => &self.content,
        }
    }
}

/// Lowercase ASCII-alphanumeric slug with single dashes between words
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
