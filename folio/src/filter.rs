//! Post filter tree
//!
//! A small predicate language that storage adapters either interpret directly
//! (`Filter::matches`) or translate into their native query syntax. A search
//! filter always has the shape
//!
//! ```text
//! And[ Published, Or[ title∋t1, description∋t1, categories∋t1, content∋t1, title∋t2, ... ] ]
//! ```

use crate::models::Post;
use crate::search::contains_term;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Searchable post fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Description,
    Categories,
    Content,
}

impl Field {
    /// Fields in the order sub-filters are generated for each term
    pub const ALL: [Field; 4] = [
        Field::Title,
        Field::Description,
        Field::Categories,
        Field::Content,
    ];

    /// Column name used by the SQLite adapter
    pub fn column(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Categories => "categories",
            Field::Content => "content",
        }
    }
}

/// Boolean predicate over a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Post has a publication timestamp
    Published,
    /// Field contains `term`, ignoring case. `term` is stored lowercase.
    FieldContains { field: Field, term: String },
    /// All children hold; empty matches everything
    And(Vec<Filter>),
    /// Any child holds; empty matches nothing
    Or(Vec<Filter>),
}

impl Filter {
    pub fn published() -> Self {
        Filter::Published
    }

    pub fn field_contains(field: Field, term: &str) -> Self {
        Filter::FieldContains {
            field,
            term: term.to_lowercase(),
        }
    }

    /// OR over every field of every distinct term, in first-seen order.
    /// Blank terms are skipped; repeats only matter to ranking.
    pub fn terms<S: AsRef<str>>(terms: &[S]) -> Self {
        let mut seen = HashSet::new();
        Filter::Or(
            terms
                .iter()
                .map(|term| term.as_ref().trim().to_lowercase())
                .filter(|term| !term.is_empty() && seen.insert(term.clone()))
                .flat_map(|term| {
                    Field::ALL
                        .into_iter()
                        .map(move |field| Filter::field_contains(field, &term))
                })
                .collect(),
        )
    }

    /// `Published AND (any field contains any term)`
    pub fn search<S: AsRef<str>>(terms: &[S]) -> Self {
        Filter::And(vec![Filter::Published, Filter::terms(terms)])
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut children) => {
                children.push(other);
                Filter::And(children)
            }
            this => Filter::And(vec![this, other]),
        }
    }

    /// Evaluate against an in-memory post
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Filter::Published => post.is_published(),
            Filter::FieldContains { field, term } => contains_term(post.field_text(*field), term),
            Filter::And(children) => children.iter().all(|f| f.matches(post)),
            Filter::Or(children) => children.iter().any(|f| f.matches(post)),
        }
    }

    /// Whether the tree contains the mandatory publication check at the top level
    pub fn requires_published(&self) -> bool {
        match self {
            Filter::Published => true,
            Filter::And(children) => children.iter().any(Filter::requires_published),
            _ => false,
        }
    }
}
