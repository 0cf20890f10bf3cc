//! Weighted substring ranking for search results.
//!
//! Every term is counted in every field and weighted by where it was found:
//!
//! | field       | weight |
//! |-------------|--------|
//! | title       | 10     |
//! | categories  | 10     |
//! | description | 3      |
//! | content     | 1      |
//!
//! The score of a post is the sum over terms and fields of
//! `occurrences × weight`. Posts are then ordered by descending score with a
//! stable sort, so ties keep the order storage returned them in.

use crate::filter::Field;
use crate::models::Post;
use crate::search::count_occurrences;
use rayon::prelude::*;

/// Below this many candidates scoring runs on the calling thread.
const PARALLEL_SCORE_THRESHOLD: usize = 256;

/// Reorders a candidate set by relevance to the query terms
pub trait Ranker: Send + Sync {
    fn rank(&self, posts: Vec<Post>, terms: &[String]) -> Vec<Post>;
}

/// Per-field weight used by [`WeightedRanker`]
pub const fn field_weight(field: Field) -> u64 {
    match field {
        Field::Title => 10,
        Field::Categories => 10,
        Field::Description => 3,
        Field::Content => 1,
    }
}

/// Score a single post against lowercase terms.
pub fn score_post(post: &Post, terms: &[String]) -> u64 {
    // Each field is lowercased once per post, not once per term
    let fields: [(Field, String); 4] =
        Field::ALL.map(|field| (field, post.field_text(field).to_lowercase()));

    terms.iter().fold(0u64, |score, term| {
        fields.iter().fold(score, |score, (field, text)| {
            let hits = count_occurrences(text, term) as u64;
            score.saturating_add(hits.saturating_mul(field_weight(*field)))
        })
    })
}

/// Default ranker: fixed field weights, stable descending order
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRanker;

impl WeightedRanker {
    /// Scores in input order
    pub fn scores(&self, posts: &[Post], terms: &[String]) -> Vec<u64> {
        if posts.len() < PARALLEL_SCORE_THRESHOLD {
            posts.iter().map(|p| score_post(p, terms)).collect()
        } else {
            // Indexed par_iter keeps input order on collect
            posts.par_iter().map(|p| score_post(p, terms)).collect()
        }
    }
}

impl Ranker for WeightedRanker {
    fn rank(&self, posts: Vec<Post>, terms: &[String]) -> Vec<Post> {
        let scores = self.scores(&posts, terms);
        let mut scored: Vec<(u64, Post)> = scores.into_iter().zip(posts).collect();
        // sort_by is stable: equal scores keep storage order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, post)| post).collect()
    }
}

/// Leaves candidates in storage order
#[derive(Debug, Clone, Copy, Default)]
pub struct UnrankedOrder;

impl Ranker for UnrankedOrder {
    fn rank(&self, posts: Vec<Post>, _terms: &[String]) -> Vec<Post> {
        posts
    }
}
