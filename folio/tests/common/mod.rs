//! Shared fixtures for the integration tests

use chrono::{Duration, TimeZone, Utc};
use folio::config::BlogConfig;
use folio::database::Database;
use folio::memory::MemoryRepository;
use folio::models::Post;
use folio::PostStore;
use std::sync::Arc;
use tempfile::TempDir;

/// Six published posts and one draft.
///
/// Post `n` has title `Title{n}`, description `description{n}`, content
/// `content{n}` and categories `categories{n},cat{x}` where `catc` is shared
/// by posts 4 and 5 only. Post 6 is the newest.
pub fn blog_posts() -> Vec<Post> {
    let base = Utc.with_ymd_and_hms(2023, 3, 1, 9, 30, 0).unwrap();
    let tags = ["cata", "cata", "catb", "catc", "catc", "catd"];

    let mut posts: Vec<Post> = tags
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            let n = i + 1;
            Post::new(format!("Title{}", n))
                .with_description(format!("description{}", n))
                .with_categories(format!("categories{},{}", n, tag))
                .with_content(format!("content{}", n))
                .published_at(base + Duration::days(n as i64))
        })
        .collect();

    posts.push(
        Post::new("Title7")
            .with_description("description7")
            .with_categories("categories7,catc")
            .with_content("content7"),
    );
    posts
}

pub fn config(items_per_page: u32) -> BlogConfig {
    BlogConfig {
        title: "Folio test blog".to_string(),
        items_per_page,
        base_url: "https://blog.example.org/".to_string(),
        ..BlogConfig::default()
    }
}

pub fn memory_store(items_per_page: u32) -> PostStore<MemoryRepository> {
    let repo = MemoryRepository::with_posts(blog_posts());
    PostStore::new(Arc::new(repo), config(items_per_page)).unwrap()
}

/// SQLite-backed store; keep the `TempDir` alive for the test's duration
pub fn sqlite_store(items_per_page: u32) -> (PostStore<Database>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path().join("blog.sqlite")).unwrap();
    db.insert_posts(&blog_posts()).unwrap();
    let store = PostStore::new(Arc::new(db), config(items_per_page)).unwrap();
    (store, temp_dir)
}

pub fn titles(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.title.as_str()).collect()
}
