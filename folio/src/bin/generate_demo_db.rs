//! Generate a demo blog database with synthetic posts.
//!
//! This creates a SQLite database using the native Rust database code,
//! ensuring schema compatibility with the library.
//!
//! Usage:
//!     cargo run --release --bin generate-demo-db -- [--posts N] [--drafts N] [output_path]
//!
//! Default output: ./demo_blog.sqlite

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use folio::database::Database;
use folio::models::Post;
use rand::Rng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "generate-demo-db", about = "Seed a SQLite database with synthetic blog posts")]
struct Args {
    /// Output database path (replaced if it exists)
    #[arg(default_value = "demo_blog.sqlite")]
    output: PathBuf,

    /// Number of published posts
    #[arg(long, default_value_t = 500)]
    posts: usize,

    /// Number of unpublished drafts
    #[arg(long, default_value_t = 25)]
    drafts: usize,
}

/// Topics used for titles and categories
const TOPICS: &[&str] = &[
    "rust", "search", "ranking", "paging", "sqlite", "async", "tokio", "parsing",
    "testing", "deployment", "caching", "security",
];

const TITLE_TEMPLATES: &[&str] = &[
    "Getting started with {}",
    "Notes on {}",
    "A deeper look at {}",
    "{} in production",
    "Why {} matters",
    "Debugging {}",
];

/// Lorem ipsum words for filler text
const LOREM_WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit",
    "sed", "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore",
    "magna", "aliqua", "enim", "ad", "minim", "veniam", "quis", "nostrud",
    "exercitation", "ullamco", "laboris", "nisi", "aliquip", "ex", "ea", "commodo",
    "consequat", "duis", "aute", "irure", "in", "reprehenderit", "voluptate",
];

fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

fn generate_paragraphs<R: Rng>(rng: &mut R, paragraphs: usize, topic: &str) -> String {
    let mut parts = Vec::with_capacity(paragraphs);
    for _ in 0..paragraphs {
        let paragraph_len = rng.gen_range(30..=120);
        let mut words: Vec<&str> = (0..paragraph_len)
            .map(|_| pick(rng, LOREM_WORDS))
            .collect();

        // Sprinkle the topic so searches have something to rank
        if rng.gen_bool(0.5) {
            let insert_pos = rng.gen_range(0..words.len());
            words.insert(insert_pos, topic);
        }

        let mut paragraph = words.join(" ");
        if let Some(first) = paragraph.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        paragraph.push('.');
        parts.push(paragraph);
    }
    parts.join("\n\n")
}

fn generate_post<R: Rng>(rng: &mut R, index: usize, published: bool) -> Post {
    let topic = pick(rng, TOPICS);
    let second = pick(rng, TOPICS);
    let title = pick(rng, TITLE_TEMPLATES).replace("{}", topic);
    let title = format!("{} #{}", title, index + 1);

    let description: String = generate_paragraphs(rng, 1, second).chars().take(160).collect();
    let paragraphs = rng.gen_range(3..=12);
    let content = generate_paragraphs(rng, paragraphs, topic);

    let mut post = Post::new(title)
        .with_description(description)
        .with_categories(format!("{},{}", topic, second))
        .with_content(content);

    if rng.gen_bool(0.4) {
        post = post.with_cover_url(format!("%URL%/images/{}.jpg", topic));
    }
    if published {
        let age_minutes = rng.gen_range(0..(60 * 24 * 365 * 3));
        post = post.published_at(Utc::now() - Duration::minutes(age_minutes));
    }
    post
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let output_path = args.output;

    if output_path.exists() {
        std::fs::remove_file(&output_path)
            .with_context(|| format!("remove existing database {}", output_path.display()))?;
    }
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }

    info!(output = %output_path.display(), posts = args.posts, drafts = args.drafts, "generating demo database");

    let db = Database::open(&output_path).context("open database")?;

    let mut rng = rand::thread_rng();
    let total = args.posts + args.drafts;
    let posts: Vec<Post> = (0..total)
        .map(|i| generate_post(&mut rng, i, i < args.posts))
        .collect();

    for (batch_index, batch) in posts.chunks(100).enumerate() {
        db.insert_posts(batch).context("insert posts")?;
        info!(inserted = (batch_index * 100 + batch.len()).min(total), total, "progress");
    }

    info!(
        items = db.count_items()?,
        size_kb = db.database_size()? / 1024,
        "database created"
    );
    Ok(())
}
