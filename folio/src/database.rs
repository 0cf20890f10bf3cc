//! SQLite post repository
//!
//! Single `posts` table. Filter trees are translated to a parameterized
//! `WHERE` clause; field matching goes through the `folio_contains` scalar
//! function so SQL and in-memory evaluation agree on case folding.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::filter::Filter;
use crate::interface::{FolioError, PostRepository};
use crate::models::Post;
use crate::search::contains_term;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Query interrupted")]
    Interrupted,
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Fallback Tokio runtime for blocking work when no runtime is current.
static FALLBACK_RUNTIME: Lazy<Option<tokio::runtime::Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .ok()
});

/// Fixed nanosecond precision: ordering compares the stored text, and equal
/// instants must not collapse into id order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

const POST_COLUMNS: &str =
    "id, slug, title, description, categories, content, coverUrl, published";

const ORDER_CLAUSE: &str = "ORDER BY published IS NULL, published DESC, id DESC";

fn format_db_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse timestamp string from database to DateTime<Utc>
fn parse_db_timestamp(timestamp_str: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok()
}

/// Register SQL functions and pragmas on every pooled connection
fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
    ")?;
    conn.create_scalar_function(
        "folio_contains",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack = ctx.get::<Option<String>>(0)?;
            let term = ctx.get::<String>(1)?;
            Ok(haystack.is_some_and(|h| contains_term(&h, &term)))
        },
    )?;
    Ok(())
}

/// Translate a filter into a SQL boolean expression, pushing bound values
fn filter_sql(filter: &Filter, values: &mut Vec<Value>) -> String {
    match filter {
        Filter::Published => "published IS NOT NULL".to_string(),
        Filter::FieldContains { field, term } => {
            values.push(Value::Text(term.clone()));
            format!("folio_contains({}, ?{})", field.column(), values.len())
        }
        Filter::And(children) if children.is_empty() => "1".to_string(),
        Filter::Or(children) if children.is_empty() => "0".to_string(),
        Filter::And(children) => join_sql(children, " AND ", values),
        Filter::Or(children) => join_sql(children, " OR ", values),
    }
}

/// Emit children as a balanced tree of binary `op` nodes.
///
/// SQLite parses a flat `a OR b OR ...` chain left-deep, so long queries would
/// hit its expression depth limit (1000). Halving keeps the depth logarithmic.
/// Parameters are still pushed left to right.
fn join_sql(children: &[Filter], op: &str, values: &mut Vec<Value>) -> String {
    match children {
        [only] => format!("({})", filter_sql(only, values)),
        _ => {
            let (left, right) = children.split_at(children.len() / 2);
            let left = join_operand(left, op, values);
            let right = join_operand(right, op, values);
            format!("({}{}{})", left, op, right)
        }
    }
}

fn join_operand(children: &[Filter], op: &str, values: &mut Vec<Value>) -> String {
    match children {
        [only] => filter_sql(only, values),
        _ => join_sql(children, op, values),
    }
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ffi::ErrorCode::OperationInterrupted
    )
}

/// Thread-safe database wrapper using connection pooling
///
/// Cloning is cheap: clones share the pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(init_connection);

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);

        // In-memory needs single connection to maintain state
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                categories TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                coverUrl TEXT,
                published TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published);
            CREATE INDEX IF NOT EXISTS idx_posts_slug ON posts(slug);
        "#)?;
        Ok(())
    }

    /// Get the database size in bytes
    pub fn database_size(&self) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        Ok(page_count * page_size)
    }

    /// Total number of posts, drafts included
    pub fn count_items(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a post. Returns the post ID.
    pub fn insert_post(&self, post: &Post) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, post)
    }

    /// Insert many posts in one transaction. Returns their IDs in input order.
    pub fn insert_posts(&self, posts: &[Post]) -> DatabaseResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let ids = posts
            .iter()
            .map(|post| Self::insert_with(&tx, post))
            .collect::<DatabaseResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(ids)
    }

    fn insert_with(conn: &Connection, post: &Post) -> DatabaseResult<i64> {
        let published = post.published.as_ref().map(format_db_timestamp);
        conn.execute(
            r#"INSERT INTO posts (id, slug, title, description, categories, content, coverUrl, published)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                post.id,
                post.slug,
                post.title,
                post.description,
                post.categories,
                post.content,
                post.cover_url,
                published,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Count posts matching `filter`
    pub fn count_matching(&self, filter: &Filter) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        Self::count_with(&conn, filter)
    }

    /// Fetch posts matching `filter` in storage order, windowed by skip/take
    pub fn fetch_matching(&self, filter: &Filter, skip: usize, take: usize) -> DatabaseResult<Vec<Post>> {
        let conn = self.get_conn()?;
        Self::fetch_with(&conn, filter, skip, take)
    }

    fn count_with(conn: &Connection, filter: &Filter) -> DatabaseResult<u64> {
        let mut values = Vec::new();
        let where_clause = filter_sql(filter, &mut values);
        let sql = format!("SELECT COUNT(*) FROM posts WHERE {}", where_clause);
        let count: i64 = conn.query_row(&sql, rusqlite::params_from_iter(values), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn fetch_with(conn: &Connection, filter: &Filter, skip: usize, take: usize) -> DatabaseResult<Vec<Post>> {
        let mut values = Vec::new();
        let where_clause = filter_sql(filter, &mut values);
        // SQLite treats a negative LIMIT as unbounded
        values.push(Value::Integer(i64::try_from(take).unwrap_or(-1)));
        let limit_idx = values.len();
        values.push(Value::Integer(i64::try_from(skip).unwrap_or(i64::MAX)));
        let offset_idx = values.len();

        let sql = format!(
            "SELECT {} FROM posts WHERE {} {} LIMIT ?{} OFFSET ?{}",
            POST_COLUMNS, where_clause, ORDER_CLAUSE, limit_idx, offset_idx
        );
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(rusqlite::params_from_iter(values), Self::row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Run `op` on a pooled connection, interrupting SQLite when `token` fires.
    fn run_interruptible<T>(
        &self,
        token: &CancellationToken,
        runtime: &tokio::runtime::Handle,
        op: impl FnOnce(&Connection) -> DatabaseResult<T>,
    ) -> DatabaseResult<T> {
        use tokio_util::task::AbortOnDropHandle;

        if token.is_cancelled() {
            return Err(DatabaseError::Interrupted);
        }

        let conn = self.get_conn()?;
        let interrupt_handle = conn.get_interrupt_handle();

        let token_clone = token.clone();
        let watcher = runtime.spawn(async move {
            token_clone.cancelled().await;
            interrupt_handle.interrupt();
        });
        let _abort_guard = AbortOnDropHandle::new(watcher);

        match op(&conn) {
            Err(DatabaseError::Sqlite(e)) if is_interrupt(&e) => Err(DatabaseError::Interrupted),
            // A token cancelled mid-query that SQLite finished anyway still counts as cancelled
            Ok(_) if token.is_cancelled() => Err(DatabaseError::Interrupted),
            other => other,
        }
    }

    /// Count with SQLite C-level interrupt support.
    pub fn count_matching_interruptible(
        &self,
        filter: &Filter,
        token: &CancellationToken,
        runtime: &tokio::runtime::Handle,
    ) -> DatabaseResult<u64> {
        self.run_interruptible(token, runtime, |conn| Self::count_with(conn, filter))
    }

    /// Fetch with SQLite C-level interrupt support.
    pub fn fetch_matching_interruptible(
        &self,
        filter: &Filter,
        skip: usize,
        take: usize,
        token: &CancellationToken,
        runtime: &tokio::runtime::Handle,
    ) -> DatabaseResult<Vec<Post>> {
        self.run_interruptible(token, runtime, |conn| Self::fetch_with(conn, filter, skip, take))
    }

    fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
        let published: Option<String> = row.get(7)?;
        let published = match published {
            Some(raw) => Some(parse_db_timestamp(&raw).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    format!("invalid published timestamp {:?}", raw).into(),
                )
            })?),
            None => None,
        };
        Ok(Post {
            id: Some(row.get(0)?),
            slug: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            categories: row.get(4)?,
            content: row.get(5)?,
            cover_url: row.get(6)?,
            published,
        })
    }
}

/// Flatten a blocking task's outcome. A panic is a storage failure, not a cancellation.
fn join_blocking<T>(
    joined: Result<DatabaseResult<T>, tokio::task::JoinError>,
) -> Result<T, FolioError> {
    match joined {
        Ok(result) => result.map_err(FolioError::from),
        Err(join_error) if join_error.is_panic() => Err(FolioError::DatabaseError(format!(
            "storage task panicked: {}",
            join_error
        ))),
        Err(_) => Err(FolioError::Cancelled),
    }
}

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
fn runtime_handle() -> Result<tokio::runtime::Handle, FolioError> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return Ok(handle);
    }
    FALLBACK_RUNTIME
        .as_ref()
        .map(|rt| rt.handle().clone())
        .ok_or_else(|| FolioError::DatabaseError("no tokio runtime available".to_string()))
}

#[async_trait::async_trait]
impl PostRepository for Database {
    async fn count(&self, filter: &Filter, token: &CancellationToken) -> Result<u64, FolioError> {
        if token.is_cancelled() {
            return Err(FolioError::Cancelled);
        }
        let runtime = runtime_handle()?;
        let runtime_for_closure = runtime.clone();
        let db = self.clone();
        let filter = filter.clone();
        let token = token.clone();

        let handle = runtime.spawn_blocking(move || {
            db.count_matching_interruptible(&filter, &token, &runtime_for_closure)
        });

        join_blocking(handle.await)
    }

    async fn fetch(
        &self,
        filter: &Filter,
        skip: usize,
        take: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Post>, FolioError> {
        if token.is_cancelled() {
            return Err(FolioError::Cancelled);
        }
        let runtime = runtime_handle()?;
        let runtime_for_closure = runtime.clone();
        let db = self.clone();
        let filter = filter.clone();
        let token = token.clone();

        let handle = runtime.spawn_blocking(move || {
            db.fetch_matching_interruptible(&filter, skip, take, &token, &runtime_for_closure)
        });

        join_blocking(handle.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(days)
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_posts(&[
            Post::new("Rust Search").with_categories("rust,search").published_at(ts(0)),
            Post::new("Draft about Rust"),
            Post::new("Paging").with_content("RUST appears in the body").published_at(ts(2)),
            Post::new("Unrelated").with_description("nothing to see").published_at(ts(1)),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.count_items().unwrap(), 0);
        assert!(db.database_size().unwrap() > 0);
    }

    #[test]
    fn test_insert_and_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let post = Post::new("Hello")
            .with_description("desc")
            .with_categories("a,b")
            .with_content("body")
            .with_cover_url("files/cover.png")
            .published_at(ts(3) + Duration::nanoseconds(1_500_123));
        let id = db.insert_post(&post).unwrap();
        assert!(id > 0);

        let fetched = db.fetch_matching(&Filter::published(), 0, usize::MAX).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], Post { id: Some(id), ..post });
    }

    #[test]
    fn test_same_millisecond_orders_by_full_precision() {
        let db = Database::open_in_memory().unwrap();
        let base = ts(0) + Duration::milliseconds(1);
        db.insert_posts(&[
            Post::new("later").published_at(base + Duration::microseconds(500)),
            Post::new("earlier").published_at(base),
        ])
        .unwrap();

        let posts = db.fetch_matching(&Filter::published(), 0, usize::MAX).unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["later", "earlier"]);
    }

    #[test]
    fn test_count_published_only() {
        let db = seeded();
        assert_eq!(db.count_items().unwrap(), 4);
        assert_eq!(db.count_matching(&Filter::published()).unwrap(), 3);
    }

    #[test]
    fn test_search_filter_matches_case_insensitively() {
        let db = seeded();
        let filter = Filter::search(&["rust"]);
        let posts = db.fetch_matching(&filter, 0, usize::MAX).unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        // Newest first, draft excluded
        assert_eq!(titles, vec!["Paging", "Rust Search"]);
        assert_eq!(db.count_matching(&filter).unwrap(), 2);
    }

    #[test]
    fn test_sql_agrees_with_in_memory_filter() {
        let db = seeded();
        let all = db.fetch_matching(&Filter::And(vec![]), 0, usize::MAX).unwrap();
        for raw in ["rust", "see", "search paging", "nothing", "zzz", "ру"] {
            let terms = crate::search::parse_terms(raw);
            let filter = Filter::search(&terms);
            let expected: Vec<Option<i64>> =
                all.iter().filter(|p| filter.matches(p)).map(|p| p.id).collect();
            let actual: Vec<Option<i64>> = db
                .fetch_matching(&filter, 0, usize::MAX)
                .unwrap()
                .into_iter()
                .map(|p| p.id)
                .collect();
            assert_eq!(actual, expected, "query {:?}", raw);
        }
    }

    #[test]
    fn test_fetch_window() {
        let db = seeded();
        let page = db.fetch_matching(&Filter::published(), 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Unrelated");
        assert!(db.fetch_matching(&Filter::published(), 10, 5).unwrap().is_empty());
    }

    #[test]
    fn test_empty_combinators() {
        let db = seeded();
        assert_eq!(db.count_matching(&Filter::And(vec![])).unwrap(), 4);
        assert_eq!(db.count_matching(&Filter::Or(vec![])).unwrap(), 0);
    }

    #[test]
    fn test_filter_sql_shape() {
        let mut values = Vec::new();
        let sql = filter_sql(&Filter::search(&["a"]), &mut values);
        assert_eq!(
            sql,
            "(published IS NOT NULL AND ((folio_contains(title, ?1) OR folio_contains(description, ?2)) \
             OR (folio_contains(categories, ?3) OR folio_contains(content, ?4))))"
        );
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], Value::Text("a".to_string()));
    }

    #[test]
    fn test_filter_sql_single_child() {
        let mut values = Vec::new();
        let sql = filter_sql(&Filter::And(vec![Filter::Published]), &mut values);
        assert_eq!(sql, "(published IS NOT NULL)");
        assert!(values.is_empty());
    }

    #[test]
    fn test_many_terms_stay_within_expression_depth() {
        let db = seeded();
        let mut terms: Vec<String> = (0..1000).map(|i| format!("filler{}", i)).collect();
        terms.push("paging".to_string());
        let filter = Filter::search(&terms);

        assert_eq!(db.count_matching(&filter).unwrap(), 1);
        let posts = db.fetch_matching(&filter, 0, usize::MAX).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Paging");
    }

    #[test]
    fn test_parse_db_timestamp() {
        assert_eq!(parse_db_timestamp("2024-01-01 12:00:00.000"), Some(ts(0)));
        assert_eq!(
            parse_db_timestamp("2024-01-01 12:00:00.000001500"),
            Some(ts(0) + Duration::nanoseconds(1_500))
        );
        assert_eq!(
            parse_db_timestamp(&format_db_timestamp(&(ts(0) + Duration::nanoseconds(7)))),
            Some(ts(0) + Duration::nanoseconds(7))
        );
        assert_eq!(parse_db_timestamp("2024-01-01 12:00:00"), Some(ts(0)));
        assert_eq!(parse_db_timestamp("yesterday"), None);
    }

    #[tokio::test]
    async fn test_repository_trait() {
        let db = seeded();
        let token = CancellationToken::new();
        assert_eq!(db.count(&Filter::published(), &token).await.unwrap(), 3);
        let posts = db.fetch(&Filter::published(), 0, 2, &token).await.unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_panicked_task_is_database_error() {
        let handle = tokio::task::spawn_blocking(|| -> DatabaseResult<u64> {
            panic!("connection state corrupted");
        });
        assert!(matches!(
            join_blocking(handle.await),
            Err(FolioError::DatabaseError(_))
        ));
    }

    #[tokio::test]
    async fn test_aborted_task_is_cancelled() {
        let handle = tokio::spawn(std::future::pending::<DatabaseResult<u64>>());
        handle.abort();
        assert!(matches!(join_blocking(handle.await), Err(FolioError::Cancelled)));
    }

    #[tokio::test]
    async fn test_repository_cancelled() {
        let db = seeded();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            db.count(&Filter::published(), &token).await,
            Err(FolioError::Cancelled)
        ));
        assert!(matches!(
            db.fetch(&Filter::published(), 0, 1, &token).await,
            Err(FolioError::Cancelled)
        ));
    }
}
