use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use tagwatch_common::PostRecord;

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

type PostRow = (
    String,            // id
    String,            // shortcode
    String,            // caption
    i64,               // likes_count
    i64,               // comments_count
    String,            // url
    bool,              // has_target_hashtag
    bool,              // notified
    DateTime<Utc>,     // scraped_at
    DateTime<Utc>,     // created_at
    DateTime<Utc>,     // updated_at
);

const POST_COLUMNS: &str = "id, shortcode, caption, likes_count, comments_count, url, \
                            has_target_hashtag, notified, scraped_at, created_at, updated_at";

fn row_to_record(r: PostRow) -> PostRecord {
    PostRecord {
        id: r.0,
        shortcode: r.1,
        caption: r.2,
        likes_count: r.3,
        comments_count: r.4,
        url: r.5,
        has_target_hashtag: r.6,
        notified: r.7,
        scraped_at: r.8,
        created_at: r.9,
        updated_at: r.10,
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Postgres-backed post store. One row per shortcode; rows are never deleted
/// by the pipeline.
#[derive(Clone)]
pub struct PostgresPostStore {
    pool: PgPool,
}

impl PostgresPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the posts table if it does not exist yet. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                shortcode TEXT NOT NULL UNIQUE,
                caption TEXT NOT NULL DEFAULT '',
                likes_count BIGINT NOT NULL DEFAULT 0,
                comments_count BIGINT NOT NULL DEFAULT 0,
                url TEXT NOT NULL,
                has_target_hashtag BOOLEAN NOT NULL DEFAULT FALSE,
                notified BOOLEAN NOT NULL DEFAULT FALSE,
                scraped_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_pending \
             ON posts (notified) WHERE has_target_hashtag",
        )
        .execute(&self.pool)
        .await?;

        info!("Post store migration complete");
        Ok(())
    }

    pub async fn find_by_shortcode(&self, shortcode: &str) -> Result<Option<PostRecord>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE shortcode = $1"
        ))
        .bind(shortcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_record))
    }

    pub async fn insert(&self, record: &PostRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, shortcode, caption, likes_count, comments_count, url,
                               has_target_hashtag, notified, scraped_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&record.id)
        .bind(&record.shortcode)
        .bind(&record.caption)
        .bind(record.likes_count)
        .bind(record.comments_count)
        .bind(&record.url)
        .bind(record.has_target_hashtag)
        .bind(record.notified)
        .bind(record.scraped_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite the mutable fields of an existing row. `shortcode`, `id`,
    /// `created_at`, and `notified` are deliberately not in the SET list.
    pub async fn update(&self, record: &PostRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET caption = $2,
                likes_count = $3,
                comments_count = $4,
                url = $5,
                has_target_hashtag = $6,
                scraped_at = $7,
                updated_at = $8
            WHERE shortcode = $1
            "#,
        )
        .bind(&record.shortcode)
        .bind(&record.caption)
        .bind(record.likes_count)
        .bind(record.comments_count)
        .bind(&record.url)
        .bind(record.has_target_hashtag)
        .bind(record.scraped_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All posts, most recently scraped first.
    pub async fn list_all(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY scraped_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Posts with a hashtag match that have not been notified yet.
    pub async fn list_pending(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE has_target_hashtag AND NOT notified"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Flip `notified` to true. Monotonic: nothing ever sets it back.
    pub async fn mark_notified(&self, shortcode: &str) -> Result<()> {
        sqlx::query("UPDATE posts SET notified = TRUE, updated_at = $2 WHERE shortcode = $1")
            .bind(shortcode)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
