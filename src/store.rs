use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// The three append-only log collections, partitioned per endpoint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCollection {
    ExerciseSearch,
    RecipeSearch,
    NutritionLookup,
}

impl LogCollection {
    pub fn table(self) -> &'static str {
        match self {
            LogCollection::ExerciseSearch => "exercise_search_log",
            LogCollection::RecipeSearch => "recipe_search_log",
            LogCollection::NutritionLookup => "nutrition_lookup_log",
        }
    }
}

/// Payload of a single log insert. `created_at` comes from the server clock
/// at insertion time; entries are never mutated or deleted afterwards.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub query: Value,
    pub results: Option<i32>,
    pub items: Option<Value>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SearchLogRow {
    pub id: i64,
    pub query: Value,
    pub results: Option<i32>,
    pub created_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait SearchLogStore: Send + Sync {
    async fn insert(&self, collection: LogCollection, entry: NewLogEntry) -> anyhow::Result<()>;

    /// Most recent exercise searches, `created_at` descending. If no stored
    /// row carries a timestamp (legacy data), falls back to insertion-order
    /// id descending.
    async fn recent_exercise_searches(&self, limit: i64) -> anyhow::Result<Vec<SearchLogRow>>;
}

#[derive(Clone)]
pub struct PgSearchLogStore {
    db: PgPool,
}

impl PgSearchLogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SearchLogStore for PgSearchLogStore {
    async fn insert(&self, collection: LogCollection, entry: NewLogEntry) -> anyhow::Result<()> {
        let sql = format!(
            "INSERT INTO {} (query, results, items, created_at) VALUES ($1, $2, $3, $4)",
            collection.table()
        );
        sqlx::query(&sql)
            .bind(entry.query)
            .bind(entry.results)
            .bind(entry.items)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.db)
            .await
            .with_context(|| format!("insert into {}", collection.table()))?;
        Ok(())
    }

    async fn recent_exercise_searches(&self, limit: i64) -> anyhow::Result<Vec<SearchLogRow>> {
        let rows = sqlx::query_as::<_, SearchLogRow>(
            r#"
            SELECT id, query, results, created_at
            FROM exercise_search_log
            WHERE created_at IS NOT NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        if !rows.is_empty() {
            return Ok(rows);
        }

        let rows = sqlx::query_as::<_, SearchLogRow>(
            r#"
            SELECT id, query, results, created_at
            FROM exercise_search_log
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
