use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hardy_core::NewsItem;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::NewNews;
use crate::service::news_service::NewsStore;

#[derive(Clone)]
pub struct NewsRepository {
    pool: PgPool,
}

impl NewsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_news(row: PgRow) -> Result<NewsItem, AppError> {
    let read = |column: &str, e: sqlx::Error| AppError::db_query(format!("Failed to read {column}"), e);
    Ok(NewsItem {
        id: row.try_get("id").map_err(|e| read("id", e))?,
        title: row.try_get("title").map_err(|e| read("title", e))?,
        content: row.try_get("content").map_err(|e| read("content", e))?,
        author_name: row.try_get("author_name").map_err(|e| read("author_name", e))?,
        author_avatar: row.try_get("author_avatar").map_err(|e| read("author_avatar", e))?,
        image_url: row.try_get("image_url").map_err(|e| read("image_url", e))?,
        discord_message_id: row
            .try_get("discord_message_id")
            .map_err(|e| read("discord_message_id", e))?,
        created_at: row.try_get("created_at").map_err(|e| read("created_at", e))?,
    })
}

#[async_trait]
impl NewsStore for NewsRepository {
    async fn exists_by_message_id(&self, message_id: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM news WHERE discord_message_id = $1)",
        )
        .bind(message_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to look up news message {message_id}: {e}");
            AppError::db_query("Failed to look up news", e)
        })
    }

    async fn insert(&self, news: &NewNews) -> Result<Option<Uuid>, AppError> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO news
                (id, title, content, author_name, author_avatar, image_url, discord_message_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (discord_message_id) DO NOTHING
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&news.title)
        .bind(&news.content)
        .bind(&news.author_name)
        .bind(&news.author_avatar)
        .bind(&news.image_url)
        .bind(&news.discord_message_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert news '{}': {e}", news.title);
            AppError::db_query("Failed to save news", e)
        })
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<NewsItem>, AppError> {
        let rows = sqlx::query(
            "SELECT id, title, content, author_name, author_avatar, image_url,
                    discord_message_id, created_at
             FROM news
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch news: {e}");
            AppError::db_query("Failed to fetch news", e)
        })?;

        rows.into_iter().map(row_to_news).collect()
    }

    async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM news WHERE $1::timestamptz IS NULL OR created_at > $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to count unread news: {e}");
            AppError::db_query("Failed to count news", e)
        })
    }
}
