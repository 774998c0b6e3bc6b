use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hardy_core::{ChangeEvent, ChangeKind, NewsItem};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{IngestOutcome, NewNews};
use crate::service::change_feed::ChangeFeed;
use crate::service::normalize::normalize;

const NEWS_TABLE: &str = "news";
const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

/// Persistence seam for news rows.
#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn exists_by_message_id(&self, message_id: &str) -> Result<bool, AppError>;

    /// Inserts `news`; `None` when a row with the same Discord message id
    /// already exists.
    async fn insert(&self, news: &NewNews) -> Result<Option<Uuid>, AppError>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<NewsItem>, AppError>;

    async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError>;
}

#[derive(Clone)]
pub struct NewsService {
    store: Arc<dyn NewsStore>,
    feed: ChangeFeed,
}

impl NewsService {
    pub fn new(store: impl NewsStore + 'static, feed: ChangeFeed) -> Self {
        Self { store: Arc::new(store), feed }
    }

    /// Normalizes a webhook payload and stores it unless its upstream message
    /// id was already ingested.
    pub async fn ingest(&self, payload: &Value) -> Result<IngestOutcome, AppError> {
        let news = normalize(payload);
        if news.content.trim().is_empty() {
            return Err(AppError::BadRequest("Empty content".to_string()));
        }

        if let Some(message_id) = news.discord_message_id.as_deref() {
            if self.store.exists_by_message_id(message_id).await? {
                info!("news message {message_id} already ingested, skipping");
                return Ok(IngestOutcome::Duplicate);
            }
        }

        match self.store.insert(&news).await? {
            Some(id) => {
                info!("news {id} created: {}", news.title);
                self.feed
                    .publish(ChangeEvent::new(NEWS_TABLE, ChangeKind::Insert, Some(id.to_string())));
                Ok(IngestOutcome::Created { id })
            }
            None => Ok(IngestOutcome::Duplicate),
        }
    }

    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<NewsItem>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        self.store.list_recent(limit).await
    }

    pub async fn unread_count(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError> {
        self.store.count_since(since).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Duration;
    use serde_json::json;

    use super::*;

    /// In-memory stand-in for the Postgres repository.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryNewsStore {
        rows: Arc<Mutex<Vec<NewsItem>>>,
    }

    impl MemoryNewsStore {
        pub(crate) fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NewsStore for MemoryNewsStore {
        async fn exists_by_message_id(&self, message_id: &str) -> Result<bool, AppError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().any(|r| r.discord_message_id.as_deref() == Some(message_id)))
        }

        async fn insert(&self, news: &NewNews) -> Result<Option<Uuid>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            if news.discord_message_id.is_some()
                && rows.iter().any(|r| r.discord_message_id == news.discord_message_id)
            {
                return Ok(None);
            }
            let id = Uuid::new_v4();
            let created_at = Utc::now() + Duration::milliseconds(rows.len() as i64);
            rows.push(NewsItem {
                id,
                title: news.title.clone(),
                content: news.content.clone(),
                author_name: news.author_name.clone(),
                author_avatar: news.author_avatar.clone(),
                image_url: news.image_url.clone(),
                discord_message_id: news.discord_message_id.clone(),
                created_at,
            });
            Ok(Some(id))
        }

        async fn list_recent(&self, limit: i64) -> Result<Vec<NewsItem>, AppError> {
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows.truncate(limit as usize);
            Ok(rows)
        }

        async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().filter(|r| since.map_or(true, |s| r.created_at > s)).count() as i64)
        }
    }

    fn service() -> (NewsService, MemoryNewsStore, ChangeFeed) {
        let store = MemoryNewsStore::default();
        let feed = ChangeFeed::new(16);
        (NewsService::new(store.clone(), feed.clone()), store, feed)
    }

    fn discord_payload(id: &str) -> Value {
        json!({
            "id": id,
            "channel_id": "1",
            "content": "Технические работы в пятницу",
            "author": { "id": "2", "username": "staff" }
        })
    }

    #[tokio::test]
    async fn same_discord_message_is_stored_once() {
        let (svc, store, _) = service();
        let first = svc.ingest(&discord_payload("900")).await.unwrap();
        let second = svc.ingest(&discord_payload("900")).await.unwrap();

        assert!(matches!(first, IngestOutcome::Created { .. }));
        assert_eq!(second, IngestOutcome::Duplicate);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn payloads_without_message_id_are_not_deduplicated() {
        let (svc, store, _) = service();
        let payload = json!({ "content": "Без идентификатора" });
        svc.ingest(&payload).await.unwrap();
        svc.ingest(&payload).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn empty_content_is_rejected_without_insert() {
        let (svc, store, _) = service();
        let err = svc.ingest(&json!({ "title": "only a title", "content": "   " })).await.unwrap_err();
        assert_eq!(err.to_string(), "Empty content");
        assert!(err.is_validation());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn insert_publishes_change_event() {
        let (svc, _, feed) = service();
        let mut sub = feed.subscribe();
        let IngestOutcome::Created { id } = svc.ingest(&discord_payload("1")).await.unwrap() else {
            panic!("expected a created row");
        };

        let event = sub.next().await.unwrap();
        assert_eq!(event.table, "news");
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.row_id, Some(id.to_string()));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_clamped() {
        let (svc, _, _) = service();
        for n in 0..3 {
            svc.ingest(&json!({ "content": format!("news {n}") })).await.unwrap();
        }
        let items = svc.list(Some(0)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "news 2");
        assert_eq!(svc.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unread_counts_rows_after_timestamp() {
        let (svc, _, _) = service();
        svc.ingest(&json!({ "content": "old" })).await.unwrap();
        let cutoff = svc.list(None).await.unwrap()[0].created_at;
        svc.ingest(&json!({ "content": "new" })).await.unwrap();

        assert_eq!(svc.unread_count(None).await.unwrap(), 2);
        assert_eq!(svc.unread_count(Some(cutoff)).await.unwrap(), 1);
    }
}
