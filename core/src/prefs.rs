//! Per-feature preference values kept in local storage.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::NewsItem;
use crate::storage::{load_json, save_json, KeyValueStorage};

pub const QUIZ_STATS_KEY: &str = "hardy-quiz-stats";
pub const FAVORITES_KEY: &str = "hardy-favorites";
pub const NEWS_LAST_SEEN_KEY: &str = "hardy-news-last-seen";

/// A value owned by one storage key. Every `update` is a full
/// read-modify-write of that key; last write wins.
#[derive(Debug, Clone)]
pub struct Stored<S, T> {
    storage: S,
    key: &'static str,
    value: T,
}

impl<S, T> Stored<S, T>
where
    S: KeyValueStorage,
    T: Serialize + DeserializeOwned + Default,
{
    pub fn load(storage: S, key: &'static str) -> Self {
        let value = load_json(&storage, key);
        Self { storage, key, value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value);
        save_json(&self.storage, self.key, &self.value);
        result
    }

    pub fn reset(&mut self) {
        self.value = T::default();
        self.storage.remove(self.key);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizStats {
    pub attempts: u32,
    pub total_correct: u32,
    pub total_questions: u32,
    pub best_score_percent: u8,
    pub last_score_percent: u8,
}

impl QuizStats {
    /// Records one finished quiz. Attempts with no questions are ignored.
    pub fn record_attempt(&mut self, correct: u32, total: u32) {
        if total == 0 {
            return;
        }
        let correct = correct.min(total);
        let percent = ((correct as f64 / total as f64) * 100.0).round() as u8;

        self.attempts = self.attempts.saturating_add(1);
        self.total_correct = self.total_correct.saturating_add(correct);
        self.total_questions = self.total_questions.saturating_add(total);
        self.last_score_percent = percent;
        self.best_score_percent = self.best_score_percent.max(percent);
    }

    pub fn accuracy_percent(&self) -> u8 {
        if self.total_questions == 0 {
            return 0;
        }
        ((self.total_correct as f64 / self.total_questions as f64) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(Vec<String>);

impl Favorites {
    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, article_id: &str) -> bool {
        self.0.iter().any(|id| id == article_id)
    }

    /// Adds or removes `article_id`; returns whether it is now a favorite.
    pub fn toggle(&mut self, article_id: &str) -> bool {
        if let Some(pos) = self.0.iter().position(|id| id == article_id) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(article_id.to_string());
            true
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewsLastSeen(Option<DateTime<Utc>>);

impl NewsLastSeen {
    pub fn seen_at(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn mark_seen(&mut self, now: DateTime<Utc>) {
        self.0 = Some(now);
    }

    pub fn is_unread(&self, item: &NewsItem) -> bool {
        self.0.map_or(true, |seen| item.created_at > seen)
    }

    pub fn unread_count(&self, items: &[NewsItem]) -> usize {
        items.iter().filter(|item| self.is_unread(item)).count()
    }
}

pub fn news_last_seen<S: KeyValueStorage>(storage: S) -> Stored<S, NewsLastSeen> {
    Stored::load(storage, NEWS_LAST_SEEN_KEY)
}
