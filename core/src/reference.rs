//! Legal code articles and the penalty calculator built on them.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("invalid reference data: {0}")]
    InvalidData(#[from] serde_json::Error),

    #[error("unknown article '{0}'")]
    UnknownArticle(String),

    #[error("unknown code '{0}'")]
    UnknownCode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Criminal,
    Administrative,
    Traffic,
    Procedural,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::Criminal => "criminal",
            CodeKind::Administrative => "administrative",
            CodeKind::Traffic => "traffic",
            CodeKind::Procedural => "procedural",
        }
    }
}

impl FromStr for CodeKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "criminal" => Ok(CodeKind::Criminal),
            "administrative" => Ok(CodeKind::Administrative),
            "traffic" => Ok(CodeKind::Traffic),
            "procedural" => Ok(CodeKind::Procedural),
            other => Err(ReferenceError::UnknownCode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub code: CodeKind,
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Fine in in-game currency.
    #[serde(default)]
    pub fine: Option<u64>,
    #[serde(default)]
    pub jail_months: Option<u32>,
}

impl Article {
    fn matches(&self, needle: &str) -> bool {
        [&self.number, &self.title, &self.text]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltySummary {
    pub articles: Vec<String>,
    pub total_fine: u64,
    pub total_jail_months: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    articles: Vec<Article>,
}

impl ReferenceLibrary {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// Articles of `code` (all codes when `None`) whose number, title or text
    /// contains `query`, case-insensitively. Source order is kept.
    pub fn search(&self, code: Option<CodeKind>, query: Option<&str>) -> Vec<&Article> {
        let needle = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
        self.articles
            .iter()
            .filter(|a| code.map_or(true, |c| a.code == c))
            .filter(|a| needle.as_deref().map_or(true, |n| a.matches(n)))
            .collect()
    }

    /// Sums fines and jail terms of the selected articles. Each article counts
    /// once no matter how often it is selected.
    pub fn penalty(&self, article_ids: &[String]) -> Result<PenaltySummary, ReferenceError> {
        let mut seen = HashSet::new();
        let mut summary = PenaltySummary::default();
        for id in article_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let article = self
                .get(id)
                .ok_or_else(|| ReferenceError::UnknownArticle(id.clone()))?;
            summary.articles.push(article.number.clone());
            summary.total_fine = summary.total_fine.saturating_add(article.fine.unwrap_or(0));
            summary.total_jail_months =
                summary.total_jail_months.saturating_add(article.jail_months.unwrap_or(0));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"[
        {"id":"uk-12.1","code":"criminal","number":"12.1","title":"Угон транспортного средства","text":"Неправомерное завладение","jail_months":24},
        {"id":"koap-3.2","code":"administrative","number":"3.2","title":"Мелкое хулиганство","fine":5000},
        {"id":"pdd-1.4","code":"traffic","number":"1.4","title":"Превышение скорости","fine":1500,"jail_months":0}
    ]"#;

    fn library() -> ReferenceLibrary {
        ReferenceLibrary::from_json(DATA).unwrap()
    }

    #[test]
    fn search_by_code_and_query() {
        let lib = library();
        assert_eq!(lib.search(None, None).len(), 3);
        assert_eq!(lib.search(Some(CodeKind::Traffic), None)[0].id, "pdd-1.4");

        let hits = lib.search(None, Some("угон"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].number, "12.1");

        assert!(lib.search(Some(CodeKind::Procedural), Some("угон")).is_empty());
        assert_eq!(lib.search(None, Some("   ")).len(), 3);
    }

    #[test]
    fn penalty_sums_unique_articles() {
        let ids = vec!["uk-12.1".to_string(), "koap-3.2".to_string(), "koap-3.2".to_string()];
        let summary = library().penalty(&ids).unwrap();
        assert_eq!(summary.articles, vec!["12.1", "3.2"]);
        assert_eq!(summary.total_fine, 5000);
        assert_eq!(summary.total_jail_months, 24);
    }

    #[test]
    fn penalty_rejects_unknown_article() {
        let err = library().penalty(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, ReferenceError::UnknownArticle(id) if id == "nope"));
    }

    #[test]
    fn code_kind_parses_case_insensitively() {
        assert_eq!("Traffic".parse::<CodeKind>().unwrap(), CodeKind::Traffic);
        assert!("civil".parse::<CodeKind>().is_err());
    }

    #[test]
    fn penalty_totals_saturate() {
        let library = ReferenceLibrary::from_json(
            r#"[
                {"id":"a","code":"criminal","number":"1","title":"a","fine":18446744073709551615,"jail_months":4294967295},
                {"id":"b","code":"criminal","number":"2","title":"b","fine":10,"jail_months":10}
            ]"#,
        )
        .unwrap();
        let summary = library.penalty(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(summary.total_fine, u64::MAX);
        assert_eq!(summary.total_jail_months, u32::MAX);
    }
}
