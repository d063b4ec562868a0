//! Wikipedia recent-changes edit-rate collector.
//!
//! Grounded on `collectors/WikipediaCollector.py`: queries the MediaWiki
//! `action=query&list=recentchanges` API for `[now - collection_window,
//! now]`, namespace 0, `rctype=edit|new`. A failed query still emits
//! `{edit_count: 0.0, query_success: 0.0}` rather than suppressing the
//! sample — the one invariant the distilled spec calls out explicitly.

use crate::collector::Collector;
use crate::config::WikipediaCollectorConfig;
use crate::error::CollectorError;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use telemetry_schema::MetricEntry;

const SOURCE: &str = "wikipedia";
const NAMESPACE_ARTICLES: u32 = 0;
const API_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct RecentChangesResponse {
    query: Option<RecentChangesQuery>,
}

#[derive(Debug, Deserialize)]
struct RecentChangesQuery {
    recentchanges: Vec<serde_json::Value>,
}

/// Samples edit activity on one Wikipedia language edition.
pub struct WikipediaCollector {
    device_name: String,
    api_url: String,
    user_agent: String,
    collection_window: u64,
    http: reqwest::Client,
}

impl WikipediaCollector {
    pub fn new(device_name: impl Into<String>, config: &WikipediaCollectorConfig) -> Self {
        Self {
            device_name: device_name.into(),
            api_url: format!("https://{}.wikipedia.org/w/api.php", config.language),
            user_agent: config.user_agent.clone(),
            collection_window: config.collection_window,
            http: reqwest::Client::new(),
        }
    }

    async fn query_recent_changes(&self) -> Option<u32> {
        let end_time = Utc::now();
        let start_time = end_time - ChronoDuration::seconds(self.collection_window as i64);

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "recentchanges"),
                ("rcstart", &start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                ("rcend", &end_time.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                ("rcnamespace", &NAMESPACE_ARTICLES.to_string()),
                ("rclimit", "max"),
                ("format", "json"),
                ("rctype", "edit|new"),
            ])
            .header("User-Agent", &self.user_agent)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body: RecentChangesResponse = response.json().await.ok()?;
        Some(
            body.query
                .map(|q| q.recentchanges.len() as u32)
                .unwrap_or(0),
        )
    }
}

#[async_trait]
impl Collector for WikipediaCollector {
    async fn collect(&self) -> Result<Vec<MetricEntry>, CollectorError> {
        let edit_count = self.query_recent_changes().await;
        let (count, success) = match edit_count {
            Some(count) => (count as f64, 1.0),
            None => (0.0, 0.0),
        };

        Ok(vec![
            MetricEntry::new("edit_count", count, "edits").map_err(|e| {
                CollectorError::SamplingFailed {
                    source_name: SOURCE.to_string(),
                    message: e.to_string(),
                }
            })?,
            MetricEntry::new("query_success", success, "").map_err(|e| {
                CollectorError::SamplingFailed {
                    source_name: SOURCE.to_string(),
                    message: e.to_string(),
                }
            })?,
        ])
    }

    fn source(&self) -> &str {
        SOURCE
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn collector_for(api_url: String) -> WikipediaCollector {
        WikipediaCollector {
            device_name: "wikipedia-monitor-en".to_string(),
            api_url,
            user_agent: "test-agent".to_string(),
            collection_window: 60,
            http: reqwest::Client::new(),
        }
    }

    #[tokio::test]
    async fn successful_query_reports_edit_count_and_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": { "recentchanges": [ {}, {}, {} ] }
            })))
            .mount(&server)
            .await;

        let collector = collector_for(server.uri());
        let metrics = collector.collect().await.unwrap();

        let edit_count = metrics.iter().find(|m| m.name() == "edit_count").unwrap();
        let success = metrics.iter().find(|m| m.name() == "query_success").unwrap();
        assert_eq!(edit_count.value(), 3.0);
        assert_eq!(success.value(), 1.0);
    }

    #[tokio::test]
    async fn failed_query_still_emits_zero_count_and_failure_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let collector = collector_for(server.uri());
        let metrics = collector.collect().await.unwrap();

        let edit_count = metrics.iter().find(|m| m.name() == "edit_count").unwrap();
        let success = metrics.iter().find(|m| m.name() == "query_success").unwrap();
        assert_eq!(edit_count.value(), 0.0);
        assert_eq!(success.value(), 0.0);
    }
}
