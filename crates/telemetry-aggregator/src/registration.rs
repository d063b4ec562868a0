//! Registers the aggregator and its collectors with the ingestion server.
//!
//! Grounded on `run_all.py`'s `wait_for_flask_healthy` and
//! `register_aggregator_and_devices`: poll `/health` until the server comes
//! up, then register the aggregator and one device per enabled collector.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry_schema::{AggregatorId, DeviceId, Source};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("server never became healthy within {seconds}s")]
    HealthTimeout { seconds: u64 },

    #[error("registration request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("registration failed with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Serialize)]
struct RegisterAggregatorRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct RegisterAggregatorResponse {
    aggregator_id: AggregatorId,
}

#[derive(Serialize)]
struct RegisterDeviceRequest<'a> {
    aggregator_id: AggregatorId,
    name: &'a str,
    source: &'a Source,
}

#[derive(Deserialize)]
struct RegisterDeviceResponse {
    device_id: DeviceId,
}

/// Talks to the ingestion server's registration and health endpoints.
pub struct RegistrationClient {
    base_url: String,
    http: reqwest::Client,
}

impl RegistrationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Poll `GET /health` every 0.5s until it returns 200, or give up after
    /// `timeout`.
    pub async fn wait_healthy(&self, timeout: Duration) -> Result<(), RegistrationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let poll_interval = Duration::from_millis(500);
        let health_url = format!("{}/health", self.base_url);

        loop {
            if let Ok(response) = self.http.get(&health_url).send().await {
                if response.status().is_success() {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RegistrationError::HealthTimeout {
                    seconds: timeout.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// `POST /aggregators {name}` — idempotent by name.
    pub async fn register_aggregator(&self, name: &str) -> Result<AggregatorId, RegistrationError> {
        let url = format!("{}/aggregators", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&RegisterAggregatorRequest { name })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrationError::Rejected { status, body });
        }

        let body: RegisterAggregatorResponse = response.json().await?;
        Ok(body.aggregator_id)
    }

    /// `POST /devices {aggregator_id, name, source}`.
    pub async fn register_device(
        &self,
        aggregator_id: AggregatorId,
        name: &str,
        source: &Source,
    ) -> Result<DeviceId, RegistrationError> {
        let url = format!("{}/devices", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&RegisterDeviceRequest {
                aggregator_id,
                name,
                source,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrationError::Rejected { status, body });
        }

        let body: RegisterDeviceResponse = response.json().await?;
        Ok(body.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn wait_healthy_returns_once_the_server_answers_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = RegistrationClient::new(server.uri());
        client.wait_healthy(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn wait_healthy_times_out_when_server_never_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = RegistrationClient::new(server.uri());
        let result = client.wait_healthy(Duration::from_millis(600)).await;
        assert!(matches!(
            result,
            Err(RegistrationError::HealthTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn register_aggregator_returns_the_issued_id() {
        let server = MockServer::start().await;
        let id = AggregatorId::new();
        Mock::given(method("POST"))
            .and(path("/aggregators"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "aggregator_id": id.to_string()
            })))
            .mount(&server)
            .await;

        let client = RegistrationClient::new(server.uri());
        let returned = client.register_aggregator("edge-1").await.unwrap();
        assert_eq!(returned, id);
    }

    #[tokio::test]
    async fn register_device_surfaces_rejection_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices"))
            .respond_with(ResponseTemplate::new(404).set_body_string("unknown aggregator"))
            .mount(&server)
            .await;

        let client = RegistrationClient::new(server.uri());
        let result = client
            .register_device(AggregatorId::new(), "local-1", &"local".to_string())
            .await;
        assert!(matches!(
            result,
            Err(RegistrationError::Rejected { status: 404, .. })
        ));
    }
}
