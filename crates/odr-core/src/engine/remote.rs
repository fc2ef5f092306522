//! HTTP+SSE adapter for a hosted research engine.
//!
//! One round is one `POST {base}/research/stream` request; every SSE `data:`
//! field is one raw stream item, an SSE event named `error` fails the round,
//! and stream close is round exhaustion.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{EngineError, EngineErrorKind, EngineResult, EngineStream, ResearchEngine, ResearchKnobs};
use crate::config::EngineConfig;
use crate::core::history::Turn;

/// Engine reached when neither the environment nor the config says otherwise.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:2024";

/// Environment override for the engine base URL.
const ENV_BASE_URL: &str = "ODR_ENGINE_URL";
/// Environment override for the engine API key.
const ENV_API_KEY: &str = "ODR_ENGINE_API_KEY";

/// SSE event name the engine uses for mid-round failures.
const ERROR_EVENT: &str = "error";

#[derive(Serialize)]
struct RoundRequest<'a> {
    messages: &'a [Turn],
    config: &'a ResearchKnobs,
}

/// Client for a hosted research engine over HTTP+SSE.
#[derive(Debug)]
pub struct RemoteEngine {
    base_url: Url,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl RemoteEngine {
    /// Builds a client from connection settings, applying the environment
    /// overrides (`ODR_ENGINE_URL`, `ODR_ENGINE_API_KEY`).
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let raw = resolve_base_url(config);
        let base_url = Url::parse(raw.trim_end_matches('/')).map_err(|err| {
            EngineError::new(
                EngineErrorKind::Config,
                format!("Invalid engine base URL {raw:?}: {err}"),
            )
        })?;
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| config.effective_api_key().map(str::to_string));
        Ok(Self {
            base_url,
            api_key,
            http: reqwest::Client::new(),
        })
    }

    /// The resolved engine base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Probes `GET {base}/health`; `Ok` means the engine answered 2xx.
    pub async fn health(&self) -> EngineResult<()> {
        let url = self.endpoint("health");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| EngineError::stream(format!("Engine unreachable: {err}")))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EngineError::http_status(status.as_u16(), &body))
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

impl ResearchEngine for RemoteEngine {
    async fn open_round(&self, turns: &[Turn], knobs: &ResearchKnobs) -> EngineResult<EngineStream> {
        let url = self.endpoint("research/stream");
        debug!(url = %url, turns = turns.len(), "opening research round");

        let mut builder = self
            .http
            .post(&url)
            .header("accept", "text/event-stream")
            .json(&RoundRequest {
                messages: turns,
                config: knobs,
            });
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| EngineError::stream(format!("Engine request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::http_status(status.as_u16(), &body));
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) if event.event == ERROR_EVENT => {
                        Some(Err(EngineError::from_error_event(&event.data)))
                    }
                    Ok(event) => {
                        let data = event.data.trim();
                        if data.is_empty() {
                            return None;
                        }
                        Some(serde_json::from_str::<Value>(data).map_err(|err| {
                            EngineError::parse(format!("Malformed stream item: {err}"))
                        }))
                    }
                    Err(err) => Some(Err(EngineError::stream(format!("SSE stream error: {err}")))),
                }
            })
            .boxed();
        Ok(stream)
    }
}

/// Base-URL resolution precedence: environment, then config, then default.
pub fn resolve_base_url(config: &EngineConfig) -> String {
    if let Ok(url) = std::env::var(ENV_BASE_URL) {
        let url = url.trim();
        if !url.is_empty() {
            return url.to_string();
        }
    }
    config
        .effective_base_url()
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string()
}
