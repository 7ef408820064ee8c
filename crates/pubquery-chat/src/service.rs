//! Query backend seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use pubquery_core::config::ServiceConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChatError, QueryError};
use crate::types::QueryResponse;

/// Translates a natural-language question into a [`QueryResponse`].
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, text: &str) -> Result<QueryResponse, QueryError>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// [`QueryService`] over `POST {base_url}{query_path}` with a JSON body.
pub struct HttpQueryService {
    client: reqwest::Client,
    endpoint: Url,
    backend: String,
}

impl HttpQueryService {
    /// Build a client for the configured backend.
    pub fn new(config: &ServiceConfig) -> Result<Self, ChatError> {
        let url = config.query_url();
        let endpoint =
            Url::parse(&url).map_err(|e| ChatError::InvalidEndpoint(format!("{}: {}", url, e)))?;

        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Client(e.to_string()))?;

        tracing::debug!(endpoint = %endpoint, timeout_secs = config.timeout_secs, "Query client ready");

        Ok(Self {
            client,
            endpoint,
            backend: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Map a transport failure onto the failure taxonomy.
    fn classify_transport(&self, err: reqwest::Error) -> QueryError {
        if err.is_builder() {
            QueryError::request(err.to_string())
        } else {
            if err.is_timeout() {
                tracing::debug!(error = %err, "Query timed out");
            } else if err.is_connect() {
                tracing::debug!(error = %err, "Query backend refused connection");
            }
            QueryError::connectivity(self.backend.clone())
        }
    }
}

#[async_trait]
impl QueryService for HttpQueryService {
    async fn query(&self, text: &str) -> Result<QueryResponse, QueryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&QueryRequest { query: text })
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::server(
                status.as_u16(),
                detail_from_body(&body),
                status.canonical_reason(),
            ));
        }

        // A response arrived, so body problems are the server's.
        let body = response
            .bytes()
            .await
            .map_err(|e| invalid_body(status.as_u16(), e))?;
        serde_json::from_slice::<QueryResponse>(&body)
            .map_err(|e| invalid_body(status.as_u16(), e))
    }
}

fn invalid_body(status: u16, err: impl std::fmt::Display) -> QueryError {
    QueryError::Server {
        status,
        detail: format!("invalid response body: {}", err),
    }
}

/// Pull the `detail` field out of an error body, if there is one.
fn detail_from_body(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
