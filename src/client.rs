//! HTTP client for a running prediction server.
//!
//! Used by `diamond-price predict --remote` to score a diamond without
//! loading the model locally. Configuration:
//! - `DIAMOND_PRICE_URL` - Base URL (default: `http://127.0.0.1:3000/api/v1`)

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::{ErrorResponse, PredictResponse};
use crate::config::FormConfig;
use crate::pipeline::FormInput;

/// Default URL for a local server.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server refused the submission (missing or invalid fields). Holds
    /// the server's message and any per-field warnings.
    #[error("{}", .0.error)]
    Rejected(ErrorResponse),

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct PriceClient {
    base_url: String,
    client: Client,
}

impl PriceClient {
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("DIAMOND_PRICE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert non-success statuses to [`ClientError`], preferring the
    /// server's own error message when the body carries one.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorResponse>(&body).unwrap_or(ErrorResponse {
            error: body,
            warnings: Vec::new(),
        });
        match status {
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                Err(ClientError::Rejected(error))
            }
            _ => Err(ClientError::Server(format!("{}: {}", status, error.error))),
        }
    }

    pub async fn predict(&self, input: &FormInput) -> Result<PredictResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/predict"))
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn form(&self) -> Result<FormConfig, ClientError> {
        let response = self.client.get(self.url("/form")).send().await?;
        self.handle_response(response).await
    }
}
