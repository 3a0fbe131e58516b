//! HTTP-backed provider implementation
//!
//! Speaks a small JSON contract with whatever decision/generation
//! service the deployment points at: `POST {base}/decide` and
//! `POST {base}/generate`. Failures are classified by status code so
//! callers can tell retryable transport trouble from a response that
//! arrived broken.

use super::{DecisionProvider, DecisionRequest, Generator, ProviderError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub struct HttpProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DecideResponse {
    /// Raw plan JSON, passed through to the Director for parsing
    plan: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

impl HttpProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::network(format!("HTTP client construction: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut req = self.client.post(format!("{}{path}", self.base_url)).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::timeout(format!("provider call timed out: {e}"))
            } else {
                ProviderError::network(format!("provider unreachable: {e}"))
            }
        })?;
        classify_status(response.status())?;
        Ok(response)
    }
}

fn classify_status(status: StatusCode) -> Result<(), ProviderError> {
    if status.is_success() {
        return Ok(());
    }
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::auth(format!("provider rejected credentials ({status})"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::server_error(format!("provider rate limited ({status})"))
        }
        s if s.is_server_error() => {
            ProviderError::server_error(format!("provider server error ({status})"))
        }
        s => ProviderError::malformed(format!("unexpected provider status ({s})")),
    };
    Err(err)
}

#[async_trait]
impl DecisionProvider for HttpProvider {
    async fn decide(&self, request: &DecisionRequest) -> Result<String, ProviderError> {
        let response = self.post_json("/decide", request).await?;
        let body: DecideResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("decide response: {e}")))?;
        Ok(body.plan.to_string())
    }
}

#[async_trait]
impl Generator for HttpProvider {
    async fn generate(&self, instructions: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({ "instructions": instructions });
        let response = self.post_json("/generate", &body).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("generate response: {e}")))?;
        if body.text.is_empty() {
            return Err(ProviderError::malformed("generate returned empty text"));
        }
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(classify_status(StatusCode::OK).is_ok());
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED).unwrap_err().kind,
            crate::provider::ProviderErrorKind::Auth
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY).unwrap_err().kind,
            crate::provider::ProviderErrorKind::ServerError
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS).unwrap_err().kind,
            crate::provider::ProviderErrorKind::ServerError
        );
        assert_eq!(
            classify_status(StatusCode::IM_A_TEAPOT).unwrap_err().kind,
            crate::provider::ProviderErrorKind::Malformed
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let p = HttpProvider::new("http://localhost:9er/", None, Duration::from_secs(1));
        // Construction itself doesn't validate the URL, only the client
        assert!(p.is_ok());
        assert_eq!(p.unwrap().base_url, "http://localhost:9er");
    }
}
