//! HTTP client for the external analysis service.
//!
//! Thin wrapper over the service's fixed contract: `POST /auth/token`,
//! `POST /auth/register`, `POST /analyze`, `GET /analyses`. The bearer token
//! is passed explicitly per call; there is no ambient session state. Failed
//! requests surface as `UpstreamFailure` and are never retried here.

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::AnalysisResult;
use crate::error::AnalysisError;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    raw: &'a str,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                AnalysisError::UpstreamFailure(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Exchanges credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AnalysisError> {
        self.token_request("/auth/token", username, password).await
    }

    /// Registers a new account and returns its bearer token.
    pub async fn register(&self, username: &str, password: &str) -> Result<String, AnalysisError> {
        self.token_request("/auth/register", username, password)
            .await
    }

    /// Submits raw email text for analysis.
    pub async fn analyze(&self, token: &str, raw: &str) -> Result<AnalysisResult, AnalysisError> {
        let path = "/analyze";
        debug!("POST {} ({} bytes of email text)", path, raw.len());

        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(&AnalyzeRequest { raw })
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        let response = error_for_status(path, response).await?;

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|e| decode_error(path, e))
    }

    /// Fetches past analyses in server-defined order, read-only.
    pub async fn history(&self, token: &str) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let path = "/analyses";
        debug!("GET {path}");

        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        let response = error_for_status(path, response).await?;

        response
            .json::<Vec<AnalysisResult>>()
            .await
            .map_err(|e| decode_error(path, e))
    }

    async fn token_request(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<String, AnalysisError> {
        debug!("POST {path} for user '{username}'");

        let response = self
            .http
            .post(self.url(path))
            .json(&CredentialsRequest { username, password })
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        let response = error_for_status(path, response).await?;

        let token: TokenResponse = response.json().await.map_err(|e| decode_error(path, e))?;
        Ok(token.access_token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport_error(path: &str, error: reqwest::Error) -> AnalysisError {
    AnalysisError::UpstreamFailure(format!("request to {path} failed: {error}"))
}

fn decode_error(path: &str, error: reqwest::Error) -> AnalysisError {
    AnalysisError::UpstreamFailure(format!("invalid response body from {path}: {error}"))
}

async fn error_for_status(
    path: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AnalysisError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(AnalysisError::UpstreamFailure(format!(
        "{path} returned {status}: {detail}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/", 5).unwrap();
        assert_eq!(client.url("/analyze"), "http://localhost:8000/analyze");

        let client = ApiClient::new("http://localhost:8000", 5).unwrap();
        assert_eq!(client.url("/analyses"), "http://localhost:8000/analyses");
    }

    #[test]
    fn test_request_bodies_match_contract() {
        let analyze = serde_json::to_value(AnalyzeRequest { raw: "From: a@b" }).unwrap();
        assert_eq!(analyze, serde_json::json!({"raw": "From: a@b"}));

        let credentials = serde_json::to_value(CredentialsRequest {
            username: "analyst",
            password: "secret",
        })
        .unwrap();
        assert_eq!(
            credentials,
            serde_json::json!({"username": "analyst", "password": "secret"})
        );
    }
}
