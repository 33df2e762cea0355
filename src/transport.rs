use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::errors::{PipedriveError, Result};
use crate::wire_models::decode_data;

/// Query parameter Pipedrive reads the API token from.
pub const API_TOKEN_PARAM: &str = "api_token";

/// HTTP session bound to one Pipedrive company domain.
///
/// Every request built through [`Session::request`] carries the API token as
/// a query parameter and a JSON content type. The underlying connections are
/// released when the session is dropped.
pub struct Session {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl Session {
    /// Opens a session with the default 30s timeout.
    ///
    /// # Arguments
    ///
    /// * `api_token` - The Pipedrive API token.
    /// * `base_url` - Company domain, e.g. `https://acme.pipedrive.com`.
    pub fn open(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::open_with_timeout(
            api_token,
            base_url,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn open_with_timeout(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(PipedriveError::Config("API token cannot be empty".to_string()));
        }

        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| PipedriveError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PipedriveError::Config(format!("Failed to create Pipedrive client: {}", e))
            })?;

        tracing::debug!("Opened Pipedrive session for {}", base_url);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request for `path` (e.g. `/v1/leads`) with the token attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .query(&[(API_TOKEN_PARAM, self.api_token.as_str())])
    }

    /// Sends a request and returns the decoded `data` payload.
    pub async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        // Token stays out of logs
        tracing::debug!(
            "{} {}{}?{}=[REDACTED]",
            method,
            self.base_url,
            path,
            API_TOKEN_PARAM
        );

        let mut builder = self.request(method.clone(), path);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PipedriveError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Pipedrive {} {} returned {}: {}", method, path, status, error_text);
            return Err(PipedriveError::Http {
                status,
                body: error_text,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| PipedriveError::Request(e.without_url()))?;
        let body: Value = serde_json::from_str(&text).map_err(|e| {
            PipedriveError::Protocol(format!("Response from {} is not JSON: {}", path, e))
        })?;

        decode_data(body)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.call::<T, Value>(Method::GET, path, query, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::PATCH, path, &[], Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let session = Session::open("token", "https://acme.pipedrive.com/");
        assert!(session.is_ok());
        assert_eq!(session.unwrap().base_url(), "https://acme.pipedrive.com");
    }

    #[test]
    fn test_session_rejects_bad_input() {
        assert!(matches!(
            Session::open("", "https://acme.pipedrive.com"),
            Err(PipedriveError::Config(_))
        ));
        assert!(matches!(
            Session::open("token", "not a url"),
            Err(PipedriveError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_request_carries_token() {
        let session = Session::open("secret", "https://acme.pipedrive.com").unwrap();
        let request = session
            .request(Method::GET, "/v1/leadLabels")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://acme.pipedrive.com/v1/leadLabels?api_token=secret"
        );
    }

    #[tokio::test]
    async fn test_debug_redacts_token() {
        let session = Session::open("secret", "https://acme.pipedrive.com").unwrap();
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret"));
    }
}
