use std::time::Duration;

use anyhow::Context;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Error body returned by the API, or a transport failure.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Thin JSON client for the directory API. Unwraps the success envelope.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(base_url).with_context(|| format!("invalid server URL '{}'", base_url))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> anyhow::Result<url::Url> {
        self.base_url.join(path).with_context(|| format!("invalid API path '{}'", path))
    }

    /// URL built from individually encoded path segments.
    pub fn segment_url(&self, segments: &[&str]) -> anyhow::Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("server URL '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.request::<()>(Method::GET, self.url(path)?, None).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().extend_pairs(query);
        self.request::<()>(Method::GET, url, None).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        self.request(Method::POST, self.url(path)?, Some(body)).await
    }

    pub async fn delete(&self, segments: &[&str]) -> anyhow::Result<Value> {
        self.request::<()>(Method::DELETE, self.segment_url(segments)?, None).await
    }

    /// Raw GET returning the status with the body, for endpoints like /health
    /// that answer with a payload on failure too.
    pub async fn get_with_status(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        let url = self.url(path)?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| RequestError::Transport { url: url.to_string(), source })?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn request<B: Serialize>(&self, method: Method, url: url::Url, body: Option<&B>) -> anyhow::Result<Value> {
        let mut request = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| RequestError::Transport { url: url.to_string(), source })?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|source| RequestError::Transport { url: url.to_string(), source })?;

        if !status.is_success() {
            return Err(RequestError::Api {
                status,
                code: body["code"].as_str().unwrap_or("UNKNOWN").to_string(),
                message: body["message"].as_str().unwrap_or("request failed").to_string(),
            }
            .into());
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base() {
        let client = ApiClient::new("http://localhost:5010").unwrap();
        assert_eq!(client.url("/api/users").unwrap().as_str(), "http://localhost:5010/api/users");
    }

    #[test]
    fn encodes_path_segments() {
        let client = ApiClient::new("http://localhost:5010/").unwrap();
        let url = client.segment_url(&["api", "groups", "M&A / Tax"]).unwrap();
        assert_eq!(url.path(), "/api/groups/M&A%20%2F%20Tax");
    }
}
