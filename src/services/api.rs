//! Thin JSON client for the upstream REST API.
//!
//! Every service in this module tree goes through [`ApiClient`], which owns
//! the shared `reqwest::Client`, attaches the caller's bearer token and maps
//! upstream error statuses onto [`AppError`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    fn builder(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Upstream {} {}", method, url);
        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> AppResult<T> {
        let response = self.builder(Method::GET, path, token).send().await?;
        decode(response).await
    }

    pub async fn get_query<Q, T>(&self, path: &str, query: &Q, token: Option<&str>) -> AppResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.builder(Method::GET, path, token).query(query).send().await?;
        decode(response).await
    }

    pub async fn send<B, T>(&self, method: Method, path: &str, body: &B, token: Option<&str>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.builder(method, path, token).json(body).send().await?;
        decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B, token: Option<&str>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, body, token).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B, token: Option<&str>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, path, body, token).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B, token: Option<&str>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, body, token).await
    }

    /// POST without a body, ignoring whatever the upstream returns on success.
    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> AppResult<()> {
        let response = self.builder(Method::POST, path, token).send().await?;
        check(response).await.map(|_| ())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let response = check(response).await?;
    Ok(response.json::<T>().await?)
}

/// Turn a non-success upstream response into the matching [`AppError`].
async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body).unwrap_or_else(|| {
        status.canonical_reason().unwrap_or("unexpected status").to_string()
    });
    warn!("Upstream returned {}: {}", status, message);

    Err(match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized,
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::BadRequest(message),
        other => AppError::Upstream {
            status: other.as_u16(),
            message,
        },
    })
}

fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}
