use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use log::{ debug, warn };
use reqwest::Client as HttpClient;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::chat::{ ChatRequest, ChatResponse, ErrorResponse, HealthResponse };

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service could not be reached at all.
    #[error("Transport failure: {0}")]
    Transport(String),
    /// The service answered with a non-2xx status.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
    },
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReply {
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RemoteResponder: Send + Sync {
    async fn respond(&self, message: &str) -> Result<RemoteReply, RemoteError>;

    async fn health(&self) -> Result<HealthResponse, RemoteError>;
}

/// Accepts bare hosts: localhost and loopback addresses get `http://`,
/// anything else `https://`.
pub fn normalize_api_url(raw: &str) -> Result<Url, RemoteError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidUrl(raw.to_string()));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        format!("http://{}", trimmed)
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&with_scheme).map_err(|_| RemoteError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(RemoteError::InvalidUrl(raw.to_string())),
    }
}

pub struct HttpRemoteResponder {
    http: HttpClient,
    chat_url: String,
    health_url: String,
}

impl HttpRemoteResponder {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base = normalize_api_url(api_url)?;
        let base = base.as_str().trim_end_matches('/').to_string();
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            chat_url: format!("{}/api/chat", base),
            health_url: format!("{}/api/health", base),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl RemoteResponder for HttpRemoteResponder {
    async fn respond(&self, message: &str) -> Result<RemoteReply, RemoteError> {
        let request = ChatRequest { message: Some(message.to_string()) };
        let resp = self.http
            .post(&self.chat_url)
            .json(&request)
            .send().await
            .map_err(RemoteError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>().await
                .ok()
                .map(|body| body.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
            debug!("Remote responder rejected request: {} {}", status, message);
            return Err(RemoteError::Rejected { status: status.as_u16(), message });
        }

        let body: ChatResponse = resp
            .json().await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let timestamp = match DateTime::parse_from_rfc3339(&body.timestamp) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring unparsable reply timestamp '{}': {}", body.timestamp, e);
                None
            }
        };
        Ok(RemoteReply { text: body.response, timestamp })
    }

    async fn health(&self) -> Result<HealthResponse, RemoteError> {
        let resp = self.http.get(&self.health_url).send().await.map_err(RemoteError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: format!("Server error: {}", status.as_u16()),
            });
        }
        resp.json().await.map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}
