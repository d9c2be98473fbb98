//! HTTP client for the practice backend.
//!
//! # Endpoints used
//!
//! | Method | Path            | Body / Response                                        |
//! |--------|-----------------|--------------------------------------------------------|
//! | POST   | `/clients/link` | `{"email"}` → `{"success", "client"?, "error"?}`       |
//! | GET    | `/clients`      | → `{"emails": [...]}`                                  |

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ClientLinker, RosterSource};
use crate::error::{LinkError, LinkResult};
use crate::models::{LinkOutcome, LinkedClient};
use crate::validation::Roster;

/// Answer of `POST /clients/link`.
#[derive(Debug, Deserialize)]
struct LinkResponse {
    success: bool,
    #[serde(default)]
    client: Option<LinkedClient>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Answer of `GET /clients`.
#[derive(Debug, Deserialize)]
struct RosterResponse {
    emails: Vec<String>,
}

/// Practice backend client
#[derive(Clone)]
pub struct HttpClientDirectory {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpClientDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ClientLinker for HttpClientDirectory {
    async fn link(&self, email: &str) -> LinkResult<LinkOutcome> {
        let url = format!("{}/clients/link", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(|e| LinkError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LinkError::Http(e.to_string()))?;

        interpret_link_response(status, &body)
    }
}

#[async_trait]
impl RosterSource for HttpClientDirectory {
    async fn fetch_roster(&self) -> LinkResult<Roster> {
        let url = format!("{}/clients", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| LinkError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::Http(format!("roster request returned {}", status)));
        }

        let body: RosterResponse = response
            .json()
            .await
            .map_err(|e| LinkError::InvalidResponse(e.to_string()))?;

        Ok(Roster::new(body.emails))
    }
}

/// Turn a link response into an outcome.
///
/// A JSON body wins over the status code, so business-rule rejections
/// (`{"success": false, "error": ...}`) keep their message on 4xx answers.
fn interpret_link_response(status: u16, body: &str) -> LinkResult<LinkOutcome> {
    let parsed: LinkResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if (200..300).contains(&status) => {
            return Err(LinkError::InvalidResponse(e.to_string()));
        }
        Err(_) => return Err(LinkError::Http(format!("link request returned status {}", status))),
    };

    if parsed.success {
        return Ok(LinkOutcome {
            client: parsed.client,
            message: parsed.message.filter(|m| !m.trim().is_empty()),
        });
    }

    match parsed.error.filter(|e| !e.trim().is_empty()) {
        Some(error) => Err(LinkError::Rejected(error)),
        None => Err(LinkError::Unknown),
    }
}
