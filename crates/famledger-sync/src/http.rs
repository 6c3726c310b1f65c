//! # HTTP Remote Client
//!
//! [`RemoteApi`] over the ledger service's REST + JSON interface.
//!
//! ## Endpoints
//! ```text
//! ┌──────────────┬──────────────────────┬────────┬──────────────┬──────────────────────┐
//! │ Kind         │ Collection           │ Create │ Update       │ List                 │
//! ├──────────────┼──────────────────────┼────────┼──────────────┼──────────────────────┤
//! │ ledger_entry │ /api/v1/ledger       │ POST   │ PATCH /{id}  │ GET ?page=&size=     │
//! │              │                      │        │              │ → {content, last}    │
//! │ budget       │ /api/v1/budgets      │ POST   │ PUT /{id}    │ GET → [..]           │
//! │ category     │ /api/v1/categories   │ POST   │ PATCH /{id}  │ GET → [..]           │
//! └──────────────┴──────────────────────┴────────┴──────────────┴──────────────────────┘
//! ```
//!
//! ## Request Rules
//! - `Authorization: Bearer <token>` when the token source has one
//! - `Idempotency-Key: <record id>` on every create, so a retried create
//!   after a lost response is recognised by the server
//! - every request carries its own timeout; a timeout is an ordinary failure
//! - bodies are the service's shapes from [`crate::wire`], never the local
//!   structs; responses without `familyId` take the pushed record's family
//!   (create/update) or the listed family (list)
//! - an empty 2xx body on create/update means "accepted as sent"
//! - `DELETE` answering 404 counts as deleted
//! - listings are returned as decoded; dropping foreign records is the
//!   worker's job

use async_trait::async_trait;
use famledger_core::{Budget, Category, LedgerEntry};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteApi, StaticToken, TokenSource};
use crate::wire::WireRecord;

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Longest response body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Upper bound on pages fetched for one listing.
const MAX_PAGES: u32 = 10_000;

// =============================================================================
// Endpoint
// =============================================================================

/// How a record type maps onto the service's URL space.
pub trait Endpoint: WireRecord {
    /// Collection path, without trailing slash.
    const PATH: &'static str;

    /// Verb used for updates.
    const UPDATE_METHOD: Method;

    /// Whether the listing is paged (`{content, last}`) or a plain array.
    const PAGED: bool;
}

impl Endpoint for LedgerEntry {
    const PATH: &'static str = "/api/v1/ledger";
    const UPDATE_METHOD: Method = Method::PATCH;
    const PAGED: bool = true;
}

impl Endpoint for Budget {
    const PATH: &'static str = "/api/v1/budgets";
    const UPDATE_METHOD: Method = Method::PUT;
    const PAGED: bool = false;
}

impl Endpoint for Category {
    const PATH: &'static str = "/api/v1/categories";
    const UPDATE_METHOD: Method = Method::PATCH;
    const PAGED: bool = false;
}

/// One page of a paged listing.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    content: Vec<T>,
    #[serde(default = "default_last")]
    last: bool,
}

fn default_last() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the remote ledger service.
///
/// One instance serves every record type; share it behind an `Arc`.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    request_timeout: Duration,
    page_size: u32,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client from the `[remote]` config section.
    ///
    /// ## Arguments
    /// * `settings` - base URL, static token, timeouts and page size
    ///
    /// ## Example
    /// ```rust,ignore
    /// let api = Arc::new(ApiClient::new(&config.remote)?);
    /// ```
    pub fn new(settings: &RemoteSettings) -> SyncResult<Self> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(ApiClient {
            client,
            base_url,
            tokens: Arc::new(StaticToken::new(settings.access_token.clone())),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            page_size: settings.page_size.max(1),
        })
    }

    /// Replaces the config token with a dynamic source.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> SyncResult<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    fn record_url<T: Endpoint>(&self, id: &str) -> SyncResult<Url> {
        let mut url = self.url(T::PATH)?;
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.clone()))?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> SyncResult<RequestBuilder> {
        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.request_timeout);

        if let Some(token) = self.tokens.access_token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SyncError::Unauthorized("Invalid access token format".into()))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        Ok(builder)
    }

    /// Sends a request and returns status and body text.
    ///
    /// Non-2xx responses become errors.
    async fn send(&self, builder: RequestBuilder) -> SyncResult<(StatusCode, String)> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            debug!(status = %status, bytes = body.len(), "API response");
            return Ok((status, body));
        }

        debug!(status = %status, "API error response");
        Err(Self::status_error(status, &body))
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.request_timeout.as_secs())
        } else {
            err.into()
        }
    }

    fn status_error(status: StatusCode, body: &str) -> SyncError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| {
                let mut preview: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
                if body.chars().count() > MAX_ERROR_BODY_CHARS {
                    preview.push_str("...");
                }
                if preview.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    preview
                }
            });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized(message),
            _ => SyncError::Http {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Decodes a create/update response, or echoes the record on an empty body.
    fn decode_record<T: Endpoint>(body: &str, sent: &T) -> SyncResult<T> {
        if body.trim().is_empty() {
            return Ok(sent.clone());
        }
        let response: T::Response = serde_json::from_str(body)?;
        Ok(T::from_response(response, sent.family_id(), Some(sent)))
    }

    fn encode_request<T: Endpoint>(record: &T) -> SyncResult<Vec<u8>> {
        serde_json::to_vec(&record.to_request())
            .map_err(|e| SyncError::SerializationFailed(e.to_string()))
    }

    async fn list_paged<T: Endpoint>(&self, family_id: &str) -> SyncResult<Vec<T>> {
        let mut records = Vec::new();

        for page in 0..MAX_PAGES {
            let mut url = self.url(T::PATH)?;
            url.query_pairs_mut()
                .append_pair("familyId", family_id)
                .append_pair("page", &page.to_string())
                .append_pair("size", &self.page_size.to_string());

            let (_, body) = self.send(self.request(Method::GET, url)?).await?;
            let page: Page<T::Response> = serde_json::from_str(&body)?;
            let done = page.last || page.content.is_empty();
            records.extend(
                page.content
                    .into_iter()
                    .map(|r| T::from_response(r, family_id, None)),
            );
            if done {
                return Ok(records);
            }
        }

        warn!(kind = %T::KIND, pages = MAX_PAGES, "Listing did not report its last page");
        Ok(records)
    }

    async fn list_all<T: Endpoint>(&self, family_id: &str) -> SyncResult<Vec<T>> {
        let mut url = self.url(T::PATH)?;
        url.query_pairs_mut().append_pair("familyId", family_id);

        let (_, body) = self.send(self.request(Method::GET, url)?).await?;
        let listed: Vec<T::Response> = serde_json::from_str(&body)?;
        Ok(listed
            .into_iter()
            .map(|r| T::from_response(r, family_id, None))
            .collect())
    }
}

#[async_trait]
impl<T: Endpoint> RemoteApi<T> for ApiClient {
    async fn create(&self, record: &T) -> SyncResult<T> {
        let body = Self::encode_request(record)?;
        let builder = self
            .request(Method::POST, self.url(T::PATH)?)?
            .header(IDEMPOTENCY_KEY, record.id())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        let (_, response) = self.send(builder).await?;
        let created = Self::decode_record(&response, record)?;

        debug!(kind = %T::KIND, local_id = %record.id(), server_id = %created.id(), "Created remotely");
        Ok(created)
    }

    async fn update(&self, record: &T) -> SyncResult<T> {
        let body = Self::encode_request(record)?;
        let builder = self
            .request(T::UPDATE_METHOD, self.record_url::<T>(record.id())?)?
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        let (_, response) = self.send(builder).await?;
        let updated = Self::decode_record(&response, record)?;

        debug!(kind = %T::KIND, id = %record.id(), "Updated remotely");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        let builder = self.request(Method::DELETE, self.record_url::<T>(id)?)?;

        match self.send(builder).await {
            Ok(_) => {
                debug!(kind = %T::KIND, id = %id, "Deleted remotely");
                Ok(())
            }
            Err(SyncError::Http { status: 404, .. }) => {
                debug!(kind = %T::KIND, id = %id, "Already absent remotely");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self, family_id: &str) -> SyncResult<Vec<T>> {
        let listed: Vec<T> = if T::PAGED {
            self.list_paged(family_id).await?
        } else {
            self.list_all(family_id).await?
        };

        debug!(kind = %T::KIND, family_id = %family_id, count = listed.len(), "Listed remotely");
        Ok(listed)
    }
}
