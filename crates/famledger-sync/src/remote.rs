//! # Remote Service Contract
//!
//! The operations the engine performs against the remote ledger service,
//! per record type. [`ApiClient`](crate::http::ApiClient) is the HTTP
//! implementation; tests substitute scripted fakes.

use async_trait::async_trait;
use famledger_core::SyncRecord;

use crate::error::SyncResult;

/// Remote CRUD for one record type.
///
/// Every call either completes or fails within the client's own timeout.
#[async_trait]
pub trait RemoteApi<T: SyncRecord>: Send + Sync {
    /// Creates the record remotely. The returned copy may carry a
    /// server-assigned id.
    async fn create(&self, record: &T) -> SyncResult<T>;

    async fn update(&self, record: &T) -> SyncResult<T>;

    async fn delete(&self, id: &str) -> SyncResult<()>;

    /// Full current set of records for a family.
    async fn list(&self, family_id: &str) -> SyncResult<Vec<T>>;
}

// =============================================================================
// Token Source
// =============================================================================

/// Supplies the bearer token for each request.
///
/// Acquiring and refreshing tokens happens outside the engine.
pub trait TokenSource: Send + Sync {
    /// `None` sends the request without an `Authorization` header.
    fn access_token(&self) -> Option<String>;
}

/// A fixed token, typically from config.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        StaticToken(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}
