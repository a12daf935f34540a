/// Remote backup and restore
///
/// Serializes the full store snapshot to the remote backup API under the
/// authenticated session's identity, and reconciles a remote snapshot back
/// by wholesale replacement. Remote is authoritative on restore: merging
/// consumable counts across devices is ambiguous, replacing avoids
/// double-crediting.
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::session::{SessionProvider, SessionToken};
use crate::store::EntitlementStore;
use crate::types::{EntitlementError, SnapshotEntry};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Remote backup API: `PUT /ledger` and `GET /ledger`, keyed by session.
#[async_trait]
pub trait RemoteBackup: Send + Sync {
    async fn put_ledger(
        &self,
        session: &SessionToken,
        snapshot: &[SnapshotEntry],
    ) -> Result<(), EntitlementError>;

    /// `Ok(None)` when the remote holds no prior backup.
    async fn get_ledger(
        &self,
        session: &SessionToken,
    ) -> Result<Option<Vec<SnapshotEntry>>, EntitlementError>;
}

#[derive(serde::Serialize)]
struct BackupRequest<'a> {
    session: &'a str,
    snapshot: &'a [SnapshotEntry],
}

pub struct HttpRemoteBackup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteBackup {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EntitlementError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EntitlementError::NetworkError(format!("failed to create HTTP client: {}", e)))?;
        Ok(HttpRemoteBackup {
            client,
            base_url: base_url.into(),
        })
    }

    fn map_request_error(e: reqwest::Error) -> EntitlementError {
        if e.is_timeout() {
            EntitlementError::NetworkError(
                "backup server timeout - check your internet connection".to_string(),
            )
        } else if e.is_connect() {
            EntitlementError::NetworkError(
                "cannot connect to backup server - check your internet connection".to_string(),
            )
        } else {
            EntitlementError::NetworkError(e.to_string())
        }
    }

    /// Shared status mapping for both ledger endpoints. `None` means the
    /// response body may be read; GET handles 404 before calling this.
    fn status_error(status: reqwest::StatusCode) -> Option<EntitlementError> {
        if status.is_success() {
            None
        } else if status == reqwest::StatusCode::UNAUTHORIZED {
            Some(EntitlementError::NotAuthenticated)
        } else {
            Some(EntitlementError::NetworkError(format!(
                "backup server error: {}",
                status
            )))
        }
    }
}

#[async_trait]
impl RemoteBackup for HttpRemoteBackup {
    async fn put_ledger(
        &self,
        session: &SessionToken,
        snapshot: &[SnapshotEntry],
    ) -> Result<(), EntitlementError> {
        let url = format!("{}/ledger", self.base_url);
        let body = BackupRequest {
            session: session.as_str(),
            snapshot,
        };

        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        match Self::status_error(response.status()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn get_ledger(
        &self,
        session: &SessionToken,
    ) -> Result<Option<Vec<SnapshotEntry>>, EntitlementError> {
        let url = format!("{}/ledger", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("session", session.as_str())])
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if let Some(error) = Self::status_error(status) {
            return Err(error);
        }

        let snapshot: Vec<SnapshotEntry> = response
            .json()
            .await
            .map_err(|e| EntitlementError::StoreCorrupt(format!("invalid remote snapshot: {}", e)))?;
        Ok(Some(snapshot))
    }
}

/// Talks to the remote collaborator and the store only, never to the UI.
pub struct SyncService {
    store: Arc<EntitlementStore>,
    session: Arc<dyn SessionProvider>,
    remote: Arc<dyn RemoteBackup>,
}

impl SyncService {
    pub fn new(
        store: Arc<EntitlementStore>,
        session: Arc<dyn SessionProvider>,
        remote: Arc<dyn RemoteBackup>,
    ) -> Self {
        SyncService {
            store,
            session,
            remote,
        }
    }

    /// Upload the full local snapshot. Returns the number of records sent.
    pub async fn backup(&self) -> Result<usize, EntitlementError> {
        let token = self
            .session
            .session_token()
            .ok_or(EntitlementError::NotAuthenticated)?;

        let snapshot = self.store.wire_snapshot();
        self.remote.put_ledger(&token, &snapshot).await?;
        info!(records = snapshot.len(), "ledger backed up");
        Ok(snapshot.len())
    }

    /// Fetch the remote snapshot and replace the local store wholesale.
    ///
    /// The fetched snapshot is validated in full before the swap; any
    /// failure leaves the local store exactly as it was.
    pub async fn restore(&self) -> Result<usize, EntitlementError> {
        let token = self
            .session
            .session_token()
            .ok_or(EntitlementError::NotAuthenticated)?;

        let entries = self
            .remote
            .get_ledger(&token)
            .await?
            .ok_or(EntitlementError::NoRemoteData)?;

        match self.store.replace_all(&entries) {
            Ok(count) => {
                info!(records = count, "ledger restored from remote");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "remote snapshot rejected; local store untouched");
                Err(e)
            }
        }
    }
}
