/// Session presence seam
///
/// Authentication is an external collaborator; the ledger only ever asks
/// "is a session present" before a backup or restore. Nothing here manages
/// credentials.
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Opaque session token under which remote backups are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait SessionProvider: Send + Sync {
    fn session_token(&self) -> Option<SessionToken>;
}

/// In-memory provider for hosts and tests. The host sets the token after
/// login and clears it on logout; clearing it does not touch the ledger.
#[derive(Default)]
pub struct MemorySessionProvider {
    token: RwLock<Option<SessionToken>>,
}

impl MemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(token: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.set_token(token);
        provider
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(SessionToken(token.into()));
    }

    pub fn clear_token(&self) {
        *self.token.write() = None;
    }
}

impl SessionProvider for MemorySessionProvider {
    fn session_token(&self) -> Option<SessionToken> {
        self.token.read().clone()
    }
}
