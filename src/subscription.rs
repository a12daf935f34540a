/// Subscription lifecycle
///
/// Activation trusts its caller: purchase eligibility (including the
/// one-active-subscription rule) lives in the validator, and activation
/// does not re-check it. Activity is always the derived read
/// `expires_at > now`; expiry is never swept by a timer.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::EntitlementStore;
use crate::types::{EntitlementError, EntitlementRecord};

/// Status of the currently active subscription, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SubscriptionManager {
    store: Arc<EntitlementStore>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<EntitlementStore>) -> Self {
        SubscriptionManager { store }
    }

    /// Mark `id` active until `expires_at`.
    pub fn activate(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EntitlementRecord, EntitlementError> {
        self.store.activate_subscription(id, expires_at)
    }

    /// Deactivate `id`. Idempotent: cancelling an absent or inactive
    /// subscription is a no-op success.
    pub fn cancel(&self, id: &str) -> Result<(), EntitlementError> {
        self.store.cancel_subscription(id)
    }

    /// Recomputed on every call; never cached.
    pub fn is_active(&self, id: &str) -> bool {
        let now = Utc::now();
        self.store
            .get(id)
            .map(|record| record.is_active_subscription(now))
            .unwrap_or(false)
    }

    /// The active subscription, if any.
    pub fn active(&self) -> Option<SubscriptionInfo> {
        let record = self.store.active_subscription()?;
        let expires_at = record.expires_at()?;
        Some(SubscriptionInfo {
            id: record.id,
            expires_at,
        })
    }
}
