/// Payment platform seam
///
/// The native store integration that actually charges money lives outside
/// this crate; the ledger only ever sees its typed confirmation. A purchase
/// that is still in flight never credits the store — there is no optimistic
/// credit.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{EntitlementError, Item};

/// Successful purchase confirmation from the payment platform.
///
/// `granted_units` overrides the item's declared grant when present (the
/// platform is authoritative about what was actually sold); `expires_at`
/// must be present for subscription purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseConfirmation {
    pub transaction_id: Uuid,
    pub item_id: String,
    pub granted_units: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// External payment platform. Failures come back as the typed errors
/// `PaymentDeclined`, `AlreadyOwned`, or `NetworkError`; the ledger never
/// retries on its own.
#[async_trait]
pub trait PaymentPlatform: Send + Sync {
    async fn purchase(&self, item: &Item) -> Result<PurchaseConfirmation, EntitlementError>;
}
