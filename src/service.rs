/// Entitlement service facade
///
/// The single owner of the store, constructed once at app start with its
/// collaborators injected, and handed by reference to call sites. All
/// mutation goes through it: purchase crediting, consumption, subscription
/// lifecycle, backup/restore, and local persistence.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::catalog::ItemCatalog;
use crate::ledger::ConsumptionLedger;
use crate::payment::PaymentPlatform;
use crate::session::SessionProvider;
use crate::storage::LocalSnapshotStore;
use crate::store::EntitlementStore;
use crate::subscription::{SubscriptionInfo, SubscriptionManager};
use crate::sync::{RemoteBackup, SyncService};
use crate::types::{Consumed, EntitlementError, EntitlementRecord, Feature, Item, ItemKind};
use crate::validator;

/// Result of a successful purchase flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub item_id: String,
    pub transaction_id: Uuid,
    pub record: EntitlementRecord,
}

/// Catalog item joined with its entitlement status, for the UI.
/// Read-only; may trail concurrent writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDisplay {
    pub item: Item,
    pub purchased: bool,
    pub remaining_units: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

pub struct EntitlementService {
    store: Arc<EntitlementStore>,
    catalog: ItemCatalog,
    payment: Arc<dyn PaymentPlatform>,
    ledger: ConsumptionLedger,
    subscriptions: SubscriptionManager,
    sync: SyncService,
    local: Option<LocalSnapshotStore>,
    in_flight: Mutex<Option<String>>,
}

impl EntitlementService {
    pub fn new(
        catalog: ItemCatalog,
        payment: Arc<dyn PaymentPlatform>,
        session: Arc<dyn SessionProvider>,
        remote: Arc<dyn RemoteBackup>,
    ) -> Self {
        let store = Arc::new(EntitlementStore::new());
        let ledger = ConsumptionLedger::new(store.clone());
        let subscriptions = SubscriptionManager::new(store.clone());
        let sync = SyncService::new(store.clone(), session, remote);
        EntitlementService {
            store,
            catalog,
            payment,
            ledger,
            subscriptions,
            sync,
            local: None,
            in_flight: Mutex::new(None),
        }
    }

    /// Persist snapshots locally between launches.
    pub fn with_local_storage(mut self, local: LocalSnapshotStore) -> Self {
        self.local = Some(local);
        self
    }

    /// Run the full purchase flow for a catalog item: eligibility check,
    /// external payment, then crediting the confirmed grant.
    ///
    /// The store is not touched until the payment platform confirms.
    /// Purchase flows are serialized: while one payment awaits
    /// confirmation, every other purchase is rejected with
    /// `PurchaseInFlight` (rapid double-tap, late retry). The eligibility
    /// snapshot is taken before the payment await, so letting a second
    /// flow validate during that window would let two subscriptions, or
    /// an over-ceiling special package, both credit.
    pub async fn purchase(
        &self,
        item_id: &str,
        online: bool,
    ) -> Result<PurchaseOutcome, EntitlementError> {
        let item = self
            .catalog
            .get(item_id)
            .cloned()
            .ok_or_else(|| EntitlementError::UnknownItem {
                item_id: item_id.to_string(),
            })?;

        {
            let mut in_flight = self.in_flight.lock();
            if let Some(pending) = in_flight.as_ref() {
                return Err(EntitlementError::PurchaseInFlight {
                    item_id: pending.clone(),
                });
            }
            *in_flight = Some(item.id.clone());
        }
        let result = self.purchase_inner(&item, online).await;
        *self.in_flight.lock() = None;
        result
    }

    async fn purchase_inner(
        &self,
        item: &Item,
        online: bool,
    ) -> Result<PurchaseOutcome, EntitlementError> {
        validator::validate(item, &self.store.snapshot(), online, Utc::now())?;

        // The await happens outside any store lock; nothing is credited
        // until the platform confirms.
        let confirmation = self.payment.purchase(item).await?;
        let record = self.store.credit_purchase(item, &confirmation)?;

        info!(item_id = %item.id, kind = ?item.kind, "purchase credited");
        Ok(PurchaseOutcome {
            item_id: item.id.clone(),
            transaction_id: confirmation.transaction_id,
            record,
        })
    }

    /// Charge one use of a protected feature, or report why it is denied.
    pub fn try_consume(&self, feature: Feature) -> Result<Consumed, EntitlementError> {
        self.ledger.try_consume(feature)
    }

    /// The active subscription, if any.
    pub fn subscription_info(&self) -> Option<SubscriptionInfo> {
        self.subscriptions.active()
    }

    /// Cancel the currently active subscription. Success when none is
    /// active.
    pub fn cancel_subscription(&self) -> Result<(), EntitlementError> {
        match self.subscriptions.active() {
            Some(info) => self.subscriptions.cancel(&info.id),
            None => Ok(()),
        }
    }

    /// Upload the full ledger under the current session.
    pub async fn backup(&self) -> Result<usize, EntitlementError> {
        self.sync.backup().await
    }

    /// Replace the local ledger with the remote snapshot.
    pub async fn restore(&self) -> Result<usize, EntitlementError> {
        self.sync.restore().await
    }

    /// Catalog joined with entitlement status, one row per catalog item.
    pub fn display_items(&self) -> Vec<ItemDisplay> {
        let now = Utc::now();
        self.catalog
            .items()
            .map(|item| {
                let record = self.store.get(&item.id);
                let purchased = record.as_ref().map(|r| r.purchased).unwrap_or(false);
                let remaining_units = record.as_ref().map(|r| r.remaining_units()).unwrap_or(0);
                let expires_at = record.as_ref().and_then(|r| r.expires_at());
                let active = record
                    .as_ref()
                    .map(|r| match item.kind {
                        ItemKind::Subscription => r.is_active_subscription(now),
                        ItemKind::Pdf | ItemKind::Special => r.has_usable_units(),
                        ItemKind::Other => r.purchased,
                    })
                    .unwrap_or(false);
                ItemDisplay {
                    item: item.clone(),
                    purchased,
                    remaining_units,
                    expires_at,
                    active,
                }
            })
            .collect()
    }

    /// Current records, ordered by id.
    pub fn records(&self) -> Vec<EntitlementRecord> {
        self.store.snapshot()
    }

    /// Write the current snapshot to local storage.
    pub fn persist_local(&self) -> Result<(), EntitlementError> {
        let local = self.local.as_ref().ok_or_else(|| {
            EntitlementError::Storage("no local snapshot store configured".to_string())
        })?;
        local.store(&self.store.wire_snapshot())
    }

    /// Load the locally persisted snapshot into the store, if one exists.
    /// Returns whether anything was loaded.
    pub fn load_local(&self) -> Result<bool, EntitlementError> {
        let local = self.local.as_ref().ok_or_else(|| {
            EntitlementError::Storage("no local snapshot store configured".to_string())
        })?;
        match local.load()? {
            Some(entries) => {
                self.store.replace_all(&entries)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Clear every record. Never called implicitly; whether logout clears
    /// the ledger is the integrator's policy.
    pub fn reset(&self) {
        self.store.reset();
    }
}
