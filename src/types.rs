/// Core type definitions for the entitlement ledger
///
/// Defines purchasable items, per-item entitlement records, the protected
/// features they unlock, the wire snapshot format used for backup/restore,
/// and the crate error enum.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of purchasable item, mirroring the store catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Consumable package of PDF export credits
    Pdf,
    /// Consumable package of share/email credits
    Special,
    /// One-time unlock with no unit accounting
    Other,
    /// Renewable subscription covering all consumable features
    Subscription,
}

impl ItemKind {
    pub fn is_consumable(&self) -> bool {
        matches!(self, ItemKind::Pdf | ItemKind::Special)
    }
}

/// Catalog entry for a purchasable item. Immutable; owned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item id
    pub id: String,
    pub kind: ItemKind,
    /// Units granted per purchase; zero for subscriptions and one-time unlocks
    pub declared_units: u32,
    /// Display price; the payment platform owns the real charge
    pub price: f64,
    pub description: String,
}

/// Protected actions the ledger gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PdfExport,
    Share,
}

impl Feature {
    /// The consumable package kind that satisfies this feature when no
    /// subscription is active.
    pub fn package_kind(&self) -> ItemKind {
        match self {
            Feature::PdfExport => ItemKind::Pdf,
            Feature::Share => ItemKind::Special,
        }
    }
}

/// Kind-specific entitlement state. Only the fields meaningful to the
/// record's kind exist, so "is this field meaningful here" never comes up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntitlementState {
    Consumable { remaining_units: u32 },
    OneTime,
    Subscription { expires_at: Option<DateTime<Utc>> },
}

/// Mutable entitlement record, one per item id, owned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub id: String,
    pub kind: ItemKind,
    pub purchased: bool,
    pub state: EntitlementState,
    pub last_modified: DateTime<Utc>,
}

impl EntitlementRecord {
    /// Create a record with purchase defaults for the given kind.
    pub fn new(id: impl Into<String>, kind: ItemKind) -> Self {
        let state = match kind {
            ItemKind::Pdf | ItemKind::Special => EntitlementState::Consumable { remaining_units: 0 },
            ItemKind::Other => EntitlementState::OneTime,
            ItemKind::Subscription => EntitlementState::Subscription { expires_at: None },
        };
        EntitlementRecord {
            id: id.into(),
            kind,
            purchased: false,
            state,
            last_modified: Utc::now(),
        }
    }

    pub fn remaining_units(&self) -> u32 {
        match self.state {
            EntitlementState::Consumable { remaining_units } => remaining_units,
            _ => 0,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            EntitlementState::Subscription { expires_at } => expires_at,
            _ => None,
        }
    }

    /// Derived read, recomputed on every call. Expiry is lazy; nothing in
    /// the ledger caches "is active" as a boolean.
    pub fn is_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.purchased
            && matches!(
                self.state,
                EntitlementState::Subscription { expires_at: Some(expiry) } if expiry > now
            )
    }

    /// A purchased consumable with units left. A purchased record at zero
    /// units is exhausted, not usable.
    pub fn has_usable_units(&self) -> bool {
        self.purchased && self.remaining_units() > 0
    }
}

/// Flat snapshot entry, the wire format for backup/restore and local
/// persistence. `kind` is carried so a restore can rebuild the tagged
/// record state without consulting the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub id: String,
    pub kind: ItemKind,
    pub purchased: bool,
    pub remaining_units: u32,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl SnapshotEntry {
    pub fn from_record(record: &EntitlementRecord) -> Self {
        SnapshotEntry {
            id: record.id.clone(),
            kind: record.kind,
            purchased: record.purchased,
            remaining_units: record.remaining_units(),
            expiry_date: record.expires_at(),
        }
    }

    pub fn into_record(self) -> EntitlementRecord {
        let state = match self.kind {
            ItemKind::Pdf | ItemKind::Special => EntitlementState::Consumable {
                remaining_units: self.remaining_units,
            },
            ItemKind::Other => EntitlementState::OneTime,
            ItemKind::Subscription => EntitlementState::Subscription {
                expires_at: self.expiry_date,
            },
        };
        EntitlementRecord {
            id: self.id,
            kind: self.kind,
            purchased: self.purchased,
            state,
            last_modified: Utc::now(),
        }
    }
}

/// Outcome of a successful consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Consumed {
    /// Covered by an active subscription; no record was mutated
    Unlimited,
    /// One unit was charged; count remaining afterwards
    Remaining { units: u32 },
}

/// Errors surfaced by the ledger and its collaborator seams
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntitlementError {
    #[error("no network connection")]
    NoNetwork,
    #[error("an active subscription already exists")]
    SubscriptionConflict,
    #[error("an active subscription already covers this feature")]
    CoveredBySubscription,
    #[error("another package of this kind still has units remaining")]
    DuplicateActivePackage,
    #[error("purchase would exceed the outstanding unit ceiling")]
    UnitCeilingExceeded,
    #[error("no entitlement covers this feature")]
    NotEntitled,
    #[error("payment was declined")]
    PaymentDeclined,
    #[error("item {item_id} is already owned")]
    AlreadyOwned { item_id: String },
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("no remote backup found")]
    NoRemoteData,
    #[error("snapshot is corrupt: {0}")]
    StoreCorrupt(String),
    #[error("unknown item {item_id}")]
    UnknownItem { item_id: String },
    #[error("a purchase for {item_id} is already in progress")]
    PurchaseInFlight { item_id: String },
    #[error("item {item_id} is not a {expected:?} item")]
    KindMismatch { item_id: String, expected: ItemKind },
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    #[error("invalid purchase confirmation: {0}")]
    InvalidConfirmation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_item_kind_serialization() {
        // All variants serialize lowercase
        let json = serde_json::to_string(&ItemKind::Pdf).unwrap();
        assert_eq!(json, "\"pdf\"");

        let json = serde_json::to_string(&ItemKind::Special).unwrap();
        assert_eq!(json, "\"special\"");

        let json = serde_json::to_string(&ItemKind::Other).unwrap();
        assert_eq!(json, "\"other\"");

        let json = serde_json::to_string(&ItemKind::Subscription).unwrap();
        assert_eq!(json, "\"subscription\"");
    }

    #[test]
    fn test_item_kind_deserialization() {
        let kind: ItemKind = serde_json::from_str("\"pdf\"").unwrap();
        assert_eq!(kind, ItemKind::Pdf);

        let kind: ItemKind = serde_json::from_str("\"subscription\"").unwrap();
        assert_eq!(kind, ItemKind::Subscription);
    }

    #[test]
    fn test_new_record_defaults() {
        let record = EntitlementRecord::new("pdf_pack_5", ItemKind::Pdf);
        assert!(!record.purchased, "New records start unpurchased");
        assert_eq!(record.remaining_units(), 0);
        assert!(!record.has_usable_units());

        let sub = EntitlementRecord::new("gold_sub", ItemKind::Subscription);
        assert!(sub.expires_at().is_none());
        assert!(!sub.is_active_subscription(Utc::now()));
    }

    #[test]
    fn test_subscription_activity_is_derived() {
        let now = Utc::now();
        let mut record = EntitlementRecord::new("gold_sub", ItemKind::Subscription);
        record.purchased = true;
        record.state = EntitlementState::Subscription {
            expires_at: Some(now + Duration::days(30)),
        };

        assert!(record.is_active_subscription(now));
        // Same record, evaluated past expiry: inactive without any mutation
        assert!(!record.is_active_subscription(now + Duration::days(31)));
    }

    #[test]
    fn test_exhausted_consumable_is_not_usable() {
        let mut record = EntitlementRecord::new("pdf_pack_5", ItemKind::Pdf);
        record.purchased = true;
        record.state = EntitlementState::Consumable { remaining_units: 0 };

        assert!(!record.has_usable_units(), "Purchased at zero units is exhausted");
    }

    #[test]
    fn test_snapshot_entry_round_trip() {
        let now = Utc::now();
        let mut record = EntitlementRecord::new("share_pack_10", ItemKind::Special);
        record.purchased = true;
        record.state = EntitlementState::Consumable { remaining_units: 7 };

        let entry = SnapshotEntry::from_record(&record);
        assert_eq!(entry.remaining_units, 7);
        assert!(entry.expiry_date.is_none());

        let rebuilt = entry.into_record();
        assert_eq!(rebuilt.id, record.id);
        assert_eq!(rebuilt.kind, record.kind);
        assert_eq!(rebuilt.purchased, record.purchased);
        assert_eq!(rebuilt.state, record.state);

        let mut sub = EntitlementRecord::new("gold_sub", ItemKind::Subscription);
        sub.purchased = true;
        sub.state = EntitlementState::Subscription {
            expires_at: Some(now + Duration::days(30)),
        };
        let rebuilt = SnapshotEntry::from_record(&sub).into_record();
        assert_eq!(rebuilt.expires_at(), sub.expires_at());
    }

    #[test]
    fn test_snapshot_entry_wire_format() {
        let entry = SnapshotEntry {
            id: "pdf_pack_5".to_string(),
            kind: ItemKind::Pdf,
            purchased: true,
            remaining_units: 3,
            expiry_date: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"remainingUnits\":3"), "Wire format is camelCase: {}", json);
        assert!(json.contains("\"expiryDate\":null"));

        let parsed: SnapshotEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_entitlement_state_tagged_serialization() {
        let state = EntitlementState::Consumable { remaining_units: 4 };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"type\":\"consumable\""), "Got: {}", json);

        let state = EntitlementState::Subscription { expires_at: None };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"type\":\"subscription\""), "Got: {}", json);
    }
}
