/// Entitlement ledger for paid document features
///
/// This crate decides, before a protected action runs, whether the action
/// is permitted, and keeps the entitlement ledger consistent across local
/// use and a remote backup/restore cycle:
/// - Purchase eligibility rules (subscription exclusivity, duplicate
///   packages, the special-unit ceiling)
/// - Atomic accounting of consumable units
/// - Subscription lifecycle with lazy expiry
/// - Wholesale backup/restore against a remote store
///
/// Screens, the native payment integration, the network transport, and
/// document export live in the host application; this crate sees them only
/// through the `PaymentPlatform`, `SessionProvider`, and `RemoteBackup`
/// seams.
pub mod catalog;
pub mod ledger;
pub mod payment;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;
pub mod subscription;
pub mod sync;
pub mod types;
pub mod validator;

// Re-export the main types for convenience
pub use catalog::ItemCatalog;
pub use ledger::ConsumptionLedger;
pub use payment::{PaymentPlatform, PurchaseConfirmation};
pub use service::{EntitlementService, ItemDisplay, PurchaseOutcome};
pub use session::{MemorySessionProvider, SessionProvider, SessionToken};
pub use storage::LocalSnapshotStore;
pub use store::EntitlementStore;
pub use subscription::{SubscriptionInfo, SubscriptionManager};
pub use sync::{HttpRemoteBackup, RemoteBackup, SyncService};
pub use types::{
    Consumed, EntitlementError, EntitlementRecord, EntitlementState, Feature, Item, ItemKind,
    SnapshotEntry,
};
pub use validator::{validate, SPECIAL_UNIT_CEILING};
