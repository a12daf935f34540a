/// Authoritative local record of what has been purchased
///
/// Single source of truth for local entitlement decisions. Every mutation
/// happens inside one write-lock critical section, so check-then-act
/// sequences (consume, restore swap) are never split by a concurrent
/// mutation. No critical section performs I/O or awaits.
use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::payment::PurchaseConfirmation;
use crate::types::{
    Consumed, EntitlementError, EntitlementRecord, EntitlementState, Feature, Item, ItemKind,
    SnapshotEntry,
};

#[derive(Default)]
pub struct EntitlementStore {
    records: RwLock<HashMap<String, EntitlementRecord>>,
}

impl EntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<EntitlementRecord> {
        self.records.read().get(id).cloned()
    }

    /// Full snapshot, ordered by id.
    pub fn snapshot(&self) -> Vec<EntitlementRecord> {
        let mut records: Vec<EntitlementRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Wire-format snapshot for backup and local persistence, ordered by id.
    pub fn wire_snapshot(&self) -> Vec<SnapshotEntry> {
        let records = self.records.read();
        let mut entries: Vec<SnapshotEntry> =
            records.values().map(SnapshotEntry::from_record).collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// The currently active subscription record, if any. Recomputed from
    /// expiry on every call.
    pub fn active_subscription(&self) -> Option<EntitlementRecord> {
        let now = Utc::now();
        self.records
            .read()
            .values()
            .find(|r| r.is_active_subscription(now))
            .cloned()
    }

    /// Credit a confirmed purchase to the item's record. Consumable grants
    /// are additive: buying more adds units to the same record id.
    pub fn credit_purchase(
        &self,
        item: &Item,
        confirmation: &PurchaseConfirmation,
    ) -> Result<EntitlementRecord, EntitlementError> {
        // Check the confirmation's shape before touching the map, so a bad
        // confirmation leaves no phantom record behind.
        let granted = if item.kind.is_consumable() {
            let units = confirmation.granted_units.unwrap_or(item.declared_units);
            if units == 0 {
                return Err(EntitlementError::InvalidConfirmation(format!(
                    "consumable purchase of {} granted zero units",
                    item.id
                )));
            }
            Some(units)
        } else {
            None
        };
        let expiry = if item.kind == ItemKind::Subscription {
            Some(confirmation.expires_at.ok_or_else(|| {
                EntitlementError::InvalidConfirmation(format!(
                    "subscription purchase of {} carried no expiry",
                    item.id
                ))
            })?)
        } else {
            None
        };

        let now = Utc::now();
        let mut records = self.records.write();
        let record = records
            .entry(item.id.clone())
            .or_insert_with(|| EntitlementRecord::new(&item.id, item.kind));
        if record.kind != item.kind {
            return Err(EntitlementError::KindMismatch {
                item_id: item.id.clone(),
                expected: item.kind,
            });
        }

        match &mut record.state {
            EntitlementState::Consumable { remaining_units } => {
                *remaining_units += granted.unwrap_or(0);
            }
            EntitlementState::OneTime => {}
            EntitlementState::Subscription { expires_at } => {
                *expires_at = expiry;
            }
        }
        record.purchased = true;
        record.last_modified = now;
        debug!(item_id = %item.id, "credited purchase");
        Ok(record.clone())
    }

    /// Atomic "is this feature usable right now, and if so, charge one use".
    ///
    /// An active subscription satisfies the feature without touching any
    /// record. Otherwise the lowest-id usable package of the feature's kind
    /// is decremented by exactly one. The denied path mutates nothing.
    pub fn consume_for_feature(&self, feature: Feature) -> Result<Consumed, EntitlementError> {
        let now = Utc::now();
        let mut records = self.records.write();

        if records.values().any(|r| r.is_active_subscription(now)) {
            return Ok(Consumed::Unlimited);
        }

        let package_kind = feature.package_kind();
        let target = records
            .values()
            .filter(|r| r.kind == package_kind && r.has_usable_units())
            .map(|r| r.id.clone())
            .min();
        let id = target.ok_or(EntitlementError::NotEntitled)?;

        let record = records
            .get_mut(&id)
            .ok_or(EntitlementError::NotEntitled)?;
        match &mut record.state {
            EntitlementState::Consumable { remaining_units } if *remaining_units > 0 => {
                *remaining_units -= 1;
                let left = *remaining_units;
                record.last_modified = now;
                debug!(item_id = %id, remaining = left, "consumed one unit");
                Ok(Consumed::Remaining { units: left })
            }
            _ => Err(EntitlementError::NotEntitled),
        }
    }

    /// Mark a subscription record active until `expires_at`. Eligibility is
    /// the validator's job; this trusts its caller.
    pub fn activate_subscription(
        &self,
        id: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<EntitlementRecord, EntitlementError> {
        let mut records = self.records.write();
        let record = records
            .entry(id.to_string())
            .or_insert_with(|| EntitlementRecord::new(id, ItemKind::Subscription));
        if record.kind != ItemKind::Subscription {
            return Err(EntitlementError::KindMismatch {
                item_id: id.to_string(),
                expected: ItemKind::Subscription,
            });
        }
        record.purchased = true;
        record.state = EntitlementState::Subscription {
            expires_at: Some(expires_at),
        };
        record.last_modified = Utc::now();
        info!(item_id = %id, %expires_at, "subscription activated");
        Ok(record.clone())
    }

    /// Clear a subscription record. Cancelling an absent or already-inactive
    /// subscription is a no-op success and leaves the record untouched.
    pub fn cancel_subscription(&self, id: &str) -> Result<(), EntitlementError> {
        let mut records = self.records.write();
        let record = match records.get_mut(id) {
            Some(record) => record,
            None => return Ok(()),
        };
        if record.kind != ItemKind::Subscription {
            return Err(EntitlementError::KindMismatch {
                item_id: id.to_string(),
                expected: ItemKind::Subscription,
            });
        }
        if !record.purchased && record.expires_at().is_none() {
            return Ok(());
        }
        record.purchased = false;
        record.state = EntitlementState::Subscription { expires_at: None };
        record.last_modified = Utc::now();
        info!(item_id = %id, "subscription cancelled");
        Ok(())
    }

    /// Replace the whole store with a snapshot. The snapshot is validated in
    /// full before the swap; on any error the local records are untouched.
    pub fn replace_all(&self, entries: &[SnapshotEntry]) -> Result<usize, EntitlementError> {
        let now = Utc::now();
        let mut incoming: HashMap<String, EntitlementRecord> =
            HashMap::with_capacity(entries.len());
        let mut active_subscriptions = 0u32;

        for entry in entries {
            let record = entry.clone().into_record();
            if record.is_active_subscription(now) {
                active_subscriptions += 1;
            }
            if incoming.insert(record.id.clone(), record).is_some() {
                return Err(EntitlementError::StoreCorrupt(format!(
                    "duplicate record id: {}",
                    entry.id
                )));
            }
        }
        if active_subscriptions > 1 {
            return Err(EntitlementError::StoreCorrupt(format!(
                "{} concurrently active subscriptions",
                active_subscriptions
            )));
        }

        let count = incoming.len();
        *self.records.write() = incoming;
        info!(records = count, "store replaced from snapshot");
        Ok(count)
    }

    /// Drop every record. Whether this runs at logout is the integrator's
    /// policy; the store retains records until told otherwise.
    pub fn reset(&self) {
        self.records.write().clear();
        info!("store reset");
    }
}
