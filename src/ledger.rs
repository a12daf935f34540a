/// Consumption ledger
///
/// The component a protected action calls before it runs: "is this feature
/// usable right now, and if so, charge one use". The check and the charge
/// are a single atomic step inside the store's critical section.
use std::sync::Arc;

use tracing::debug;

use crate::store::EntitlementStore;
use crate::types::{Consumed, EntitlementError, Feature};

pub struct ConsumptionLedger {
    store: Arc<EntitlementStore>,
}

impl ConsumptionLedger {
    pub fn new(store: Arc<EntitlementStore>) -> Self {
        ConsumptionLedger { store }
    }

    /// Charge one use of `feature`, or report why it is not usable.
    ///
    /// An active subscription satisfies any feature without mutating a
    /// record. Otherwise one unit is decremented from a usable package of
    /// the matching kind. The denied path performs no mutation at all.
    pub fn try_consume(&self, feature: Feature) -> Result<Consumed, EntitlementError> {
        let outcome = self.store.consume_for_feature(feature)?;
        debug!(?feature, ?outcome, "consumption granted");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PurchaseConfirmation;
    use crate::types::{Item, ItemKind};
    use chrono::{Duration, Utc};
    use std::thread;
    use uuid::Uuid;

    fn store_with_pdf_units(units: u32) -> Arc<EntitlementStore> {
        let store = Arc::new(EntitlementStore::new());
        let item = Item {
            id: "pdf_pack".to_string(),
            kind: ItemKind::Pdf,
            declared_units: units,
            price: 1.99,
            description: "PDF package".to_string(),
        };
        let confirmation = PurchaseConfirmation {
            transaction_id: Uuid::new_v4(),
            item_id: item.id.clone(),
            granted_units: Some(units),
            expires_at: None,
        };
        store.credit_purchase(&item, &confirmation).unwrap();
        store
    }

    #[test]
    fn test_consume_decrements_by_one() {
        let store = store_with_pdf_units(3);
        let ledger = ConsumptionLedger::new(store.clone());

        assert_eq!(
            ledger.try_consume(Feature::PdfExport).unwrap(),
            Consumed::Remaining { units: 2 }
        );
        assert_eq!(
            ledger.try_consume(Feature::PdfExport).unwrap(),
            Consumed::Remaining { units: 1 }
        );
        assert_eq!(store.get("pdf_pack").unwrap().remaining_units(), 1);
    }

    #[test]
    fn test_consume_without_entitlement_denied() {
        let store = Arc::new(EntitlementStore::new());
        let ledger = ConsumptionLedger::new(store);

        let result = ledger.try_consume(Feature::Share);
        assert!(matches!(result, Err(EntitlementError::NotEntitled)));
    }

    #[test]
    fn test_subscription_consume_is_unlimited() {
        let store = store_with_pdf_units(5);
        store
            .activate_subscription("gold_sub", Utc::now() + Duration::days(30))
            .unwrap();
        let ledger = ConsumptionLedger::new(store.clone());

        for _ in 0..10 {
            assert_eq!(
                ledger.try_consume(Feature::PdfExport).unwrap(),
                Consumed::Unlimited
            );
        }
        assert_eq!(
            store.get("pdf_pack").unwrap().remaining_units(),
            5,
            "Subscription consumption must not touch the package record"
        );
    }

    #[test]
    fn test_concurrent_consumption_has_no_lost_or_double_decrements() {
        // k units, n > k competing callers: exactly k succeed, the record
        // lands on zero, and nobody observes a duplicate remaining count.
        let k = 5u32;
        let n = 16usize;
        let store = store_with_pdf_units(k);
        let ledger = Arc::new(ConsumptionLedger::new(store.clone()));

        let mut handles = Vec::with_capacity(n);
        for _ in 0..n {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || ledger.try_consume(Feature::PdfExport)));
        }

        let mut consumed = Vec::new();
        let mut denied = 0usize;
        for handle in handles {
            match handle.join().expect("consumer thread panicked") {
                Ok(Consumed::Remaining { units }) => consumed.push(units),
                Ok(Consumed::Unlimited) => panic!("No subscription is active"),
                Err(EntitlementError::NotEntitled) => denied += 1,
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(consumed.len(), k as usize, "Exactly k consumptions succeed");
        assert_eq!(denied, n - k as usize);
        consumed.sort_unstable();
        let expected: Vec<u32> = (0..k).collect();
        assert_eq!(consumed, expected, "Each remaining count is observed exactly once");
        assert_eq!(store.get("pdf_pack").unwrap().remaining_units(), 0);
    }
}
