/// Purchase eligibility rules
///
/// Pure decision function over a store snapshot: no side effects, no I/O,
/// no clock reads. Rules run in a fixed order and the first matching deny
/// wins. Connectivity is supplied by the caller, never queried here.
use chrono::{DateTime, Utc};

use crate::types::{EntitlementError, EntitlementRecord, Item, ItemKind};

/// Outstanding special-package units may never exceed this across all
/// purchased records; the UI cannot usefully surface a larger stockpile.
pub const SPECIAL_UNIT_CEILING: u32 = 30;

pub fn validate(
    item: &Item,
    records: &[EntitlementRecord],
    online: bool,
    now: DateTime<Utc>,
) -> Result<(), EntitlementError> {
    if !online {
        return Err(EntitlementError::NoNetwork);
    }

    let active_subscription = |exclude: Option<&str>| {
        records.iter().any(|r| {
            Some(r.id.as_str()) != exclude && r.is_active_subscription(now)
        })
    };

    match item.kind {
        ItemKind::Subscription => {
            // Renewing the same plan is allowed; a second concurrent plan is not.
            if active_subscription(Some(&item.id)) {
                return Err(EntitlementError::SubscriptionConflict);
            }
            Ok(())
        }
        ItemKind::Pdf => {
            if active_subscription(None) {
                return Err(EntitlementError::CoveredBySubscription);
            }
            let duplicate = records.iter().any(|r| {
                r.id != item.id && r.kind == ItemKind::Pdf && r.has_usable_units()
            });
            if duplicate {
                return Err(EntitlementError::DuplicateActivePackage);
            }
            Ok(())
        }
        ItemKind::Special => {
            if active_subscription(None) {
                return Err(EntitlementError::CoveredBySubscription);
            }
            let outstanding: u32 = records
                .iter()
                .filter(|r| r.kind == ItemKind::Special && r.purchased)
                .map(|r| r.remaining_units())
                .sum();
            if outstanding + item.declared_units > SPECIAL_UNIT_CEILING {
                return Err(EntitlementError::UnitCeilingExceeded);
            }
            Ok(())
        }
        ItemKind::Other => Ok(()),
    }
}
