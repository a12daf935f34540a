/// Read-only catalog of purchasable items
///
/// Loaded once per session from whatever source the host application uses
/// (embedded JSON, remote product list). The ledger never mutates it.
use std::collections::HashMap;

use crate::types::{EntitlementError, Item};

#[derive(Debug, Clone)]
pub struct ItemCatalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl ItemCatalog {
    /// Build a catalog, rejecting duplicate item ids.
    pub fn new(items: Vec<Item>) -> Result<Self, EntitlementError> {
        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), pos).is_some() {
                return Err(EntitlementError::InvalidCatalog(format!(
                    "duplicate item id: {}",
                    item.id
                )));
            }
        }
        Ok(ItemCatalog { items, index })
    }

    /// Parse a catalog from a JSON array of items.
    pub fn from_json(json: &str) -> Result<Self, EntitlementError> {
        let items: Vec<Item> = serde_json::from_str(json)
            .map_err(|e| EntitlementError::InvalidCatalog(format!("failed to parse catalog: {}", e)))?;
        Self::new(items)
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemKind;

    fn pdf_pack() -> Item {
        Item {
            id: "pdf_pack_5".to_string(),
            kind: ItemKind::Pdf,
            declared_units: 5,
            price: 1.99,
            description: "PDF package (5 exports)".to_string(),
        }
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ItemCatalog::new(vec![pdf_pack()]).expect("catalog should build");
        assert_eq!(catalog.len(), 1);

        let item = catalog.get("pdf_pack_5").expect("item should be present");
        assert_eq!(item.declared_units, 5);
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = ItemCatalog::new(vec![pdf_pack(), pdf_pack()]);
        match result {
            Err(EntitlementError::InvalidCatalog(msg)) => {
                assert!(msg.contains("pdf_pack_5"), "Error should name the id: {}", msg);
            }
            other => panic!("Expected InvalidCatalog, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            {
                "id": "gold_sub",
                "kind": "subscription",
                "declared_units": 0,
                "price": 9.99,
                "description": "Gold subscription (monthly)"
            },
            {
                "id": "share_pack_10",
                "kind": "special",
                "declared_units": 10,
                "price": 2.99,
                "description": "Share package (10 emails)"
            }
        ]"#;

        let catalog = ItemCatalog::from_json(json).expect("catalog should parse");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("gold_sub").unwrap().kind, ItemKind::Subscription);

        let bad = ItemCatalog::from_json("not json");
        assert!(matches!(bad, Err(EntitlementError::InvalidCatalog(_))));
    }
}
