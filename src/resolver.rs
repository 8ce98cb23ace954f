//! Maps a completed transaction to the storage key of its deliverable file.

use std::collections::HashMap;

use crate::models::webhook::{DeliveryMetadata, TransactionPayload};

/// Resolves purchased line items to blob storage keys.
///
/// Resolution checks, in priority order:
/// 1. item-level product `custom_data.download_path`
/// 2. item-level price `custom_data.download_path`
/// 3. transaction-level `custom_data.download_path`
/// 4. the configured price/product id → path table
///
/// Absence of a key is not an error: the transaction is still recorded, but
/// no download token is issued.
#[derive(Debug, Clone, Default)]
pub struct KeyResolver {
    /// Price or product id → delivery path, supplied via configuration
    table: HashMap<String, String>,
}

impl KeyResolver {
    pub fn new(table: HashMap<String, String>) -> Self {
        Self { table }
    }

    /// Resolve the storage key for a transaction, if any.
    pub fn resolve(&self, transaction: &TransactionPayload) -> Option<String> {
        self.raw_path(transaction).map(normalize_key)
    }

    fn raw_path(&self, transaction: &TransactionPayload) -> Option<String> {
        let path_of = |custom_data: Option<&DeliveryMetadata>| {
            custom_data?
                .download_path
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
        };

        // Item-level product metadata wins over price metadata
        for item in &transaction.items {
            if let Some(path) = path_of(item.product.as_ref().and_then(|p| p.custom_data.as_ref()))
            {
                return Some(path);
            }
        }
        for item in &transaction.items {
            if let Some(path) = path_of(item.price.as_ref().and_then(|p| p.custom_data.as_ref())) {
                return Some(path);
            }
        }

        // Transaction-level metadata
        if let Some(path) = path_of(transaction.custom_data.as_ref()) {
            return Some(path);
        }

        // Static table, by price id then product id
        for item in &transaction.items {
            for id in [
                item.price.as_ref().and_then(|p| p.id.as_deref()),
                item.product.as_ref().and_then(|p| p.id.as_deref()),
            ]
            .into_iter()
            .flatten()
            {
                if let Some(path) = self.table.get(id) {
                    return Some(path.clone());
                }
            }
        }

        None
    }
}

/// Normalize a resolved delivery path into a storage key.
///
/// A path containing a separator is used verbatim; a bare identifier is
/// expanded into the products namespace with the standard archive extension.
fn normalize_key(raw: String) -> String {
    if raw.contains('/') {
        raw
    } else {
        format!("products/{raw}.zip")
    }
}
