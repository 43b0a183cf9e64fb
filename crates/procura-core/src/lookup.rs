//! # Reference Lookups
//!
//! Seams to the services that describe products, locations and related
//! documents. The crate only depends on these traits; the host wires in the
//! real services, and [`StaticCatalog`] covers tests and demos.
//!
//! A failed lookup is `None`, never an error. Screens render
//! [`NOT_AVAILABLE`] in its place via [`display_or_na`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::grouping::GroupedReceiptItems;
use crate::money::Money;
use crate::types::{LocationInfo, ProductInfo};
use crate::{
    NOT_AVAILABLE, UNKNOWN_LOCATION_ID, UNKNOWN_LOCATION_NAME, UNKNOWN_PRODUCT_ID,
    UNKNOWN_PRODUCT_NAME,
};

pub trait ProductLookup {
    fn product(&self, id: &str) -> Option<ProductInfo>;
}

pub trait LocationLookup {
    fn location(&self, id: &str) -> Option<LocationInfo>;
}

/// Cross-referenced purchase documents.
pub trait DocumentLookup {
    fn document(&self, kind: DocumentKind, number: &str) -> Option<DocumentSummary>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PurchaseRequest,
    PurchaseOrder,
    GoodsReceivedNote,
}

/// Header-level facts about a document, as shown in reference popovers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub kind: DocumentKind,
    pub number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub vendor_name: Option<String>,
    pub status: String,
    pub total: Money,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// Placeholder text for a missing value.
pub fn display_or_na(value: Option<&str>) -> &str {
    crate::types::non_blank(value).unwrap_or(NOT_AVAILABLE)
}

/// Product name for display, `"N/A"` when the lookup has nothing.
pub fn product_name_or_na(lookup: &impl ProductLookup, id: &str) -> String {
    lookup
        .product(id)
        .map(|p| p.name)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Fills product descriptors that the receipt lines left empty from a
/// product lookup. Only the products that change are copied.
pub fn enrich_products(
    grouped: &GroupedReceiptItems,
    lookup: &impl ProductLookup,
) -> GroupedReceiptItems {
    let mut next = grouped.clone();
    for (id, group) in next.products.iter_mut() {
        if id == UNKNOWN_PRODUCT_ID {
            continue;
        }
        let Some(found) = lookup.product(id) else {
            continue;
        };

        let current = &group.product;
        let name = if current.name == UNKNOWN_PRODUCT_NAME {
            found.name
        } else {
            current.name.clone()
        };
        let code = if current.code.is_empty() {
            found.code
        } else {
            current.code.clone()
        };
        let description = current.description.clone().or(found.description);

        if name != current.name || code != current.code || description != current.description {
            let group = Arc::make_mut(group);
            group.product.name = name;
            group.product.code = code;
            group.product.description = description;
        }
    }
    next
}

/// Fills location names and codes that the receipt lines left empty from a
/// location lookup. Untouched products and locations stay shared.
pub fn enrich_locations(
    grouped: &GroupedReceiptItems,
    lookup: &impl LocationLookup,
) -> GroupedReceiptItems {
    let mut next = grouped.clone();
    for group in next.products.values_mut() {
        let updates: Vec<(usize, LocationInfo)> = group
            .locations
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| id.as_str() != UNKNOWN_LOCATION_ID)
            .filter_map(|(index, (id, location_group))| {
                let found = lookup.location(id)?;
                let current = &location_group.location;
                let merged = LocationInfo {
                    id: current.id.clone(),
                    name: if current.name == UNKNOWN_LOCATION_NAME {
                        found.name
                    } else {
                        current.name.clone()
                    },
                    code: current.code.clone().or(found.code),
                };
                (merged != *current).then_some((index, merged))
            })
            .collect();

        if updates.is_empty() {
            continue;
        }
        let group = Arc::make_mut(group);
        for (index, location) in updates {
            if let Some((_, location_group)) = group.locations.get_index_mut(index) {
                Arc::make_mut(location_group).location = location;
            }
        }
    }
    next
}

// =============================================================================
// Static Catalog
// =============================================================================

/// In-memory implementation of every lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: HashMap<String, ProductInfo>,
    locations: HashMap<String, LocationInfo>,
    documents: HashMap<(DocumentKind, String), DocumentSummary>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        StaticCatalog::default()
    }

    pub fn with_product(mut self, product: ProductInfo) -> Self {
        self.products.insert(product.id.clone(), product);
        self
    }

    pub fn with_location(mut self, location: LocationInfo) -> Self {
        self.locations.insert(location.id.clone(), location);
        self
    }

    pub fn with_document(mut self, document: DocumentSummary) -> Self {
        self.documents
            .insert((document.kind, document.number.clone()), document);
        self
    }
}

impl ProductLookup for StaticCatalog {
    fn product(&self, id: &str) -> Option<ProductInfo> {
        self.products.get(id).cloned()
    }
}

impl LocationLookup for StaticCatalog {
    fn location(&self, id: &str) -> Option<LocationInfo> {
        self.locations.get(id).cloned()
    }
}

impl DocumentLookup for StaticCatalog {
    fn document(&self, kind: DocumentKind, number: &str) -> Option<DocumentSummary> {
        self.documents.get(&(kind, number.to_string())).cloned()
    }
}
