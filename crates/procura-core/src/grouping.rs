//! # Receipt Grouping
//!
//! Turns the flat list of GRN receipt lines into the product → location →
//! PO-line tree the receiving screen displays, and back.
//!
//! ## Tree Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GroupedReceiptItems                                                    │
//! │  └── products (first-seen order)                                        │
//! │      ├── "prod-rice"  ProductGroup                                      │
//! │      │   └── locations (first-seen order)                               │
//! │      │       ├── "loc-main"     LocationGroup                           │
//! │      │       │   └── po_lines: [PO-001 line, PO-004 line]  (arrival)    │
//! │      │       └── "loc-kitchen"  LocationGroup                           │
//! │      │           └── po_lines: [PO-001 line]                            │
//! │      └── "unknown"    ProductGroup ("Unknown Product")                  │
//! │          └── "unknown" LocationGroup ("Unknown Location")               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - The tree is a projection of the flat list: rebuilt, never edited in
//!   place. [`flatten_grouped_items`] gives the lines back in traversal order.
//! - Duplicate (product, location) pairs append to the same bucket.
//! - Branches are held in `Arc`, so [`update_item_in_groups`] copies only the
//!   product and location that contain the patched line.

use std::sync::Arc;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::pricing::DocumentTotals;
use crate::types::{LocationInfo, ProductInfo, ReceiptLine};
use crate::NOT_AVAILABLE;

// =============================================================================
// Tree Types
// =============================================================================

/// One purchase-order line received at a location.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PoLineInfo {
    /// PO number, or `"N/A"` when the line carries none.
    pub po_number: String,
    pub po_id: Option<String>,
    pub item: ReceiptLine,
}

impl PoLineInfo {
    fn from_item(item: ReceiptLine) -> Self {
        PoLineInfo {
            po_number: item
                .po_number
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            po_id: item.po_id.clone(),
            item,
        }
    }
}

/// All lines of one product received at one location.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LocationGroup {
    pub location: LocationInfo,
    pub po_lines: Vec<PoLineInfo>,
}

/// All locations a product was received at.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductGroup {
    pub product: ProductInfo,
    #[ts(as = "std::collections::HashMap<String, LocationGroup>")]
    pub locations: IndexMap<String, Arc<LocationGroup>>,
    pub total_items: usize,
    pub total_locations: usize,
}

/// The grouped view of a GRN's lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GroupedReceiptItems {
    #[ts(as = "std::collections::HashMap<String, ProductGroup>")]
    pub products: IndexMap<String, Arc<ProductGroup>>,
    pub total_products: usize,
    pub total_items: usize,
}

// =============================================================================
// Grouping
// =============================================================================

/// Groups flat receipt lines by product id, then location id.
///
/// Ordering at every level is first-seen; lines keep arrival order inside
/// their bucket. Product and location descriptors come from the first line
/// seen for that key.
///
/// ## Example
/// ```rust
/// use procura_core::grouping::group_items_by_product_location;
/// use procura_core::types::ReceiptLine;
///
/// let line = |id: &str, product: &str, location: &str| ReceiptLine {
///     id: id.to_string(),
///     product_id: Some(product.to_string()),
///     location_id: Some(location.to_string()),
///     ..ReceiptLine::blank()
/// };
/// let grouped = group_items_by_product_location(vec![
///     line("a", "P2", "L1"),
///     line("b", "P1", "L1"),
///     line("c", "P1", "L2"),
/// ]);
///
/// let products: Vec<&str> = grouped.products.keys().map(String::as_str).collect();
/// assert_eq!(products, ["P2", "P1"]);
/// let p1_locations: Vec<&str> = grouped.products["P1"].locations.keys().map(String::as_str).collect();
/// assert_eq!(p1_locations, ["L1", "L2"]);
/// ```
pub fn group_items_by_product_location<I>(items: I) -> GroupedReceiptItems
where
    I: IntoIterator<Item = ReceiptLine>,
{
    let mut products: IndexMap<String, (ProductInfo, IndexMap<String, LocationGroup>)> =
        IndexMap::new();

    for item in items {
        let (_, locations) = products
            .entry(item.product_key().to_string())
            .or_insert_with(|| (item.product_info(), IndexMap::new()));

        locations
            .entry(item.location_key().to_string())
            .or_insert_with(|| LocationGroup {
                location: item.location_info(),
                po_lines: Vec::new(),
            })
            .po_lines
            .push(PoLineInfo::from_item(item));
    }

    let products: IndexMap<String, Arc<ProductGroup>> = products
        .into_iter()
        .map(|(id, (product, locations))| {
            let total_items = locations.values().map(|l| l.po_lines.len()).sum();
            let total_locations = locations.len();
            let group = ProductGroup {
                product,
                locations: locations
                    .into_iter()
                    .map(|(loc_id, group)| (loc_id, Arc::new(group)))
                    .collect(),
                total_items,
                total_locations,
            };
            (id, Arc::new(group))
        })
        .collect();

    let total_items = products.values().map(|p| p.total_items).sum();
    let grouped = GroupedReceiptItems {
        total_products: products.len(),
        total_items,
        products,
    };

    debug!(
        products = grouped.total_products,
        items = grouped.total_items,
        "Grouped receipt lines"
    );
    grouped
}

/// Flattens the tree back into lines: product order, then location order,
/// then PO-line order.
pub fn flatten_grouped_items(grouped: &GroupedReceiptItems) -> Vec<ReceiptLine> {
    grouped.lines().cloned().collect()
}

/// Returns a new tree with the line `item_id` patched by `patch`.
///
/// Only the product and location containing the line are copied; every
/// other branch is shared with `grouped`. When the patch moves the line to
/// a different product or location, or changes the descriptors shown for
/// them, the tree is regrouped from the flattened lines so it stays a
/// faithful projection. An unknown `item_id` yields an unchanged tree.
pub fn update_item_in_groups<F>(
    grouped: &GroupedReceiptItems,
    item_id: &str,
    patch: F,
) -> GroupedReceiptItems
where
    F: FnOnce(&mut ReceiptLine),
{
    let Some((p, l, i)) = grouped.position_of(item_id) else {
        warn!(item_id = %item_id, "Receipt line not found in grouped items");
        return grouped.clone();
    };

    let mut next = grouped.clone();
    let mut regroup = false;

    if let Some((_, product)) = next.products.get_index_mut(p) {
        let product = Arc::make_mut(product);
        if let Some((_, location)) = product.locations.get_index_mut(l) {
            let location = Arc::make_mut(location);
            let po_line = &mut location.po_lines[i];

            let before = GroupingView::of(&po_line.item);
            patch(&mut po_line.item);
            regroup = GroupingView::of(&po_line.item) != before;

            *po_line = PoLineInfo::from_item(po_line.item.clone());
        }
    }

    if regroup {
        debug!(item_id = %item_id, "Patched line changed its grouping, regrouping");
        return group_items_by_product_location(flatten_grouped_items(&next));
    }
    next
}

/// Quantity still to be received on a PO line:
/// `ordered − previously_delivered − currently_received`.
///
/// Not clamped: over-receipt produces a negative value, which the UI shows
/// as-is.
///
/// ## Example
/// ```rust
/// use procura_core::grouping::calculate_remaining_quantity;
/// use rust_decimal::Decimal;
///
/// let remaining = calculate_remaining_quantity(
///     Decimal::from(100),
///     Decimal::from(30),
///     Decimal::from(40),
/// );
/// assert_eq!(remaining, Decimal::from(30));
/// ```
#[inline]
pub fn calculate_remaining_quantity(
    ordered: Decimal,
    previously_delivered: Decimal,
    currently_received: Decimal,
) -> Decimal {
    ordered
        .saturating_sub(previously_delivered)
        .saturating_sub(currently_received)
}

/// Every field of a line that shapes the tree around it.
#[derive(PartialEq)]
struct GroupingView {
    product: ProductInfo,
    location: LocationInfo,
}

impl GroupingView {
    fn of(line: &ReceiptLine) -> Self {
        GroupingView {
            product: line.product_info(),
            location: line.location_info(),
        }
    }
}

// =============================================================================
// Tree Queries & Roll-ups
// =============================================================================

/// Quantity roll-up over a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuantitySummary {
    #[ts(type = "string")]
    pub ordered: Decimal,
    #[ts(type = "string")]
    pub previously_received: Decimal,
    #[ts(type = "string")]
    pub received: Decimal,
    #[ts(type = "string")]
    pub foc: Decimal,
    #[ts(type = "string")]
    pub remaining: Decimal,
}

impl QuantitySummary {
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a ReceiptLine>,
    {
        lines
            .into_iter()
            .fold(QuantitySummary::default(), |mut acc, line| {
                acc.ordered = acc.ordered.saturating_add(line.ordered_quantity);
                acc.previously_received = acc.previously_received.saturating_add(line.previously_received);
                acc.received = acc.received.saturating_add(line.received_quantity);
                acc.foc = acc.foc.saturating_add(line.foc_quantity);
                acc.remaining = acc.remaining.saturating_add(line.remaining_quantity());
                acc
            })
    }
}

impl LocationGroup {
    pub fn lines(&self) -> impl Iterator<Item = &ReceiptLine> {
        self.po_lines.iter().map(|po_line| &po_line.item)
    }

    pub fn quantities(&self) -> QuantitySummary {
        QuantitySummary::from_lines(self.lines())
    }

    pub fn totals(&self) -> DocumentTotals {
        let amounts: Vec<_> = self.lines().map(ReceiptLine::amounts).collect();
        DocumentTotals::from_lines(&amounts)
    }
}

impl ProductGroup {
    pub fn lines(&self) -> impl Iterator<Item = &ReceiptLine> {
        self.locations.values().flat_map(|location| location.lines())
    }

    pub fn quantities(&self) -> QuantitySummary {
        QuantitySummary::from_lines(self.lines())
    }

    pub fn totals(&self) -> DocumentTotals {
        let amounts: Vec<_> = self.lines().map(ReceiptLine::amounts).collect();
        DocumentTotals::from_lines(&amounts)
    }
}

impl GroupedReceiptItems {
    /// All lines in traversal order.
    pub fn lines(&self) -> impl Iterator<Item = &ReceiptLine> {
        self.products.values().flat_map(|product| product.lines())
    }

    /// Finds a line by id anywhere in the tree.
    pub fn find_item(&self, item_id: &str) -> Option<&ReceiptLine> {
        self.lines().find(|line| line.id == item_id)
    }

    pub fn quantities(&self) -> QuantitySummary {
        QuantitySummary::from_lines(self.lines())
    }

    /// Footer totals over every line of the GRN.
    pub fn totals(&self) -> DocumentTotals {
        let amounts: Vec<_> = self.lines().map(ReceiptLine::amounts).collect();
        DocumentTotals::from_lines(&amounts)
    }

    fn position_of(&self, item_id: &str) -> Option<(usize, usize, usize)> {
        self.products
            .values()
            .enumerate()
            .find_map(|(p, product)| {
                product
                    .locations
                    .values()
                    .enumerate()
                    .find_map(|(l, location)| {
                        location
                            .po_lines
                            .iter()
                            .position(|po_line| po_line.item.id == item_id)
                            .map(|i| (p, l, i))
                    })
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::{UNKNOWN_LOCATION_ID, UNKNOWN_PRODUCT_ID, UNKNOWN_PRODUCT_NAME};
    use rust_decimal_macros::dec;

    fn line(id: &str, product: Option<&str>, location: Option<&str>) -> ReceiptLine {
        ReceiptLine {
            id: id.to_string(),
            product_id: product.map(str::to_string),
            product_name: product.map(|p| format!("Product {p}")),
            location_id: location.map(str::to_string),
            location_name: location.map(|l| format!("Location {l}")),
            po_number: Some(format!("PO-{id}")),
            ordered_quantity: dec!(10),
            received_quantity: dec!(4),
            ..ReceiptLine::blank()
        }
    }

    fn ids(lines: &[ReceiptLine]) -> Vec<&str> {
        lines.iter().map(|l| l.id.as_str()).collect()
    }

    fn sorted_ids(lines: &[ReceiptLine]) -> Vec<String> {
        let mut ids: Vec<String> = lines.iter().map(|l| l.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_first_seen_order() {
        crate::test_support::init_tracing();
        let grouped = group_items_by_product_location(vec![
            line("1", Some("P2"), Some("L1")),
            line("2", Some("P1"), Some("L1")),
            line("3", Some("P1"), Some("L2")),
        ]);

        let products: Vec<&String> = grouped.products.keys().collect();
        assert_eq!(products, ["P2", "P1"]);

        let p1 = &grouped.products["P1"];
        let locations: Vec<&String> = p1.locations.keys().collect();
        assert_eq!(locations, ["L1", "L2"]);
        assert_eq!(p1.total_items, 2);
        assert_eq!(p1.total_locations, 2);
        assert_eq!(grouped.total_products, 2);
        assert_eq!(grouped.total_items, 3);
    }

    #[test]
    fn test_duplicates_append_to_same_bucket() {
        let grouped = group_items_by_product_location(vec![
            line("a", Some("P1"), Some("L1")),
            line("b", Some("P1"), Some("L1")),
            line("c", Some("P1"), Some("L1")),
        ]);

        let bucket = &grouped.products["P1"].locations["L1"];
        let po_numbers: Vec<&str> = bucket.po_lines.iter().map(|l| l.po_number.as_str()).collect();
        assert_eq!(po_numbers, ["PO-a", "PO-b", "PO-c"]);
        assert_eq!(grouped.total_items, 3);
    }

    #[test]
    fn test_missing_identifiers_use_unknown_buckets() {
        let items = vec![line("a", None, None), line("b", None, None)];
        let grouped = group_items_by_product_location(items.clone());

        let unknown = &grouped.products[UNKNOWN_PRODUCT_ID];
        assert_eq!(unknown.product.name, UNKNOWN_PRODUCT_NAME);
        assert_eq!(unknown.locations[UNKNOWN_LOCATION_ID].po_lines.len(), 2);
        assert_eq!(flatten_grouped_items(&grouped), items);
    }

    #[test]
    fn test_missing_po_number_shows_na() {
        let mut item = line("a", Some("P1"), Some("L1"));
        item.po_number = None;
        let grouped = group_items_by_product_location(vec![item]);
        assert_eq!(
            grouped.products["P1"].locations["L1"].po_lines[0].po_number,
            NOT_AVAILABLE
        );
    }

    #[test]
    fn test_flatten_round_trip_preserves_multiset() {
        let items = vec![
            line("1", Some("P2"), Some("L1")),
            line("2", Some("P1"), Some("L1")),
            line("3", Some("P2"), Some("L2")),
            line("4", Some("P1"), Some("L1")),
            line("5", None, Some("L1")),
            line("6", Some("P2"), Some("L1")),
        ];
        let flat = flatten_grouped_items(&group_items_by_product_location(items.clone()));

        assert_eq!(sorted_ids(&flat), sorted_ids(&items));
        assert_eq!(ids(&flat), ["1", "6", "3", "2", "4", "5"]);
    }

    #[test]
    fn test_empty_input() {
        let grouped = group_items_by_product_location(Vec::new());
        assert_eq!(grouped.total_products, 0);
        assert_eq!(grouped.total_items, 0);
        assert!(flatten_grouped_items(&grouped).is_empty());
    }

    #[test]
    fn test_update_shares_untouched_branches() {
        let grouped = group_items_by_product_location(vec![
            line("1", Some("P1"), Some("L1")),
            line("2", Some("P1"), Some("L2")),
            line("3", Some("P2"), Some("L1")),
        ]);

        let updated = update_item_in_groups(&grouped, "1", |item| {
            item.received_quantity = dec!(9);
        });

        assert_eq!(updated.find_item("1").unwrap().received_quantity, dec!(9));
        assert_eq!(grouped.find_item("1").unwrap().received_quantity, dec!(4));

        assert!(Arc::ptr_eq(&grouped.products["P2"], &updated.products["P2"]));
        assert!(!Arc::ptr_eq(&grouped.products["P1"], &updated.products["P1"]));
        assert!(Arc::ptr_eq(
            &grouped.products["P1"].locations["L2"],
            &updated.products["P1"].locations["L2"]
        ));
    }

    #[test]
    fn test_update_refreshes_po_number() {
        let grouped = group_items_by_product_location(vec![line("1", Some("P1"), Some("L1"))]);
        let updated = update_item_in_groups(&grouped, "1", |item| {
            item.po_number = Some("PO-NEW".to_string());
        });
        assert_eq!(
            updated.products["P1"].locations["L1"].po_lines[0].po_number,
            "PO-NEW"
        );
    }

    #[test]
    fn test_update_that_moves_location_regroups() {
        let grouped = group_items_by_product_location(vec![
            line("1", Some("P1"), Some("L1")),
            line("2", Some("P1"), Some("L1")),
        ]);

        let updated = update_item_in_groups(&grouped, "2", |item| {
            item.location_id = Some("L3".to_string());
            item.location_name = Some("Bar".to_string());
        });

        let p1 = &updated.products["P1"];
        assert_eq!(p1.total_locations, 2);
        assert_eq!(p1.locations["L3"].location.name, "Bar");
        assert_eq!(p1.locations["L1"].po_lines.len(), 1);
        assert_eq!(updated.total_items, 2);
    }

    #[test]
    fn test_update_unknown_id_is_a_no_op() {
        let grouped = group_items_by_product_location(vec![line("1", Some("P1"), Some("L1"))]);
        let updated = update_item_in_groups(&grouped, "missing", |item| {
            item.received_quantity = dec!(99);
        });
        assert_eq!(updated, grouped);
    }

    #[test]
    fn test_remaining_quantity_is_unclamped() {
        assert_eq!(
            calculate_remaining_quantity(dec!(100), dec!(30), dec!(40)),
            dec!(30)
        );
        assert_eq!(
            calculate_remaining_quantity(dec!(100), dec!(30), dec!(80)),
            dec!(-10)
        );
    }

    #[test]
    fn test_rollups() {
        let mut a = line("1", Some("P1"), Some("L1"));
        a.foc_quantity = dec!(1);
        a.pricing.unit_price = Money::new(dec!(2.5));
        let mut b = line("2", Some("P1"), Some("L2"));
        b.previously_received = dec!(6);
        b.pricing.unit_price = Money::new(dec!(10));

        let grouped = group_items_by_product_location(vec![a, b]);
        let p1 = &grouped.products["P1"];

        let quantities = p1.quantities();
        assert_eq!(quantities.ordered, dec!(20));
        assert_eq!(quantities.received, dec!(8));
        assert_eq!(quantities.foc, dec!(1));
        assert_eq!(quantities.remaining, dec!(6));

        let totals = p1.totals();
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.amounts.subtotal, Money::new(dec!(50)));
        assert_eq!(grouped.totals(), totals);
        assert_eq!(p1.locations["L2"].totals().amounts.total, Money::new(dec!(40)));
    }

    #[test]
    fn test_rollups_of_huge_lines_saturate() {
        let mut a = line("1", Some("P1"), Some("L1"));
        a.received_quantity = Decimal::MAX;
        a.ordered_quantity = Decimal::MIN;
        a.pricing.unit_price = Money::new(dec!(1000));
        let b = a.clone();

        let grouped = group_items_by_product_location(vec![a, b]);
        assert_eq!(grouped.totals().amounts.subtotal.amount(), Decimal::MAX);

        let quantities = grouped.quantities();
        assert_eq!(quantities.received, Decimal::MAX);
        assert_eq!(quantities.remaining, Decimal::MIN);
    }
}
