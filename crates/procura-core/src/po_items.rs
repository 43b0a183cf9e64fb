//! # Purchase-Order Item Table
//!
//! Search, filter, sort and footer summary for the items of a purchase
//! order.
//!
//! ## Item Status
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  received = 0            ──► Pending                                    │
//! │  0 < received < ordered  ──► PartiallyReceived                          │
//! │  received ≥ ordered      ──► FullyReceived                              │
//! │  cancelled by buyer      ──► Cancelled (sticky, never re-derived)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::grouping::calculate_remaining_quantity;
use crate::money::Money;
use crate::pipeline::{compare_text, matches_search, sort_rows, Selection, SortSpec, TableRow};
use crate::pricing::{self, percentage_of, DocumentTotals, LineAmounts, PricingInput};
use crate::types::{first_quantity, first_text};
use crate::validation::validate_search_query;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PoItemStatus {
    #[default]
    Pending,
    PartiallyReceived,
    FullyReceived,
    Cancelled,
}

impl PoItemStatus {
    pub const ALL: [PoItemStatus; 4] = [
        PoItemStatus::Pending,
        PoItemStatus::PartiallyReceived,
        PoItemStatus::FullyReceived,
        PoItemStatus::Cancelled,
    ];

    /// Status implied by the quantities alone.
    pub fn from_quantities(ordered: Decimal, received: Decimal) -> Self {
        if received <= Decimal::ZERO {
            PoItemStatus::Pending
        } else if received < ordered {
            PoItemStatus::PartiallyReceived
        } else {
            PoItemStatus::FullyReceived
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PoItemStatus::Pending => 0,
            PoItemStatus::PartiallyReceived => 1,
            PoItemStatus::FullyReceived => 2,
            PoItemStatus::Cancelled => 3,
        }
    }
}

/// One item of a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", from = "RawPoItem")]
pub struct PoItem {
    pub id: String,
    pub product_name: String,
    pub product_code: String,
    pub description: String,
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub order_unit: String,
    #[ts(type = "string")]
    pub ordered_quantity: Decimal,
    #[ts(type = "string")]
    pub received_quantity: Decimal,
    #[ts(type = "string")]
    pub foc_quantity: Decimal,
    pub status: PoItemStatus,
    pub pricing: PricingInput,
}

/// Wire form of [`PoItem`] with one slot per spelling.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPoItem {
    id: String,
    product_name: Option<String>,
    name: Option<String>,
    item_name: Option<String>,
    product_code: Option<String>,
    item_code: Option<String>,
    code: Option<String>,
    description: Option<String>,
    location_id: Option<String>,
    location_name: Option<String>,
    order_unit: Option<String>,
    unit: Option<String>,
    ordered_quantity: Option<Decimal>,
    ordered_qty: Option<Decimal>,
    received_quantity: Option<Decimal>,
    received_qty: Option<Decimal>,
    foc_quantity: Option<Decimal>,
    foc_qty: Option<Decimal>,
    #[serde(default)]
    status: PoItemStatus,
    #[serde(default)]
    pricing: PricingInput,
}

impl From<RawPoItem> for PoItem {
    fn from(raw: RawPoItem) -> Self {
        PoItem {
            id: raw.id,
            product_name: first_text([raw.product_name, raw.name, raw.item_name])
                .unwrap_or_default(),
            product_code: first_text([raw.product_code, raw.item_code, raw.code])
                .unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            location_id: first_text([raw.location_id]),
            location_name: first_text([raw.location_name]),
            order_unit: first_text([raw.order_unit, raw.unit]).unwrap_or_default(),
            ordered_quantity: first_quantity([raw.ordered_quantity, raw.ordered_qty]),
            received_quantity: first_quantity([raw.received_quantity, raw.received_qty]),
            foc_quantity: first_quantity([raw.foc_quantity, raw.foc_qty]),
            status: raw.status,
            pricing: raw.pricing,
        }
    }
}

impl PoItem {
    /// Ordered quantity still outstanding. Negative when over-received.
    pub fn remaining_quantity(&self) -> Decimal {
        calculate_remaining_quantity(self.ordered_quantity, self.received_quantity, Decimal::ZERO)
    }

    /// Amounts for the ordered quantity.
    pub fn amounts(&self) -> LineAmounts {
        pricing::calculate_line_amounts(self.ordered_quantity, &self.pricing)
    }

    /// Status with quantities taken into account; cancellation is kept.
    pub fn effective_status(&self) -> PoItemStatus {
        match self.status {
            PoItemStatus::Cancelled => PoItemStatus::Cancelled,
            _ => PoItemStatus::from_quantities(self.ordered_quantity, self.received_quantity),
        }
    }
}

/// An item with its computed columns.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PoItemRow {
    pub item: PoItem,
    pub status: PoItemStatus,
    #[ts(type = "string")]
    pub remaining_quantity: Decimal,
    pub amounts: LineAmounts,
}

impl From<PoItem> for PoItemRow {
    fn from(item: PoItem) -> Self {
        PoItemRow {
            status: item.effective_status(),
            remaining_quantity: item.remaining_quantity(),
            amounts: item.amounts(),
            item,
        }
    }
}

// =============================================================================
// Query
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoItemSortField {
    #[default]
    Name,
    Code,
    Ordered,
    Received,
    Remaining,
    Amount,
    Status,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoItemQuery {
    pub search: String,
    pub status: Selection<PoItemStatus>,
    pub location: Selection<String>,
    pub sort: SortSpec<PoItemSortField>,
}

impl PoItemQuery {
    /// Trims the search text and rejects it when it is too long.
    pub fn validated(mut self) -> CoreResult<Self> {
        self.search = validate_search_query(&self.search)?;
        Ok(self)
    }

    fn accepts(&self, row: &PoItemRow) -> bool {
        matches_search(&self.search, &row.search_fields())
            && self.status.matches(&row.status)
            && self
                .location
                .matches_str(row.item.location_id.as_deref().unwrap_or_default())
    }
}

impl TableRow for PoItemRow {
    type SortField = PoItemSortField;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.item.product_name.as_str(),
            self.item.product_code.as_str(),
            self.item.description.as_str(),
        ]
    }

    fn compare_by(&self, other: &Self, field: PoItemSortField) -> Ordering {
        match field {
            PoItemSortField::Name => compare_text(&self.item.product_name, &other.item.product_name),
            PoItemSortField::Code => compare_text(&self.item.product_code, &other.item.product_code),
            PoItemSortField::Ordered => self.item.ordered_quantity.cmp(&other.item.ordered_quantity),
            PoItemSortField::Received => {
                self.item.received_quantity.cmp(&other.item.received_quantity)
            }
            PoItemSortField::Remaining => self.remaining_quantity.cmp(&other.remaining_quantity),
            PoItemSortField::Amount => self.amounts.amounts.total.cmp(&other.amounts.amounts.total),
            PoItemSortField::Status => self.status.rank().cmp(&other.status.rank()),
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: PoItemStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PoItemSummary {
    pub item_count: usize,
    pub by_status: Vec<StatusCount>,
    #[ts(type = "string")]
    pub total_ordered: Decimal,
    #[ts(type = "string")]
    pub total_received: Decimal,
    #[ts(type = "string")]
    pub total_remaining: Decimal,
    #[ts(type = "string")]
    pub total_foc: Decimal,
    /// Received share of ordered quantity across non-cancelled items, in percent.
    #[ts(type = "string")]
    pub completion_percent: Decimal,
    pub totals: DocumentTotals,
}

impl PoItemSummary {
    pub fn from_rows(rows: &[PoItemRow]) -> Self {
        let by_status = PoItemStatus::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                count: rows.iter().filter(|r| r.status == status).count(),
            })
            .collect();

        let open: Vec<&PoItemRow> = rows
            .iter()
            .filter(|r| r.status != PoItemStatus::Cancelled)
            .collect();
        let ordered: Decimal = open.iter().map(|r| r.item.ordered_quantity).sum();
        let received: Decimal = open.iter().map(|r| r.item.received_quantity).sum();

        PoItemSummary {
            item_count: rows.len(),
            by_status,
            total_ordered: ordered,
            total_received: received,
            total_remaining: open.iter().map(|r| r.remaining_quantity).sum(),
            total_foc: rows.iter().map(|r| r.item.foc_quantity).sum(),
            completion_percent: percentage_of(received, ordered),
            totals: DocumentTotals::from_lines(open.iter().map(|r| &r.amounts)),
        }
    }

    /// Total order value in transaction currency.
    pub fn total_amount(&self) -> Money {
        self.totals.amounts.total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PoItemTable {
    pub rows: Vec<PoItemRow>,
    pub summary: PoItemSummary,
}

/// Runs the item-table pipeline over the items of one purchase order.
pub fn build_po_item_table(items: &[PoItem], query: &PoItemQuery) -> PoItemTable {
    let mut rows: Vec<PoItemRow> = items
        .iter()
        .cloned()
        .map(PoItemRow::from)
        .filter(|row| query.accepts(row))
        .collect();

    sort_rows(&mut rows, query.sort);
    let summary = PoItemSummary::from_rows(&rows);

    debug!(input = items.len(), rows = rows.len(), "Built PO item table");
    PoItemTable { rows, summary }
}

// =============================================================================
// Unit Tests
// =============================================================================
