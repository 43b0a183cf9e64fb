//! # Domain Types
//!
//! Core domain types shared by the receiving, purchasing and reporting
//! modules.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ReceiptLine    │   │  ProductInfo    │   │  LocationInfo   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  product_id     │──►│  name, code     │   │  name, code     │       │
//! │  │  location_id    │──────────────────────►  │                 │       │
//! │  │  po_number      │   └─────────────────┘   └─────────────────┘       │
//! │  │  quantities     │                                                    │
//! │  │  pricing        │   ┌─────────────────┐   ┌─────────────────┐       │
//! │  └─────────────────┘   │    TaxMode      │   │   UserContext   │       │
//! │                        │  Inclusive      │   │  role           │       │
//! │                        │  Exclusive      │   │  locations      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## One Record, Many Spellings
//! Receipt lines arrive from several screens that spell the same field
//! differently (`productId`, `itemId`; `name`, `itemName`, `productName`).
//! All spellings are folded into one typed record at deserialisation time,
//! first non-blank value wins, so no code downstream looks up optional keys.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::pricing::{self, LineAmounts, PricingInput};
use crate::{UNKNOWN_LOCATION_ID, UNKNOWN_LOCATION_NAME, UNKNOWN_PRODUCT_ID, UNKNOWN_PRODUCT_NAME};

// =============================================================================
// Tax Mode
// =============================================================================

/// Whether a line's price already contains tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Tax is added on top of the net amount.
    #[default]
    Exclusive,
    /// The amount already includes tax; tax is netted out of it.
    Inclusive,
}

impl TaxMode {
    /// Maps the forms' `taxIncluded` checkbox onto a mode.
    #[inline]
    pub fn from_inclusive_flag(inclusive: bool) -> Self {
        if inclusive {
            TaxMode::Inclusive
        } else {
            TaxMode::Exclusive
        }
    }

    #[inline]
    pub fn is_inclusive(&self) -> bool {
        matches!(self, TaxMode::Inclusive)
    }
}

// =============================================================================
// Form Mode
// =============================================================================

/// Mode of a document or item-detail form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    /// Read-only.
    #[default]
    View,
    /// Editing an existing record.
    Edit,
    /// Creating a new record.
    Add,
}

impl FormMode {
    /// Returns true if inputs accept changes in this mode.
    pub fn is_editable(&self) -> bool {
        matches!(self, FormMode::Edit | FormMode::Add)
    }

    /// Returns true when the record does not exist yet.
    pub fn is_new(&self) -> bool {
        matches!(self, FormMode::Add)
    }
}

// =============================================================================
// Product / Location
// =============================================================================

/// Identifies a distinct product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A receiving location under a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// Receipt Line
// =============================================================================

/// One received line of a goods received note.
///
/// This is the canonical, flat record. Grouped views, totals and
/// base-currency figures are all derived from it and never stored back.
///
/// ## Quantities
/// - `ordered_quantity`: quantity on the purchase-order line
/// - `previously_received`: delivered by earlier GRNs against the same line
/// - `received_quantity`: delivered on this GRN (priced)
/// - `foc_quantity`: delivered free of charge (never priced)
///
/// Deserialises through a raw record with one slot per spelling, so a
/// record that carries two spellings of the same field is merged instead
/// of rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", from = "RawReceiptLine")]
pub struct ReceiptLine {
    pub id: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub location_code: Option<String>,
    pub po_number: Option<String>,
    pub po_id: Option<String>,

    #[ts(type = "string")]
    pub ordered_quantity: Decimal,
    #[ts(type = "string")]
    pub previously_received: Decimal,
    #[ts(type = "string")]
    pub received_quantity: Decimal,
    #[ts(type = "string")]
    pub foc_quantity: Decimal,

    pub order_unit: Option<String>,
    pub received_unit: Option<String>,
    pub lot_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,

    /// Goods stay vendor-owned at a consignment location.
    pub is_consignment: bool,

    pub pricing: PricingInput,
}

/// A receipt line as the screens send it: every spelling in its own slot.
///
/// Text fields take the first non-blank spelling. Quantities take the first
/// non-zero one, so an explicit `0` under one key does not hide a value
/// under another.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceiptLine {
    id: String,
    product_id: Option<String>,
    item_id: Option<String>,
    product_name: Option<String>,
    name: Option<String>,
    item_name: Option<String>,
    product_code: Option<String>,
    item_code: Option<String>,
    code: Option<String>,
    sku: Option<String>,
    description: Option<String>,
    item_description: Option<String>,
    location_id: Option<String>,
    store_location_id: Option<String>,
    location_name: Option<String>,
    location: Option<String>,
    store_location: Option<String>,
    location_code: Option<String>,
    po_number: Option<String>,
    purchase_order_number: Option<String>,
    po_id: Option<String>,
    purchase_order_id: Option<String>,
    ordered_quantity: Option<Decimal>,
    ordered_qty: Option<Decimal>,
    previously_received: Option<Decimal>,
    previously_delivered: Option<Decimal>,
    delivered_quantity: Option<Decimal>,
    received_quantity: Option<Decimal>,
    received_qty: Option<Decimal>,
    quantity: Option<Decimal>,
    foc_quantity: Option<Decimal>,
    foc_qty: Option<Decimal>,
    order_unit: Option<String>,
    unit: Option<String>,
    received_unit: Option<String>,
    lot_number: Option<String>,
    lot_no: Option<String>,
    expiry_date: Option<NaiveDate>,
    #[serde(default)]
    is_consignment: bool,
    #[serde(default)]
    pricing: PricingInput,
}

impl From<RawReceiptLine> for ReceiptLine {
    fn from(raw: RawReceiptLine) -> Self {
        ReceiptLine {
            id: raw.id,
            product_id: first_text([raw.product_id, raw.item_id]),
            product_name: first_text([raw.product_name, raw.name, raw.item_name]),
            product_code: first_text([raw.product_code, raw.item_code, raw.code, raw.sku]),
            description: first_text([raw.description, raw.item_description]),
            location_id: first_text([raw.location_id, raw.store_location_id]),
            location_name: first_text([raw.location_name, raw.location, raw.store_location]),
            location_code: first_text([raw.location_code]),
            po_number: first_text([raw.po_number, raw.purchase_order_number]),
            po_id: first_text([raw.po_id, raw.purchase_order_id]),
            ordered_quantity: first_quantity([raw.ordered_quantity, raw.ordered_qty]),
            previously_received: first_quantity([
                raw.previously_received,
                raw.previously_delivered,
                raw.delivered_quantity,
            ]),
            received_quantity: first_quantity([
                raw.received_quantity,
                raw.received_qty,
                raw.quantity,
            ]),
            foc_quantity: first_quantity([raw.foc_quantity, raw.foc_qty]),
            order_unit: first_text([raw.order_unit, raw.unit]),
            received_unit: first_text([raw.received_unit]),
            lot_number: first_text([raw.lot_number, raw.lot_no]),
            expiry_date: raw.expiry_date,
            is_consignment: raw.is_consignment,
            pricing: raw.pricing,
        }
    }
}

/// First candidate with non-whitespace content.
pub(crate) fn first_text<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

/// First non-zero candidate, or zero.
pub(crate) fn first_quantity<const N: usize>(candidates: [Option<Decimal>; N]) -> Decimal {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_zero())
        .unwrap_or_default()
}

impl ReceiptLine {
    /// Creates an empty line for a form in [`FormMode::Add`].
    ///
    /// The id is a fresh UUID v4 so the line can be patched before it has
    /// ever been saved.
    pub fn blank() -> Self {
        ReceiptLine {
            id: Uuid::new_v4().to_string(),
            product_id: None,
            product_name: None,
            product_code: None,
            description: None,
            location_id: None,
            location_name: None,
            location_code: None,
            po_number: None,
            po_id: None,
            ordered_quantity: Decimal::ZERO,
            previously_received: Decimal::ZERO,
            received_quantity: Decimal::ZERO,
            foc_quantity: Decimal::ZERO,
            order_unit: None,
            received_unit: None,
            lot_number: None,
            expiry_date: None,
            is_consignment: false,
            pricing: PricingInput::default(),
        }
    }

    /// Grouping key for the product level. Missing or blank ids fall back
    /// to the shared unknown bucket.
    pub fn product_key(&self) -> &str {
        non_blank(self.product_id.as_deref()).unwrap_or(UNKNOWN_PRODUCT_ID)
    }

    /// Grouping key for the location level.
    pub fn location_key(&self) -> &str {
        non_blank(self.location_id.as_deref()).unwrap_or(UNKNOWN_LOCATION_ID)
    }

    /// Product descriptor as first seen on this line.
    pub fn product_info(&self) -> ProductInfo {
        ProductInfo {
            id: self.product_key().to_string(),
            name: non_blank(self.product_name.as_deref())
                .unwrap_or(UNKNOWN_PRODUCT_NAME)
                .to_string(),
            code: self.product_code.clone().unwrap_or_default(),
            description: self.description.clone(),
        }
    }

    /// Location descriptor as first seen on this line.
    pub fn location_info(&self) -> LocationInfo {
        LocationInfo {
            id: self.location_key().to_string(),
            name: non_blank(self.location_name.as_deref())
                .unwrap_or(UNKNOWN_LOCATION_NAME)
                .to_string(),
            code: self.location_code.clone(),
        }
    }

    /// Quantity still expected after this receipt. Not floored at zero.
    pub fn remaining_quantity(&self) -> Decimal {
        crate::grouping::calculate_remaining_quantity(
            self.ordered_quantity,
            self.previously_received,
            self.received_quantity,
        )
    }

    /// Derived monetary amounts for the priced (non-FOC) quantity.
    pub fn amounts(&self) -> LineAmounts {
        pricing::calculate_line_amounts(self.received_quantity, &self.pricing)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// User Context
// =============================================================================

/// Role of the signed-in user, as supplied by the session provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    Staff,
    DepartmentManager,
    Purchaser,
    Storekeeper,
    FinancialManager,
    Admin,
}

/// The current user, passed explicitly into any filter that depends on
/// permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub id: String,
    pub name: String,
    pub role: UserRole,
    /// Location ids this user may see.
    #[serde(default)]
    pub accessible_locations: Vec<String>,
}

impl UserContext {
    /// Returns true if rows at `location_id` are visible to this user.
    ///
    /// Roles listed in `global_roles` see every location.
    pub fn can_view_location(&self, location_id: &str, global_roles: &[UserRole]) -> bool {
        global_roles.contains(&self.role)
            || self.accessible_locations.iter().any(|id| id == location_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
