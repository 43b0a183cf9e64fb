//! # procura-core: Pure Business Logic for Procura
//!
//! This crate holds the calculations behind the receiving and purchasing
//! screens: goods-received-note grouping, line-item pricing and the report
//! tables. Everything here is a pure, synchronous function over in-memory
//! data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Procura Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (TypeScript)                        │   │
//! │  │   GRN form ──► PO item table ──► Inventory aging report         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON (ts-rs bindings)                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ procura-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │ grouping  │  │  pricing  │  │   aging   │  │ po_items  │   │   │
//! │  │   │ product → │  │ discount  │  │  buckets  │  │  status   │   │   │
//! │  │   │ location  │  │ tax, FX   │  │  expiry   │  │ completion│   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │         money · pipeline · lookup · config · validation         │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Receipt lines, tax mode, users
//! - [`money`] - Money type rounded to two decimal places
//! - [`pricing`] - Discount, tax and base-currency amounts per line
//! - [`grouping`] - GRN items grouped by product, then location
//! - [`pipeline`] - Search, filter and sort building blocks
//! - [`aging`] - Inventory aging report
//! - [`po_items`] - Purchase-order item table
//! - [`lookup`] - Product, location and document lookups
//! - [`config`] - Organisation settings
//! - [`error`] - Domain error types
//! - [`validation`] - Form submission checks
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; "now" is always a parameter
//! 2. **No I/O**: lookups are traits the host implements
//! 3. **Decimal Money**: amounts are `rust_decimal` values rounded at every step
//! 4. **Degrade, Don't Fail**: bad data becomes sentinels; only validators error
//!
//! ## Example Usage
//!
//! ```rust
//! use procura_core::grouping::{flatten_grouped_items, group_items_by_product_location};
//! use procura_core::types::ReceiptLine;
//!
//! let lines: Vec<ReceiptLine> = serde_json::from_str(r#"[
//!     {"id": "1", "productId": "p1", "name": "Rice", "locationId": "dry"},
//!     {"id": "2", "productId": "p1", "name": "Rice", "locationId": "bar"},
//!     {"id": "3", "itemId": "p2", "itemName": "Salt", "locationId": "dry"}
//! ]"#).unwrap();
//!
//! let grouped = group_items_by_product_location(lines);
//! assert_eq!(grouped.total_products, 2);
//! assert_eq!(grouped.products["p1"].total_locations, 2);
//!
//! let ids: Vec<_> = flatten_grouped_items(&grouped).into_iter().map(|l| l.id).collect();
//! assert_eq!(ids, ["1", "2", "3"]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aging;
pub mod config;
pub mod error;
pub mod grouping;
pub mod lookup;
pub mod money;
pub mod pipeline;
pub mod po_items;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, ValidationError};
pub use grouping::{
    flatten_grouped_items, group_items_by_product_location, update_item_in_groups,
    GroupedReceiptItems,
};
pub use money::Money;
pub use pricing::{calculate_line_amounts, LineAmounts, PricingInput};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Grouping key for lines that carry no product id.
pub const UNKNOWN_PRODUCT_ID: &str = "unknown";

pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";

/// Grouping key for lines that carry no location id.
pub const UNKNOWN_LOCATION_ID: &str = "unknown";

pub const UNKNOWN_LOCATION_NAME: &str = "Unknown Location";

/// Display text for a missing reference (PO number, failed lookup).
pub const NOT_AVAILABLE: &str = "N/A";

/// Dropdown value that disables a categorical filter.
pub const SELECTION_ALL: &str = "all";

/// Longest accepted table search query, in characters.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

#[cfg(test)]
pub(crate) mod test_support {
    /// Routes `tracing` output to the test harness. Safe to call repeatedly.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_public_types_are_thread_safe() {
        assert_send_sync::<GroupedReceiptItems>();
        assert_send_sync::<ReceiptLine>();
        assert_send_sync::<LineAmounts>();
        assert_send_sync::<aging::AgingReport>();
        assert_send_sync::<po_items::PoItemTable>();
        assert_send_sync::<lookup::StaticCatalog>();
        assert_send_sync::<CoreConfig>();
        assert_send_sync::<CoreError>();
    }
}
