//! # Inventory Aging Report
//!
//! Filters, sorts and summarises stock lots by how long they have been on
//! hand.
//!
//! ## Report Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockLot[] ──► age against `as_of` ──► AgedLot[]                       │
//! │                                            │                            │
//! │          user may see location? ◄──────────┤                            │
//! │          search name / code / lot ◄────────┤                            │
//! │          location, category, bucket, expiry filters ("all" = any)       │
//! │                                            │                            │
//! │                                   sort by selected column               │
//! │                                            │                            │
//! │                         AgingReport { rows, summary }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reference date is a parameter, never read from the clock, so the
//! same inputs always produce the same report.

use std::cmp::Ordering;

use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::config::{AgingThresholds, CoreConfig};
use crate::error::CoreResult;
use crate::money::{round2, Money};
use crate::pipeline::{compare_text, matches_search, sort_rows, Selection, SortSpec, TableRow};
use crate::types::UserContext;
use crate::validation::validate_search_query;

// =============================================================================
// Rows
// =============================================================================

/// A lot of stock on hand at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockLot {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub lot_number: String,
    #[serde(default)]
    pub category: String,
    pub location_id: String,
    #[serde(default)]
    pub location_name: String,
    #[ts(as = "String")]
    pub received_date: NaiveDate,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
    pub unit_cost: Money,
    #[serde(default)]
    pub is_consignment: bool,
}

impl StockLot {
    /// Quantity × unit cost, rounded.
    pub fn value(&self) -> Money {
        self.unit_cost.mul_quantity(self.quantity)
    }

    /// Whole days since receipt. Lots dated in the future count as zero.
    pub fn age_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.received_date).num_days().max(0)
    }
}

/// Age band of a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    /// Up to `fresh_max_days` (default 0–30).
    Fresh,
    /// Up to `aging_max_days` (default 31–60).
    Aging,
    /// Up to `stale_max_days` (default 61–90).
    Stale,
    /// Older than `stale_max_days` (default 91+).
    Critical,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 4] = [
        AgeBucket::Fresh,
        AgeBucket::Aging,
        AgeBucket::Stale,
        AgeBucket::Critical,
    ];

    pub fn for_age(age_days: i64, thresholds: &AgingThresholds) -> Self {
        if age_days <= thresholds.fresh_max_days {
            AgeBucket::Fresh
        } else if age_days <= thresholds.aging_max_days {
            AgeBucket::Aging
        } else if age_days <= thresholds.stale_max_days {
            AgeBucket::Stale
        } else {
            AgeBucket::Critical
        }
    }

    /// Column label, e.g. `"31-60 days"`.
    pub fn label(&self, thresholds: &AgingThresholds) -> String {
        match self {
            AgeBucket::Fresh => format!("0-{} days", thresholds.fresh_max_days),
            AgeBucket::Aging => format!(
                "{}-{} days",
                thresholds.fresh_max_days + 1,
                thresholds.aging_max_days
            ),
            AgeBucket::Stale => format!(
                "{}-{} days",
                thresholds.aging_max_days + 1,
                thresholds.stale_max_days
            ),
            AgeBucket::Critical => format!("{}+ days", thresholds.stale_max_days + 1),
        }
    }
}

/// Expiry state of a lot relative to the report date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    NoExpiry,
    Good,
    ExpiringSoon,
    Expired,
}

impl ExpiryStatus {
    pub fn for_lot(lot: &StockLot, as_of: NaiveDate, soon_days: i64) -> Self {
        match lot.expiry_date {
            None => ExpiryStatus::NoExpiry,
            Some(expiry) if expiry < as_of => ExpiryStatus::Expired,
            Some(expiry) if (expiry - as_of).num_days() <= soon_days => ExpiryStatus::ExpiringSoon,
            Some(_) => ExpiryStatus::Good,
        }
    }
}

/// A lot with its derived aging fields, as one table row.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AgedLot {
    pub lot: StockLot,
    pub age_days: i64,
    pub bucket: AgeBucket,
    pub expiry: ExpiryStatus,
    pub value: Money,
}

impl AgedLot {
    pub fn new(lot: StockLot, as_of: NaiveDate, config: &CoreConfig) -> Self {
        let age_days = lot.age_days(as_of);
        AgedLot {
            bucket: AgeBucket::for_age(age_days, &config.aging),
            expiry: ExpiryStatus::for_lot(&lot, as_of, config.expiring_soon_days),
            value: lot.value(),
            age_days,
            lot,
        }
    }
}

// =============================================================================
// Query
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgingSortField {
    #[default]
    ProductName,
    ProductCode,
    Location,
    Category,
    Quantity,
    Value,
    Age,
    Expiry,
}

/// Filter bar and sort state of the aging table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgingQuery {
    pub search: String,
    pub location: Selection<String>,
    pub category: Selection<String>,
    pub bucket: Selection<AgeBucket>,
    pub expiry: Selection<ExpiryStatus>,
    pub sort: SortSpec<AgingSortField>,
}

impl AgingQuery {
    /// Trims the search text and rejects it when it is too long.
    pub fn validated(mut self) -> CoreResult<Self> {
        self.search = validate_search_query(&self.search)?;
        Ok(self)
    }

    fn accepts(&self, row: &AgedLot) -> bool {
        matches_search(&self.search, &row.search_fields())
            && self.location.matches_str(&row.lot.location_id)
            && self.category.matches_str(&row.lot.category)
            && self.bucket.matches(&row.bucket)
            && self.expiry.matches(&row.expiry)
    }
}

impl TableRow for AgedLot {
    type SortField = AgingSortField;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.lot.product_name.as_str(),
            self.lot.product_code.as_str(),
            self.lot.lot_number.as_str(),
        ]
    }

    fn compare_by(&self, other: &Self, field: AgingSortField) -> Ordering {
        match field {
            AgingSortField::ProductName => {
                compare_text(&self.lot.product_name, &other.lot.product_name)
            }
            AgingSortField::ProductCode => {
                compare_text(&self.lot.product_code, &other.lot.product_code)
            }
            AgingSortField::Location => {
                compare_text(&self.lot.location_name, &other.lot.location_name)
            }
            AgingSortField::Category => compare_text(&self.lot.category, &other.lot.category),
            AgingSortField::Quantity => self.lot.quantity.cmp(&other.lot.quantity),
            AgingSortField::Value => self.value.cmp(&other.value),
            AgingSortField::Age => self.age_days.cmp(&other.age_days),
            // lots without expiry sort after every dated lot
            AgingSortField::Expiry => match (self.lot.expiry_date, other.lot.expiry_date) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub bucket: AgeBucket,
    pub label: String,
    pub lot_count: usize,
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub value: Money,
    /// Share of the report's total value, in percent.
    #[ts(type = "string")]
    pub value_share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAge {
    pub category: String,
    pub lot_count: usize,
    #[ts(type = "string")]
    pub average_age_days: Decimal,
    pub value: Money,
}

/// Dashboard cards and chart series for the aging report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AgingSummary {
    pub lot_count: usize,
    pub product_count: usize,
    #[ts(type = "string")]
    pub total_quantity: Decimal,
    pub total_value: Money,
    #[ts(type = "string")]
    pub average_age_days: Decimal,
    pub buckets: Vec<BucketSummary>,
    /// First-seen category order.
    pub categories: Vec<CategoryAge>,
    pub expiring_soon_count: usize,
    pub expired_count: usize,
    pub consignment_value: Money,
}

impl AgingSummary {
    pub fn from_rows(rows: &[AgedLot], thresholds: &AgingThresholds) -> Self {
        let total_value: Money = rows.iter().map(|r| r.value).sum();

        let buckets = AgeBucket::ALL
            .iter()
            .map(|&bucket| {
                let in_bucket: Vec<&AgedLot> = rows.iter().filter(|r| r.bucket == bucket).collect();
                let value: Money = in_bucket.iter().map(|r| r.value).sum();
                BucketSummary {
                    bucket,
                    label: bucket.label(thresholds),
                    lot_count: in_bucket.len(),
                    quantity: in_bucket.iter().map(|r| r.lot.quantity).sum(),
                    value,
                    value_share: crate::pricing::percentage_of(value.amount(), total_value.amount()),
                }
            })
            .collect();

        let mut by_category: IndexMap<&str, (usize, i64, Money)> = IndexMap::new();
        for row in rows {
            let entry = by_category
                .entry(row.lot.category.as_str())
                .or_insert((0, 0, Money::zero()));
            entry.0 += 1;
            entry.1 += row.age_days;
            entry.2 += row.value;
        }
        let categories = by_category
            .into_iter()
            .map(|(category, (count, age_sum, value))| CategoryAge {
                category: category.to_string(),
                lot_count: count,
                average_age_days: average(age_sum, count),
                value,
            })
            .collect();

        let mut products: Vec<&str> = rows.iter().map(|r| r.lot.product_id.as_str()).collect();
        products.sort_unstable();
        products.dedup();

        AgingSummary {
            lot_count: rows.len(),
            product_count: products.len(),
            total_quantity: rows.iter().map(|r| r.lot.quantity).sum(),
            total_value,
            average_age_days: average(rows.iter().map(|r| r.age_days).sum(), rows.len()),
            buckets,
            categories,
            expiring_soon_count: rows
                .iter()
                .filter(|r| r.expiry == ExpiryStatus::ExpiringSoon)
                .count(),
            expired_count: rows
                .iter()
                .filter(|r| r.expiry == ExpiryStatus::Expired)
                .count(),
            consignment_value: rows
                .iter()
                .filter(|r| r.lot.is_consignment)
                .map(|r| r.value)
                .sum(),
        }
    }
}

fn average(sum: i64, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    round2(Decimal::from(sum) / Decimal::from(count as u64))
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AgingReport {
    #[ts(as = "String")]
    pub as_of: NaiveDate,
    pub rows: Vec<AgedLot>,
    pub summary: AgingSummary,
}

/// Runs the full aging pipeline over `lots`.
///
/// Rows outside the user's locations are dropped before any other filter,
/// so summaries never include stock the user cannot see.
pub fn build_aging_report(
    lots: &[StockLot],
    query: &AgingQuery,
    user: &UserContext,
    config: &CoreConfig,
    as_of: NaiveDate,
) -> AgingReport {
    let mut rows: Vec<AgedLot> = lots
        .iter()
        .filter(|lot| user.can_view_location(&lot.location_id, &config.global_access_roles))
        .map(|lot| AgedLot::new(lot.clone(), as_of, config))
        .filter(|row| query.accepts(row))
        .collect();

    sort_rows(&mut rows, query.sort);
    let summary = AgingSummary::from_rows(&rows, &config.aging);

    debug!(
        user_id = %user.id,
        input = lots.len(),
        rows = rows.len(),
        "Built inventory aging report"
    );

    AgingReport {
        as_of,
        rows,
        summary,
    }
}

/// Distinct categories among the lots the user may see, for the filter
/// dropdown.
pub fn category_options(lots: &[StockLot], user: &UserContext, config: &CoreConfig) -> Vec<String> {
    let mut categories: Vec<String> = lots
        .iter()
        .filter(|lot| user.can_view_location(&lot.location_id, &config.global_access_roles))
        .map(|lot| lot.category.clone())
        .filter(|c| !c.is_empty())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SortDirection;
    use crate::types::UserRole;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn as_of() -> NaiveDate {
        date(2024, 6, 30)
    }

    fn lot(id: &str, name: &str, category: &str, location: &str, received: NaiveDate) -> StockLot {
        StockLot {
            id: id.to_string(),
            product_id: format!("p-{name}"),
            product_name: name.to_string(),
            product_code: format!("{}-01", name.to_uppercase()),
            lot_number: format!("LOT-{id}"),
            category: category.to_string(),
            location_id: location.to_string(),
            location_name: location.to_string(),
            received_date: received,
            expiry_date: None,
            quantity: dec!(10),
            unit: "kg".to_string(),
            unit_cost: Money::new(dec!(2.5)),
            is_consignment: false,
        }
    }

    fn lots() -> Vec<StockLot> {
        let mut butter = lot("1", "Butter", "Dairy", "kitchen", date(2024, 6, 20));
        butter.expiry_date = Some(date(2024, 7, 10));
        let mut cream = lot("2", "Cream", "Dairy", "kitchen", date(2024, 4, 1));
        cream.expiry_date = Some(date(2024, 6, 1));
        let flour = lot("3", "Flour", "Dry Goods", "store", date(2024, 5, 15));
        let mut wine = lot("4", "Wine", "Beverage", "bar", date(2023, 12, 1));
        wine.is_consignment = true;
        wine.quantity = dec!(4);
        wine.unit_cost = Money::new(dec!(30));
        vec![butter, cream, flour, wine]
    }

    fn admin() -> UserContext {
        UserContext {
            id: "admin".to_string(),
            name: "Admin".to_string(),
            role: UserRole::Admin,
            accessible_locations: Vec::new(),
        }
    }

    #[test]
    fn test_buckets_and_expiry() {
        let config = CoreConfig::default();
        let rows: Vec<AgedLot> = lots()
            .into_iter()
            .map(|l| AgedLot::new(l, as_of(), &config))
            .collect();

        assert_eq!(rows[0].age_days, 10);
        assert_eq!(rows[0].bucket, AgeBucket::Fresh);
        assert_eq!(rows[0].expiry, ExpiryStatus::ExpiringSoon);
        assert_eq!(rows[1].bucket, AgeBucket::Stale);
        assert_eq!(rows[1].expiry, ExpiryStatus::Expired);
        assert_eq!(rows[2].bucket, AgeBucket::Aging);
        assert_eq!(rows[2].expiry, ExpiryStatus::NoExpiry);
        assert_eq!(rows[3].bucket, AgeBucket::Critical);
    }

    #[test]
    fn test_bucket_boundaries_are_inclusive() {
        let t = AgingThresholds::default();
        assert_eq!(AgeBucket::for_age(30, &t), AgeBucket::Fresh);
        assert_eq!(AgeBucket::for_age(31, &t), AgeBucket::Aging);
        assert_eq!(AgeBucket::for_age(90, &t), AgeBucket::Stale);
        assert_eq!(AgeBucket::for_age(91, &t), AgeBucket::Critical);
        assert_eq!(AgeBucket::Aging.label(&t), "31-60 days");
        assert_eq!(AgeBucket::Stale.label(&t), "61-90 days");
        assert_eq!(AgeBucket::Critical.label(&t), "91+ days");
    }

    #[test]
    fn test_user_only_sees_assigned_locations() {
        let user = UserContext {
            id: "u1".to_string(),
            name: "Chef".to_string(),
            role: UserRole::Staff,
            accessible_locations: vec!["kitchen".to_string()],
        };
        let report = build_aging_report(
            &lots(),
            &AgingQuery::default(),
            &user,
            &CoreConfig::default(),
            as_of(),
        );

        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| r.lot.location_id == "kitchen"));
        assert_eq!(report.summary.total_value, Money::new(dec!(50)));
    }

    #[test]
    fn test_filters_and_sort() {
        let query = AgingQuery {
            category: Selection::Only("Dairy".to_string()),
            sort: SortSpec::new(AgingSortField::Age, SortDirection::Desc),
            ..AgingQuery::default()
        };
        let report = build_aging_report(&lots(), &query, &admin(), &CoreConfig::default(), as_of());

        let names: Vec<&str> = report.rows.iter().map(|r| r.lot.product_name.as_str()).collect();
        assert_eq!(names, ["Cream", "Butter"]);

        let query = AgingQuery {
            search: "lot-3".to_string(),
            ..AgingQuery::default()
        };
        let report = build_aging_report(&lots(), &query, &admin(), &CoreConfig::default(), as_of());
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].lot.product_name, "Flour");

        let query = AgingQuery {
            bucket: Selection::Only(AgeBucket::Critical),
            ..AgingQuery::default()
        };
        let report = build_aging_report(&lots(), &query, &admin(), &CoreConfig::default(), as_of());
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].lot.product_name, "Wine");
    }

    #[test]
    fn test_expiry_sort_puts_undated_last() {
        let query = AgingQuery {
            sort: SortSpec::new(AgingSortField::Expiry, SortDirection::Asc),
            ..AgingQuery::default()
        };
        let report = build_aging_report(&lots(), &query, &admin(), &CoreConfig::default(), as_of());
        let names: Vec<&str> = report.rows.iter().map(|r| r.lot.product_name.as_str()).collect();
        assert_eq!(names, ["Cream", "Butter", "Flour", "Wine"]);
    }

    #[test]
    fn test_summary() {
        let report = build_aging_report(
            &lots(),
            &AgingQuery::default(),
            &admin(),
            &CoreConfig::default(),
            as_of(),
        );
        let summary = &report.summary;

        assert_eq!(summary.lot_count, 4);
        assert_eq!(summary.product_count, 4);
        assert_eq!(summary.total_quantity, dec!(34));
        assert_eq!(summary.total_value, Money::new(dec!(195)));
        assert_eq!(summary.expiring_soon_count, 1);
        assert_eq!(summary.expired_count, 1);
        assert_eq!(summary.consignment_value, Money::new(dec!(120)));

        let critical = &summary.buckets[3];
        assert_eq!(critical.bucket, AgeBucket::Critical);
        assert_eq!(critical.lot_count, 1);
        assert_eq!(critical.value_share, dec!(61.54));

        let dairy = &summary.categories[0];
        assert_eq!(dairy.category, "Dairy");
        assert_eq!(dairy.lot_count, 2);
        // (10 + 90) / 2
        assert_eq!(dairy.average_age_days, dec!(50));
    }

    #[test]
    fn test_empty_report() {
        let report = build_aging_report(
            &[],
            &AgingQuery::default(),
            &admin(),
            &CoreConfig::default(),
            as_of(),
        );
        assert!(report.rows.is_empty());
        assert_eq!(report.summary.average_age_days, Decimal::ZERO);
        assert!(report.summary.buckets.iter().all(|b| b.value_share.is_zero()));
    }

    #[test]
    fn test_query_from_ui_json() {
        let query: AgingQuery = serde_json::from_str(
            r#"{"search":"","location":"all","category":"Dairy","bucket":"critical","expiry":"all",
                "sort":{"field":"value","direction":"desc"}}"#,
        )
        .unwrap();
        assert_eq!(query.location, Selection::All);
        assert_eq!(query.bucket, Selection::Only(AgeBucket::Critical));
        assert_eq!(query.sort.field, AgingSortField::Value);
    }

    #[test]
    fn test_query_search_is_trimmed_and_bounded() {
        let query = AgingQuery {
            search: "  rice  ".to_string(),
            ..AgingQuery::default()
        }
        .validated()
        .unwrap();
        assert_eq!(query.search, "rice");

        let too_long = AgingQuery {
            search: "x".repeat(crate::MAX_SEARCH_QUERY_LEN + 1),
            ..AgingQuery::default()
        };
        assert!(matches!(
            too_long.validated(),
            Err(crate::CoreError::Validation(crate::ValidationError::TooLong { .. }))
        ));
    }

    #[test]
    fn test_category_options() {
        let options = category_options(&lots(), &admin(), &CoreConfig::default());
        assert_eq!(options, ["Beverage", "Dairy", "Dry Goods"]);
    }
}
