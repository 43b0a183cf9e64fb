//! # Table Pipelines
//!
//! Building blocks shared by the report tables: free-text search,
//! categorical filters with an `"all"` sentinel, and sortable columns.
//!
//! ```text
//! rows ──► visible to user? ──► search ──► filters ──► sort ──► summary
//! ```
//!
//! Every stage is a plain, restartable transformation over an in-memory
//! slice. Nothing is cached between runs.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::SELECTION_ALL;

// =============================================================================
// Search
// =============================================================================

/// Case-insensitive substring match over several fields.
///
/// A blank query matches everything.
///
/// ## Example
/// ```rust
/// use procura_core::pipeline::matches_search;
///
/// assert!(matches_search("rice", &["Jasmine Rice", "RICE-25"]));
/// assert!(matches_search("  ", &["anything"]));
/// assert!(!matches_search("flour", &["Jasmine Rice"]));
/// ```
pub fn matches_search(query: &str, fields: &[&str]) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

// =============================================================================
// Selection ("all" sentinel)
// =============================================================================

/// Value of a categorical filter dropdown.
///
/// Serialised as the string `"all"` or as the selected value itself,
/// matching the dropdown values the UI sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    /// `All` bypasses the filter.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(selected) => selected == value,
        }
    }
}

impl Selection<String> {
    /// String selections also match borrowed values.
    pub fn matches_str(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(selected) => selected == value,
        }
    }
}

impl<T: Serialize> Serialize for Selection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::All => serializer.serialize_str(SELECTION_ALL),
            Selection::Only(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Selection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<V> {
            All(AllMarker),
            Only(V),
        }

        match Repr::<T>::deserialize(deserializer)? {
            Repr::All(_) => Ok(Selection::All),
            Repr::Only(value) => Ok(Selection::Only(value)),
        }
    }
}

/// Deserialises only from the literal `"all"`.
struct AllMarker;

impl<'de> Deserialize<'de> for AllMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AllVisitor;

        impl<'de> Visitor<'de> for AllVisitor {
            type Value = AllMarker;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "the string \"{SELECTION_ALL}\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<AllMarker, E> {
                if value == SELECTION_ALL {
                    Ok(AllMarker)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }
        }

        deserializer.deserialize_str(AllVisitor)
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Orients an ascending comparison.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Current sort column and direction of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec<F> {
    pub field: F,
    #[serde(default)]
    pub direction: SortDirection,
}

impl<F: Copy + PartialEq> SortSpec<F> {
    pub fn new(field: F, direction: SortDirection) -> Self {
        SortSpec { field, direction }
    }

    /// Column-header click: the same column flips direction, a new column
    /// starts ascending.
    pub fn clicked(self, field: F) -> Self {
        if self.field == field {
            SortSpec {
                field,
                direction: self.direction.toggle(),
            }
        } else {
            SortSpec {
                field,
                direction: SortDirection::Asc,
            }
        }
    }
}

/// A row of a searchable, sortable table.
pub trait TableRow {
    type SortField: Copy;

    /// Fields the free-text search looks at.
    fn search_fields(&self) -> Vec<&str>;

    /// Ascending comparison on `field`.
    fn compare_by(&self, other: &Self, field: Self::SortField) -> Ordering;
}

/// Keeps rows whose search fields contain `query`.
pub fn search_rows<'a, R: TableRow>(
    rows: impl IntoIterator<Item = &'a R>,
    query: &'a str,
) -> impl Iterator<Item = &'a R>
where
    R: 'a,
{
    rows.into_iter()
        .filter(move |row| matches_search(query, &row.search_fields()))
}

/// Stable sort by the selected column.
pub fn sort_rows<R: TableRow>(rows: &mut [R], sort: SortSpec<R::SortField>) {
    rows.sort_by(|a, b| sort.direction.apply(a.compare_by(b, sort.field)));
}

/// Case-insensitive text comparison for name-like columns.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

// =============================================================================
// Unit Tests
// =============================================================================
