//! Query descriptions: predicates, sort order, page size, and cursors.
//!
//! The wire shape of [`Filter`] and [`SortDescriptor`] follows the
//! `filterBy` / `sortBy` objects of record web services, so an HTTP
//! backend can forward them without translation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{FieldValue, RawRemoteRecord};

/// How a [`Filter`] compares a record field against its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    /// String field starts with the string value.
    BeginsWith,
    /// String field is one of the entries of a string list value.
    In,
    /// String list field contains the string value.
    ListContains,
}

/// A single field condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_name: String,
    pub comparator: Comparator,
    pub field_value: FieldValue,
}

impl Filter {
    pub fn new(
        field_name: impl Into<String>,
        comparator: Comparator,
        field_value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            comparator,
            field_value: field_value.into(),
        }
    }

    pub fn equals(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, Comparator::Equals, value)
    }

    pub fn not_equals(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, Comparator::NotEquals, value)
    }

    pub fn less_than(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, Comparator::LessThan, value)
    }

    pub fn greater_than(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, Comparator::GreaterThan, value)
    }

    pub fn begins_with(field_name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(field_name, Comparator::BeginsWith, FieldValue::String(prefix.into()))
    }

    /// Returns whether the record satisfies this condition.
    ///
    /// A record that lacks the field, or holds a value of a kind that cannot
    /// be compared with the filter value, never matches.
    pub fn matches(&self, record: &RawRemoteRecord) -> bool {
        let Some(actual) = record.get(&self.field_name) else {
            return false;
        };
        let expected = &self.field_value;

        match self.comparator {
            Comparator::Equals => actual.partial_cmp(expected) == Some(Ordering::Equal),
            Comparator::NotEquals => matches!(
                actual.partial_cmp(expected),
                Some(Ordering::Less | Ordering::Greater)
            ),
            Comparator::LessThan => actual.partial_cmp(expected) == Some(Ordering::Less),
            Comparator::LessThanOrEquals => matches!(
                actual.partial_cmp(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Comparator::GreaterThan => actual.partial_cmp(expected) == Some(Ordering::Greater),
            Comparator::GreaterThanOrEquals => matches!(
                actual.partial_cmp(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Comparator::BeginsWith => match (actual.as_str(), expected.as_str()) {
                (Some(a), Some(prefix)) => a.starts_with(prefix),
                _ => false,
            },
            Comparator::In => match (actual.as_str(), expected.as_string_list()) {
                (Some(a), Some(list)) => list.iter().any(|entry| entry == a),
                _ => false,
            },
            Comparator::ListContains => match (actual.as_string_list(), expected.as_str()) {
                (Some(list), Some(e)) => list.iter().any(|entry| entry == e),
                _ => false,
            },
        }
    }
}

/// A conjunction of filters. The empty conjunction matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    filters: Vec<Filter>,
}

impl Predicate {
    /// The match-all predicate.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds a filter to the conjunction.
    #[must_use]
    pub fn and(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_match_all(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn matches(&self, record: &RawRemoteRecord) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }
}

impl From<Filter> for Predicate {
    fn from(filter: Filter) -> Self {
        Self::all().and(filter)
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDescriptor {
    pub field_name: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ascending: true,
        }
    }

    pub fn descending(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ascending: false,
        }
    }

    /// Orders two records by this key. Records missing the field sort
    /// last in either direction; incomparable values tie.
    pub fn compare(&self, a: &RawRemoteRecord, b: &RawRemoteRecord) -> Ordering {
        match (a.get(&self.field_name), b.get(&self.field_name)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(y).unwrap_or(Ordering::Equal);
                if self.ascending { ord } else { ord.reverse() }
            }
        }
    }
}

/// Everything a query carries besides its record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortDescriptor>,
    /// Maximum records per page requested from the server. Bounds the
    /// page size only; paging continues until the server stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_limit: Option<usize>,
}

impl QuerySpec {
    /// Match-all, unsorted, server-chosen page size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicate = predicate.into();
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, descriptor: SortDescriptor) -> Self {
        self.sort.push(descriptor);
        self
    }

    #[must_use]
    pub fn with_results_limit(mut self, limit: usize) -> Self {
        self.results_limit = Some(limit);
        self
    }

    /// Orders two records by the sort keys in sequence.
    pub fn compare_records(&self, a: &RawRemoteRecord, b: &RawRemoteRecord) -> Ordering {
        self.sort
            .iter()
            .map(|descriptor| descriptor.compare(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// Opaque continuation token for the next page of a query.
///
/// Only the backend that issued a cursor can interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
