//! Collections and equality-only queries.
//!
//! The backend only evaluates equality filters without composite indexes, so
//! a [`Query`] never carries an ordering. Callers sort client-side.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Fields, RawDocument};

/// A named document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Installations,
    Users,
    Notes,
    Announcements,
    Messages,
}

impl Collection {
    /// Every collection, in a fixed order.
    pub const ALL: [Collection; 5] = [
        Collection::Installations,
        Collection::Users,
        Collection::Notes,
        Collection::Announcements,
        Collection::Messages,
    ];

    /// The collection name used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Installations => "installations",
            Collection::Users => "users",
            Collection::Notes => "notes",
            Collection::Announcements => "announcements",
            Collection::Messages => "messages",
        }
    }

    /// Parse a backend collection name.
    pub fn from_name(name: &str) -> Option<Self> {
        Collection::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of an equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
}

impl FilterValue {
    /// Check a stored field value against this filter value.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (FilterValue::Text(expected), Some(Value::String(actual))) => expected == actual,
            (FilterValue::Bool(expected), Some(Value::Bool(actual))) => expected == actual,
            _ => false,
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "{:?}", s),
            FilterValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        FilterValue::Text(value.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// A single `field == value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    /// Wire name of the document field.
    pub field: String,
    /// Value the field must equal.
    pub value: FilterValue,
}

/// A live or one-shot query: collection, equality filters, optional limit.
///
/// Filters are kept sorted by field name so two queries with the same filter
/// set compare equal regardless of the order they were built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    /// Match every document in a collection.
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Add an equality filter. A second filter on the same field replaces the first.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.filters.binary_search_by(|f| f.field.as_str().cmp(&field)) {
            Ok(pos) => self.filters[pos].value = value,
            Err(pos) => self.filters.insert(pos, Filter { field, value }),
        }
        self
    }

    /// Cap the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a document body satisfies every filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|f| f.value.matches(fields.get(&f.field)))
    }

    /// Filter and cap documents, keeping their order.
    pub fn apply<'a, I>(&self, docs: I) -> Vec<RawDocument>
    where
        I: IntoIterator<Item = (&'a String, &'a Fields)>,
    {
        let limit = self.limit.unwrap_or(usize::MAX);
        docs.into_iter()
            .filter(|(_, fields)| self.matches(fields))
            .take(limit)
            .map(|(id, fields)| RawDocument::new(id.clone(), fields.clone()))
            .collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for (i, filter) in self.filters.iter().enumerate() {
            let sep = if i == 0 { " where " } else { " and " };
            write!(f, "{}{} == {}", sep, filter.field, filter.value)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_order_is_canonical() {
        let a = Query::new(Collection::Users)
            .where_eq("team", "Julia")
            .where_eq("role", "supervisor");
        let b = Query::new(Collection::Users)
            .where_eq("role", "supervisor")
            .where_eq("team", "Julia");
        assert_eq!(a, b);
    }

    #[test]
    fn test_where_eq_replaces_same_field() {
        let q = Query::new(Collection::Users)
            .where_eq("team", "Julia")
            .where_eq("team", "BigTex");
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters[0].value, FilterValue::from("BigTex"));
    }

    #[test]
    fn test_matches_bool_and_text() {
        let q = Query::new(Collection::Messages)
            .where_eq("recipientUid", "u1")
            .where_eq("read", false);

        assert!(q.matches(&fields(json!({"recipientUid": "u1", "read": false}))));
        assert!(!q.matches(&fields(json!({"recipientUid": "u1", "read": true}))));
        assert!(!q.matches(&fields(json!({"recipientUid": "u2", "read": false}))));
        // A string "false" is not the boolean false.
        assert!(!q.matches(&fields(json!({"recipientUid": "u1", "read": "false"}))));
        assert!(!q.matches(&fields(json!({"recipientUid": "u1"}))));
    }

    #[test]
    fn test_apply_respects_limit_and_order() {
        let docs: Vec<(String, Fields)> = (0..4)
            .map(|i| (format!("d{}", i), fields(json!({"team": "Julia", "n": i}))))
            .collect();
        let q = Query::new(Collection::Users).where_eq("team", "Julia").limit(2);

        let result = q.apply(docs.iter().map(|(id, f)| (id, f)));
        let ids: Vec<&str> = result.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d0", "d1"]);
    }

    #[test]
    fn test_display() {
        let q = Query::new(Collection::Messages)
            .where_eq("recipientUid", "u1")
            .where_eq("read", false)
            .limit(5);
        assert_eq!(
            q.to_string(),
            "messages where read == false and recipientUid == \"u1\" limit 5"
        );
    }

    #[test]
    fn test_collection_names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_name(c.as_str()), Some(c));
        }
        assert_eq!(Collection::from_name("topics"), None);
    }
}
