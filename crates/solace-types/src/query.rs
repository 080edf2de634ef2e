use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Document;

/// A predicate on one top-level document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// `field == value`
    Eq { field: String, value: Value },
    /// `field` is an array containing `value`
    ArrayContains { field: String, value: Value },
    /// the document id equals `id`
    DocumentId { id: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn document_id(id: impl Into<String>) -> Self {
        Self::DocumentId { id: id.into() }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::DocumentId { id } => doc.id == *id,
            Self::Eq { field, value } => doc.field(field) == Some(value),
            Self::ArrayContains { field, value } => doc
                .field(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A filtered, optionally ordered and limited read of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Evaluate filters, ordering and limit over every document of the
    /// collection. Ordering is stable, so ties keep storage order.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(order) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.field(&order.field), b.field(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched
    }
}

/// Total order over optional JSON values: missing and null sort first, then
/// booleans, numbers, strings. Values of other kinds compare equal.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(id: &str, author: &str, created_at: i64, is_read: bool) -> Document {
        Document::new(
            id,
            json!({ "authorId": author, "createdAt": created_at, "isRead": is_read }),
        )
    }

    #[test]
    fn eq_and_array_contains() {
        let chat = Document::new("c1", json!({ "participants": ["u1", "u2"], "open": true }));

        assert!(Filter::array_contains("participants", "u2").matches(&chat));
        assert!(!Filter::array_contains("participants", "u3").matches(&chat));
        assert!(Filter::eq("open", true).matches(&chat));
        assert!(!Filter::eq("missing", true).matches(&chat));
        assert!(!Filter::array_contains("open", true).matches(&chat));
        assert!(Filter::document_id("c1").matches(&chat));
        assert!(!Filter::document_id("c2").matches(&chat));
    }

    #[test]
    fn latest_first_with_limit() {
        let docs = vec![msg("a", "u1", 10, false), msg("b", "u2", 30, true), msg("c", "u2", 20, false)];

        let latest = Query::collection("chats/c1/messages")
            .order_by("createdAt", Direction::Descending)
            .limit(1)
            .apply(docs);

        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, "b");
    }

    #[test]
    fn filters_combine_as_and() {
        let docs = vec![msg("a", "u1", 10, false), msg("b", "u2", 30, true), msg("c", "u2", 20, false)];

        let unread = Query::collection("chats/c1/messages")
            .filter(Filter::eq("isRead", false))
            .filter(Filter::eq("authorId", "u2"))
            .apply(docs);

        let ids: Vec<_> = unread.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c"]);
    }

    #[test]
    fn missing_fields_sort_first() {
        let docs = vec![msg("a", "u1", 10, false), Document::new("b", json!({}))];

        let asc = Query::collection("x")
            .order_by("createdAt", Direction::Ascending)
            .apply(docs);

        assert_eq!(asc[0].id, "b");
    }
}
