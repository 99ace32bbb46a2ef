use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Read access to named fields of a record.
///
/// The table view and the local refinement pass only ever look at records
/// through this trait, so any key/value shaped type can be listed.
pub trait Fields {
    fn field(&self, name: &str) -> Option<&Value>;

    /// Display text of a field, empty for absent or null values.
    fn field_text(&self, name: &str) -> String {
        value_text(self.field(name))
    }
}

/// One catalog item as returned by the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Identifier used to open the detail view, if the record carries one.
    pub fn id(&self) -> Option<String> {
        let id = self.field_text("id");
        if id.is_empty() { None } else { Some(id) }
    }
}

impl Fields for Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Record(map),
            _ => Record::default(),
        }
    }
}

pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

// Position of a value kind in the cross-type ordering.
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
    }
}

/// Three-way comparison of two field values.
///
/// This is a total order: absent and null sort first, then booleans,
/// numbers, strings and finally arrays/objects (compared by their JSON text).
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => x.to_string().cmp(&y.to_string()),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => match rank(a).cmp(&rank(b)) {
            Ordering::Equal if rank(a) == 4 => value_text(a).cmp(&value_text(b)),
            ord => ord,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from(value)
    }

    #[test]
    fn absent_and_null_fields_render_empty() {
        let r = record(json!({"title": "Phone", "brand": null}));
        assert_eq!(r.field_text("brand"), "");
        assert_eq!(r.field_text("sku"), "");
        assert_eq!(r.field_text("title"), "Phone");
    }

    #[test]
    fn scalars_render_without_quotes() {
        let r = record(json!({"price": 9.99, "stock": 5, "ok": true, "tags": ["a", "b"]}));
        assert_eq!(r.field_text("price"), "9.99");
        assert_eq!(r.field_text("stock"), "5");
        assert_eq!(r.field_text("ok"), "true");
        assert_eq!(r.field_text("tags"), "[\"a\",\"b\"]");
    }

    #[test]
    fn numbers_compare_numerically() {
        let a = json!(9);
        let b = json!(10.5);
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_values(Some(&b), Some(&a)), Ordering::Greater);
        assert_eq!(compare_values(Some(&a), Some(&json!(9.0))), Ordering::Equal);
    }

    #[test]
    fn mixed_kinds_follow_rank() {
        let s = json!("a");
        let n = json!(1);
        assert_eq!(compare_values(None, Some(&n)), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(compare_values(Some(&s), Some(&n)), Ordering::Greater);
    }

    #[test]
    fn id_is_read_from_numeric_field() {
        assert_eq!(record(json!({"id": 7})).id().as_deref(), Some("7"));
        assert_eq!(record(json!({"title": "x"})).id(), None);
    }
}
