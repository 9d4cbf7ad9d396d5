//! Query text for the REST query endpoint.

use crmcheck_core::RecordFilter;
use serde_json::Value;

/// Render a literal for a WHERE clause.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(_) | Value::Object(_) => quote(&value.to_string()),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `SELECT <fields> FROM <object> [WHERE ...]`
///
/// The field list is joined the way the query shaper measures it. An empty
/// list selects `Id` only. No row limit is applied; the caller follows
/// continuation pages.
pub fn select(object_type: &str, filter: &RecordFilter, fields: &[String]) -> String {
    let fields = if fields.is_empty() {
        "Id".to_string()
    } else {
        fields.join(",")
    };

    let mut query = format!("SELECT {} FROM {}", fields, object_type);
    if !filter.is_empty() {
        let conditions: Vec<String> = filter
            .iter()
            .map(|(field, value)| format!("{} = {}", field, literal(value)))
            .collect();
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }
    query
}
