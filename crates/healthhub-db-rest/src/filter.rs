//! Encoding of store queries as PostgREST query parameters.

use healthhub_storage::{Filter, FilterOp, Query, SortParam};
use serde_json::Value;

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encodes one operator as a PostgREST operator expression.
pub fn encode_op(op: &FilterOp) -> String {
    match op {
        FilterOp::Eq(Value::Null) | FilterOp::IsNull => "is.null".to_string(),
        FilterOp::Neq(Value::Null) | FilterOp::NotNull => "not.is.null".to_string(),
        FilterOp::Eq(value) => format!("eq.{}", literal(value)),
        FilterOp::Neq(value) => format!("neq.{}", literal(value)),
    }
}

/// Encodes a filter as `column=op.value` pairs.
pub fn encode_filter(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions
        .iter()
        .map(|c| (c.column.clone(), encode_op(&c.op)))
        .collect()
}

/// Encodes ordering as a single `order` value, e.g. `floor.asc,bed_number.desc`.
pub fn encode_order(order: &[SortParam]) -> Option<String> {
    if order.is_empty() {
        return None;
    }
    Some(
        order
            .iter()
            .map(|s| format!("{}.{}", s.column, if s.descending { "desc" } else { "asc" }))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Encodes a full select.
pub fn encode_query(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(encode_filter(&query.filter));
    if let Some(order) = encode_order(&query.order) {
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

/// Extracts the total from a `Content-Range` header (`0-24/3573`, `*/0`).
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
