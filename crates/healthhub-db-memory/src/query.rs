//! Ordering and paging over in-memory rows.

use std::cmp::Ordering;

use healthhub_storage::SortParam;
use serde_json::Value;

/// Rank of a JSON type when values of different types meet in one column.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

/// Compares two column values in ascending order with nulls last,
/// the way Postgres orders `ASC`.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Sorts rows by the given columns, most significant first.
///
/// Descending order reverses the whole comparison, so nulls come first,
/// matching Postgres `DESC`.
pub fn sort_records(records: &mut [Value], order: &[SortParam]) {
    if order.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for sort in order {
            let left = a.get(&sort.column).unwrap_or(&Value::Null);
            let right = b.get(&sort.column).unwrap_or(&Value::Null);
            let mut ordering = compare_values(left, right);
            if sort.descending {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Applies offset and limit to already sorted rows.
pub fn paginate(records: Vec<Value>, offset: Option<u32>, limit: Option<u32>) -> Vec<Value> {
    let offset = offset.unwrap_or(0) as usize;
    let iter = records.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit as usize).collect(),
        None => iter.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(1), &json!(2)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("A-2"), &json!("A-10")), Ordering::Greater);
        assert_eq!(compare_values(&json!(null), &json!("x")), Ordering::Greater);
    }

    #[test]
    fn test_sort_records_multi_column() {
        let mut rows = vec![
            json!({"id": "1", "floor": 2, "bed_number": "B"}),
            json!({"id": "2", "floor": 1, "bed_number": "B"}),
            json!({"id": "3", "floor": 1, "bed_number": "A"}),
            json!({"id": "4", "bed_number": "C"}),
        ];
        sort_records(&mut rows, &[SortParam::asc("floor"), SortParam::asc("bed_number")]);
        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["3", "2", "1", "4"]);

        sort_records(&mut rows, &[SortParam::desc("floor")]);
        assert_eq!(rows[0]["id"], "4");
        assert_eq!(rows[1]["id"], "1");
    }

    #[test]
    fn test_paginate() {
        let rows: Vec<Value> = (0..5).map(|i| json!({"n": i})).collect();
        assert_eq!(paginate(rows.clone(), Some(1), Some(2)), vec![json!({"n": 1}), json!({"n": 2})]);
        assert_eq!(paginate(rows.clone(), Some(4), None).len(), 1);
        assert!(paginate(rows, Some(10), Some(3)).is_empty());
    }
}
