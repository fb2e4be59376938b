//! Query types for the record store abstraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column every table uses as primary key.
pub const ID_COLUMN: &str = "id";

/// Comparison applied by a single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Column equals the value.
    Eq(Value),
    /// Column differs from the value.
    Neq(Value),
    /// Column is null or absent.
    IsNull,
    /// Column is present and not null.
    NotNull,
}

/// A condition on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column the condition applies to.
    pub column: String,
    /// The comparison.
    pub op: FilterOp,
}

impl Condition {
    /// Returns true if `record` satisfies this condition.
    ///
    /// A missing column compares like `null`.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        let current = record.get(&self.column).unwrap_or(&Value::Null);
        match &self.op {
            FilterOp::Eq(expected) => current == expected,
            FilterOp::Neq(expected) => current != expected,
            FilterOp::IsNull => current.is_null(),
            FilterOp::NotNull => !current.is_null(),
        }
    }
}

/// A conjunction of column conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// All conditions must hold.
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Creates an empty filter that matches every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter selecting the row with the given id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().and_eq(ID_COLUMN, id.into())
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op: FilterOp::Eq(value.into()),
        });
        self
    }

    /// Adds an inequality condition.
    #[must_use]
    pub fn and_neq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op: FilterOp::Neq(value.into()),
        });
        self
    }

    /// Adds an `is null` condition.
    #[must_use]
    pub fn and_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op: FilterOp::IsNull,
        });
        self
    }

    /// Adds an `is not null` condition.
    #[must_use]
    pub fn and_not_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op: FilterOp::NotNull,
        });
        self
    }

    /// Returns the id this filter pins, if it has an `id = ...` string condition.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match &c.op {
            FilterOp::Eq(Value::String(id)) if c.column == ID_COLUMN => Some(id.as_str()),
            _ => None,
        })
    }

    /// Returns true if the filter has conditions beyond the id pin.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| !(c.column == ID_COLUMN && matches!(c.op, FilterOp::Eq(_))))
    }

    /// Returns true if `record` satisfies every condition.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Returns true if this filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// A sort parameter for select results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortParam {
    /// The column to sort by.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl SortParam {
    /// Creates a new `SortParam`.
    #[must_use]
    pub fn new(column: impl Into<String>, descending: bool) -> Self {
        Self {
            column: column.into(),
            descending,
        }
    }

    /// Creates an ascending sort parameter.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, false)
    }

    /// Creates a descending sort parameter.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, true)
    }
}

/// Parameters for a select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Row filter.
    pub filter: Filter,
    /// Ordering, most significant first.
    pub order: Vec<SortParam>,
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: Option<u32>,
    /// Whether to compute the exact number of matching rows.
    pub count: bool,
}

impl Query {
    /// Creates a query over all rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Appends an ordering column.
    #[must_use]
    pub fn with_order(mut self, sort: SortParam) -> Self {
        self.order.push(sort);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Requests an exact total count.
    #[must_use]
    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }
}

/// Result of a select.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// The rows in this page.
    pub records: Vec<Value>,
    /// Total number of matching rows, when requested.
    pub total: Option<u64>,
}

impl Page {
    /// Creates a page without a total.
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            total: None,
        }
    }

    /// Sets the total count.
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Returns the number of rows in this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
