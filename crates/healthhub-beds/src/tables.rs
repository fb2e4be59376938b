//! Table names the bed workflows operate on.

/// Default name of the bed table.
pub const DEFAULT_BEDS_TABLE: &str = "beds";

/// Default name of the allocation table.
pub const DEFAULT_ALLOCATIONS_TABLE: &str = "bed_allocations";

/// Names of the tables holding beds and allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub beds: String,
    pub allocations: String,
}

impl TableNames {
    pub fn new(beds: impl Into<String>, allocations: impl Into<String>) -> Self {
        Self {
            beds: beds.into(),
            allocations: allocations.into(),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self::new(DEFAULT_BEDS_TABLE, DEFAULT_ALLOCATIONS_TABLE)
    }
}
