use crate::error::CoreError;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names of the bed table.
pub mod fields {
    pub const ID: &str = "id";
    pub const BED_NUMBER: &str = "bed_number";
    pub const FLOOR: &str = "floor";
    pub const WARD: &str = "ward";
    pub const STATUS: &str = "status";
    pub const PATIENT_ID: &str = "patient_id";
    pub const ALLOCATION_ID: &str = "allocation_id";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BedStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
}

impl BedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(CoreError::invalid_status("bed", other)),
        }
    }
}

/// A bed row.
///
/// `patient_id` and `allocation_id` are the bound usage reference: both are
/// set while the bed is occupied and cleared when it is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: String,
    pub bed_number: String,
    pub floor: i32,
    pub ward: String,
    pub status: BedStatus,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub allocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Bed {
    pub fn is_available(&self) -> bool {
        self.status == BedStatus::Available
    }

    pub fn is_bound_to(&self, allocation_id: &str) -> bool {
        self.status == BedStatus::Occupied
            && self.allocation_id.as_deref() == Some(allocation_id)
    }
}

/// Payload for creating a bed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBed {
    pub bed_number: String,
    pub floor: i32,
    pub ward: String,
    #[serde(default)]
    pub status: BedStatus,
}

impl NewBed {
    pub fn new(bed_number: impl Into<String>, floor: i32, ward: impl Into<String>) -> Self {
        Self {
            bed_number: bed_number.into(),
            floor,
            ward: ward.into(),
            status: BedStatus::Available,
        }
    }

    pub fn with_status(mut self, status: BedStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a bed. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BedStatus>,
}

impl BedPatch {
    pub fn status(status: BedStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bed_number.is_none()
            && self.floor.is_none()
            && self.ward.is_none()
            && self.status.is_none()
    }
}
