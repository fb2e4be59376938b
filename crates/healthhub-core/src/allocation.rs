use crate::error::CoreError;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names of the allocation table.
pub mod fields {
    pub const ID: &str = "id";
    pub const BED_ID: &str = "bed_id";
    pub const PATIENT_ID: &str = "patient_id";
    pub const ADMISSION_DATE: &str = "admission_date";
    pub const DISCHARGE_DATE: &str = "discharge_date";
    pub const STATUS: &str = "status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Active,
    Discharged,
    Transferred,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Discharged => "discharged",
            Self::Transferred => "transferred",
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "discharged" => Ok(Self::Discharged),
            "transferred" => Ok(Self::Transferred),
            other => Err(CoreError::invalid_status("allocation", other)),
        }
    }
}

/// An occupancy record binding a bed to a patient.
///
/// Allocations are created `active` and move to `discharged` or
/// `transferred` exactly once. A later stay in the same bed gets a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAllocation {
    pub id: String,
    pub bed_id: String,
    pub patient_id: String,
    pub admission_date: Timestamp,
    #[serde(default)]
    pub discharge_date: Option<Timestamp>,
    pub status: AllocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl BedAllocation {
    pub fn is_active(&self) -> bool {
        self.status == AllocationStatus::Active
    }
}

/// Payload for the allocation insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAllocation {
    pub bed_id: String,
    pub patient_id: String,
    pub admission_date: Timestamp,
    pub status: AllocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewAllocation {
    pub fn active(
        bed_id: impl Into<String>,
        patient_id: impl Into<String>,
        admission_date: Timestamp,
    ) -> Self {
        Self {
            bed_id: bed_id.into(),
            patient_id: patient_id.into(),
            admission_date,
            status: AllocationStatus::Active,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
