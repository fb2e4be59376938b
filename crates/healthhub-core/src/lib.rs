pub mod allocation;
pub mod bed;
pub mod error;
pub mod id;
pub mod record;
pub mod time;

pub use allocation::{AllocationStatus, BedAllocation, NewAllocation};
pub use bed::{Bed, BedPatch, BedStatus, NewBed};
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{IdError, generate_id, validate_id};
pub use record::{decode_record, encode_record};
pub use time::{Timestamp, now_utc};
