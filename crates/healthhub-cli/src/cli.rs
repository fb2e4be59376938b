use clap::{Parser, Subcommand, ValueEnum};
use healthhub_beds::DEFAULT_PAGE_SIZE;
use healthhub_core::{BedStatus, Timestamp};

#[derive(Parser)]
#[command(name = "healthhub")]
#[command(about = "HealthHub bed allocation: admit, discharge and reconcile beds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file (defaults to ./healthhub.toml when present)
    #[arg(short, long, global = true, env = "HEALTHHUB_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List and maintain beds
    Beds(BedsArgs),
    /// Admit a patient to a bed
    Allocate(AllocateArgs),
    /// Discharge an active allocation and release its bed
    Discharge(DischargeArgs),
    /// Show a patient's allocations, newest first
    Allocations(AllocationsArgs),
    /// Compare beds with active allocations and repair drift
    Reconcile(ReconcileArgs),
}

#[derive(clap::Args)]
pub struct BedsArgs {
    #[command(subcommand)]
    pub command: BedCommands,
}

#[derive(Subcommand)]
pub enum BedCommands {
    /// List beds ordered by bed number
    List(ListBedsArgs),
    /// List available beds by floor and number
    Available,
    /// Show one bed
    Get(BedIdArgs),
    /// Register a new bed
    Create(CreateBedArgs),
    /// Set the status of a bed that is not occupied
    Status(BedStatusArgs),
    /// Remove a bed that is not occupied
    Delete(BedIdArgs),
}

#[derive(clap::Args)]
pub struct ListBedsArgs {
    /// Page size
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub limit: u32,
    /// Number of beds to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(clap::Args)]
pub struct BedIdArgs {
    /// Bed id
    pub id: String,
}

#[derive(clap::Args)]
pub struct CreateBedArgs {
    /// Bed number shown on the ward plan (e.g. A-101)
    #[arg(long)]
    pub number: String,
    #[arg(long, allow_negative_numbers = true)]
    pub floor: i32,
    #[arg(long)]
    pub ward: String,
    /// Initial status: available or maintenance
    #[arg(long, default_value = "available")]
    pub status: BedStatus,
}

#[derive(clap::Args)]
pub struct BedStatusArgs {
    /// Bed id
    pub id: String,
    /// New status: available or maintenance
    pub status: BedStatus,
}

#[derive(clap::Args)]
pub struct AllocateArgs {
    /// Bed id
    #[arg(long)]
    pub bed: String,
    /// Patient id
    #[arg(long)]
    pub patient: String,
    /// Admission time, RFC3339 or YYYY-MM-DD (defaults to now)
    #[arg(long)]
    pub admission: Option<Timestamp>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args)]
pub struct DischargeArgs {
    /// Allocation id
    pub allocation_id: String,
    /// Discharge time, RFC3339 or YYYY-MM-DD (defaults to now)
    #[arg(long)]
    pub at: Option<Timestamp>,
}

#[derive(clap::Args)]
pub struct AllocationsArgs {
    /// Patient id
    pub patient_id: String,
}

#[derive(clap::Args)]
pub struct ReconcileArgs {
    /// Write the repairs instead of only reporting drift
    #[arg(long)]
    pub apply: bool,
}
