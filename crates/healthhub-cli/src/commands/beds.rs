use anyhow::{Context, Result};
use colored::Colorize;
use healthhub_beds::BedDirectory;
use healthhub_core::{BedPatch, NewBed};

use crate::cli::{BedCommands, CreateBedArgs, OutputFormat};
use crate::output::{bed_table, beds_table, print_success, print_value};

pub async fn run(directory: &BedDirectory, command: &BedCommands, format: OutputFormat) -> Result<()> {
    match command {
        BedCommands::List(args) => list(directory, args.limit, args.offset, format).await,
        BedCommands::Available => available(directory, format).await,
        BedCommands::Get(args) => {
            let bed = directory.get_bed(&args.id).await?;
            print_value(&bed, format, bed_table)
        }
        BedCommands::Create(args) => create(directory, args, format).await,
        BedCommands::Status(args) => {
            let bed = directory
                .update_bed(&args.id, &BedPatch::status(args.status))
                .await
                .with_context(|| format!("Failed to set status of bed {}", args.id))?;
            print_success(&format!("Bed {} is now {}", bed.bed_number.cyan(), bed.status));
            print_value(&bed, format, bed_table)
        }
        BedCommands::Delete(args) => {
            directory
                .delete_bed(&args.id)
                .await
                .with_context(|| format!("Failed to delete bed {}", args.id))?;
            print_success(&format!("Deleted bed {}", args.id.cyan()));
            Ok(())
        }
    }
}

async fn list(directory: &BedDirectory, limit: u32, offset: u32, format: OutputFormat) -> Result<()> {
    let page = directory.list_beds(limit, offset).await?;
    print_value(&page, format, |page| {
        let shown = offset as u64 + page.beds.len() as u64;
        format!("{}\nShowing {shown} of {}", beds_table(&page.beds), page.total)
    })
}

async fn available(directory: &BedDirectory, format: OutputFormat) -> Result<()> {
    let beds = directory.available_beds().await?;
    print_value(&beds, format, |beds| beds_table(beds))
}

async fn create(directory: &BedDirectory, args: &CreateBedArgs, format: OutputFormat) -> Result<()> {
    let new_bed = NewBed::new(args.number.as_str(), args.floor, args.ward.as_str())
        .with_status(args.status);
    let bed = directory
        .create_bed(&new_bed)
        .await
        .with_context(|| format!("Failed to create bed {}", args.number))?;
    print_success(&format!("Created bed {} ({})", bed.bed_number.cyan(), bed.id.cyan()));
    print_value(&bed, format, bed_table)
}
