use std::sync::Arc;

use anyhow::{Context, Result};
use healthhub_beds::TableNames;
use healthhub_config::{AppConfig, StoreBackend};
use healthhub_db_rest::{RestStore, RestStoreConfig};
use healthhub_storage::DynStore;
use tracing::{info, warn};

/// Opens the record store selected by `store.backend`.
pub fn open_store(config: &AppConfig) -> Result<DynStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("memory backend selected; records are discarded when the command exits");
            Ok(healthhub_db_memory::create_store())
        }
        StoreBackend::Rest => {
            let rest = &config.store.rest;
            // validate() guarantees both are present for the rest backend
            let url = rest.url.as_deref().context("store.rest.url is not set")?;
            let api_key = rest
                .api_key
                .clone()
                .context("store.rest.api_key is not set")?;
            let rest_config = RestStoreConfig::new(url, api_key)
                .context("Invalid REST store configuration")?
                .with_schema(rest.schema.clone())
                .with_timeout_ms(rest.timeout_ms);
            let store = RestStore::new(rest_config).context("Failed to create REST store")?;
            info!(url, schema = %rest.schema, "using REST record store");
            Ok(Arc::new(store))
        }
    }
}

pub fn table_names(config: &AppConfig) -> TableNames {
    TableNames::new(
        config.tables.beds.clone(),
        config.tables.bed_allocations.clone(),
    )
}
