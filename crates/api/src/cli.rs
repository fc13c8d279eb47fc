//! Command line interface of the countfeed server.

use clap::Parser;
use countfeed_core::OwnerId;
use std::path::PathBuf;

use countfeed_engine::CONFIG_FILE_NAME;

/// CLI arguments for the countfeed server.
#[derive(Debug, Parser)]
#[command(name = "countfeed")]
#[command(about = "Counter HTTP API with a lease-coordinated change feed consumer")]
pub struct CliArgs {
    /// Path to the TOML config file; created with defaults when missing.
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// HTTP server port.
    #[arg(long, env = "COUNTFEED_PORT", default_value = "8080")]
    pub port: u16,

    /// Lease owner id of this instance; random when not set.
    #[arg(long, env = "COUNTFEED_INSTANCE_ID")]
    pub instance_id: Option<String>,
}

impl CliArgs {
    /// Owner id used for partition leases.
    pub fn owner_id(&self) -> OwnerId {
        match &self.instance_id {
            Some(id) if !id.is_empty() => OwnerId::new(id.clone()),
            _ => OwnerId::random(),
        }
    }
}
