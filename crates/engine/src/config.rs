//! Service configuration via `countfeed.toml`
//!
//! On first start a default `countfeed.toml` is written next to the
//! process. To change settings, edit the file and restart.

use countfeed_core::{Error, Result};
use countfeed_storage::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::counter::IncrementStrategy;
use crate::feed::ProcessorOptions;
use crate::retry::RetryConfig;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "countfeed.toml";

/// Store endpoint of the in-process backend.
pub const MEMORY_ENDPOINT: &str = "memory://";

/// Service configuration loaded from `countfeed.toml`.
///
/// # Example
///
/// ```toml
/// store_endpoint = "memory://"
/// counters_container = "counters"
/// lease_container = "leases"
/// renewal_interval_ms = 17000
/// lease_expiry_ms = 60000
/// increment_mode = "last-writer-wins"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountfeedConfig {
    /// Document store endpoint; only `memory://` is built in.
    #[serde(default = "default_store_endpoint")]
    pub store_endpoint: String,
    /// Container holding counter documents.
    #[serde(default = "default_counters_container")]
    pub counters_container: String,
    /// Container holding partition leases.
    #[serde(default = "default_lease_container")]
    pub lease_container: String,
    /// Number of change-feed partitions.
    #[serde(default = "default_partition_count")]
    pub partition_count: u32,
    /// How often owned leases are renewed and free partitions are claimed.
    #[serde(default = "default_renewal_interval_ms")]
    pub renewal_interval_ms: u64,
    /// How long a lease stays valid without renewal.
    #[serde(default = "default_lease_expiry_ms")]
    pub lease_expiry_ms: u64,
    /// Pause between change-feed polls that found nothing new.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum events handed to the handler per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// `"last-writer-wins"` or `"optimistic"`.
    #[serde(default = "default_increment_mode")]
    pub increment_mode: String,
    /// Retry bound for optimistic increments.
    #[serde(default = "default_max_increment_retries")]
    pub max_increment_retries: usize,
    /// Counters created with value 0 at startup if missing.
    #[serde(default = "default_seed_counters")]
    pub seed_counters: Vec<String>,
}

fn default_store_endpoint() -> String {
    MEMORY_ENDPOINT.to_string()
}

fn default_counters_container() -> String {
    "counters".to_string()
}

fn default_lease_container() -> String {
    "leases".to_string()
}

fn default_partition_count() -> u32 {
    4
}

fn default_renewal_interval_ms() -> u64 {
    17_000
}

fn default_lease_expiry_ms() -> u64 {
    60_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_batch_size() -> usize {
    100
}

fn default_increment_mode() -> String {
    "last-writer-wins".to_string()
}

fn default_max_increment_retries() -> usize {
    5
}

fn default_seed_counters() -> Vec<String> {
    vec!["default".to_string()]
}

impl Default for CountfeedConfig {
    fn default() -> Self {
        Self {
            store_endpoint: default_store_endpoint(),
            counters_container: default_counters_container(),
            lease_container: default_lease_container(),
            partition_count: default_partition_count(),
            renewal_interval_ms: default_renewal_interval_ms(),
            lease_expiry_ms: default_lease_expiry_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            increment_mode: default_increment_mode(),
            max_increment_retries: default_max_increment_retries(),
            seed_counters: default_seed_counters(),
        }
    }
}

impl CountfeedConfig {
    /// Renewal interval as a `Duration`.
    pub fn renewal_interval(&self) -> Duration {
        Duration::from_millis(self.renewal_interval_ms)
    }

    /// Lease expiry window as a `Duration`.
    pub fn lease_expiry(&self) -> Duration {
        Duration::from_millis(self.lease_expiry_ms)
    }

    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse the increment mode into an `IncrementStrategy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"last-writer-wins"` or
    /// `"optimistic"`.
    pub fn increment_strategy(&self) -> Result<IncrementStrategy> {
        match self.increment_mode.as_str() {
            "last-writer-wins" => Ok(IncrementStrategy::LastWriterWins),
            "optimistic" => Ok(IncrementStrategy::Optimistic(
                RetryConfig::default().with_max_retries(self.max_increment_retries),
            )),
            other => Err(Error::Config(format!(
                "Invalid increment mode '{}' in {}. Expected \"last-writer-wins\" or \"optimistic\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Store settings for `countfeed_storage::open_store`.
    pub fn store_options(&self) -> StoreOptions<'_> {
        StoreOptions {
            endpoint: &self.store_endpoint,
            counters_container: &self.counters_container,
            lease_container: &self.lease_container,
            partition_count: self.partition_count,
        }
    }

    /// Change-feed processor settings.
    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            renewal_interval: self.renewal_interval(),
            poll_interval: self.poll_interval(),
            batch_size: self.batch_size,
        }
    }

    /// Check the settings for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if !self.store_endpoint.starts_with(MEMORY_ENDPOINT) {
            return Err(Error::Config(format!(
                "Unsupported store_endpoint '{}'. Expected \"{}\".",
                self.store_endpoint, MEMORY_ENDPOINT
            )));
        }
        if self.counters_container.is_empty() || self.lease_container.is_empty() {
            return Err(Error::Config("Container names must not be empty".into()));
        }
        if self.counters_container == self.lease_container {
            return Err(Error::Config(
                "counters_container and lease_container must differ".into(),
            ));
        }
        if self.partition_count == 0 {
            return Err(Error::Config("partition_count must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.renewal_interval_ms == 0 || self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "renewal_interval_ms and poll_interval_ms must be positive".into(),
            ));
        }
        if self.renewal_interval_ms >= self.lease_expiry_ms {
            return Err(Error::Config(format!(
                "renewal_interval_ms ({}) must be shorter than lease_expiry_ms ({})",
                self.renewal_interval_ms, self.lease_expiry_ms
            )));
        }
        if self.seed_counters.iter().any(|name| name.is_empty()) {
            return Err(Error::Config("seed_counters must not contain empty names".into()));
        }
        self.increment_strategy()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# countfeed configuration
#
# Document store endpoint. "memory://" is the in-process backend.
store_endpoint = "memory://"

# Container names for counter documents and partition leases
counters_container = "counters"
lease_container = "leases"

# Number of change-feed partitions (counters are spread by name)
partition_count = 4

# Lease timing. The renewal interval must be shorter than the expiry.
renewal_interval_ms = 17000
lease_expiry_ms = 60000

# Change feed polling
poll_interval_ms = 1000
batch_size = 100

# Increment strategy: "last-writer-wins" (default) or "optimistic"
#   "last-writer-wins" = unguarded read-modify-write, concurrent increments may be lost
#   "optimistic"       = etag-conditional write, retried up to max_increment_retries
increment_mode = "last-writer-wins"
max_increment_retries = 5

# Counters created with value 0 at startup if missing
seed_counters = ["default"]
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: CountfeedConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Create the default file when missing, then load it.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        Self::write_default_if_missing(path)?;
        Self::from_file(path)
    }
}
