//! HTTP route handlers for the counter API.
//!
//! Every route takes the counter name from the `name` query parameter,
//! defaulting to `"default"`. The name doubles as partition key and id.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use countfeed_engine::CounterStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

/// Name of the counter used when a request does not name one.
pub const DEFAULT_COUNTER: &str = "default";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Counter store backing every route
    pub counters: CounterStore,
}

/// Query parameters shared by the counter routes.
#[derive(Debug, Deserialize)]
pub struct CounterParams {
    /// Counter name
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    DEFAULT_COUNTER.to_string()
}

/// Body of `GET /api/counter/status`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CounterStatus {
    /// The counter has a stored record
    #[serde(rename_all = "camelCase")]
    Found {
        /// Always `true`
        exists: bool,
        /// Document id
        id: String,
        /// Partition key
        partition_key: String,
        /// Current value
        value: i64,
        /// Time of the last write
        updated_at: DateTime<Utc>,
    },
    /// Nothing was written under this name yet
    Missing {
        /// Always `false`
        exists: bool,
        /// Human-readable explanation
        message: String,
    },
}

/// Handle GET /api/counter
///
/// Returns the current value, 0 for a counter that does not exist.
pub async fn get_counter(
    State(state): State<AppState>,
    Query(params): Query<CounterParams>,
) -> Result<Json<i64>, ApiError> {
    let name = params.name.as_str();
    let current = state.counters.get(name, name).await?;
    debug!(target: "countfeed::api", name, value = current.value, exists = current.exists, "Counter read");
    Ok(Json(current.value))
}

/// Handle POST /api/counter
///
/// Increments the counter and returns the value written.
pub async fn increment_counter(
    State(state): State<AppState>,
    Query(params): Query<CounterParams>,
) -> Result<Json<i64>, ApiError> {
    let name = params.name.as_str();
    let value = state.counters.increment(name, name).await?;
    Ok(Json(value))
}

/// Handle GET /api/counter/status
pub async fn counter_status(
    State(state): State<AppState>,
    Query(params): Query<CounterParams>,
) -> Result<Json<CounterStatus>, ApiError> {
    let name = params.name;
    let status = match state.counters.status(&name, &name).await? {
        Some(record) => CounterStatus::Found {
            exists: true,
            id: record.id,
            partition_key: record.partition_key,
            value: record.value,
            updated_at: record.updated_at,
        },
        None => CounterStatus::Missing {
            exists: false,
            message: format!("Counter '{}' not yet initialized", name),
        },
    };
    Ok(Json(status))
}
