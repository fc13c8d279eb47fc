//! HTTP surface of countfeed
//!
//! This crate exposes the counter store over HTTP and wires a whole
//! instance together:
//! - routes / handlers: `GET`/`POST /api/counter`, `GET /api/counter/status`
//! - ApiError: JSON error bodies with 400/500 statuses
//! - Service: stores, counter store, seeding and the change-feed processor
//! - CliArgs: command line of the `countfeed` binary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;

pub use cli::CliArgs;
pub use error::ApiError;
pub use handlers::{AppState, CounterParams, CounterStatus, DEFAULT_COUNTER};
pub use routes::router;
pub use service::Service;
