//! HTTP server for the opsdeck monitoring backend: SQLite-backed
//! entity store, axum route layer, and the derived health/validation
//! endpoints built on opsdeck-core.

pub mod alerts_api;
pub mod db;
pub mod error;
pub mod health_api;
pub mod incidents_api;
pub mod routes;
pub mod seed;
pub mod services_api;
pub mod slos_api;
pub mod telemetry_api;
pub mod validation_api;

pub use db::Database;
pub use error::ApiError;
pub use routes::{build_router, AppState, SharedState};
