//! Portfolio API Server module
//!
//! HTTP REST API over the project store.
//! Run with `portfolio-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
