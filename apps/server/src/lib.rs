pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod store;
mod main_lib;

pub use main_lib::{build_state, build_state_with_source, init_tracing, AppState};
