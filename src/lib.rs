pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

// Record shapes shared across layers
pub mod domain;
