pub mod config;
pub mod telemetry;

pub use config::{Condition, ConfigError, PurgeConfig};
pub use telemetry::{init_tracing, shutdown_tracing};
