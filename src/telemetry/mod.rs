//! Telemetry Module

mod alerts;
mod logging;
pub mod metrics;

pub use alerts::{Alert, AlertLevel, AlertManager};
pub use logging::init_logging;
pub use metrics::init_metrics;
