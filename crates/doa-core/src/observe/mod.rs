//! # Observability
//!
//! - **Logging**: `tracing` subscriber setup
//! - **Metrics**: pipeline counters with Prometheus text export
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  MusicEstimator::ingest() / refresh()         │
//! │  tracing::{debug,info,warn}!, metrics.*.inc() │
//! └──────────────┬───────────────────┬────────────┘
//!                ▼                   ▼
//!          ┌──────────┐        ┌───────────┐
//!          │ Logging  │        │  Metrics  │
//!          │ (fmt/JSON│        │  (Prom    │
//!          │  stdout) │        │   text)   │
//!          └──────────┘        └───────────┘
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use metrics::{Counter, Gauge, Histogram, Metrics, MetricsSnapshot};

/// Initialise logging and return a fresh metrics registry.
pub fn init(log_config: &LogConfig) -> Metrics {
    init_logging(log_config);
    Metrics::new()
}
