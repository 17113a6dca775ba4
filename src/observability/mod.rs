//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! logging middleware, rate limiter, recovery
//!     → logging.rs (tracing subscriber, env filter)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log lines
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows in via the `x-request-id` header
//! - Metrics are cheap (atomic increments) and off until a recorder exists

pub mod logging;
pub mod metrics;
