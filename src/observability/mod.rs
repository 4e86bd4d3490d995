//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → audit.rs (one append-only line, before any gate;
//!                 file I/O happens on the audit-writer thread)
//!
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Audit logging is fail-open: a broken sink never fails a request
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{
    AuditSink, FileAuditSink, MemoryAuditSink, QueuedAuditSink, RequestAuditLogger, TracingAuditSink,
};
