//! Security subsystem: the gates of the governance pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client.rs (derive client key)
//!     → temporal.rs (time-of-day window)
//!     → rate_limit.rs (per-client sliding window, backed by store.rs)
//!     → authorization.rs (role check on mutating methods)
//!     → Pass to application handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: a guarded request without a permitting rule is rejected
//! - Each gate is scoped by path pattern and passes everything else
//! - No trust in client input beyond the configured forwarded header

pub mod authorization;
pub mod client;
pub mod rate_limit;
pub mod store;
pub mod temporal;

pub use authorization::{AuthorizationRule, RoleAuthorizer};
pub use client::ClientIdentifier;
pub use rate_limit::{RateDecision, RateLimitStage, SlidingWindowLimiter};
pub use store::{GlobalLockStore, RecordStore, RequestRecord, ShardedStore};
pub use temporal::{AccessWindow, TemporalAccessPolicy};
