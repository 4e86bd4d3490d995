//! Request governance: the ordered chain every inbound request passes
//! through before it reaches application code.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → context.rs (method, path, client key, identity, arrival time)
//!     → pipeline.rs (audit → temporal → rate limit → authorization)
//!     → Verdict::Dispatch → application handler
//!     → Verdict::Rejected → pipeline's own response
//! ```
//!
//! # Design Decisions
//! - Stages are `Stage` trait objects in an explicit ordered list
//! - Evaluation is synchronous; nothing in it awaits
//! - Time comes from an injectable `Clock`

pub mod clock;
pub mod context;
pub mod decision;
pub mod pipeline;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ClientKey, Identity, RequestContext};
pub use decision::{Decision, PipelineState, Rejection, Stage};
pub use pipeline::{GovernancePipeline, PipelineBuilder, Verdict};
