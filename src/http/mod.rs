//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → middleware/governance.rs (build context, run pipeline)
//!     → application Router (on Verdict::Dispatch)
//!     → response.rs (render Rejection on Verdict::Rejected)
//!     → Send to client
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use middleware::governance_middleware;
pub use server::HttpServer;
