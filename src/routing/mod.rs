//! Path scoping for governance policies.
//!
//! Each policy decides whether it applies to a request by testing the path
//! against its own `PathScope`. Policies never see routes outside their scope.

pub mod matcher;

pub use matcher::{PathPattern, PathScope};
