pub mod governance;

pub use governance::governance_middleware;
