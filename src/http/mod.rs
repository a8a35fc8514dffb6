//! HTTP protocol layer module
//!
//! Provides HTTP response construction, decoupled from request handling.

pub mod response;

// Re-export commonly used types
pub use response::build_permanent_redirect;
