//! Request handler module
//!
//! Responsible for request routing dispatch. Every request is routed
//! to the permanent redirect.

pub mod redirect;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
