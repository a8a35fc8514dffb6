//! Redirect handler
//!
//! The only action the server has: send the client to the configured target.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::http;

/// Permanent redirect to the configured target
///
/// The request itself is never consulted; method, path, query and
/// headers all produce the same response.
pub fn redirect(state: &AppState) -> Response<Full<Bytes>> {
    http::build_permanent_redirect(state.target.location(), state.config.redirect.cache_max_age)
}
