//! HTTP response building module
//!
//! Builds the permanent redirect response, decoupled from request handling.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};

/// Build 301 Moved Permanently response
///
/// `max_age` goes into `Cache-Control` so clients and caches may reuse
/// the redirect without asking again.
pub fn build_permanent_redirect(location: &HeaderValue, max_age: u64) -> Response<Full<Bytes>> {
    let body = redirect_body(location);

    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location.clone())
        .header(CACHE_CONTROL, format!("public, max-age={max_age}"))
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            let mut resp = Response::new(Full::new(Bytes::new()));
            *resp.status_mut() = StatusCode::MOVED_PERMANENTLY;
            resp.headers_mut().insert(LOCATION, location.clone());
            resp
        })
}

fn redirect_body(location: &HeaderValue) -> String {
    match location.to_str() {
        Ok(url) => format!("Moved Permanently: {url}\n"),
        Err(_) => "Moved Permanently\n".to_string(),
    }
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
