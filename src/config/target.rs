// Redirect target module
// Validates the destination URL once at startup

use hyper::header::HeaderValue;
use hyper::Uri;

use crate::error::StartupError;

/// Validated absolute destination URL
///
/// Holds the pre-encoded `Location` header value so requests never re-parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    url: String,
    location: HeaderValue,
}

impl RedirectTarget {
    /// Parse and validate an absolute `http`/`https` URL
    pub fn parse(raw: &str) -> Result<Self, StartupError> {
        let url = raw.trim();
        let invalid = |reason: &str| StartupError::InvalidTarget {
            target: raw.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| invalid(&e.to_string()))?;

        match uri.scheme_str() {
            Some("http" | "https") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme '{other}'"))),
            None => return Err(invalid("missing scheme, an absolute URL is required")),
        }

        match uri.host() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(invalid("missing host")),
        }

        let location = HeaderValue::from_str(url).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            location,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Value for the `Location` response header
    pub const fn location(&self) -> &HeaderValue {
        &self.location
    }
}

impl std::fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
