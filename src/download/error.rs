//! Error types for the download module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single transfer.
///
/// These surface to callers as the `error` message of a failed
/// [`ResultRecord`](super::ResultRecord); a failure never aborts sibling
/// transfers.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level error (DNS resolution, connection refused, TLS, broken
    /// stream mid-body).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Connect/headers phase timed out.
    #[error("timeout connecting to {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response. 404 and 403 render as distinct user-facing
    /// messages; other statuses pass through generically.
    #[error("{}", status_message(*.status, .url))]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during the transfer (create, write, flush).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The external extraction tool failed (spawn error or non-zero exit).
    #[error("extractor failed for {url}: {message}")]
    Extractor {
        /// The URL handed to the tool.
        url: String,
        /// Failure detail, including captured stderr when available.
        message: String,
    },
}

fn status_message(status: u16, url: &str) -> String {
    match status {
        404 => format!("file not found on server (HTTP 404): {url}"),
        403 => format!("access denied by server (HTTP 403): {url}"),
        _ => format!("server returned HTTP {status} for {url}"),
    }
}

impl TransferError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an extractor failure.
    pub fn extractor(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extractor {
            url: url.into(),
            message: message.into(),
        }
    }
}

// No From<reqwest::Error> / From<std::io::Error> impls: every variant needs
// context (url, path) the source errors cannot supply. The helper
// constructors are the conversion points.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_404_has_distinct_message() {
        let error = TransferError::http_status("https://example.com/missing.pdf", 404);
        let msg = error.to_string();
        assert!(msg.contains("not found"), "expected 'not found' in: {msg}");
        assert!(msg.contains("404"), "expected status in: {msg}");
        assert!(msg.contains("https://example.com/missing.pdf"));
    }

    #[test]
    fn test_http_403_has_distinct_message() {
        let error = TransferError::http_status("https://example.com/private.zip", 403);
        let msg = error.to_string();
        assert!(
            msg.contains("access denied"),
            "expected 'access denied' in: {msg}"
        );
        assert!(msg.contains("403"), "expected status in: {msg}");
    }

    #[test]
    fn test_http_other_statuses_pass_through() {
        let error = TransferError::http_status("https://example.com/file", 503);
        let msg = error.to_string();
        assert!(msg.contains("HTTP 503"), "expected 'HTTP 503' in: {msg}");
        assert!(!msg.contains("not found"));
        assert!(!msg.contains("access denied"));
    }

    #[test]
    fn test_timeout_display() {
        let error = TransferError::timeout("https://example.com/slow");
        let msg = error.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("https://example.com/slow"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = TransferError::io(PathBuf::from("/tmp/out.bin"), io_error);
        assert!(error.to_string().contains("/tmp/out.bin"));
    }

    #[test]
    fn test_invalid_url_display() {
        let error = TransferError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"));
        assert!(msg.contains("not-a-url"));
    }

    #[test]
    fn test_extractor_display_includes_detail() {
        let error = TransferError::extractor("https://youtu.be/x", "exited with code 1");
        let msg = error.to_string();
        assert!(msg.contains("extractor failed"));
        assert!(msg.contains("exited with code 1"));
    }
}
