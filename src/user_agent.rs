//! Shared User-Agent string for download and probe traffic.

/// Browser-like User-Agent sent on all requests.
///
/// Many file hosts reject obvious non-browser agents outright; a mainstream
/// desktop browser string keeps direct downloads working without any
/// per-host configuration.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
