//! Configuration surface for mounting the client runtime onto a page.

use std::time::Duration;

use url::Url;

/// Location of the server this runtime talks to.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerLocation {
    /// Origin the client runtime was served from, e.g.
    /// `https://example.com/_client`.
    pub url: Url,

    /// Application route appended after the `/stream` segment of the
    /// WebSocket URL.
    pub route: String,

    /// Raw query string (including the leading `?`, if any) appended to the
    /// WebSocket URL.
    pub query: String,
}

impl ServerLocation {
    /// Builds the `ws`/`wss` URL the transport dials, mirroring this
    /// location's `http`/`https` scheme.
    #[must_use]
    pub fn stream_url(&self) -> String {
        let protocol = if self.url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        let authority = self.url.host_str().map_or_else(String::new, |host| {
            self.url
                .port()
                .map_or_else(|| host.to_owned(), |port| format!("{host}:{port}"))
        });
        let base = self.url.path().trim_end_matches('/');
        let route = self.route.trim_end_matches('/');
        format!("{protocol}://{authority}{base}/stream{route}{}", self.query)
    }

    /// Builds the URL an import source named by `name` resolves to.
    #[must_use]
    pub fn module_url(&self, name: &str) -> String {
        let base = self.url.as_str().trim_end_matches('/');
        format!("{base}/modules/{name}")
    }
}

/// Tunables for the transport's reconnect algorithm.
///
/// Defaults match the distilled specification's constants; embedders may
/// override them, e.g. in tests or against servers with different idle
/// timeout budgets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectOptions {
    /// Delay before the first reconnect attempt.
    pub initial_interval: Duration,

    /// Upper bound the reconnect delay backs off towards.
    pub max_interval: Duration,

    /// Number of reconnect attempts before giving up entirely.
    pub max_retries: u32,

    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_rate: f64,

    /// Fraction of uniform jitter applied around each computed delay.
    pub interval_jitter: f64,
}

impl Default for ReconnectOptions {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(750),
            max_interval: Duration::from_millis(60_000),
            max_retries: 50,
            backoff_rate: 1.1,
            interval_jitter: 0.1,
        }
    }
}

/// Top-level configuration passed to [`crate::mount()`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Where the server lives and how to reach it.
    pub server_location: ServerLocation,

    /// Reconnect tunables, or [`None`] to use [`ReconnectOptions::default()`].
    pub reconnect_options: Option<ReconnectOptions>,
}

impl ClientConfig {
    /// Returns the effective [`ReconnectOptions`], falling back to defaults.
    #[must_use]
    pub fn reconnect_options(&self) -> ReconnectOptions {
        self.reconnect_options.unwrap_or_default()
    }
}
