//! Application state for the HTTP server.

use edgesub_core::SourceSet;
use edgesub_sources::Prober;

/// Shared application state.
///
/// Holds no per-request data; every subscription request is aggregated from
/// scratch.
#[derive(Clone)]
pub struct AppState {
    /// Endpoint sources consulted by the subscription route.
    pub sources: SourceSet,
    /// Latency prober for the test routes.
    pub prober: Prober,
}

impl AppState {
    /// Creates application state.
    pub fn new(sources: SourceSet, prober: Prober) -> Self {
        Self { sources, prober }
    }
}
