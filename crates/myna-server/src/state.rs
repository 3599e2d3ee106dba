use myna::relay::RelayService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayService,
    /// Deployment name reported by the diagnostic endpoint.
    pub model: String,
}
