/// Default INSPIRE-HEP host queried for BibTeX records.
pub const DEFAULT_BASE_URL: &str = "https://inspirehep.net";

/// Path of the literature search endpoint below the base URL.
pub const LITERATURE_ENDPOINT: &str = "/api/literature";

/// Settings for talking to the literature service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspireConfig {
    pub base_url: String,
}

impl Default for InspireConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl InspireConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Read the configuration from the environment.
    ///
    /// `INSPIRE_BASE_URL` overrides the service host, which is how the tests
    /// point the binary at a local mock server.
    pub fn from_env() -> Self {
        let base_url = std::env::var("INSPIRE_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Full URL of the literature endpoint.
    pub fn literature_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), LITERATURE_ENDPOINT)
    }
}
