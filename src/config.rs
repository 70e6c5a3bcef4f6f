use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Names shown in the list, in display order.
pub const DEFAULT_NAMES: [&str; 3] = ["junegunn", "gaearon", "benlesh"];

/// Public GitHub API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// What the reactive view does when a lookup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// The pipeline stops; the view keeps its last value.
    #[default]
    Terminate,
    /// The failure is shown in the detail pane and the pipeline continues.
    Surface,
}

/// Runtime settings for both views and the HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub names: Vec<String>,
    /// Root of the users API; lookups go to `{api_base}/users/{name}`.
    pub api_base: String,
    pub user_agent: String,
    /// Artificial delay before the reactive view shows a loaded profile.
    pub reactive_delay_ms: u64,
    pub error_policy: ErrorPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            names: DEFAULT_NAMES.iter().map(|s| s.to_string()).collect(),
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: concat!("profile-views/", env!("CARGO_PKG_VERSION")).to_string(),
            reactive_delay_ms: 1000,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject an empty or blank name list and an unparsable API root.
    pub fn validate(&self) -> Result<()> {
        if self.names.is_empty() {
            return Err(Error::Config("names must not be empty".into()));
        }
        if let Some(blank) = self.names.iter().find(|n| n.trim().is_empty()) {
            return Err(Error::Config(format!("invalid name {blank:?}")));
        }
        self.api_base_url()?;
        Ok(())
    }

    /// The initial selection: the first configured name.
    pub fn default_name(&self) -> &str {
        self.names
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_NAMES[0])
    }

    pub fn reactive_delay(&self) -> Duration {
        Duration::from_millis(self.reactive_delay_ms)
    }

    /// The parsed API root.
    pub fn api_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base)
            .map_err(|e| Error::Config(format!("api_base {:?}: {e}", self.api_base)))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!("api_base {:?} cannot be a base URL", self.api_base)));
        }
        Ok(url)
    }
}
