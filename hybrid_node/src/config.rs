//! Node configuration file.
//!
//! One TOML document with three sections:
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "hybrid-node-01"
//!
//! [node]
//! sample_rate = 48000
//! buffer_size = 512
//! mode = "hybrid"
//!
//! [backend]
//! name = "simulation"
//!
//! [backend.options]
//! full_scale = 1.0
//! ```
//!
//! Every key is optional; missing keys take the built-in defaults.

use std::path::Path;

use hybrid_common::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
use hybrid_common::node::config::NodeConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ─── Backend Section ────────────────────────────────────────────────

/// Which hardware backend to open, and its backend-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_backend_name")]
    pub name: String,

    /// Passed verbatim to the backend factory.
    #[serde(default)]
    pub options: toml::Table,
}

fn default_backend_name() -> String {
    "simulation".to_string()
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            name: default_backend_name(),
            options: toml::Table::new(),
        }
    }
}

// ─── File Config ────────────────────────────────────────────────────

/// Complete node configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFileConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub backend: BackendSection,
}

impl Validate for NodeFileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.node.validate().map_err(ConfigError::ValidationError)?;
        if self.backend.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a node configuration file.
pub fn load_config(path: &Path) -> Result<NodeFileConfig, ConfigError> {
    let config = NodeFileConfig::load_validated(path)?;
    info!(
        "Config loaded from {}: {} Hz, {} frames, {:?} mode, backend '{}'",
        path.display(),
        config.node.sample_rate,
        config.node.buffer_size,
        config.node.mode,
        config.backend.name
    );
    Ok(config)
}

/// Like [`load_config`], but a missing file (or no path) yields the defaults.
///
/// Parse and validation errors are still returned.
pub fn load_or_default(path: Option<&Path>) -> Result<NodeFileConfig, ConfigError> {
    let Some(path) = path else {
        info!("No config file given, using built-in defaults");
        return Ok(NodeFileConfig::default());
    };
    match load_config(path) {
        Err(ConfigError::FileNotFound) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(NodeFileConfig::default())
        }
        other => other,
    }
}
