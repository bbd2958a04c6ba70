//! Admission-control configuration, loaded from TOML.
//!
//! ```toml
//! confirm_timeout_ms = 1000
//! default_msdu_lifetime = 512
//! max_roam_tspecs = 8
//!
//! [sim]
//! accept = true
//! medium_time = 1000
//! ```

use crate::error::{CacError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacConfig {
    /// Timeout for every blocking collaborator call.
    pub confirm_timeout_ms: u64,
    /// MSDU lifetime programmed in extended mode when the AP sends none.
    pub default_msdu_lifetime: u16,
    /// Cap on TSPECs recovered from an association response.
    pub max_roam_tspecs: usize,
    pub sim: SimConfig,
}

impl Default for CacConfig {
    fn default() -> Self {
        CacConfig {
            confirm_timeout_ms: 1000,
            default_msdu_lifetime: 512,
            max_roam_tspecs: 8,
            sim: SimConfig::default(),
        }
    }
}

/// Behaviour of the simulated access point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub accept: bool,
    pub medium_time: u16,
    /// Status sent when `accept` is false.
    pub status: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            accept: true,
            medium_time: 0x3e8,
            status: 3,
        }
    }
}

impl CacConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CacConfig = toml::from_str(s).map_err(|e| CacError::Config(e.to_string()))?;
        if config.max_roam_tspecs > 8 {
            return Err(CacError::Config(format!(
                "max_roam_tspecs {} exceeds the TSID range",
                config.max_roam_tspecs
            )));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CacError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}
