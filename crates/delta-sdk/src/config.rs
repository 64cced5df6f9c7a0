//! Repository configuration stored at `.delta/config.toml`.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Environment variable that overrides the configured author name.
pub const AUTHOR_NAME_ENV: &str = "DELTA_AUTHOR_NAME";
/// Environment variable that overrides the configured author email.
pub const AUTHOR_EMAIL_ENV: &str = "DELTA_AUTHOR_EMAIL";

/// Per-repository configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub core: CoreConfig,
    pub user: UserConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Branch HEAD names after `init` (default: `main`).
    pub default_branch: String,
    /// zlib level for new objects, 0-9 (default: 6).
    pub compression_level: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            compression_level: 6,
        }
    }
}

/// Fallback author identity when the environment does not provide one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

impl RepoConfig {
    /// Load the config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))
    }

    /// Write the config file.
    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))?;
        fs::write(path, content)?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Author name and email: environment first, then `[user]`.
    pub fn author(&self) -> (String, String) {
        self.author_with(|key| std::env::var(key).ok())
    }

    /// Author resolution against an arbitrary variable lookup.
    pub fn author_with(&self, lookup: impl Fn(&str) -> Option<String>) -> (String, String) {
        let name = lookup(AUTHOR_NAME_ENV).unwrap_or_else(|| self.user.name.clone());
        let email = lookup(AUTHOR_EMAIL_ENV).unwrap_or_else(|| self.user.email.clone());
        (name, email)
    }
}
