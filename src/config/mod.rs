//! The configuration of the `safebooru-dl` binary.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
pub use validator::Validate;

use crate::transport::{ReqwestTransport, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// The commented default config file, equal to [`Config::default`].
pub const DEFAULT_CONFIG_STR: &str = include_str!("default.toml");

/// Settings read from the `--config` file. Every key is optional.
#[non_exhaustive]
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Request timeout in seconds, `0` disables it.
    pub timeout: u64,
    /// The `User-Agent` header sent with every request.
    #[validate(length(min = 1, message = "user_agent must not be empty"))]
    pub user_agent: String,
    /// The default download directory.
    pub download_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT.as_secs(),
            user_agent: String::from(DEFAULT_USER_AGENT),
            download_dir: None,
        }
    }
}

impl Config {
    /// Build the transport described by this config.
    ///
    /// # Errors
    ///
    /// See [`ReqwestTransport::build`].
    pub fn transport(&self) -> crate::Result<ReqwestTransport> {
        ReqwestTransport::build(Duration::from_secs(self.timeout), &self.user_agent)
    }
}
