//! Compiler configuration.
//!
//! [`CompilerConfig`] implements [`serde::Deserialize`] with every field
//! defaulted, so a TOML file only needs to name what it changes:
//!
//! ```
//! # use kotoba::config::CompilerConfig;
//! let config = CompilerConfig::from_toml_str("speed_mode = true\n[debug]\nparser = true\n")
//!     .expect("valid configuration");
//! assert!(config.speed_mode());
//! assert!(config.debug().parser());
//! assert!(!config.debug().lexer());
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level compiler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerConfig {
    /// Emit line markers as comments instead of runtime assignments.
    #[serde(default)]
    speed_mode: bool,

    /// Stage dump settings.
    #[serde(default)]
    debug: DebugConfig,
}

impl CompilerConfig {
    pub fn new(speed_mode: bool, debug: DebugConfig) -> Self {
        Self { speed_mode, debug }
    }

    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML or has
    /// fields of the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its content is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = path.display().to_string(); "Loading configuration");
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn speed_mode(&self) -> bool {
        self.speed_mode
    }

    pub fn debug(&self) -> &DebugConfig {
        &self.debug
    }
}

/// Which intermediate results are dumped at `debug` level.
///
/// Disabled dumps are still available at `trace` level.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    lexer: bool,

    #[serde(default)]
    parser: bool,

    #[serde(default)]
    generated_code: bool,
}

impl DebugConfig {
    pub fn new(lexer: bool, parser: bool, generated_code: bool) -> Self {
        Self {
            lexer,
            parser,
            generated_code,
        }
    }

    /// Dump the decorated token stream.
    pub fn lexer(&self) -> bool {
        self.lexer
    }

    /// Dump the syntax tree.
    pub fn parser(&self) -> bool {
        self.parser
    }

    /// Dump the generated program.
    pub fn generated_code(&self) -> bool {
        self.generated_code
    }
}
