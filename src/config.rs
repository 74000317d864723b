// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration management.
//!
//! ```toml
//! [compiler]
//! debug_info = true
//! mode = "merge"
//! threads = 4
//!
//! [output]
//! format = "json"
//! color = false
//! ```
//!
//! Command line flags override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ferrite_codegen::{CompileMode, CompilerOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{CompileArgs, OutputFormat};

/// File looked up in the working directory when no config is given.
pub const DEFAULT_CONFIG_FILE: &str = "ferrite.toml";

/// Configuration for ferrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options handed to the compiler
    pub compiler: CompilerOptions,

    /// How results are written
    pub output: OutputConfig,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Listing or JSON
    pub format: OutputFormat,

    /// Colour listings written to a terminal
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Listing,
            color: true,
        }
    }
}

impl Config {
    /// Loads `path`, or `./ferrite.toml` if it exists, or the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !tokio::fs::try_exists(&default).await.unwrap_or(false) {
                    return Ok(Config::default());
                }
                default
            }
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies command line overrides.
    pub fn merge_args(&mut self, args: &CompileArgs) {
        if args.debug {
            self.compiler.debug_info = true;
        }
        if args.merge {
            self.compiler.mode = CompileMode::Merge;
        }
        if let Some(threads) = args.threads {
            self.compiler.threads = threads.max(1);
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }
        if args.no_color {
            self.output.color = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [compiler]
            mode = "merge"
            threads = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.compiler.mode, CompileMode::Merge);
        assert_eq!(config.compiler.threads, 3);
        assert!(!config.compiler.debug_info);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Config::parse("[compiler]\nmode = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::parse("[output]\nformat = \"json\"\n").unwrap();
        config.merge_args(&CompileArgs {
            debug: true,
            threads: Some(0),
            no_color: true,
            ..CompileArgs::default()
        });
        assert!(config.compiler.debug_info);
        assert_eq!(config.compiler.threads, 1);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.color);
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compiler]\ndebug_info = true").unwrap();
        let config = Config::load(Some(file.path())).await.unwrap();
        assert!(config.compiler.debug_info);
    }

    #[tokio::test]
    async fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).await.is_err());
    }
}
