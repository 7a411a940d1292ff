//! nether-abin.toml configuration
//!
//! Every field is optional. Command-line flags override what is loaded here.

use anyhow::{Context, Result};
use nether_abin::{DEFAULT_PAD_WIDTH, ExportOptions};
use nether_brr::{DEFAULT_MIN_SAMPLE_LEN, ScanOptions};
use serde::Deserialize;
use std::path::Path;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "nether-abin.toml";

/// nether-abin.toml structure
#[derive(Debug, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub brr: BrrSection,
    #[serde(default)]
    pub export: ExportSection,
}

/// BRR scanning and audition settings
#[derive(Debug, Deserialize)]
pub struct BrrSection {
    /// Reject shifts 13-15 and implausibly short samples.
    /// Default: true
    #[serde(default = "default_strict")]
    pub strict: bool,

    /// Strict-mode minimum sample length, in PCM samples.
    /// Default: 250
    #[serde(default = "default_min_sample_len")]
    pub min_sample_len: usize,

    /// Sample rate written to audition WAV files.
    /// Default: 11025
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_strict() -> bool {
    true
}

fn default_min_sample_len() -> usize {
    DEFAULT_MIN_SAMPLE_LEN
}

fn default_sample_rate() -> u32 {
    11025
}

impl Default for BrrSection {
    fn default() -> Self {
        Self {
            strict: default_strict(),
            min_sample_len: default_min_sample_len(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Assembler export settings
#[derive(Debug, Deserialize)]
pub struct ExportSection {
    /// Column at which `//` comments start.
    /// Default: 50
    #[serde(default = "default_pad_width")]
    pub pad_width: usize,
}

fn default_pad_width() -> usize {
    DEFAULT_PAD_WIDTH
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            pad_width: default_pad_width(),
        }
    }
}

impl ToolConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Parse config from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse nether-abin.toml")
    }

    /// Load `explicit` if given, else `nether-abin.toml` if present, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            tracing::debug!("Using {}", fallback.display());
            return Self::load(fallback);
        }
        Ok(Self::default())
    }

    pub fn scan_options(&self, lenient: bool) -> ScanOptions {
        ScanOptions {
            strict: self.brr.strict && !lenient,
            min_sample_len: self.brr.min_sample_len,
        }
    }

    pub fn export_options(&self, pad_width: Option<usize>) -> ExportOptions {
        ExportOptions {
            pad_width: pad_width.unwrap_or(self.export.pad_width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ToolConfig::parse("").unwrap();
        assert!(config.brr.strict);
        assert_eq!(config.brr.min_sample_len, 250);
        assert_eq!(config.brr.sample_rate, 11025);
        assert_eq!(config.export.pad_width, 50);
        assert_eq!(config.scan_options(false), ScanOptions::default());
        assert_eq!(config.export_options(None), ExportOptions::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ToolConfig::parse(
            r#"
            [brr]
            strict = false
            sample_rate = 32000

            [export]
            pad_width = 40
            "#,
        )
        .unwrap();
        assert!(!config.brr.strict);
        assert_eq!(config.brr.min_sample_len, 250);
        assert_eq!(config.brr.sample_rate, 32000);
        assert_eq!(config.export_options(None).pad_width, 40);
        assert_eq!(config.export_options(Some(60)).pad_width, 60);
    }

    #[test]
    fn test_lenient_flag_overrides_strict() {
        let config = ToolConfig::default();
        assert!(!config.scan_options(true).strict);
    }

    #[test]
    fn test_unknown_types_fail() {
        assert!(ToolConfig::parse("[brr]\nstrict = \"yes\"").is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ToolConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
