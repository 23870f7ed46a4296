use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use tracesync_logs::ProducerConfig;
use tracesync_types::DEFAULT_FORMAT;

/// How rows and notices are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Drain interval in milliseconds
    pub tick_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    /// Records generated before streaming starts
    pub backlog: usize,
    /// RNG seed; random when unset
    pub seed: Option<u64>,
    /// Number of independent views
    pub views: usize,
    /// Initial filter for the first view
    pub filter: Option<String>,
    pub format: String,
    pub output: OutputFormat,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            jitter_min_ms: 50,
            jitter_max_ms: 100,
            backlog: 100,
            seed: None,
            views: 2,
            filter: None,
            format: DEFAULT_FORMAT.to_string(),
            output: OutputFormat::Text,
            log_level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("tick_ms must be greater than zero");
        }
        if self.jitter_min_ms > self.jitter_max_ms {
            bail!(
                "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
                self.jitter_min_ms,
                self.jitter_max_ms
            );
        }
        if self.views == 0 {
            bail!("at least one view is required");
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn producer(&self) -> ProducerConfig {
        ProducerConfig {
            min_jitter: Duration::from_millis(self.jitter_min_ms),
            max_jitter: Duration::from_millis(self.jitter_max_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick(), Duration::from_millis(500));
        assert_eq!(config.producer(), ProducerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
tick_ms = 250
seed = 9
filter = 'module eq "net"'
output = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.filter.as_deref(), Some(r#"module eq "net""#));
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.views, 2);
        assert_eq!(config.format, DEFAULT_FORMAT);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tick = 250").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validation() {
        let config = AppConfig {
            tick_ms: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            jitter_min_ms: 200,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            views: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
