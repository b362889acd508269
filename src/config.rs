// Configuration loaded from ~/.negocia/rc
//
// The rc file is a list of `key=value` lines. Blank lines and lines starting
// with `#` are ignored. Recognized keys:
//   data.location=<path>   database file; relative paths resolve against the rc directory
//   board.color=on|off     force ANSI color on or off

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Parsed rc settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub data_location: Option<PathBuf>,
    pub color: Option<bool>,
}

impl Config {
    /// Directory holding the rc file and the default database
    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".negocia"))
    }

    /// Get the configuration file path
    pub fn rc_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("rc"))
    }

    /// Load the rc file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        let rc_path = Self::rc_path()?;
        if !rc_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&rc_path)
            .with_context(|| format!("Failed to read config file: {}", rc_path.display()))?;
        let base_dir = rc_path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir)
            .with_context(|| format!("Invalid config file: {}", rc_path.display()))
    }

    /// Parse rc content. Relative paths are resolved against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("line {}: expected key=value, got '{}'", lineno + 1, line))?;
            let value = value.trim();

            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = Some(if path.is_relative() {
                        base_dir.join(path)
                    } else {
                        path
                    });
                }
                "board.color" => {
                    config.color = Some(parse_switch(value).ok_or_else(|| {
                        anyhow::anyhow!("line {}: board.color must be on or off, got '{}'", lineno + 1, value)
                    })?);
                }
                other => log::warn!("ignoring unknown config key '{}'", other),
            }
        }

        Ok(config)
    }

    /// Database path from `data.location`, or the default location
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.data_location {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("pipeline.db")),
        }
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relative_location() {
        let config = Config::parse("data.location=./custom.db\n", Path::new("/home/ana/.negocia")).unwrap();
        assert_eq!(config.data_location, Some(PathBuf::from("/home/ana/.negocia/./custom.db")));
        assert_eq!(config.color, None);
    }

    #[test]
    fn test_parse_absolute_location_and_color() {
        let content = "# comment\n\ndata.location=/tmp/board.db\nboard.color = off\n";
        let config = Config::parse(content, Path::new("/ignored")).unwrap();
        assert_eq!(config.data_location, Some(PathBuf::from("/tmp/board.db")));
        assert_eq!(config.color, Some(false));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(Config::parse("data.location\n", Path::new("/")).is_err());
        assert!(Config::parse("board.color=sometimes\n", Path::new("/")).is_err());
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let config = Config::parse("theme=dark\n", Path::new("/")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_database_path_prefers_data_location() {
        let config = Config { data_location: Some(PathBuf::from("/tmp/x.db")), color: None };
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/x.db"));
    }
}
