use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::{default_data_dir, ensure_tally_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageSection,
    pub ingest: IngestSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Where accounts and transactions live (default: ~/.tally/data)
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Refuse to store a statement whose balances do not reconcile
    pub require_balanced: bool,
    /// Currency for accounts created without --currency
    pub default_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// env_logger filter used when RUST_LOG is unset
    pub level: String,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            require_balanced: false,
            default_currency: tally_core::account::default_currency(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg = parse_config("[ingest]\nrequire_balanced = true\n").unwrap();
        assert!(cfg.ingest.require_balanced);
        assert_eq!(cfg.ingest.default_currency, "USD");
        assert_eq!(cfg.log.level, "warn");
        assert!(cfg.storage.data_dir.is_none());
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let cfg = parse_config("[storage]\ndata_dir = \"/tmp/tally-data\"\n").unwrap();
        assert_eq!(cfg.data_dir().unwrap(), PathBuf::from("/tmp/tally-data"));
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back = parse_config(&s).unwrap();
        assert_eq!(back.ingest.default_currency, "USD");
        assert!(!back.ingest.require_balanced);
    }
}
