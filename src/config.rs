//! Runtime configuration from the environment (and `.env`, when present).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_WORKBOOK_PATH: &str = "database/workbook.bin.gz";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("BIND_ADDR must be an IP address, got '{0}'")]
    InvalidAddress(String),

    #[error("STORE must be 'file' or 'memory', got '{0}'")]
    UnknownStore(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Workbook persisted to `WORKBOOK_PATH`.
    File,
    /// Throwaway in-process workbook.
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub workbook_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub store: StoreKind,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            workbook_path: PathBuf::from(DEFAULT_WORKBOOK_PATH),
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            store: StoreKind::File,
        }
    }
}

impl Config {
    /// Loads `.env` if there is one, then reads the process environment.
    #[cfg(feature = "web")]
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or(ConfigError::InvalidPort(port))?;
        }
        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))?;
        }
        if let Some(path) = get("WORKBOOK_PATH") {
            config.workbook_path = PathBuf::from(path);
        }
        if let Some(dir) = get("UPLOADS_DIR") {
            config.uploads_dir = PathBuf::from(dir);
        }
        if let Some(store) = get("STORE") {
            config.store = match store.to_ascii_lowercase().as_str() {
                "file" => StoreKind::File,
                "memory" => StoreKind::Memory,
                _ => return Err(ConfigError::UnknownStore(store)),
            };
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn reads_every_key() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("BIND_ADDR", "127.0.0.1"),
            ("WORKBOOK_PATH", "/tmp/wb.bin.gz"),
            ("UPLOADS_DIR", "/tmp/photos"),
            ("STORE", "Memory"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.workbook_path, PathBuf::from("/tmp/wb.bin.gz"));
        assert_eq!(config.uploads_dir, PathBuf::from("/tmp/photos"));
        assert_eq!(config.store, StoreKind::Memory);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[("PORT", "0")])),
            Err(ConfigError::InvalidPort("0".into()))
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("BIND_ADDR", "localhost")])),
            Err(ConfigError::InvalidAddress("localhost".into()))
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("STORE", "sheets")])),
            Err(ConfigError::UnknownStore("sheets".into()))
        );
    }
}
