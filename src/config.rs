use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::upstream::{UpstreamSettings, DEFAULT_HOST};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdapterConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://frontend:3000".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub host: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions never expire when unset.
    pub ttl_secs: Option<u64>,
}

impl AdapterConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_addr, self.server.port)
    }

    pub fn upstream_settings(&self) -> UpstreamSettings {
        UpstreamSettings {
            host: self.upstream.host.clone(),
            timeout: Duration::from_secs(self.upstream.timeout_secs),
        }
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        self.session.ttl_secs.map(Duration::from_secs)
    }

    /// Overrides file values with whatever `lookup` returns for the known variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().with_context(|| format!("Invalid PORT: {port}"))?;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr
                .parse()
                .with_context(|| format!("Invalid BIND_ADDR: {addr}"))?;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(host) = lookup("DEVOPS_HOST") {
            self.upstream.host = host;
        }
        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid UPSTREAM_TIMEOUT_SECS: {secs}"))?;
            ensure!(
                self.upstream.timeout_secs > 0,
                "Invalid UPSTREAM_TIMEOUT_SECS: must be greater than zero"
            );
        }
        if let Some(secs) = lookup("SESSION_TTL_SECS") {
            self.session.ttl_secs = Some(
                secs.parse()
                    .with_context(|| format!("Invalid SESSION_TTL_SECS: {secs}"))?,
            );
        }
        Ok(())
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DEVOPS_ADAPTER_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devops-adapter")
        .join("config.toml")
}

pub fn load_config_from(path: &std::path::Path) -> Result<AdapterConfig> {
    if !path.exists() {
        return Ok(AdapterConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AdapterConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))?;
    ensure!(
        config.upstream.timeout_secs > 0,
        "Invalid upstream.timeout_secs in {}: must be greater than zero",
        path.display()
    );
    Ok(config)
}

/// Reads the config file, if any, then applies environment overrides.
pub fn load_config() -> Result<AdapterConfig> {
    let mut config = load_config_from(&config_path())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.host, "dev.azure.com");
        assert_eq!(config.session_ttl(), None);
        assert_eq!(config.server.allowed_origins.len(), 2);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[upstream]\ntimeout_secs = 5\n\n[session]\nttl_secs = 3600\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.upstream_settings().timeout, Duration::from_secs(5));
        assert_eq!(config.upstream.host, "dev.azure.com");
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9090"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("DEVOPS_HOST", "devops.internal"),
        ]
        .into_iter()
        .collect();

        let mut config = AdapterConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.socket_addr().port(), 9090);
        assert_eq!(
            config.server.allowed_origins,
            ["https://a.example", "https://b.example"]
        );
        assert_eq!(config.upstream_settings().host, "devops.internal");
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = AdapterConfig::default();
        let err = config
            .apply_env(|key| (key == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = AdapterConfig::default();
        let err = config
            .apply_env(|key| (key == "UPSTREAM_TIMEOUT_SECS").then(|| "0".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[upstream]\ntimeout_secs = 0\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }
}
