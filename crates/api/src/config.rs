use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[allow(dead_code)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // express-rate-limit defaults carried over: 100 per 15 minutes
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)] // Deserialized from TOML, not yet used in code
pub struct ObservabilityConfig {
    pub prometheus_port: u16,
}

impl ApiConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let config: ApiConfig = toml::from_str(content).context("failed to parse api config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            self.rate_limit.max_requests > 0,
            "rate_limit.max_requests must be > 0"
        );
        anyhow::ensure!(
            self.rate_limit.window_secs > 0,
            "rate_limit.window_secs must be > 0"
        );
        Ok(())
    }

    pub fn default_config_path() -> String {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(std::path::Path::to_path_buf));

        // Check next to the binary first
        if let Some(dir) = &exe_dir {
            let candidate = dir.join("api.toml");
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }

        // Check config/ directory relative to cwd
        let candidate = Path::new("config/api.toml");
        if candidate.exists() {
            return candidate.to_string_lossy().to_string();
        }

        // Check crates/api/config/ (development)
        let candidate = Path::new("crates/api/config/api.toml");
        if candidate.exists() {
            return candidate.to_string_lossy().to_string();
        }

        // Fallback
        "config/api.toml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> &'static str {
        r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
path = "data/registry.db"

[rate_limit]
max_requests = 100
window_secs = 900

[observability]
prometheus_port = 9095
"#
    }

    #[test]
    fn test_parse_valid_config() {
        let config = ApiConfig::from_str(sample_config()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "data/registry.db");
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn test_rate_limit_section_optional() {
        let content = "
[server]
host = \"127.0.0.1\"
port = 3000

[database]
path = \"data/registry.db\"

[observability]
prometheus_port = 9095
";
        let config = ApiConfig::from_str(content).unwrap();
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn test_parse_invalid_config_missing_field() {
        let bad = "
[server]
port = 3000
";
        assert!(ApiConfig::from_str(bad).is_err());
    }

    #[test]
    fn test_validate_zero_window() {
        let content = sample_config().replace("window_secs = 900", "window_secs = 0");
        let result = ApiConfig::from_str(&content);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("window_secs must be > 0"));
    }

    #[test]
    fn test_load_from_file() {
        let config = ApiConfig::load("config/api.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
