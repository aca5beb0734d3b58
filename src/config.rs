//! Configuration shared by the session, the transport and the UI.
//!
//! Values come from, in increasing precedence: built-in defaults, an optional
//! YAML file, `ECHEMPLOT_*` environment variables, and finally command-line
//! flags (applied by the binary).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::table::PageSize;
use crate::error::ConfigError;
use crate::render::ChartKind;

/// Where the data producer listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            path: "/ws".to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') || self.path.is_empty() {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}:{}{}", self.host, self.port, path)
    }
}

/// Reconnect behaviour after an abnormal close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub delay_ms: u64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Budget for the TCP connect plus websocket handshake.
    pub dial_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2000,
            max_attempts: Some(5),
            dial_timeout_ms: 10_000,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub page_size: PageSize,
    /// Optional FIFO cap on table rows. `None` keeps every sample of the session.
    pub max_rows: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::Twenty,
            max_rows: None,
        }
    }
}

/// Configuration for the whole viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchemPlotConfig {
    /// Window title.
    pub title: String,
    pub endpoint: EndpointConfig,
    /// Points retained per technique on the chart.
    pub max_points: usize,
    pub reconnect: ReconnectConfig,
    /// Full chart rebuild after this many incremental extends.
    pub resync_interval: u32,
    pub chart_kind: ChartKind,
    pub table: TableConfig,
    /// Connect as soon as the window opens.
    pub auto_connect: bool,
}

impl Default for EchemPlotConfig {
    fn default() -> Self {
        Self {
            title: "Electrochemistry Live Plot".to_string(),
            endpoint: EndpointConfig::default(),
            max_points: 1000,
            reconnect: ReconnectConfig::default(),
            resync_interval: 20,
            chart_kind: ChartKind::Scatter,
            table: TableConfig::default(),
            auto_connect: true,
        }
    }
}

impl EchemPlotConfig {
    /// Read a YAML file; keys missing from the file keep their defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config file");
        Ok(cfg)
    }

    /// Overlay `ECHEMPLOT_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from any lookup function (used by tests).
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ECHEMPLOT_HOST") {
            self.endpoint.host = host;
        }
        if let Some(v) = lookup("ECHEMPLOT_PORT") {
            self.endpoint.port = parse_var("ECHEMPLOT_PORT", &v)?;
        }
        if let Some(v) = lookup("ECHEMPLOT_MAX_POINTS") {
            self.max_points = parse_var("ECHEMPLOT_MAX_POINTS", &v)?;
        }
        if let Some(v) = lookup("ECHEMPLOT_RECONNECT_DELAY_MS") {
            self.reconnect.delay_ms = parse_var("ECHEMPLOT_RECONNECT_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("ECHEMPLOT_MAX_RECONNECTS") {
            self.reconnect.max_attempts = parse_attempts(&v).ok_or(ConfigError::InvalidEnv {
                key: "ECHEMPLOT_MAX_RECONNECTS",
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint host is empty".into()));
        }
        if self.max_points == 0 {
            return Err(ConfigError::Invalid("max_points must be at least 1".into()));
        }
        if self.resync_interval == 0 {
            return Err(ConfigError::Invalid(
                "resync_interval must be at least 1".into(),
            ));
        }
        if self.reconnect.dial_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "reconnect.dial_timeout_ms must be at least 1".into(),
            ));
        }
        if self.table.max_rows == Some(0) {
            return Err(ConfigError::Invalid("table.max_rows must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

/// `0` and `unbounded` both mean "retry forever".
pub fn parse_attempts(value: &str) -> Option<Option<u32>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("unbounded") {
        return Some(None);
    }
    match value.parse::<u32>() {
        Ok(0) => Some(None),
        Ok(n) => Some(Some(n)),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_adds_leading_slash() {
        let ep = EndpointConfig {
            host: "lab-pc".into(),
            port: 9000,
            path: "stream".into(),
        };
        assert_eq!(ep.url(), "ws://lab-pc:9000/stream");
        assert_eq!(EndpointConfig::default().url(), "ws://127.0.0.1:8765/ws");
    }

    #[test]
    fn attempts_accept_unbounded_spellings() {
        assert_eq!(parse_attempts("unbounded"), Some(None));
        assert_eq!(parse_attempts("0"), Some(None));
        assert_eq!(parse_attempts("3"), Some(Some(3)));
        assert_eq!(parse_attempts("many"), None);
    }
}
