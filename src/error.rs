//! Error types shared across the crate.
//!
//! Decode faults never show up here: the decoder classifies bad frames as
//! [`WireEvent::Unknown`](crate::decoder::WireEvent::Unknown) instead of failing.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading or validating an [`EchemPlotConfig`](crate::config::EchemPlotConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure to start or run the transport channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("no handshake within {0:?}")]
    DialTimeout(std::time::Duration),
    #[error("transport channel is shut down")]
    Closed,
}

/// Failure while turning series data into chart primitives.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("heatmap needs at least one point")]
    EmptyHeatmap,
    #[error("heatmap axis range is not finite")]
    NonFiniteRange,
}

/// Failure while exporting the tabular view.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cross-component sample-count mismatch. Always a programming defect.
#[derive(Debug, Error, PartialEq)]
pub enum InvariantViolation {
    #[error("series {technique} saw {series} samples but threads hold {threads}")]
    SeriesThreadMismatch {
        technique: String,
        series: u64,
        threads: u64,
    },
    #[error("series {technique} retains {retained} points, expected {expected}")]
    SeriesRetention {
        technique: String,
        retained: usize,
        expected: usize,
    },
    #[error("table holds {table} rows but threads hold {threads} samples")]
    TableThreadMismatch { table: usize, threads: usize },
}
