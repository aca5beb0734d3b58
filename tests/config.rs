use std::collections::HashMap;
use std::io::Write;

use assert_matches::assert_matches;
use echemplot::error::ConfigError;
use echemplot::{ChartKind, EchemPlotConfig, PageSize};

#[test]
fn defaults_match_documented_values() {
    let cfg = EchemPlotConfig::default();
    assert_eq!(cfg.endpoint.url(), "ws://127.0.0.1:8765/ws");
    assert_eq!(cfg.max_points, 1000);
    assert_eq!(cfg.reconnect.delay_ms, 2000);
    assert_eq!(cfg.reconnect.max_attempts, Some(5));
    assert_eq!(cfg.reconnect.dial_timeout_ms, 10_000);
    assert_eq!(cfg.resync_interval, 20);
    assert_eq!(cfg.table.page_size, PageSize::Twenty);
    assert_eq!(cfg.table.max_rows, None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn yaml_overrides_only_given_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "endpoint:\n  host: lab-pc\n  port: 9001\nmax_points: 250\nchart_kind: heatmap\ntable:\n  page_size: 50\nreconnect:\n  max_attempts: null\n"
    )
    .unwrap();
    let cfg = EchemPlotConfig::load_from_path(file.path()).unwrap();
    assert_eq!(cfg.endpoint.url(), "ws://lab-pc:9001/ws");
    assert_eq!(cfg.max_points, 250);
    assert_eq!(cfg.chart_kind, ChartKind::Heatmap);
    assert_eq!(cfg.table.page_size, PageSize::Fifty);
    assert_eq!(cfg.reconnect.max_attempts, None);
    assert_eq!(cfg.reconnect.delay_ms, 2000);
    assert_eq!(cfg.resync_interval, 20);
}

#[test]
fn yaml_rejects_unsupported_page_size() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "table:\n  page_size: 30").unwrap();
    assert_matches!(
        EchemPlotConfig::load_from_path(file.path()),
        Err(ConfigError::Parse { .. })
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert_matches!(
        EchemPlotConfig::load_from_path(dir.path().join("absent.yaml")),
        Err(ConfigError::Io { .. })
    );
}

#[test]
fn environment_overlays_file_values() {
    let vars: HashMap<&str, &str> = [
        ("ECHEMPLOT_HOST", "10.0.0.5"),
        ("ECHEMPLOT_PORT", "8800"),
        ("ECHEMPLOT_MAX_POINTS", "64"),
        ("ECHEMPLOT_RECONNECT_DELAY_MS", "500"),
        ("ECHEMPLOT_MAX_RECONNECTS", "unbounded"),
    ]
    .into_iter()
    .collect();
    let mut cfg = EchemPlotConfig::default();
    cfg.apply_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.endpoint.url(), "ws://10.0.0.5:8800/ws");
    assert_eq!(cfg.max_points, 64);
    assert_eq!(cfg.reconnect.delay_ms, 500);
    assert_eq!(cfg.reconnect.max_attempts, None);

    cfg.apply_vars(|k| (k == "ECHEMPLOT_MAX_RECONNECTS").then(|| "0".to_string()))
        .unwrap();
    assert_eq!(cfg.reconnect.max_attempts, None);
    cfg.apply_vars(|k| (k == "ECHEMPLOT_MAX_RECONNECTS").then(|| "3".to_string()))
        .unwrap();
    assert_eq!(cfg.reconnect.max_attempts, Some(3));
}

#[test]
fn bad_environment_value_is_reported() {
    let mut cfg = EchemPlotConfig::default();
    let err = cfg
        .apply_vars(|k| (k == "ECHEMPLOT_PORT").then(|| "eighty".to_string()))
        .unwrap_err();
    assert_matches!(err, ConfigError::InvalidEnv { key: "ECHEMPLOT_PORT", .. });
}

#[test]
fn validate_rejects_degenerate_values() {
    let mut cfg = EchemPlotConfig::default();
    cfg.max_points = 0;
    assert_matches!(cfg.validate(), Err(ConfigError::Invalid(_)));

    let mut cfg = EchemPlotConfig::default();
    cfg.endpoint.host = "  ".into();
    assert_matches!(cfg.validate(), Err(ConfigError::Invalid(_)));

    let mut cfg = EchemPlotConfig::default();
    cfg.resync_interval = 0;
    assert_matches!(cfg.validate(), Err(ConfigError::Invalid(_)));

    let mut cfg = EchemPlotConfig::default();
    cfg.reconnect.dial_timeout_ms = 0;
    assert_matches!(cfg.validate(), Err(ConfigError::Invalid(_)));
}
