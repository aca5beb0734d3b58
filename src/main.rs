use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use echemplot::{run_echemplot, ChartKind, EchemPlotConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChartArg {
    Scatter,
    Line,
    Heatmap,
}

impl From<ChartArg> for ChartKind {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::Scatter => ChartKind::Scatter,
            ChartArg::Line => ChartKind::Line,
            ChartArg::Heatmap => ChartKind::Heatmap,
        }
    }
}

/// Live plot of electrochemical measurements streamed over a websocket.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// YAML config file; missing keys keep their defaults.
    #[arg(short, long, env = "ECHEMPLOT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Points kept per technique on the chart.
    #[arg(long)]
    max_points: Option<usize>,

    #[arg(long, value_enum)]
    chart: Option<ChartArg>,

    /// Start disconnected.
    #[arg(long)]
    no_connect: bool,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(&self, cfg: &mut EchemPlotConfig) {
        if let Some(host) = &self.host {
            cfg.endpoint.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.endpoint.port = port;
        }
        if let Some(max_points) = self.max_points {
            cfg.max_points = max_points;
        }
        if let Some(chart) = self.chart {
            cfg.chart_kind = chart.into();
        }
        if self.no_connect {
            cfg.auto_connect = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cfg = match &cli.config {
        Some(path) => EchemPlotConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EchemPlotConfig::default(),
    };
    cfg.apply_env().context("reading ECHEMPLOT_* environment")?;
    cli.apply(&mut cfg);
    cfg.validate()?;

    info!(
        endpoint = %cfg.endpoint.url(),
        max_points = cfg.max_points,
        reconnect = ?cfg.reconnect.max_attempts,
        "starting viewer"
    );
    run_echemplot(cfg).map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
