//! echemplot crate root: re-exports and module wiring.
//!
//! Live plotting of electrochemical measurements streamed as JSON frames over
//! a websocket. The pipeline, leaf to root:
//! - `transport`: websocket client with fixed-delay reconnect
//! - `decoder`: wire frames to typed events, technique label normalisation
//! - `data`: per-technique series, thread index, tabular projection
//! - `render`: extend-or-rebuild decisions, axis labels, heatmap
//! - `session`: synchronous fan-out of decoded events to all of the above
//! - `app`: eframe/egui viewer

pub mod app;
pub mod config;
pub mod data;
pub mod decoder;
pub mod error;
pub mod render;
pub mod sample;
pub mod session;
pub mod status;
pub mod transport;

// Public re-exports for a compact external API
pub use app::{run_echemplot, EchemPlotApp};
pub use config::EchemPlotConfig;
pub use data::series::{SeriesStore, TechniqueSeries};
pub use data::table::{PageSize, TableProjection};
pub use data::threads::{Thread, ThreadId, ThreadIndex};
pub use decoder::{normalize_technique, Decoder, WireEvent};
pub use render::{ChartKind, ChartSurface, Figure, RenderBridge, RenderUpdate};
pub use sample::{Sample, SelectedPoint, Technique};
pub use session::LiveSession;
pub use status::{ConnectionState, ConnectionStatus};
pub use transport::{ReconnectPolicy, TransportChannel, TransportEvent};
