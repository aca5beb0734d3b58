//! Render bridge: series state in, chart primitives out.
//!
//! The chart is modelled as a [`ChartSurface`] with two operations, `extend`
//! and `rebuild`. [`RenderBridge`] decides which one each append needs.

pub mod axes;
pub mod bridge;
pub mod heatmap;

use serde::{Deserialize, Serialize};

pub use axes::{axis_labels, AxisLabels};
pub use bridge::{resolve_click, RebuildReason, RenderBridge, RenderUpdate, ResyncSchedule};
pub use heatmap::HeatmapGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Scatter,
    Line,
    Heatmap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Scatter, ChartKind::Line, ChartKind::Heatmap];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Scatter => "Scatter",
            ChartKind::Line => "Line",
            ChartKind::Heatmap => "Heatmap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStyle {
    Markers,
    Lines,
}

/// One coordinate on its way to the chart, carrying the sample identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub x: f64,
    pub y: f64,
    pub sequence: u64,
}

/// One named trace; the name is the technique.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    pub style: TraceStyle,
    pub points: Vec<[f64; 2]>,
    pub sequences: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub revision: u64,
}

/// Everything a surface needs for a full redraw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Figure {
    pub traces: Vec<Trace>,
    pub heatmap: Option<HeatmapGrid>,
    pub layout: Layout,
}

/// Anything that can show a [`Figure`] and grow it point by point.
pub trait ChartSurface {
    /// Replace everything shown with `figure`.
    fn rebuild(&mut self, figure: Figure);

    /// Append `point` to trace `trace`, keeping at most `window` points.
    fn extend(&mut self, trace: usize, point: TracePoint, window: usize);
}
