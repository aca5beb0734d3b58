use serde_json::Value;
use tracing::{debug, warn};

use crate::data::series::{AppendOutcome, SeriesStore, StoreSnapshot};
use crate::decoder::normalize_technique;
use crate::error::RenderError;
use crate::sample::{SelectedPoint, Technique};

use super::heatmap::heatmap_from;
use super::{axis_labels, ChartKind, ChartSurface, Figure, Layout, Trace, TracePoint, TraceStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// First point of a technique not yet on the chart.
    NewSeries,
    /// Periodic consistency resync.
    Resync,
    Reset,
    ChartKindChanged,
    /// Heatmap has no incremental form, so every append regrids.
    GridUpdate,
    /// Requested by the caller, e.g. a freshly created surface.
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderUpdate {
    Rebuild {
        figure: Figure,
        reason: RebuildReason,
    },
    Extend {
        trace: usize,
        point: TracePoint,
        window: usize,
    },
    /// Nothing to draw for this append.
    Idle,
}

impl RenderUpdate {
    pub fn apply_to<S: ChartSurface + ?Sized>(self, surface: &mut S) {
        match self {
            RenderUpdate::Rebuild { figure, .. } => surface.rebuild(figure),
            RenderUpdate::Extend {
                trace,
                point,
                window,
            } => surface.extend(trace, point, window),
            RenderUpdate::Idle => {}
        }
    }

    pub fn is_rebuild(&self) -> bool {
        matches!(self, RenderUpdate::Rebuild { .. })
    }
}

/// Counts incremental extends and says when a full resync is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncSchedule {
    interval: u32,
    since_rebuild: u32,
}

impl ResyncSchedule {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            since_rebuild: 0,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Count one append. `true` means rebuild now instead of extending.
    pub fn tick(&mut self) -> bool {
        self.since_rebuild += 1;
        self.since_rebuild >= self.interval
    }

    pub fn rebuilt(&mut self) {
        self.since_rebuild = 0;
    }
}

#[derive(Debug, Clone)]
pub struct RenderBridge {
    kind: ChartKind,
    schedule: ResyncSchedule,
    revision: u64,
    pending: Option<RebuildReason>,
}

impl Default for RenderBridge {
    fn default() -> Self {
        Self::new(ChartKind::Scatter, 20)
    }
}

impl RenderBridge {
    pub fn new(kind: ChartKind, resync_interval: u32) -> Self {
        Self {
            kind,
            schedule: ResyncSchedule::new(resync_interval),
            revision: 0,
            pending: None,
        }
    }

    pub fn chart_kind(&self) -> ChartKind {
        self.kind
    }

    /// Bumped on every extend and rebuild; a reset rebuild starts over at 0.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Switch chart type; the next update is a full rebuild.
    pub fn set_chart_kind(&mut self, kind: ChartKind) -> bool {
        if kind == self.kind {
            return false;
        }
        self.kind = kind;
        self.pending = Some(RebuildReason::ChartKindChanged);
        true
    }

    /// Queue a rebuild for the next [`flush`](Self::flush) or append.
    pub fn request(&mut self, reason: RebuildReason) {
        self.pending.get_or_insert(reason);
    }

    pub fn pending(&self) -> Option<RebuildReason> {
        self.pending
    }

    /// Forget everything shown; the queued rebuild is revision 0 again.
    pub fn reset(&mut self) {
        self.revision = 0;
        self.pending = Some(RebuildReason::Reset);
        self.schedule.rebuilt();
    }

    /// Take a pending rebuild, if any, and perform it now.
    pub fn flush(&mut self, store: &SeriesStore, active: Option<&Technique>) -> RenderUpdate {
        match self.pending.take() {
            Some(reason) => self.rebuild(store.snapshot(), active, reason),
            None => RenderUpdate::Idle,
        }
    }

    /// Decide how the chart follows one append to `store`.
    pub fn on_append(
        &mut self,
        outcome: &AppendOutcome,
        store: &SeriesStore,
        active: Option<&Technique>,
    ) -> RenderUpdate {
        let reason = if let Some(reason) = self.pending.take() {
            Some(reason)
        } else if outcome.created {
            Some(RebuildReason::NewSeries)
        } else if self.schedule.tick() {
            Some(RebuildReason::Resync)
        } else {
            None
        };
        let snapshot = store.snapshot();
        if let Some(reason) = reason {
            return self.rebuild(snapshot, active, reason);
        }
        if self.kind == ChartKind::Heatmap {
            return self.rebuild(snapshot, active, RebuildReason::GridUpdate);
        }
        match snapshot.series.get(outcome.index).and_then(|s| s.last()) {
            Some((x, y, sequence)) => {
                self.revision += 1;
                RenderUpdate::Extend {
                    trace: outcome.index,
                    point: TracePoint { x, y, sequence },
                    window: snapshot.max_points,
                }
            }
            None => self.rebuild(snapshot, active, RebuildReason::Resync),
        }
    }

    /// Full rebuild from `snapshot`.
    pub fn rebuild(
        &mut self,
        snapshot: StoreSnapshot<'_>,
        active: Option<&Technique>,
        reason: RebuildReason,
    ) -> RenderUpdate {
        debug!(?reason, points = snapshot.total_points(), "chart rebuild");
        self.revision = match reason {
            RebuildReason::Reset => 0,
            _ => self.revision + 1,
        };
        let figure = self.build_figure(snapshot, active);
        self.schedule.rebuilt();
        RenderUpdate::Rebuild { figure, reason }
    }

    fn build_figure(&self, snapshot: StoreSnapshot<'_>, active: Option<&Technique>) -> Figure {
        let labelled = active
            .map(|t| &**t)
            .or_else(|| snapshot.series.last().map(|s| &**s.technique()))
            .unwrap_or("");
        let labels = axis_labels(labelled);
        let layout = Layout {
            title: if labelled.is_empty() {
                "Live data".to_string()
            } else {
                format!("{labelled} live data")
            },
            x_label: labels.x.to_string(),
            y_label: labels.y.to_string(),
            revision: self.revision,
        };

        let style = match self.kind {
            ChartKind::Line => TraceStyle::Lines,
            ChartKind::Scatter => TraceStyle::Markers,
            ChartKind::Heatmap => match heatmap_from(snapshot.series) {
                Ok(grid) => {
                    return Figure {
                        traces: Vec::new(),
                        heatmap: Some(grid),
                        layout,
                    }
                }
                Err(RenderError::EmptyHeatmap) => TraceStyle::Markers,
                Err(e) => {
                    warn!(error = %e, "heatmap unavailable, drawing scatter instead");
                    TraceStyle::Markers
                }
            },
        };
        Figure {
            traces: snapshot
                .series
                .iter()
                .map(|s| Trace {
                    name: s.technique().to_string(),
                    style,
                    points: s.points().collect(),
                    sequences: s.sequences().iter().copied().collect(),
                })
                .collect(),
            heatmap: None,
            layout,
        }
    }
}

/// Map a chart click back to a sample reference.
///
/// The trace name is the technique and goes through the same normalisation
/// as wire frames, so `{"text": "CV"}` and `"CV"` resolve alike.
pub fn resolve_click(trace_name: &Value, x: f64, y: f64, sequence: Option<u64>) -> SelectedPoint {
    SelectedPoint {
        technique: Technique::from(normalize_technique(trace_name)),
        x,
        y,
        sequence,
    }
}
