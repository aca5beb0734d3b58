//! One live session: decoder, series store, thread index and table fed from
//! the same event stream.
//!
//! Every decoded data point reaches all three consumers before the next frame
//! is looked at, so their sample counts agree at every point a caller can
//! observe. [`LiveSession::check_invariants`] states exactly what "agree" means.

use serde_json::Value;
use tracing::{debug, info};

use crate::config::EchemPlotConfig;
use crate::data::series::SeriesStore;
use crate::data::table::TableProjection;
use crate::data::threads::{ThreadId, ThreadIndex};
use crate::decoder::{Clock, Decoder, WireEvent};
use crate::error::InvariantViolation;
use crate::render::{resolve_click, ChartKind, RebuildReason, RenderBridge, RenderUpdate};
use crate::sample::{Sample, SelectedPoint, Technique};
use crate::status::ConnectionStatus;
use crate::transport::TransportEvent;

#[derive(Debug)]
pub struct LiveSession {
    decoder: Decoder,
    series: SeriesStore,
    threads: ThreadIndex,
    table: TableProjection,
    bridge: RenderBridge,
    status: ConnectionStatus,
    selection: Option<SelectedPoint>,
}

impl LiveSession {
    pub fn new(cfg: &EchemPlotConfig, status: ConnectionStatus) -> Self {
        Self::with_decoder(cfg, status, Decoder::new())
    }

    /// Same as [`new`](Self::new) with a fixed time source.
    pub fn with_clock(cfg: &EchemPlotConfig, status: ConnectionStatus, clock: Clock) -> Self {
        Self::with_decoder(cfg, status, Decoder::with_clock(clock))
    }

    fn with_decoder(cfg: &EchemPlotConfig, status: ConnectionStatus, decoder: Decoder) -> Self {
        Self {
            decoder,
            series: SeriesStore::new(cfg.max_points),
            threads: ThreadIndex::new(),
            table: TableProjection::new(cfg.table.page_size, cfg.table.max_rows),
            bridge: RenderBridge::new(cfg.chart_kind, cfg.resync_interval),
            status,
            selection: None,
        }
    }

    pub fn series(&self) -> &SeriesStore {
        &self.series
    }

    pub fn threads(&self) -> &ThreadIndex {
        &self.threads
    }

    /// Display-only access: reorder and select never touch sample data.
    pub fn threads_mut(&mut self) -> &mut ThreadIndex {
        &mut self.threads
    }

    pub fn table(&self) -> &TableProjection {
        &self.table
    }

    /// Filter, sort and paging controls.
    pub fn table_mut(&mut self) -> &mut TableProjection {
        &mut self.table
    }

    pub fn bridge(&self) -> &RenderBridge {
        &self.bridge
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn selection(&self) -> Option<&SelectedPoint> {
        self.selection.as_ref()
    }

    /// The sample behind the current selection, if a thread still holds it.
    pub fn selected_sample(&self) -> Option<&Sample> {
        let point = self.selection.as_ref()?;
        self.threads
            .threads()
            .iter()
            .filter(|t| t.technique == point.technique)
            .flat_map(|t| t.samples.iter())
            .find(|s| point.matches(s))
    }

    pub fn chart_kind(&self) -> ChartKind {
        self.bridge.chart_kind()
    }

    /// Apply one transport event. Frames go through the decoder.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> RenderUpdate {
        match event {
            TransportEvent::StateChanged(state) => {
                self.status.transition(state);
                RenderUpdate::Idle
            }
            TransportEvent::ReconnectScheduled { attempt, .. } => {
                self.status.set_reconnect_attempt(attempt);
                RenderUpdate::Idle
            }
            TransportEvent::RetriesExhausted { .. } => {
                self.status.set_retries_exhausted(true);
                RenderUpdate::Idle
            }
            TransportEvent::Frame(raw) => self.handle_frame(&raw),
            TransportEvent::FrameDropped { .. } => {
                self.status.record_dropped_frame();
                RenderUpdate::Idle
            }
        }
    }

    /// Decode one raw frame and apply it.
    pub fn handle_frame(&mut self, raw: &str) -> RenderUpdate {
        match self.decoder.decode(raw) {
            WireEvent::DataPoint(sample) => self.ingest(sample),
            WireEvent::TechniqueChange { technique } => {
                info!(%technique, "technique change");
                self.status.set_active_technique(Some(technique));
                self.bridge.request(RebuildReason::Refresh);
                self.flush()
            }
            WireEvent::ConnectionAck { message } => {
                info!(%message, "server acknowledged connection");
                self.status.record_ack(message);
                RenderUpdate::Idle
            }
            WireEvent::Unknown { reason, .. } => {
                if reason.is_fault() {
                    self.status.record_dropped_frame();
                }
                RenderUpdate::Idle
            }
        }
    }

    /// Fan one sample out to series, threads and table, then to the chart.
    pub fn ingest(&mut self, sample: Sample) -> RenderUpdate {
        let outcome = self.series.append(&sample);
        let thread = self.threads.ingest(&sample);
        let technique = sample.technique.clone();
        self.table.push(sample);
        if thread.created {
            debug!(thread = thread.thread, %technique, "ingest opened thread");
        }

        debug_assert_eq!(self.check_technique(&technique), Ok(()));

        let active = self.status.active_technique();
        let update = self.bridge.on_append(&outcome, &self.series, active.as_ref());
        self.status.set_chart_revision(self.bridge.revision());
        update
    }

    /// Emit any queued rebuild.
    pub fn flush(&mut self) -> RenderUpdate {
        let active = self.status.active_technique();
        let update = self.bridge.flush(&self.series, active.as_ref());
        self.status.set_chart_revision(self.bridge.revision());
        update
    }

    /// Full figure for a surface that has nothing drawn yet.
    pub fn refresh(&mut self) -> RenderUpdate {
        self.bridge.request(RebuildReason::Refresh);
        self.flush()
    }

    pub fn set_chart_kind(&mut self, kind: ChartKind) -> RenderUpdate {
        if self.bridge.set_chart_kind(kind) {
            info!(kind = kind.label(), "chart kind changed");
        }
        self.flush()
    }

    /// Clear all derived state and restart sequence numbering.
    ///
    /// Connection state is kept; a replay of the same frames afterwards
    /// rebuilds exactly what a fresh session would.
    pub fn reset(&mut self) -> RenderUpdate {
        info!(samples = self.table.len(), "session reset");
        self.decoder.reset();
        self.series.reset();
        self.threads.reset();
        self.table.reset();
        self.selection = None;
        self.status.set_active_technique(None);
        self.bridge.reset();
        self.flush()
    }

    /// Chart click: resolve it to a sample reference and highlight the row.
    pub fn click_chart(
        &mut self,
        trace_name: &str,
        x: f64,
        y: f64,
        sequence: Option<u64>,
    ) -> SelectedPoint {
        let point = resolve_click(&Value::from(trace_name), x, y, sequence);
        self.table.highlight(Some(point.clone()));
        self.selection = Some(point.clone());
        point
    }

    /// Table click on the current page; the chart highlights the same sample.
    pub fn click_table_row(&mut self, row: usize) -> Option<SelectedPoint> {
        let point = self.table.click_row(row)?;
        self.selection = Some(point.clone());
        Some(point)
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.table.highlight(None);
    }

    pub fn select_thread(&mut self, id: ThreadId) -> bool {
        self.threads.select(id)
    }

    pub fn reorder_threads(&mut self, from: usize, to: usize) -> bool {
        self.threads.reorder(from, to)
    }

    fn check_technique(&self, technique: &Technique) -> Result<(), InvariantViolation> {
        let threads = self.threads.samples_for(technique) as u64;
        let Some(series) = self.series.get(technique) else {
            return Err(InvariantViolation::SeriesThreadMismatch {
                technique: technique.to_string(),
                series: 0,
                threads,
            });
        };
        if series.appended() != threads {
            return Err(InvariantViolation::SeriesThreadMismatch {
                technique: technique.to_string(),
                series: series.appended(),
                threads,
            });
        }
        let expected = (series.appended() as usize).min(self.series.max_points());
        if series.len() != expected {
            return Err(InvariantViolation::SeriesRetention {
                technique: technique.to_string(),
                retained: series.len(),
                expected,
            });
        }
        Ok(())
    }

    /// Cross-component sample counts.
    ///
    /// Per technique, the series has seen as many samples as the threads
    /// hold and retains `min(seen, max_points)` of them. The table holds
    /// every thread sample unless a row cap is configured.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for series in self.series.iter() {
            self.check_technique(series.technique())?;
        }
        let threads = self.threads.total_samples();
        let expected_rows = match self.table.max_rows() {
            Some(cap) => threads.min(cap),
            None => threads,
        };
        if self.table.len() != expected_rows {
            return Err(InvariantViolation::TableThreadMismatch {
                table: self.table.len(),
                threads,
            });
        }
        Ok(())
    }
}
