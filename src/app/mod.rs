//! Desktop application.
//!
//! | Sub-module    | Responsibility |
//! | ------------- | -------------- |
//! | [`canvas`]    | egui_plot chart implementing [`ChartSurface`](crate::render::ChartSurface) |
//! | [`threads_ui`]| Thread list, reorder, selection and mini-plot |
//! | [`table_ui`]  | Sample table with filter, sort, paging and CSV export |
//! | [`top_bar`]   | Connection controls and status |
//! | [`run`]       | [`run_echemplot()`] entry point and icon loading |

pub mod canvas;
mod run;
mod table_ui;
mod threads_ui;
mod top_bar;

pub use canvas::{CanvasClick, PlotCanvas};
pub use run::run_echemplot;

use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

use eframe::egui;
use tracing::warn;

use crate::config::EchemPlotConfig;
use crate::error::TransportError;
use crate::session::LiveSession;
use crate::status::ConnectionStatus;
use crate::transport::{Notifier, ReconnectPolicy, TransportChannel, TransportEvent};

use top_bar::TopBarAction;

/// Events applied per frame at most, so a flood cannot stall the UI.
const MAX_EVENTS_PER_FRAME: usize = 2000;

pub struct EchemPlotApp {
    session: LiveSession,
    canvas: PlotCanvas,
    transport: TransportChannel,
    events: Receiver<TransportEvent>,
    export_note: Option<String>,
}

impl EchemPlotApp {
    /// Build the app and start the transport thread. `ctx` is woken on every transport event.
    pub fn new(cfg: &EchemPlotConfig, ctx: egui::Context) -> Result<Self, TransportError> {
        let status = ConnectionStatus::new();
        let mut session = LiveSession::new(cfg, status);
        let (tx, rx) = channel();
        let notify: Notifier = Arc::new(move || ctx.request_repaint());
        let transport = TransportChannel::spawn(
            cfg.endpoint.url(),
            ReconnectPolicy::from(&cfg.reconnect),
            tx,
            Some(notify),
        )?;
        if cfg.auto_connect {
            transport.connect()?;
        }
        let mut canvas = PlotCanvas::default();
        session.refresh().apply_to(&mut canvas);
        Ok(Self {
            session,
            canvas,
            transport,
            events: rx,
            export_note: None,
        })
    }

    pub fn session(&self) -> &LiveSession {
        &self.session
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        for _ in 0..MAX_EVENTS_PER_FRAME {
            match self.events.try_recv() {
                Ok(event) => self
                    .session
                    .handle_transport_event(event)
                    .apply_to(&mut self.canvas),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    warn!("transport event channel closed");
                    return;
                }
            }
        }
        // more queued than one frame takes
        ctx.request_repaint();
    }

    fn apply_action(&mut self, action: TopBarAction) {
        let sent = match action {
            TopBarAction::Connect => self.transport.connect(),
            TopBarAction::Disconnect => self.transport.disconnect(),
            TopBarAction::Reset => {
                self.session.reset().apply_to(&mut self.canvas);
                Ok(())
            }
            TopBarAction::ChartKind(kind) => {
                self.session.set_chart_kind(kind).apply_to(&mut self.canvas);
                Ok(())
            }
        };
        if let Err(e) = sent {
            warn!(error = %e, ?action, "transport command failed");
        }
    }
}

impl eframe::App for EchemPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);

        let snapshot = self.session.status().snapshot();
        let action = egui::TopBottomPanel::top("echemplot_top")
            .show(ctx, |ui| {
                top_bar::show(
                    ui,
                    &snapshot,
                    self.transport.url(),
                    self.session.chart_kind(),
                )
            })
            .inner;
        if let Some(action) = action {
            self.apply_action(action);
        }

        egui::SidePanel::left("echemplot_threads")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                threads_ui::show(ui, self.session.threads_mut());
            });

        egui::TopBottomPanel::bottom("echemplot_table")
            .resizable(true)
            .default_height(280.0)
            .show(ctx, |ui| {
                table_ui::show(ui, &mut self.session, &mut self.export_note);
            });

        let click = egui::CentralPanel::default()
            .show(ctx, |ui| self.canvas.show(ui, self.session.selection()))
            .inner;
        if let Some(CanvasClick {
            trace,
            x,
            y,
            sequence,
        }) = click
        {
            self.session.click_chart(&trace, x, y, sequence);
        }
    }
}
