use eframe::egui;
use egui::Color32;
use egui_phosphor::regular::{BROOM, CIRCLE, PLUGS, PLUGS_CONNECTED, WARNING};

use crate::render::ChartKind;
use crate::status::{ConnectionState, StatusSnapshot};

/// What the user asked for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBarAction {
    Connect,
    Disconnect,
    Reset,
    ChartKind(ChartKind),
}

fn state_color(state: ConnectionState) -> Color32 {
    match state {
        ConnectionState::Disconnected => Color32::from_rgb(200, 60, 60),
        ConnectionState::Connecting => Color32::from_rgb(230, 170, 40),
        ConnectionState::Connected => Color32::from_rgb(60, 180, 90),
    }
}

pub fn show(
    ui: &mut egui::Ui,
    status: &StatusSnapshot,
    endpoint: &str,
    chart_kind: ChartKind,
) -> Option<TopBarAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(CIRCLE).color(state_color(status.state)));
        ui.label(status.state.label()).on_hover_text(endpoint);
        if status.retries_exhausted {
            ui.label(egui::RichText::new(format!("{WARNING} gave up reconnecting")).weak());
        } else if status.reconnect_attempt > 0 && status.state != ConnectionState::Connected {
            ui.weak(format!("retry {}", status.reconnect_attempt));
        }

        match status.state {
            ConnectionState::Disconnected => {
                if ui.button(format!("{PLUGS_CONNECTED} Connect")).clicked() {
                    action = Some(TopBarAction::Connect);
                }
            }
            ConnectionState::Connecting | ConnectionState::Connected => {
                if ui.button(format!("{PLUGS} Disconnect")).clicked() {
                    action = Some(TopBarAction::Disconnect);
                }
            }
        }
        if ui
            .button(format!("{BROOM} Reset"))
            .on_hover_text("Clear chart, threads and table")
            .clicked()
        {
            action = Some(TopBarAction::Reset);
        }

        ui.separator();
        let mut kind = chart_kind;
        egui::ComboBox::from_id_salt("chart_kind")
            .selected_text(kind.label())
            .show_ui(ui, |ui| {
                for option in ChartKind::ALL {
                    ui.selectable_value(&mut kind, option, option.label());
                }
            });
        if kind != chart_kind {
            action = Some(TopBarAction::ChartKind(kind));
        }

        ui.separator();
        match &status.active_technique {
            Some(t) => ui.label(format!("Technique: {t}")),
            None => ui.weak("No technique"),
        };

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if status.dropped_frames > 0 {
                ui.label(format!("{WARNING} {} dropped", status.dropped_frames))
                    .on_hover_text("Frames that could not be decoded");
            }
            if let Some(ack) = &status.last_ack {
                ui.weak(ack);
            }
        });
    });
    action
}
