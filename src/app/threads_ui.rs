//! Left panel: thread list with drag reorder, selection and a mini-plot.

use eframe::egui;
use egui::Id;
use egui_dnd::dnd;
use egui_phosphor::regular::DOTS_SIX_VERTICAL;
use egui_plot::{Line, Plot};

use crate::data::threads::{ThreadId, ThreadIndex};

struct ThreadRow {
    id: ThreadId,
    title: String,
    samples: usize,
}

pub fn show(ui: &mut egui::Ui, threads: &mut ThreadIndex) {
    ui.strong("Threads");
    ui.separator();

    if threads.is_empty() {
        ui.weak("No data yet.");
        return;
    }

    let rows: Vec<ThreadRow> = threads
        .threads()
        .iter()
        .map(|t| ThreadRow {
            id: t.id,
            title: t.title.clone(),
            samples: t.len(),
        })
        .collect();
    let selected = threads.selected_id();
    let ingesting = threads.ingest_target().map(|t| t.id);
    let mut clicked: Option<ThreadId> = None;

    let response = egui::ScrollArea::vertical()
        .id_salt("threads_scroll")
        .max_height(ui.available_height() * 0.55)
        .show(ui, |ui| {
            let ids = rows.iter().map(|r| r.id);
            dnd(ui, Id::new("threads_dnd")).show(ids, |ui, id, handle, _state| {
                let Some(row) = rows.iter().find(|r| r.id == id) else {
                    return;
                };
                ui.horizontal(|ui| {
                    handle.ui(ui, |ui| {
                        ui.label(DOTS_SIX_VERTICAL);
                    });
                    let mut text = format!("{} ({})", row.title, row.samples);
                    if ingesting == Some(row.id) {
                        text.push_str(" ●");
                    }
                    if ui
                        .selectable_label(selected == Some(row.id), text)
                        .clicked()
                    {
                        clicked = Some(row.id);
                    }
                });
            })
        })
        .inner;

    if let Some(update) = response.final_update() {
        // egui_dnd reports the insertion slot in the original list
        let to = if update.to > update.from {
            update.to - 1
        } else {
            update.to
        };
        threads.reorder(update.from, to);
    }
    if response.is_dragging() {
        ui.ctx().request_repaint();
    }
    if let Some(id) = clicked {
        threads.select(id);
    }

    ui.separator();
    let Some(thread) = threads.selected() else {
        return;
    };
    egui::Grid::new("thread_details").num_columns(2).show(ui, |ui| {
        ui.label("Title");
        ui.label(&thread.title);
        ui.end_row();
        ui.label("Technique");
        ui.label(&*thread.technique);
        ui.end_row();
        ui.label("Started");
        ui.label(thread.started_at.format("%H:%M:%S%.3f").to_string());
        ui.end_row();
        ui.label("Samples");
        ui.label(thread.len().to_string());
        ui.end_row();
    });

    let points: Vec<[f64; 2]> = thread.samples.iter().map(|s| [s.x, s.y]).collect();
    Plot::new(("thread_mini_plot", thread.id))
        .height(140.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show_axes([false, true])
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(thread.title.clone(), points));
        });
}
