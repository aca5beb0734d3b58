//! Bottom panel: the sample table with filter, sort, paging and CSV export.

use eframe::egui;
use egui_phosphor::regular::{
    CARET_DOWN, CARET_LEFT, CARET_RIGHT, CARET_UP, DOWNLOAD_SIMPLE, MAGNIFYING_GLASS,
};
use egui_table::{HeaderRow, Table, TableDelegate};
use tracing::{info, warn};

use crate::data::table::{PageSize, SortDirection, SortOrder, TableColumn};
use crate::sample::{Sample, SelectedPoint};
use crate::session::LiveSession;

const COLUMN_WIDTHS: [f32; 5] = [70.0, 120.0, 140.0, 140.0, 220.0];

struct SamplesDelegate {
    rows: Vec<Sample>,
    highlighted: Option<SelectedPoint>,
    sort: SortOrder,
    sort_clicked: Option<TableColumn>,
    row_clicked: Option<usize>,
}

impl TableDelegate for SamplesDelegate {
    fn header_cell_ui(&mut self, ui: &mut egui::Ui, cell: &egui_table::HeaderCellInfo) {
        let Some(&column) = TableColumn::ALL.get(cell.col_range.start) else {
            return;
        };
        let mut text = column.header().to_string();
        if self.sort.column == column {
            text.push(' ');
            text.push_str(match self.sort.direction {
                SortDirection::Ascending => CARET_UP,
                SortDirection::Descending => CARET_DOWN,
            });
        }
        ui.add_space(4.0);
        let resp = ui.add(
            egui::Label::new(egui::RichText::new(text).strong()).sense(egui::Sense::click()),
        );
        if resp.on_hover_text("Sort").clicked() {
            self.sort_clicked = Some(column);
        }
    }

    fn cell_ui(&mut self, ui: &mut egui::Ui, cell: &egui_table::CellInfo) {
        let row = cell.row_nr as usize;
        let Some(sample) = self.rows.get(row) else {
            return;
        };
        let Some(&column) = TableColumn::ALL.get(cell.col_nr) else {
            return;
        };
        if self.highlighted.as_ref().is_some_and(|p| p.matches(sample)) {
            ui.painter()
                .rect_filled(ui.max_rect(), 0.0, ui.visuals().selection.bg_fill);
        }
        ui.add_space(4.0);
        let resp = ui.add(
            egui::Label::new(column.cell(sample))
                .truncate()
                .sense(egui::Sense::click()),
        );
        if resp.clicked() {
            self.row_clicked = Some(row);
        }
    }
}

/// Draw the table. Header clicks resort it and row clicks select a sample.
pub fn show(ui: &mut egui::Ui, session: &mut LiveSession, export_note: &mut Option<String>) {
    ui.horizontal(|ui| {
        ui.label(MAGNIFYING_GLASS);
        let mut filter = session.table().filter().to_string();
        if ui
            .add(egui::TextEdit::singleline(&mut filter).hint_text("Filter"))
            .changed()
        {
            session.table_mut().set_filter(filter);
        }

        ui.separator();
        let mut size = session.table().page_size();
        egui::ComboBox::from_id_salt("page_size")
            .selected_text(format!("{} / page", size.rows()))
            .show_ui(ui, |ui| {
                for option in PageSize::ALL {
                    ui.selectable_value(&mut size, option, option.rows().to_string());
                }
            });
        if size != session.table().page_size() {
            session.table_mut().set_page_size(size);
        }

        ui.separator();
        let page = session.table().page();
        let pages = session.table().page_count();
        if ui
            .add_enabled(page > 0, egui::Button::new(CARET_LEFT))
            .clicked()
        {
            session.table_mut().set_page(page - 1);
        }
        ui.label(format!("{} / {}", page.min(pages - 1) + 1, pages));
        if ui
            .add_enabled(page + 1 < pages, egui::Button::new(CARET_RIGHT))
            .clicked()
        {
            session.table_mut().set_page(page + 1);
        }
        ui.label(format!("{} rows", session.table().view().len()));

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .button(format!("{DOWNLOAD_SIMPLE} Export CSV"))
                .clicked()
            {
                export_csv(session, export_note);
            }
            if let Some(note) = export_note.as_deref() {
                ui.weak(note);
            }
        });
    });
    ui.separator();

    let mut delegate = SamplesDelegate {
        rows: session.table().page_rows().into_iter().cloned().collect(),
        highlighted: session.table().highlighted().cloned(),
        sort: session.table().sort(),
        sort_clicked: None,
        row_clicked: None,
    };
    let columns = COLUMN_WIDTHS
        .iter()
        .map(|w| egui_table::Column::new(*w).resizable(true))
        .collect::<Vec<_>>();
    Table::new()
        .id_salt("samples_table")
        .num_rows(delegate.rows.len() as u64)
        .columns(columns)
        .headers(vec![HeaderRow::new(24.0)])
        .show(ui, &mut delegate);

    if let Some(column) = delegate.sort_clicked {
        session.table_mut().toggle_sort(column);
    }
    if let Some(row) = delegate.row_clicked {
        session.click_table_row(row);
    }
}

fn export_csv(session: &LiveSession, note: &mut Option<String>) {
    let Some(path) = rfd::FileDialog::new()
        .set_file_name("samples.csv")
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };
    match session.table().save_csv(&path) {
        Ok(()) => {
            info!(path = %path.display(), rows = session.table().view().len(), "exported table");
            *note = Some(format!("Saved {}", path.display()));
        }
        Err(e) => {
            warn!(error = %e, "table export failed");
            *note = Some(e.to_string());
        }
    }
}
