//! egui_plot implementation of [`ChartSurface`].

use eframe::egui;
use egui::{Color32, Stroke};
use egui_plot::{Legend, Line, Plot, PlotPoint, PlotResponse, Points, Polygon};
use tracing::debug;

use crate::render::{ChartSurface, Figure, HeatmapGrid, TracePoint, TraceStyle};
use crate::sample::SelectedPoint;

/// Clicks further than this from every point select nothing.
const HIT_RADIUS_PX: f32 = 12.0;

/// A click on the plot that landed on a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasClick {
    pub trace: String,
    pub x: f64,
    pub y: f64,
    pub sequence: Option<u64>,
}

/// Holds the current figure and draws it every frame.
#[derive(Debug, Default)]
pub struct PlotCanvas {
    figure: Figure,
    extends: u64,
    rebuilds: u64,
}

impl ChartSurface for PlotCanvas {
    fn rebuild(&mut self, figure: Figure) {
        self.figure = figure;
        self.rebuilds += 1;
    }

    fn extend(&mut self, trace: usize, point: TracePoint, window: usize) {
        let Some(t) = self.figure.traces.get_mut(trace) else {
            debug!(trace, "extend for unknown trace, waiting for resync");
            return;
        };
        t.points.push([point.x, point.y]);
        t.sequences.push(point.sequence);
        if t.points.len() > window {
            let excess = t.points.len() - window;
            t.points.drain(..excess);
            t.sequences.drain(..excess.min(t.sequences.len()));
        }
        self.extends += 1;
    }
}

impl PlotCanvas {
    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    /// `(extends, rebuilds)` applied so far.
    pub fn counters(&self) -> (u64, u64) {
        (self.extends, self.rebuilds)
    }

    pub fn show(&self, ui: &mut egui::Ui, selection: Option<&SelectedPoint>) -> Option<CanvasClick> {
        let layout = &self.figure.layout;
        ui.vertical_centered(|ui| {
            ui.strong(&layout.title);
        });
        let plot = Plot::new("echemplot_chart")
            .legend(Legend::default())
            .x_axis_label(layout.x_label.clone())
            .y_axis_label(layout.y_label.clone())
            .allow_double_click_reset(true);

        let response: PlotResponse<()> = plot.show(ui, |plot_ui| {
            if let Some(grid) = &self.figure.heatmap {
                for cell in heatmap_cells(grid) {
                    plot_ui.polygon(cell);
                }
            }
            for trace in &self.figure.traces {
                match trace.style {
                    TraceStyle::Lines => {
                        plot_ui.line(Line::new(trace.name.clone(), trace.points.clone()));
                    }
                    TraceStyle::Markers => {
                        plot_ui.points(
                            Points::new(trace.name.clone(), trace.points.clone()).radius(2.5),
                        );
                    }
                }
            }
            if let Some(sel) = selection {
                plot_ui.points(
                    Points::new("", vec![[sel.x, sel.y]])
                        .radius(6.0)
                        .color(Color32::YELLOW),
                );
            }
        });

        if !response.response.clicked() {
            return None;
        }
        let pointer = response.response.interact_pointer_pos()?;
        self.hit_test(&response, pointer)
    }

    /// Nearest drawn point in screen space, if close enough.
    fn hit_test(&self, response: &PlotResponse<()>, pointer: egui::Pos2) -> Option<CanvasClick> {
        let transform = &response.transform;
        let mut best: Option<(f32, usize, usize)> = None;
        for (ti, trace) in self.figure.traces.iter().enumerate() {
            for (pi, p) in trace.points.iter().enumerate() {
                let pos = transform.position_from_point(&PlotPoint::new(p[0], p[1]));
                let d = pos.distance(pointer);
                if d <= HIT_RADIUS_PX && best.map_or(true, |(bd, _, _)| d < bd) {
                    best = Some((d, ti, pi));
                }
            }
        }
        let (_, ti, pi) = best?;
        let trace = &self.figure.traces[ti];
        let [x, y] = trace.points[pi];
        Some(CanvasClick {
            trace: trace.name.clone(),
            x,
            y,
            sequence: trace.sequences.get(pi).copied(),
        })
    }
}

fn heat_color(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color32::from_rgb(lerp(30, 250), lerp(40, 220), lerp(120, 40))
}

fn heatmap_cells(grid: &HeatmapGrid) -> Vec<Polygon<'static>> {
    let max = grid.max_count();
    if max <= 0.0 {
        return Vec::new();
    }
    let (hw, hh) = (grid.cell_half_width, grid.cell_half_height);
    let mut cells = Vec::new();
    for (row, y) in grid.y.iter().enumerate() {
        for (col, x) in grid.x.iter().enumerate() {
            let count = grid.z[row][col];
            if count <= 0.0 {
                continue;
            }
            let corners = vec![
                [x - hw, y - hh],
                [x + hw, y - hh],
                [x + hw, y + hh],
                [x - hw, y + hh],
            ];
            cells.push(
                Polygon::new("", corners)
                    .fill_color(heat_color(count / max))
                    .stroke(Stroke::NONE),
            );
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Layout, Trace};

    fn figure() -> Figure {
        Figure {
            traces: vec![Trace {
                name: "CV".into(),
                style: TraceStyle::Markers,
                points: vec![[0.0, 0.0], [1.0, 1.0]],
                sequences: vec![1, 2],
            }],
            heatmap: None,
            layout: Layout::default(),
        }
    }

    #[test]
    fn extend_keeps_window() {
        let mut c = PlotCanvas::default();
        c.rebuild(figure());
        c.extend(0, TracePoint { x: 2.0, y: 2.0, sequence: 3 }, 2);
        let t = &c.figure().traces[0];
        assert_eq!(t.points, vec![[1.0, 1.0], [2.0, 2.0]]);
        assert_eq!(t.sequences, vec![2, 3]);
        assert_eq!(c.counters(), (1, 1));
    }

    #[test]
    fn extend_unknown_trace_is_ignored() {
        let mut c = PlotCanvas::default();
        c.extend(3, TracePoint { x: 0.0, y: 0.0, sequence: 1 }, 10);
        assert_eq!(c.counters(), (0, 0));
    }
}
