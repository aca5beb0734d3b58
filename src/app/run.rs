//! Native window entry point.

use eframe::egui;

use crate::config::EchemPlotConfig;

use super::EchemPlotApp;

/// Open the viewer window and block until it is closed.
///
/// The transport thread is started from inside the eframe creator so it can
/// wake the UI on every event.
pub fn run_echemplot(cfg: EchemPlotConfig) -> eframe::Result<()> {
    let mut viewport = egui::ViewportBuilder::default().with_inner_size(egui::vec2(1400.0, 900.0));
    if let Some(icon) = load_app_icon_svg() {
        viewport = viewport.with_icon(icon);
    }
    let opts = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let title = cfg.title.clone();
    eframe::run_native(
        &title,
        opts,
        Box::new(move |cc| {
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            let app = EchemPlotApp::new(&cfg, cc.egui_ctx.clone())?;
            Ok(Box::new(app))
        }),
    )
}

/// Render `icon.svg` from the crate root; `None` if missing or unreadable.
fn load_app_icon_svg() -> Option<egui::IconData> {
    let svg_path = concat!(env!("CARGO_MANIFEST_DIR"), "/icon.svg");
    let data = std::fs::read(svg_path).ok()?;

    let tree = usvg::Tree::from_data(&data, &usvg::Options::default()).ok()?;
    let size = tree.size().to_int_size();
    if size.width() == 0 || size.height() == 0 {
        return None;
    }
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    Some(egui::IconData {
        rgba: pixmap.take(),
        width: size.width(),
        height: size.height(),
    })
}
