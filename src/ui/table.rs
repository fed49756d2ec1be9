use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::{
    Record, COL_BASE_MSRP, COL_CITY, COL_ELECTRIC_RANGE, COL_MAKE, COL_MODEL_YEAR, COL_STATE,
    COL_VEHICLE_TYPE, COL_VIN,
};

const HEADERS: [&str; 8] = [
    COL_VIN,
    COL_MODEL_YEAR,
    COL_MAKE,
    COL_VEHICLE_TYPE,
    COL_CITY,
    COL_STATE,
    COL_BASE_MSRP,
    COL_ELECTRIC_RANGE,
];

// ---------------------------------------------------------------------------
// Filtered rows preview
// ---------------------------------------------------------------------------

/// Collapsible table with the first rows of the filtered view.
pub fn preview_table(ui: &mut Ui, rows: &[Record], visible_rows: usize) {
    let title = format!("Filtered rows ({} of {visible_rows} shown)", rows.len());
    egui::CollapsingHeader::new(RichText::new(title).strong())
        .id_salt("filtered_rows")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .columns(Column::auto().at_least(60.0), HEADERS.len())
                .max_scroll_height(320.0)
                .header(20.0, |mut header| {
                    for name in HEADERS {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, rows.len(), |mut row| {
                        let record = &rows[row.index()];
                        for cell in cells(record) {
                            row.col(|ui: &mut Ui| {
                                ui.label(cell);
                            });
                        }
                    });
                });
        });
}

/// Display strings in [`HEADERS`] order; missing cells render as a dash.
fn cells(r: &Record) -> [String; 8] {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "–".to_string());
    let number = |v: Option<f64>| v.map_or_else(|| "–".to_string(), |n| format!("{n:.0}"));
    [
        text(&r.vin),
        r.model_year.to_string(),
        text(&r.make),
        text(&r.vehicle_type),
        text(&r.city),
        text(&r.state),
        number(r.base_msrp),
        number(r.electric_range),
    ]
}
