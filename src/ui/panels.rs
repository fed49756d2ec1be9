use std::collections::BTreeSet;

use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, TextEdit, Ui};

use crate::state::{pick_dataset_file, AppState};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    let Some(filters) = state.filters.clone() else {
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Model year range ----
            ui.strong("Model year");
            let (lo, hi) = dataset.year_bounds();
            let (mut from, mut to) = filters.year_range();
            let from_changed = ui.add(Slider::new(&mut from, lo..=hi).text("from")).changed();
            let to_changed = ui.add(Slider::new(&mut to, lo..=hi).text("to")).changed();
            if from_changed || to_changed {
                // The dragged end pushes the other one instead of crossing it.
                if from_changed && from > to {
                    to = from;
                }
                if to_changed && to < from {
                    from = to;
                }
                state.set_year_range(from, to);
            }
            ui.separator();

            // ---- Vehicle type ----
            let n_types = dataset.vehicle_types().len();
            ui.strong(format!(
                "Vehicle type  ({}/{n_types})",
                filters.selected_types.len()
            ));
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_types();
                }
                if ui.small_button("None").clicked() {
                    state.clear_types();
                }
            });
            for t in dataset.vehicle_types() {
                let mut checked = filters.selected_types.contains(t);
                let text = RichText::new(t).color(state.type_colors.color_for(t));
                if ui.checkbox(&mut checked, text).changed() {
                    state.set_type_selected(t, checked);
                }
            }
            if filters.selected_types.is_empty() {
                ui.label(RichText::new("No type selected: nothing is shown.").italics());
            }
            ui.separator();

            // ---- City / make ----
            let action = multiselect(
                ui,
                "City",
                dataset.cities(),
                &filters.selected_cities,
                &mut state.city_search,
            );
            if action.clear {
                state.clear_cities();
            }
            for (city, selected) in action.toggled {
                state.set_city_selected(&city, selected);
            }
            ui.separator();

            let action = multiselect(
                ui,
                "Make",
                dataset.makes(),
                &filters.selected_makes,
                &mut state.make_search,
            );
            if action.clear {
                state.clear_makes();
            }
            for (make, selected) in action.toggled {
                state.set_make_selected(&make, selected);
            }
            ui.separator();

            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

#[derive(Default)]
struct MultiSelectAction {
    toggled: Vec<(String, bool)>,
    clear: bool,
}

/// Searchable checkbox list. An empty selection means "no restriction".
fn multiselect(
    ui: &mut Ui,
    label: &str,
    options: &BTreeSet<String>,
    selected: &BTreeSet<String>,
    search: &mut String,
) -> MultiSelectAction {
    let mut action = MultiSelectAction::default();

    let summary = if selected.is_empty() {
        "all".to_string()
    } else {
        format!("{}/{}", selected.len(), options.len())
    };

    egui::CollapsingHeader::new(RichText::new(format!("{label}  ({summary})")).strong())
        .id_salt(label)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.add(
                    TextEdit::singleline(search)
                        .hint_text("Search…")
                        .desired_width(120.0),
                );
                if ui.small_button("Clear").clicked() {
                    action.clear = true;
                }
            });

            // Selected values first so they stay reachable while searching.
            let needle = search.to_lowercase();
            let visible: Vec<&String> = selected
                .iter()
                .chain(options.iter().filter(|o| !selected.contains(*o)))
                .filter(|o| needle.is_empty() || o.to_lowercase().contains(&needle))
                .collect();

            let row_height = ui.spacing().interact_size.y;
            ScrollArea::vertical()
                .id_salt(format!("{label}_list"))
                .max_height(200.0)
                .show_rows(ui, row_height, visible.len(), |ui: &mut Ui, rows| {
                    for value in &visible[rows] {
                        let mut checked = selected.contains(*value);
                        if ui.checkbox(&mut checked, value.as_str()).changed() {
                            action.toggled.push(((*value).clone(), checked));
                        }
                    }
                });
        });

    action
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.dataset.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        if let Some(total) = state.dataset.as_ref().map(|ds| ds.len()) {
            let visible = state.dashboard().map(|d| d.visible_rows).unwrap_or(0);
            ui.label(format!("{total} registrations loaded, {visible} visible"));
            if let Some(path) = state.source_path() {
                ui.label(RichText::new(path.display().to_string()).weak());
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let start_dir = state
        .source_path()
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf());

    if let Some(path) = pick_dataset_file(start_dir.as_deref()) {
        state.open(&path);
    }
}
