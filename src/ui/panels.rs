use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::{Frequency, Measure};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter Data");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Taken out so the closures below can mutate the rest of the state.
    let stations = std::mem::take(&mut state.stations);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Stations ----
            let n_selected = state.selection.stations.len();
            let header_text = if n_selected == 0 {
                format!("Stations  (all {})", stations.len())
            } else {
                format!("Stations  ({n_selected}/{})", stations.len())
            };

            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("stations")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        state.select_all_stations();
                    }
                    for station in &stations {
                        let mut checked = state.selection.stations.contains(station);
                        let text = RichText::new(station).color(state.color_map.color_for(station));
                        if ui.checkbox(&mut checked, text).changed() {
                            state.toggle_station(station);
                        }
                    }
                });
            ui.separator();

            // ---- Date range ----
            let mut enabled = state.date_filter_enabled;
            if ui.checkbox(&mut enabled, "Filter by date").changed() {
                state.set_date_filter_enabled(enabled);
            }
            let mut start = state.start_date;
            let mut end = state.end_date;
            ui.add_enabled_ui(state.date_filter_enabled, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("Start date");
                    ui.add(DatePickerButton::new(&mut start).id_salt("start_date"));
                });
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("End date");
                    ui.add(DatePickerButton::new(&mut end).id_salt("end_date"));
                });
            });
            if start != state.start_date || end != state.end_date {
                state.set_date_range(start, end);
            }
            ui.separator();

            // ---- Weather parameter ----
            ui.strong("Weather parameter");
            let current = state.selection.weather_parameter;
            egui::ComboBox::from_id_salt("weather_parameter")
                .selected_text(current.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for measure in Measure::WEATHER {
                        if ui
                            .selectable_label(current == measure, measure.column_name())
                            .clicked()
                        {
                            state.set_weather_parameter(measure);
                        }
                    }
                });
            ui.separator();

            // ---- Time aggregation ----
            ui.strong("Time aggregation");
            let current = state.selection.time_agg;
            egui::ComboBox::from_id_salt("time_agg")
                .selected_text(current.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for freq in Frequency::ALL {
                        if ui
                            .selectable_label(current == freq, freq.to_string())
                            .clicked()
                        {
                            state.set_time_agg(freq);
                        }
                    }
                });
        });
    state.stations = stations;
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
        });

        ui.separator();

        if let (Some(ds), Some(views)) = (&state.dataset, &state.views) {
            ui.label(format!(
                "{} records loaded, {} selected",
                ds.len(),
                views.row_count
            ));
        }

        if let Some(path) = &state.source_path {
            ui.separator();
            ui.label(RichText::new(path.display().to_string()).weak());
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
    let file = rfd::FileDialog::new()
        .set_title("Open air-quality data")
        .add_filter("Supported files", &["csv", "tsv", "txt", "json"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("TSV", &["tsv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}
