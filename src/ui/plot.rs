use eframe::egui::{Color32, RichText, ScrollArea, Ui};
use egui_plot::{BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoint, PlotPoints, Points};

use crate::color::ColorMap;
use crate::data::series::x_to_time;
use crate::data::{ChartKind, ChartSpec, Measure};
use crate::state::AppState;

const PLOT_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render metrics and charts for the current selection.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(views) = &state.views else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view air-quality data  (File → Open…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Air Quality Dashboard - Insight");
            ui.add_space(4.0);

            let insight = &views.insight;
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Average PM2.5");
                let text = insight
                    .mean_pm25
                    .map(|v| format!("{v:.2} {}", Measure::Pm25.unit()))
                    .unwrap_or_else(|| "–".to_string());
                ui.label(RichText::new(text).size(22.0).strong());
            });
            ui.label(format!(
                "Station with the highest pollution: {}",
                insight.most_polluted.as_deref().unwrap_or("–")
            ));
            ui.label(format!(
                "Station with the lowest pollution: {}",
                insight.least_polluted.as_deref().unwrap_or("–")
            ));
            ui.separator();

            ui.heading("NO2 pollutant concentration");
            chart(ui, "no2_trend", &views.no2_trend, &state.color_map);
            ui.separator();

            ui.heading("Weather parameters vs pollution level");
            chart(ui, "weather_scatter", &views.weather_scatter, &state.color_map);
            ui.separator();

            ui.heading("PM2.5 distribution per station");
            chart(ui, "pm25_box", &views.pm25_box, &state.color_map);
            ui.separator();

            ui.heading("Pollution trend over time");
            chart(ui, "pm25_trend", &views.pm25_trend, &state.color_map);
        });
}

// ---------------------------------------------------------------------------
// ChartSpec rendering
// ---------------------------------------------------------------------------

/// Draw one [`ChartSpec`] with egui_plot. Series colours come from the
/// station colour map; the ungrouped series is light blue.
pub fn chart(ui: &mut Ui, id: &str, spec: &ChartSpec, colors: &ColorMap) {
    ui.strong(&spec.title);
    if spec.is_empty() {
        ui.label(RichText::new("No data for the current selection.").italics());
        return;
    }

    let color_of = |label: &str| match label {
        "Data" => Color32::LIGHT_BLUE,
        other => colors.color_for(other),
    };

    let mut plot = Plot::new(id)
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label(spec.x_label.clone())
        .y_axis_label(spec.y_label.clone())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true);

    if spec.x_is_time {
        plot = plot
            .x_axis_formatter(|mark, _range| format_time(mark.value, "%Y-%m-%d"))
            .label_formatter(|name: &str, value: &PlotPoint| {
                let when = format_time(value.x, "%Y-%m-%d %H:%M");
                if name.is_empty() {
                    format!("{when}\n{:.2}", value.y)
                } else {
                    format!("{name}\n{when}\n{:.2}", value.y)
                }
            });
    }

    if spec.kind == ChartKind::Box {
        let names: Vec<String> = spec.boxes.iter().map(|(name, _)| name.clone()).collect();
        plot = plot.x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
                return String::new();
            }
            names.get(idx as usize).cloned().unwrap_or_default()
        });
    }

    plot.show(ui, |plot_ui| match spec.kind {
        ChartKind::Line => {
            for series in &spec.series {
                let points: PlotPoints = series.points.clone().into();
                plot_ui.line(
                    Line::new(points)
                        .name(&series.label)
                        .color(color_of(series.label.as_str()))
                        .width(1.5),
                );
            }
        }
        ChartKind::Scatter => {
            for series in &spec.series {
                let points: PlotPoints = series.points.clone().into();
                plot_ui.points(
                    Points::new(points)
                        .name(&series.label)
                        .color(color_of(series.label.as_str()))
                        .radius(2.0),
                );
            }
        }
        ChartKind::Box => {
            for (i, (name, stats)) in spec.boxes.iter().enumerate() {
                let x = i as f64;
                let color = color_of(name.as_str());
                let spread = BoxSpread::new(
                    stats.lower_whisker,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.upper_whisker,
                );
                let elem = BoxElem::new(x, spread)
                    .name(name)
                    .box_width(0.6)
                    .whisker_width(0.3);
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(name).color(color));

                if !stats.outliers.is_empty() {
                    let outliers: PlotPoints = stats.outliers.iter().map(|&y| [x, y]).collect();
                    plot_ui.points(Points::new(outliers).name(name).color(color).radius(1.5));
                }
            }
        }
    });
}

fn format_time(x: f64, fmt: &str) -> String {
    x_to_time(x)
        .map(|t| t.format(fmt).to_string())
        .unwrap_or_default()
}
