use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::{load_file_with, Frequency, LoadOptions, Measure, Table};
use crate::views::{DashboardViews, Selection};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Table>,

    /// Station names in first-appearance order, computed once per dataset.
    pub stations: Vec<String>,

    /// File the dataset came from.
    pub source_path: Option<PathBuf>,

    /// Current user selection.
    pub selection: Selection,

    /// Date picker values; only applied while `date_filter_enabled`.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub date_filter_enabled: bool,

    /// Views for the current selection (cached).
    pub views: Option<DashboardViews>,

    /// Station colours, fixed per dataset.
    pub color_map: ColorMap,

    pub load_options: LoadOptions,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            dataset: None,
            stations: Vec::new(),
            source_path: None,
            selection: Selection {
                weather_parameter: config.default_parameter,
                time_agg: config.default_time_agg,
                aggregation: config.aggregation,
                ..Default::default()
            },
            start_date: today,
            end_date: today,
            date_filter_enabled: false,
            views: None,
            color_map: ColorMap::default(),
            load_options: config.load_options(),
            status_message: None,
        }
    }

    /// Load `path`, replacing the current dataset. Failures leave the
    /// previous dataset in place and are reported in the status bar.
    pub fn open(&mut self, path: &Path) {
        match self.try_open(path) {
            Ok(()) => self.status_message = None,
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    fn try_open(&mut self, path: &Path) -> Result<()> {
        let table = load_file_with(path, self.load_options)
            .with_context(|| format!("loading {}", path.display()))?;
        self.source_path = Some(path.to_path_buf());
        self.set_dataset(table);
        Ok(())
    }

    /// Ingest a newly loaded dataset, reset selections and colours.
    pub fn set_dataset(&mut self, dataset: Table) {
        if let Some((first, last)) = dataset.time_span() {
            self.start_date = first.date();
            self.end_date = last.date();
        }
        self.selection.stations.clear();
        self.date_filter_enabled = false;
        self.stations = dataset.stations();
        self.color_map = ColorMap::new(&self.stations);
        self.dataset = Some(dataset);
        self.recompute();
    }

    /// Recompute all views after a selection change.
    pub fn recompute(&mut self) {
        self.selection.date_range = self
            .date_filter_enabled
            .then_some((self.start_date, self.end_date));
        self.views = self
            .dataset
            .as_ref()
            .map(|ds| DashboardViews::compute(ds, &self.selection));
    }

    /// Toggle a single station in the selection.
    pub fn toggle_station(&mut self, station: &str) {
        if !self.selection.stations.remove(station) {
            self.selection.stations.insert(station.to_string());
        }
        self.recompute();
    }

    /// Clear the station selection, which shows every station.
    pub fn select_all_stations(&mut self) {
        self.selection.stations.clear();
        self.recompute();
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.start_date = start;
        self.end_date = end;
        self.recompute();
    }

    pub fn set_date_filter_enabled(&mut self, enabled: bool) {
        self.date_filter_enabled = enabled;
        self.recompute();
    }

    pub fn set_weather_parameter(&mut self, measure: Measure) {
        self.selection.weather_parameter = measure;
        self.recompute();
    }

    pub fn set_time_agg(&mut self, freq: Frequency) {
        self.selection.time_agg = freq;
        self.recompute();
    }
}
