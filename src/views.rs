use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::data::{
    build_box_plot, build_scatter, build_series, column_mean, filter, group_mean, Aggregation, Axis,
    ChartSpec, DataError, FilterCriteria, Frequency, GroupBy, Measure, SeriesOptions, Table,
};

// ---------------------------------------------------------------------------
// User selection
// ---------------------------------------------------------------------------

/// Everything the user can pick in the side panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Empty means all stations.
    pub stations: BTreeSet<String>,
    /// Inclusive calendar-date window; `None` disables date filtering.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Weather parameter plotted against PM2.5.
    pub weather_parameter: Measure,
    pub time_agg: Frequency,
    pub aggregation: Aggregation,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            stations: BTreeSet::new(),
            date_range: None,
            weather_parameter: Measure::Temp,
            time_agg: Frequency::Day,
            aggregation: Aggregation::Mean,
        }
    }
}

impl Selection {
    pub fn criteria(&self) -> FilterCriteria {
        let criteria = FilterCriteria {
            stations: self.stations.clone(),
            ..Default::default()
        };
        match self.date_range {
            Some((start, end)) => criteria.between_dates(start, end),
            None => criteria,
        }
    }
}

// ---------------------------------------------------------------------------
// Computed views
// ---------------------------------------------------------------------------

/// Scalar metrics shown above the charts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insight {
    pub mean_pm25: Option<f64>,
    pub most_polluted: Option<String>,
    pub least_polluted: Option<String>,
}

/// All dashboard outputs for one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardViews {
    pub row_count: usize,
    pub insight: Insight,
    pub no2_trend: ChartSpec,
    pub weather_scatter: ChartSpec,
    pub pm25_box: ChartSpec,
    pub pm25_trend: ChartSpec,
}

impl DashboardViews {
    /// Filter `source` by `selection` and derive every view from the result.
    pub fn compute(source: &Table, selection: &Selection) -> Self {
        let filtered = filter(source, &selection.criteria());
        let by_station = GroupBy::Station;

        let station_means = group_mean(&filtered, &by_station, Measure::Pm25);
        let insight = Insight {
            mean_pm25: column_mean(&filtered, Measure::Pm25),
            most_polluted: placeholder_on_empty(station_means.argmax()),
            least_polluted: placeholder_on_empty(station_means.argmin()),
        };

        let no2_trend = build_series(
            &filtered,
            Axis::Timestamp,
            Measure::No2,
            &SeriesOptions::default()
                .grouped_by(by_station.clone())
                .labels("NO2 trend across stations", "Time", "NO2 concentration"),
        );

        let weather_scatter = build_scatter(
            &filtered,
            selection.weather_parameter,
            Measure::Pm25,
            Some(&by_station),
        );

        let pm25_box = build_box_plot(&filtered, &by_station, Measure::Pm25);

        let pm25_trend = build_series(
            &filtered,
            Axis::Timestamp,
            Measure::Pm25,
            &SeriesOptions::default()
                .resampled(selection.time_agg, selection.aggregation)
                .labels(
                    format!("PM2.5 pollution trend ({})", selection.time_agg),
                    "Time",
                    "PM2.5",
                ),
        );

        log::debug!(
            "Recomputed views over {} of {} records",
            filtered.len(),
            source.len()
        );

        DashboardViews {
            row_count: filtered.len(),
            insight,
            no2_trend,
            weather_scatter,
            pm25_box,
            pm25_trend,
        }
    }
}

fn placeholder_on_empty(result: Result<&str, DataError>) -> Option<String> {
    match result {
        Ok(key) => Some(key.to_string()),
        Err(e) => {
            log::debug!("No station ranking: {e}");
            None
        }
    }
}
