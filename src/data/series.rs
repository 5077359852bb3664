use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::aggregate::{group_box_stats, partition, Aggregation, BoxStats};
use super::model::{GroupBy, Measure, Record, Table};

// ---------------------------------------------------------------------------
// Resampling frequency
// ---------------------------------------------------------------------------

/// Time bucket used to resample a series before plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hour,
    Day,
    Month,
    Year,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Hour,
        Frequency::Day,
        Frequency::Month,
        Frequency::Year,
    ];

    /// Start of the bucket containing `ts`.
    pub fn floor(self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        let start = match self {
            Frequency::Hour => return date.and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts),
            Frequency::Day => Some(date),
            Frequency::Month => date.with_day(1),
            Frequency::Year => date.with_day(1).and_then(|d| d.with_month(1)),
        };
        start.map_or(ts, |d| d.and_time(NaiveTime::MIN))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Hour => "hour",
            Frequency::Day => "day",
            Frequency::Month => "month",
            Frequency::Year => "year",
        };
        f.write_str(name)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::ALL
            .into_iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown frequency '{s}' (expected hour, day, month or year)"))
    }
}

// ---------------------------------------------------------------------------
// Time ↔ plot coordinate
// ---------------------------------------------------------------------------

/// Time axes carry seconds since the Unix epoch, with microsecond fractions.
pub fn time_to_x(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp_micros() as f64 / 1e6
}

pub fn x_to_time(x: f64) -> Option<NaiveDateTime> {
    if !x.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((x * 1e6).round() as i64).map(|dt| dt.naive_utc())
}

// ---------------------------------------------------------------------------
// Chart description
// ---------------------------------------------------------------------------

/// Column used for the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Timestamp,
    Measure(Measure),
}

impl Axis {
    fn value(self, record: &Record) -> Option<f64> {
        match self {
            Axis::Timestamp => Some(time_to_x(record.timestamp)),
            Axis::Measure(m) => record.get(m),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Scatter,
    Box,
}

/// One labelled sequence of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<[f64; 2]>,
}

/// A rendering-agnostic description of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: Option<String>,
    /// X values are [`time_to_x`] seconds.
    pub x_is_time: bool,
    pub series: Vec<Series>,
    /// Per-group summaries, only for [`ChartKind::Box`].
    pub boxes: Vec<(String, BoxStats)>,
}

impl ChartSpec {
    fn new(kind: ChartKind, title: String, x_label: String, y_label: String) -> Self {
        ChartSpec {
            kind,
            title,
            x_label,
            y_label,
            legend_title: None,
            x_is_time: false,
            series: Vec::new(),
            boxes: Vec::new(),
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty()) && self.boxes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Line series
// ---------------------------------------------------------------------------

/// Optional knobs for [`build_series`].
#[derive(Debug, Clone, Default)]
pub struct SeriesOptions {
    pub group_by: Option<GroupBy>,
    pub freq: Option<Frequency>,
    pub aggregation: Aggregation,
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

impl SeriesOptions {
    pub fn grouped_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn resampled(mut self, freq: Frequency, aggregation: Aggregation) -> Self {
        self.freq = Some(freq);
        self.aggregation = aggregation;
        self
    }

    pub fn labels(mut self, title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self.x_label = Some(x_label.into());
        self.y_label = Some(y_label.into());
        self
    }
}

/// Describe a line chart of `y` against `x`.
///
/// Without a group there is a single series labelled `Data`; with one,
/// a series per distinct group value in order of first appearance. Every
/// series is ordered by x. When `freq` is set and x is the timestamp,
/// y is aggregated per time bucket and plotted at the bucket start.
/// Rows with a missing x or y are skipped.
pub fn build_series(table: &Table, x: Axis, y: Measure, options: &SeriesOptions) -> ChartSpec {
    let mut chart = ChartSpec::new(
        ChartKind::Line,
        options.title.clone().unwrap_or_else(|| "Data distribution".to_string()),
        options.x_label.clone().unwrap_or_else(|| "Time".to_string()),
        options.y_label.clone().unwrap_or_else(|| "Value".to_string()),
    );
    chart.x_is_time = x == Axis::Timestamp;

    let freq = match (options.freq, x) {
        (Some(freq), Axis::Timestamp) => Some(freq),
        (Some(freq), Axis::Measure(m)) => {
            log::debug!("Ignoring {freq} resampling for non-time axis {m}");
            None
        }
        (None, _) => None,
    };

    let points_for = |records: &[&Record]| match freq {
        Some(freq) => resample(records, y, freq, options.aggregation),
        None => sorted_points(records, x, y),
    };

    chart.series = match &options.group_by {
        Some(group_by) => {
            chart.legend_title = Some("Group".to_string());
            partition(table, group_by)
                .into_iter()
                .map(|(label, records)| Series {
                    label,
                    points: points_for(&records),
                })
                .collect()
        }
        None => {
            let records: Vec<&Record> = table.records().iter().collect();
            vec![Series {
                label: "Data".to_string(),
                points: points_for(&records),
            }]
        }
    };
    chart
}

fn sorted_points(records: &[&Record], x: Axis, y: Measure) -> Vec<[f64; 2]> {
    let mut points: Vec<[f64; 2]> = records
        .iter()
        .filter_map(|r| Some([x.value(r)?, r.get(y)?]))
        .collect();
    // Stable: equal x keep table order.
    points.sort_by(|a, b| a[0].total_cmp(&b[0]));
    points
}

fn resample(records: &[&Record], y: Measure, freq: Frequency, aggregation: Aggregation) -> Vec<[f64; 2]> {
    let mut buckets: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(value) = record.get(y) {
            buckets
                .entry(freq.floor(record.timestamp))
                .or_default()
                .push(value);
        }
    }
    buckets
        .into_iter()
        .filter_map(|(start, values)| Some([time_to_x(start), aggregation.apply(&values)?]))
        .collect()
}

// ---------------------------------------------------------------------------
// Scatter and box charts
// ---------------------------------------------------------------------------

/// Describe a scatter of `y` against `x`, one series per group when given.
pub fn build_scatter(table: &Table, x: Measure, y: Measure, group_by: Option<&GroupBy>) -> ChartSpec {
    let mut chart = ChartSpec::new(
        ChartKind::Scatter,
        format!("Relationship of {x} with {y}"),
        x.to_string(),
        y.to_string(),
    );
    let pairs = |records: &[&Record]| -> Vec<[f64; 2]> {
        records
            .iter()
            .filter_map(|r| Some([r.get(x)?, r.get(y)?]))
            .collect()
    };

    chart.series = match group_by {
        Some(group_by) => {
            chart.legend_title = Some(group_by.to_string());
            partition(table, group_by)
                .into_iter()
                .map(|(label, records)| Series {
                    label,
                    points: pairs(&records),
                })
                .collect()
        }
        None => {
            let records: Vec<&Record> = table.records().iter().collect();
            vec![Series {
                label: "Data".to_string(),
                points: pairs(&records),
            }]
        }
    };
    chart
}

/// Describe the distribution of `measure` per group as box plots.
pub fn build_box_plot(table: &Table, group_by: &GroupBy, measure: Measure) -> ChartSpec {
    let mut chart = ChartSpec::new(
        ChartKind::Box,
        format!("{measure} distribution by {group_by}"),
        group_by.to_string(),
        format!("{measure} concentration"),
    );
    chart.boxes = group_box_stats(table, group_by, measure);
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, month, day)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn table(rows: &[(&str, NaiveDateTime, Option<f64>)]) -> Table {
        Table::new(
            vec!["station".into(), "timestamp".into(), "PM2.5".into(), "TEMP".into()],
            rows.iter()
                .map(|&(s, ts, v)| {
                    Record::new(s, ts)
                        .with(Measure::Pm25, v)
                        .with(Measure::Temp, v.map(|v| v / 10.0))
                })
                .collect(),
        )
    }

    #[test]
    fn sub_second_timestamps_sort_in_time_order() {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let late = base.and_hms_milli_opt(0, 0, 0, 700).unwrap();
        let early = base.and_hms_milli_opt(0, 0, 0, 200).unwrap();
        let t = table(&[("A", late, Some(7.0)), ("A", early, Some(2.0))]);
        let chart = build_series(&t, Axis::Timestamp, Measure::Pm25, &SeriesOptions::default());

        let points = &chart.series[0].points;
        let ys: Vec<f64> = points.iter().map(|p| p[1]).collect();
        assert_eq!(ys, [2.0, 7.0]);
        assert!(points[0][0] < points[1][0]);
        assert_eq!(x_to_time(points[0][0]), Some(early));
        assert_eq!(x_to_time(points[1][0]), Some(late));
    }

    #[test]
    fn single_series_is_sorted_by_time() {
        let t = table(&[("A", at(1, 2, 0), Some(2.0)), ("A", at(1, 1, 0), Some(1.0))]);
        let chart = build_series(&t, Axis::Timestamp, Measure::Pm25, &SeriesOptions::default());

        assert_eq!(chart.kind, ChartKind::Line);
        assert!(chart.x_is_time);
        assert_eq!(chart.legend_title, None);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].label, "Data");
        assert_eq!(
            chart.series[0].points,
            vec![[time_to_x(at(1, 1, 0)), 1.0], [time_to_x(at(1, 2, 0)), 2.0]]
        );
        // Input untouched.
        assert_eq!(t.records()[0].timestamp, at(1, 2, 0));
    }

    #[test]
    fn grouped_series_follow_first_appearance() {
        let t = table(&[
            ("B", at(1, 3, 0), Some(3.0)),
            ("A", at(1, 2, 0), Some(2.0)),
            ("B", at(1, 1, 0), Some(1.0)),
            ("A", at(1, 1, 0), None),
        ]);
        let options = SeriesOptions::default()
            .grouped_by(GroupBy::Station)
            .labels("NO2 trend", "Time", "NO2");
        let chart = build_series(&t, Axis::Timestamp, Measure::Pm25, &options);

        assert_eq!(chart.title, "NO2 trend");
        assert_eq!(chart.legend_title.as_deref(), Some("Group"));
        let labels: Vec<&str> = chart.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["B", "A"]);
        let b_y: Vec<f64> = chart.series[0].points.iter().map(|p| p[1]).collect();
        assert_eq!(b_y, [1.0, 3.0]);
        assert_eq!(chart.series[1].points.len(), 1);
    }

    #[test]
    fn resamples_by_day_with_mean() {
        let t = table(&[
            ("A", at(1, 1, 3), Some(10.0)),
            ("A", at(1, 2, 5), Some(5.0)),
            ("A", at(1, 1, 20), Some(20.0)),
            ("A", at(1, 1, 21), None),
        ]);
        let options = SeriesOptions::default().resampled(Frequency::Day, Aggregation::Mean);
        let chart = build_series(&t, Axis::Timestamp, Measure::Pm25, &options);

        let day = |d| NaiveDate::from_ymd_opt(2021, 1, d).unwrap().and_time(NaiveTime::MIN);
        assert_eq!(
            chart.series[0].points,
            vec![[time_to_x(day(1)), 15.0], [time_to_x(day(2)), 5.0]]
        );
    }

    #[test]
    fn resamples_by_month_per_group() {
        let t = table(&[
            ("A", at(1, 5, 0), Some(1.0)),
            ("B", at(2, 5, 0), Some(7.0)),
            ("A", at(1, 25, 0), Some(3.0)),
            ("A", at(3, 1, 0), Some(9.0)),
        ]);
        let options = SeriesOptions::default()
            .grouped_by(GroupBy::Station)
            .resampled(Frequency::Month, Aggregation::Max);
        let chart = build_series(&t, Axis::Timestamp, Measure::Pm25, &options);

        let month = |m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap().and_time(NaiveTime::MIN);
        assert_eq!(
            chart.series[0].points,
            vec![[time_to_x(month(1)), 3.0], [time_to_x(month(3)), 9.0]]
        );
        assert_eq!(chart.series[1].points, vec![[time_to_x(month(2)), 7.0]]);
    }

    #[test]
    fn frequency_floors() {
        let ts = at(7, 14, 9);
        assert_eq!(Frequency::Hour.floor(ts), NaiveDate::from_ymd_opt(2021, 7, 14).unwrap().and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(Frequency::Day.floor(ts), NaiveDate::from_ymd_opt(2021, 7, 14).unwrap().and_time(NaiveTime::MIN));
        assert_eq!(Frequency::Month.floor(ts), NaiveDate::from_ymd_opt(2021, 7, 1).unwrap().and_time(NaiveTime::MIN));
        assert_eq!(Frequency::Year.floor(ts), NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_time(NaiveTime::MIN));
        assert_eq!("Month".parse::<Frequency>(), Ok(Frequency::Month));
        assert!("week".parse::<Frequency>().is_err());
    }

    #[test]
    fn measure_axis_ignores_frequency() {
        let t = table(&[("A", at(1, 1, 0), Some(30.0)), ("A", at(1, 1, 1), Some(10.0))]);
        let options = SeriesOptions::default().resampled(Frequency::Year, Aggregation::Mean);
        let chart = build_series(&t, Axis::Measure(Measure::Temp), Measure::Pm25, &options);
        assert!(!chart.x_is_time);
        assert_eq!(chart.series[0].points, vec![[1.0, 10.0], [3.0, 30.0]]);
    }

    #[test]
    fn empty_table_gives_empty_chart() {
        let chart = build_series(&Table::default(), Axis::Timestamp, Measure::No2, &SeriesOptions::default());
        assert!(chart.is_empty());
        let grouped = build_series(
            &Table::default(),
            Axis::Timestamp,
            Measure::No2,
            &SeriesOptions::default().grouped_by(GroupBy::Station),
        );
        assert!(grouped.series.is_empty());
    }

    #[test]
    fn scatter_pairs_present_values_per_group() {
        let t = table(&[
            ("A", at(1, 1, 0), Some(20.0)),
            ("B", at(1, 1, 0), None),
            ("B", at(1, 2, 0), Some(40.0)),
        ]);
        let chart = build_scatter(&t, Measure::Temp, Measure::Pm25, Some(&GroupBy::Station));
        assert_eq!(chart.kind, ChartKind::Scatter);
        assert_eq!(chart.title, "Relationship of TEMP with PM2.5");
        assert_eq!(chart.series[0].points, vec![[2.0, 20.0]]);
        assert_eq!(chart.series[1].points, vec![[4.0, 40.0]]);
    }

    #[test]
    fn box_plot_lists_groups_with_values() {
        let t = table(&[("A", at(1, 1, 0), Some(1.0)), ("B", at(1, 1, 0), Some(2.0))]);
        let chart = build_box_plot(&t, &GroupBy::Station, Measure::Pm25);
        assert_eq!(chart.kind, ChartKind::Box);
        assert_eq!(chart.boxes.len(), 2);
        assert!(!chart.is_empty());
    }

    #[test]
    fn time_coordinates_round_trip() {
        let ts = at(3, 4, 5);
        assert_eq!(x_to_time(time_to_x(ts)), Some(ts));
        assert_eq!(x_to_time(f64::NAN), None);
    }
}
