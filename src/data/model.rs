use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Measure – the known numeric columns of an air-quality record
// ---------------------------------------------------------------------------

/// A numeric pollutant or weather column.
///
/// Columns are looked up by name once, at load time. Everything downstream
/// selects values through this enum instead of by string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Measure {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "O3")]
    O3,
    #[serde(rename = "TEMP")]
    Temp,
    #[serde(rename = "PRES")]
    Pres,
    #[serde(rename = "DEWP")]
    Dewp,
    #[serde(rename = "RAIN")]
    Rain,
    #[serde(rename = "WSPM")]
    Wspm,
}

impl Measure {
    pub const COUNT: usize = 11;

    pub const ALL: [Measure; Measure::COUNT] = [
        Measure::Pm25,
        Measure::Pm10,
        Measure::So2,
        Measure::No2,
        Measure::Co,
        Measure::O3,
        Measure::Temp,
        Measure::Pres,
        Measure::Dewp,
        Measure::Rain,
        Measure::Wspm,
    ];

    /// Weather parameters offered for the pollution relationship chart.
    pub const WEATHER: [Measure; 5] = [
        Measure::Temp,
        Measure::Rain,
        Measure::Pres,
        Measure::Dewp,
        Measure::Wspm,
    ];

    /// Column header used in the source file.
    pub fn column_name(self) -> &'static str {
        match self {
            Measure::Pm25 => "PM2.5",
            Measure::Pm10 => "PM10",
            Measure::So2 => "SO2",
            Measure::No2 => "NO2",
            Measure::Co => "CO",
            Measure::O3 => "O3",
            Measure::Temp => "TEMP",
            Measure::Pres => "PRES",
            Measure::Dewp => "DEWP",
            Measure::Rain => "RAIN",
            Measure::Wspm => "WSPM",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Measure::Pm25
            | Measure::Pm10
            | Measure::So2
            | Measure::No2
            | Measure::Co
            | Measure::O3 => "µg/m³",
            Measure::Temp | Measure::Dewp => "°C",
            Measure::Pres => "hPa",
            Measure::Rain => "mm",
            Measure::Wspm => "m/s",
        }
    }

    /// Position of this measure in a record's value array.
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Measure::ALL
            .into_iter()
            .find(|m| m.column_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown measure column '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the measurement table
// ---------------------------------------------------------------------------

/// One station measurement at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub station: String,
    pub timestamp: NaiveDateTime,
    /// Measure values indexed by [`Measure`]; `None` is a missing value.
    values: [Option<f64>; Measure::COUNT],
    /// Every other column, verbatim: column_name → cell text.
    pub extra: BTreeMap<String, String>,
}

impl Record {
    pub fn new(station: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Record {
            station: station.into(),
            timestamp,
            values: [None; Measure::COUNT],
            extra: BTreeMap::new(),
        }
    }

    /// Builder-style setter used by the loaders and tests.
    pub fn with(mut self, measure: Measure, value: Option<f64>) -> Self {
        self.set(measure, value);
        self
    }

    pub fn get(&self, measure: Measure) -> Option<f64> {
        self.values[measure.index()]
    }

    pub fn set(&mut self, measure: Measure, value: Option<f64>) {
        // NaN in the source is the same thing as an empty cell.
        self.values[measure.index()] = value.filter(|v| !v.is_nan());
    }

    /// Value of the grouping column for this record, if present and non-empty.
    pub fn group_value<'a>(&'a self, group_by: &GroupBy) -> Option<&'a str> {
        let value = match group_by {
            GroupBy::Station => self.station.as_str(),
            GroupBy::Column(col) => self.extra.get(col)?.as_str(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

// ---------------------------------------------------------------------------
// GroupBy – categorical column selector
// ---------------------------------------------------------------------------

/// Which categorical column partitions the records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupBy {
    Station,
    /// A pass-through column, looked up by header name.
    Column(String),
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::Station => write!(f, "station"),
            GroupBy::Column(col) => write!(f, "{col}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// An ordered set of records sharing one schema. Row order is file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
    /// Header columns in file order.
    columns: Vec<String>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Table { records, columns }
    }

    /// A table with the same schema as `self` holding `records`.
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Table {
            records,
            columns: self.columns.clone(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Distinct station identifiers in order of first appearance.
    pub fn stations(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.station.as_str()))
            .map(|r| r.station.clone())
            .collect()
    }

    /// Earliest and latest timestamp, or `None` for an empty table.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.records.first()?.timestamp;
        Some(self.records.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.timestamp), hi.max(r.timestamp))
        }))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn measure_parses_from_column_name() {
        assert_eq!("PM2.5".parse::<Measure>(), Ok(Measure::Pm25));
        assert_eq!("wspm".parse::<Measure>(), Ok(Measure::Wspm));
        assert!("wd".parse::<Measure>().is_err());
    }

    #[test]
    fn nan_is_stored_as_missing() {
        let r = Record::new("A", ts(1)).with(Measure::No2, Some(f64::NAN));
        assert_eq!(r.get(Measure::No2), None);
    }

    #[test]
    fn stations_keep_first_appearance_order() {
        let table = Table::new(
            vec!["station".into(), "timestamp".into()],
            vec![
                Record::new("Wanliu", ts(1)),
                Record::new("Aotizhongxin", ts(1)),
                Record::new("Wanliu", ts(2)),
            ],
        );
        assert_eq!(table.stations(), vec!["Wanliu", "Aotizhongxin"]);
        assert_eq!(table.time_span(), Some((ts(1), ts(2))));
    }

    #[test]
    fn group_value_skips_empty_cells() {
        let mut r = Record::new("A", ts(1));
        r.extra.insert("wd".into(), String::new());
        assert_eq!(r.group_value(&GroupBy::Column("wd".into())), None);
        assert_eq!(r.group_value(&GroupBy::Column("missing".into())), None);
        assert_eq!(r.group_value(&GroupBy::Station), Some("A"));
    }
}
