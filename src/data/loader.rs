use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use super::error::DataError;
use super::model::{Measure, Record, Table};

pub const STATION_COLUMN: &str = "station";
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Cell texts treated as a missing measure value.
const MISSING_MARKERS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Overrides for delimited input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Field delimiter; `None` picks one from the file extension.
    pub delimiter: Option<u8>,
}

/// Load a measurement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – comma-delimited with a header row
/// * `.tsv`          – tab-delimited with a header row
/// * `.json`         – `[{ "station": "...", "timestamp": "...", "PM2.5": 12.0, ... }, ...]`
pub fn load_file(path: &Path) -> Result<Table, DataError> {
    load_file_with(path, LoadOptions::default())
}

pub fn load_file_with(path: &Path, options: LoadOptions) -> Result<Table, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "json" => load_json(path)?,
        "tsv" => load_delimited(path, options.delimiter.unwrap_or(b'\t'))?,
        "csv" | "txt" => load_delimited(path, options.delimiter.unwrap_or(b','))?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };

    log::info!(
        "Loaded {} records for {} stations from {}",
        table.len(),
        table.stations().len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Delimited loader
// ---------------------------------------------------------------------------

/// Header row with column names, one measurement per row.
/// `station` and `timestamp` are required; known measure columns are
/// parsed as numbers, everything else is kept as text.
fn load_delimited(path: &Path, delimiter: u8) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|e| DataError::Io(path.to_path_buf(), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(BufReader::new(file));

    let csv_err = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let layout = ColumnLayout::from_headers(&headers)?;
    let mut unparsed = 0usize;
    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = result.map_err(csv_err)?;
        let row_no = i + 1;

        let raw_ts = row.get(layout.timestamp).unwrap_or("");
        let mut record = Record::new(
            row.get(layout.station).unwrap_or(""),
            parse_timestamp_cell(raw_ts, row_no)?,
        );

        for (col_idx, cell) in row.iter().enumerate() {
            match layout.roles[col_idx] {
                ColumnRole::Station | ColumnRole::Timestamp => {}
                ColumnRole::Measure(m) => {
                    let value = parse_measure(cell);
                    if value.is_none() && !is_missing_marker(cell) {
                        unparsed += 1;
                    }
                    record.set(m, value);
                }
                ColumnRole::Extra => {
                    record.extra.insert(headers[col_idx].clone(), cell.to_string());
                }
            }
        }
        records.push(record);
    }

    if unparsed > 0 {
        log::warn!(
            "{unparsed} non-numeric measure cells in {} treated as missing",
            path.display()
        );
    }

    Ok(Table::new(headers, records))
}

#[derive(Debug, Clone, Copy)]
enum ColumnRole {
    Station,
    Timestamp,
    Measure(Measure),
    Extra,
}

/// Role of each header column, resolved once per file.
struct ColumnLayout {
    station: usize,
    timestamp: usize,
    roles: Vec<ColumnRole>,
}

impl ColumnLayout {
    fn from_headers(headers: &[String]) -> Result<Self, DataError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };
        let station = position(STATION_COLUMN)?;
        let timestamp = position(TIMESTAMP_COLUMN)?;

        let roles = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == station {
                    ColumnRole::Station
                } else if i == timestamp {
                    ColumnRole::Timestamp
                } else {
                    Measure::ALL
                        .into_iter()
                        .find(|m| m.column_name() == h)
                        .map_or(ColumnRole::Extra, ColumnRole::Measure)
                }
            })
            .collect();

        Ok(ColumnLayout {
            station,
            timestamp,
            roles,
        })
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|e| DataError::Io(path.to_path_buf(), e))?;
    let rows: Vec<serde_json::Map<String, JsonValue>> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DataError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, obj) in rows.iter().enumerate() {
        let row_no = i + 1;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }

        let station = obj
            .get(STATION_COLUMN)
            .map(json_to_text)
            .ok_or_else(|| DataError::MissingColumn(STATION_COLUMN.to_string()))?;
        let raw_ts = obj
            .get(TIMESTAMP_COLUMN)
            .map(json_to_text)
            .ok_or_else(|| DataError::MissingColumn(TIMESTAMP_COLUMN.to_string()))?;

        let mut record = Record::new(station, parse_timestamp_cell(&raw_ts, row_no)?);
        for (key, val) in obj {
            if key == STATION_COLUMN || key == TIMESTAMP_COLUMN {
                continue;
            }
            match Measure::ALL.into_iter().find(|m| m.column_name() == key) {
                Some(m) => record.set(m, json_to_f64(val)),
                None => {
                    record.extra.insert(key.clone(), json_to_text(val));
                }
            }
        }
        records.push(record);
    }

    Ok(Table::new(columns, records))
}

fn json_to_f64(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_measure(s),
        _ => None,
    }
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

fn parse_timestamp_cell(raw: &str, row: usize) -> Result<NaiveDateTime, DataError> {
    parse_timestamp(raw).ok_or_else(|| DataError::Parse {
        row,
        value: raw.to_string(),
    })
}

/// Parse the timestamp forms found in exported station data.
///
/// Offsets in RFC 3339 input are normalized to UTC; date-only values map
/// to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_measure(cell: &str) -> Option<f64> {
    let s = cell.trim();
    if is_missing_marker(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn is_missing_marker(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn loads_csv_with_measures_and_extras() {
        let file = write_temp(
            "csv",
            "No,station,timestamp,PM2.5,NO2,TEMP,wd\n\
             1,Aotizhongxin,2013-03-01 00:00:00,4.0,7.0,-0.7,NNW\n\
             2,Wanliu,2013-03-01 01:00:00,NA,,1.5,N\n",
        );
        let table = load_file(file.path()).expect("load csv");

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.columns(),
            ["No", "station", "timestamp", "PM2.5", "NO2", "TEMP", "wd"]
        );
        let first = &table.records()[0];
        assert_eq!(first.station, "Aotizhongxin");
        assert_eq!(first.timestamp, ymd_hms(2013, 3, 1, 0, 0, 0));
        assert_eq!(first.get(Measure::Pm25), Some(4.0));
        assert_eq!(first.get(Measure::Temp), Some(-0.7));
        assert_eq!(first.extra.get("wd").map(String::as_str), Some("NNW"));
        assert_eq!(first.extra.get("No").map(String::as_str), Some("1"));

        let second = &table.records()[1];
        assert_eq!(second.get(Measure::Pm25), None);
        assert_eq!(second.get(Measure::No2), None);
        assert_eq!(second.get(Measure::So2), None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io(..)), "{err:?}");
    }

    #[test]
    fn bad_timestamp_fails_the_whole_load() {
        let file = write_temp(
            "csv",
            "station,timestamp,PM2.5\nA,2020-01-01,1\nB,not a date,2\n",
        );
        match load_file(file.path()) {
            Err(DataError::Parse { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "not a date");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_station_column_is_reported() {
        let file = write_temp("csv", "site,timestamp\nA,2020-01-01\n");
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "station"));
    }

    #[test]
    fn tsv_and_delimiter_override() {
        let tsv = write_temp("tsv", "station\ttimestamp\tO3\nA\t2020-01-01 05:00\t33\n");
        let table = load_file(tsv.path()).expect("load tsv");
        assert_eq!(table.records()[0].get(Measure::O3), Some(33.0));
        assert_eq!(table.records()[0].timestamp, ymd_hms(2020, 1, 1, 5, 0, 0));

        let semi = write_temp("csv", "station;timestamp;CO\nA;2020-01-01;300\n");
        let table = load_file_with(
            semi.path(),
            LoadOptions {
                delimiter: Some(b';'),
            },
        )
        .expect("load semicolon csv");
        assert_eq!(table.records()[0].get(Measure::Co), Some(300.0));
    }

    #[test]
    fn loads_records_oriented_json() {
        let file = write_temp(
            "json",
            r#"[
                {"station": "A", "timestamp": "2020-01-01T00:00:00", "PM2.5": 10, "wd": "E"},
                {"station": "B", "timestamp": "2020-01-02", "PM2.5": null, "wd": null}
            ]"#,
        );
        let table = load_file(file.path()).expect("load json");
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get(Measure::Pm25), Some(10.0));
        assert_eq!(table.records()[1].get(Measure::Pm25), None);
        assert_eq!(table.records()[1].extra.get("wd").map(String::as_str), Some(""));
    }

    #[test]
    fn json_columns_keep_file_order() {
        let file = write_temp(
            "json",
            r#"[{"timestamp": "2020-01-01", "station": "A", "zeta": "x", "PM2.5": 1}]"#,
        );
        let table = load_file(file.path()).expect("load json");
        assert_eq!(table.columns(), ["timestamp", "station", "zeta", "PM2.5"]);
    }

    #[test]
    fn ragged_row_is_csv_error() {
        let file = write_temp(
            "csv",
            "station,timestamp,NO2\nA,2020-01-01 00:00,1\nA,2020-01-01 01:00,2,extra\n",
        );
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Csv { .. }), "{err:?}");
    }

    #[test]
    fn malformed_json_is_json_error() {
        let file = write_temp("json", r#"[{"station": "A", "timestamp": "2020-01-01""#);
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Json { .. }), "{err:?}");
    }

    #[test]
    fn unsupported_extension() {
        let file = write_temp("parquet", "");
        assert!(matches!(
            load_file(file.path()),
            Err(DataError::UnsupportedFormat(ext)) if ext == "parquet"
        ));
    }

    #[test]
    fn timestamp_forms() {
        let expected = ymd_hms(2014, 7, 9, 13, 0, 0);
        assert_eq!(parse_timestamp("2014-07-09 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2014-07-09T13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2014-07-09 13:00"), Some(expected));
        assert_eq!(parse_timestamp("2014/07/09 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2014-07-09T15:00:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2014-07-09"),
            Some(ymd_hms(2014, 7, 9, 0, 0, 0))
        );
        assert_eq!(parse_timestamp("09-07-2014"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
