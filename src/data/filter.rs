use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::model::{Record, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which stations and which time window
// ---------------------------------------------------------------------------

/// Row selection for the dashboard views.
///
/// An empty station set means "all stations". The date window only applies
/// when both `start` and `end` are set; a half-open window filters nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub stations: BTreeSet<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl FilterCriteria {
    pub fn for_stations<I, S>(stations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterCriteria {
            stations: stations.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Inclusive calendar-date window: from the first instant of
    /// `start_date` to the last instant of `end_date`.
    pub fn between_dates(self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let start = start_date.and_time(NaiveTime::MIN);
        let end = end_date.and_time(
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN),
        );
        self.between(start, end)
    }

    /// Both bounds, if and only if both are set.
    fn window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.start?, self.end?))
    }

    /// Whether `record` passes every active condition.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.stations.is_empty() && !self.stations.contains(&record.station) {
            return false;
        }
        match self.window() {
            Some((start, end)) => start <= record.timestamp && record.timestamp <= end,
            None => true,
        }
    }
}

/// Return indices of records that pass the filter, in table order.
pub fn filtered_indices(table: &Table, criteria: &FilterCriteria) -> Vec<usize> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| criteria.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Copy the matching records into a new table. The source is left untouched;
/// an empty result is a valid table.
pub fn filter(table: &Table, criteria: &FilterCriteria) -> Table {
    let kept: Vec<Record> = table
        .records()
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();

    log::debug!(
        "Filter kept {} of {} records ({} stations selected, window {:?}..{:?})",
        kept.len(),
        table.len(),
        criteria.stations.len(),
        criteria.start,
        criteria.end
    );
    table.with_records(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Measure;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample() -> Table {
        Table::new(
            vec!["station".into(), "timestamp".into(), "PM2.5".into()],
            vec![
                Record::new("A", at(1, 0)).with(Measure::Pm25, Some(10.0)),
                Record::new("B", at(2, 0)).with(Measure::Pm25, Some(30.0)),
                Record::new("C", at(3, 12)).with(Measure::Pm25, None),
                Record::new("A", at(4, 6)).with(Measure::Pm25, Some(20.0)),
            ],
        )
    }

    #[test]
    fn station_filter_keeps_only_members() {
        let table = sample();
        let out = filter(&table, &FilterCriteria::for_stations(["A"]));
        assert_eq!(out.len(), 2);
        assert!(out.records().iter().all(|r| r.station == "A"));
        assert_eq!(out.records()[0], table.records()[0]);
        assert_eq!(out.records()[1], table.records()[3]);
    }

    #[test]
    fn empty_station_set_keeps_everything() {
        let table = sample();
        assert_eq!(filter(&table, &FilterCriteria::default()), table);
    }

    #[test]
    fn date_window_is_inclusive_on_both_ends() {
        let table = sample();
        let criteria = FilterCriteria::default().between(at(2, 0), at(3, 12));
        let out = filter(&table, &criteria);
        let stations: Vec<&str> = out.records().iter().map(|r| r.station.as_str()).collect();
        assert_eq!(stations, ["B", "C"]);
        assert!(out
            .records()
            .iter()
            .all(|r| at(2, 0) <= r.timestamp && r.timestamp <= at(3, 12)));
    }

    #[test]
    fn half_open_window_does_not_filter_dates() {
        let table = sample();
        let only_start = FilterCriteria {
            start: Some(at(3, 0)),
            ..Default::default()
        };
        let only_end = FilterCriteria {
            end: Some(at(1, 0)),
            ..Default::default()
        };
        assert_eq!(filter(&table, &only_start), table);
        assert_eq!(filter(&table, &only_end), table);
    }

    #[test]
    fn station_and_dates_compose_with_and() {
        let table = sample();
        let criteria = FilterCriteria::for_stations(["A", "B"]).between(at(2, 0), at(4, 23));
        let idx = filtered_indices(&table, &criteria);
        assert_eq!(idx, vec![1, 3]);
    }

    #[test]
    fn date_window_covers_whole_end_day() {
        let table = sample();
        let day = NaiveDate::from_ymd_opt(2020, 1, 4).unwrap();
        let out = filter(&table, &FilterCriteria::default().between_dates(day, day));
        assert_eq!(out.len(), 1);
        assert_eq!(out.records()[0].timestamp, at(4, 6));
    }

    #[test]
    fn filtering_is_idempotent() {
        let table = sample();
        let criteria = FilterCriteria::for_stations(["B", "C"]).between(at(1, 0), at(3, 0));
        let once = filter(&table, &criteria);
        assert_eq!(filter(&once, &criteria), once);
    }

    #[test]
    fn no_match_yields_empty_table() {
        let table = sample();
        let out = filter(&table, &FilterCriteria::for_stations(["Z"]));
        assert!(out.is_empty());
        assert_eq!(out.columns(), table.columns());
    }
}
