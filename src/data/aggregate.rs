use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DataError;
use super::model::{GroupBy, Measure, Record, Table};

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partition records by group value, groups in order of first appearance.
/// Records without a group value are dropped.
pub(crate) fn partition<'a>(table: &'a Table, group_by: &GroupBy) -> Vec<(String, Vec<&'a Record>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Record>)> = Vec::new();

    for record in table.records() {
        let Some(key) = record.group_value(group_by) else {
            continue;
        };
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key.to_string(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }
    groups
}

fn values_of(records: &[&Record], measure: Measure) -> Vec<f64> {
    records.iter().filter_map(|r| r.get(measure)).collect()
}

// ---------------------------------------------------------------------------
// Aggregation functions
// ---------------------------------------------------------------------------

/// How a bucket of values collapses to one number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
    Median,
}

impl Aggregation {
    /// `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let result = match self {
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                quantile(&sorted, 0.5)
            }
        };
        Some(result)
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Median => "median",
        };
        f.write_str(name)
    }
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

// ---------------------------------------------------------------------------
// GroupSummary – one scalar per group
// ---------------------------------------------------------------------------

/// Group key → aggregate, in first-encounter order of the groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    entries: Vec<(String, f64)>,
}

impl GroupSummary {
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key of the largest value. NaN entries are skipped; ties go to the
    /// group encountered first.
    pub fn argmax(&self) -> Result<&str, DataError> {
        self.pick(|candidate, best| candidate > best)
    }

    /// Key of the smallest value, same rules as [`GroupSummary::argmax`].
    pub fn argmin(&self) -> Result<&str, DataError> {
        self.pick(|candidate, best| candidate < best)
    }

    fn pick(&self, better: impl Fn(f64, f64) -> bool) -> Result<&str, DataError> {
        let mut best: Option<(&str, f64)> = None;
        for (key, value) in &self.entries {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if !better(*value, b) => {}
                _ => best = Some((key.as_str(), *value)),
            }
        }
        best.map(|(key, _)| key).ok_or(DataError::EmptyInput)
    }
}

impl FromIterator<(String, f64)> for GroupSummary {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        GroupSummary {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Mean of `measure` per group, ignoring missing values. A group with no
/// values maps to NaN.
pub fn group_mean(table: &Table, group_by: &GroupBy, measure: Measure) -> GroupSummary {
    partition(table, group_by)
        .into_iter()
        .map(|(key, records)| {
            let mean = Aggregation::Mean
                .apply(&values_of(&records, measure))
                .unwrap_or(f64::NAN);
            (key, mean)
        })
        .collect()
}

/// Mean of every non-missing value of `measure`.
pub fn column_mean(table: &Table, measure: Measure) -> Option<f64> {
    let values: Vec<f64> = table.records().iter().filter_map(|r| r.get(measure)).collect();
    Aggregation::Mean.apply(&values)
}

// ---------------------------------------------------------------------------
// Box statistics
// ---------------------------------------------------------------------------

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    /// Values beyond 1.5 IQR from the quartiles.
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Compute from raw values; NaN is ignored. `None` when nothing remains.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let fence = 1.5 * (q3 - q1);
        let (lo_fence, hi_fence) = (q1 - fence, q3 + fence);

        let lower_whisker = sorted.iter().copied().find(|v| *v >= lo_fence).unwrap_or(q1);
        let upper_whisker = sorted.iter().rev().copied().find(|v| *v <= hi_fence).unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| !(lo_fence..=hi_fence).contains(v))
            .collect();

        Some(BoxStats {
            count: sorted.len(),
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            outliers,
        })
    }
}

/// Box statistics of `measure` per group; groups without values are left out.
pub fn group_box_stats(table: &Table, group_by: &GroupBy, measure: Measure) -> Vec<(String, BoxStats)> {
    partition(table, group_by)
        .into_iter()
        .filter_map(|(key, records)| {
            BoxStats::compute(&values_of(&records, measure)).map(|stats| (key, stats))
        })
        .collect()
}
