/// Data layer: core types, loading, filtering, aggregation and chart
/// descriptions.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  stations + date window → new Table
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌───────────┐  ┌──────────┐
///   │ aggregate  │  │  series   │  Table → ChartSpec
///   └───────────┘  └──────────┘
/// ```

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod series;

pub use aggregate::{column_mean, group_box_stats, group_mean, Aggregation, BoxStats, GroupSummary};
pub use error::DataError;
pub use filter::{filter, filtered_indices, FilterCriteria};
pub use loader::{load_file, load_file_with, LoadOptions};
pub use model::{GroupBy, Measure, Record, Table};
pub use series::{build_box_plot, build_scatter, build_series, Axis, ChartKind, ChartSpec, Frequency, Series, SeriesOptions};
