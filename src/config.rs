use std::fmt::Debug;
use std::ops::RangeBounds;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{Aggregation, Frequency, LoadOptions, Measure};

/// Dashboard startup configuration.
///
/// Loaded from a TOML file; every field is optional. See
/// [`DashboardConfig::from_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Dataset opened at startup.
    pub data_path: PathBuf,
    /// Field delimiter for delimited files; inferred from the extension when unset.
    pub delimiter: Option<char>,

    /// Weather parameter initially plotted against PM2.5.
    pub default_parameter: Measure,
    /// Initial resampling bucket of the PM2.5 trend.
    pub default_time_agg: Frequency,
    /// How each resampling bucket is collapsed.
    pub aggregation: Aggregation,

    pub window_width: f32,
    pub window_height: f32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("all_tabeldf.csv"),
            delimiter: None,
            default_parameter: Measure::Temp,
            default_time_agg: Frequency::Day,
            aggregation: Aggregation::Mean,
            window_width: 1200.0,
            window_height: 800.0,
        }
    }
}

impl DashboardConfig {
    /// Load a [`DashboardConfig`] from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is out of range.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = std::fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {file:?}"))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(text).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(d) = self.delimiter {
            if !d.is_ascii() || d == '"' || d == '\n' || d == '\r' {
                bail!("delimiter must be a single ASCII character other than a quote or newline, but is {d:?}");
            }
        }
        if !Measure::WEATHER.contains(&self.default_parameter) {
            bail!(
                "default parameter must be one of {:?}, but is {}",
                Measure::WEATHER.map(Measure::column_name),
                self.default_parameter
            );
        }
        check_num(self.window_width, 300.0..=8000.0).context("invalid window width")?;
        check_num(self.window_height, 200.0..=8000.0).context("invalid window height")?;
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            // Validated as ASCII above.
            delimiter: self.delimiter.map(|d| d as u8),
        }
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
