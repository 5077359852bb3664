use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Timelike};
use clap::Parser;

/// Write a synthetic multi-station air-quality CSV.
#[derive(Debug, Parser)]
#[command(about)]
struct Cli {
    /// Output CSV path.
    #[arg(long, default_value = "all_tabeldf.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of days of hourly data per station.
    #[arg(long, default_value_t = 60)]
    days: u32,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Per-station baseline: (name, PM2.5 level, NO2 level).
const STATIONS: [(&str, f64, f64); 3] = [
    ("Aotizhongxin", 85.0, 60.0),
    ("Dongsi", 90.0, 55.0),
    ("Huairou", 65.0, 30.0),
];

const WIND_DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

const HEADER: [&str; 19] = [
    "No", "year", "month", "day", "hour", "PM2.5", "PM10", "SO2", "NO2", "CO", "O3", "TEMP",
    "PRES", "DEWP", "RAIN", "wd", "WSPM", "station", "timestamp",
];

/// Format a measurement; ~2% come out as `NA`, like real station exports.
fn cell(rng: &mut SimpleRng, value: f64) -> String {
    if rng.next_f64() < 0.02 {
        "NA".to_string()
    } else {
        format!("{:.1}", value.max(0.0))
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let mut rng = SimpleRng::new(args.seed);

    let start = NaiveDate::from_ymd_opt(2013, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start date")?;
    let hours = i64::from(args.days) * 24;

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    writer.write_record(HEADER)?;

    let mut row_id = 0u64;
    for (station, pm25_base, no2_base) in STATIONS {
        let mut wd_idx = 0usize;
        for h in 0..hours {
            let ts = start + Duration::hours(h);
            let daily = (2.0 * std::f64::consts::PI * f64::from(ts.hour()) / 24.0).sin();
            let seasonal = f64::from(ts.ordinal()) / 365.0;

            let temp = 5.0 + 20.0 * seasonal + 6.0 * daily + rng.gauss(0.0, 1.5);
            let wspm = rng.gauss(2.0, 1.0).abs();
            let pm25 = pm25_base * (1.2 - 0.15 * wspm).max(0.2) + rng.gauss(0.0, 15.0);
            let no2 = no2_base - 8.0 * daily + rng.gauss(0.0, 8.0);
            let rain = if rng.next_f64() < 0.05 { rng.gauss(2.0, 1.5).abs() } else { 0.0 };
            if rng.next_f64() < 0.1 {
                wd_idx = (wd_idx + 1) % WIND_DIRECTIONS.len();
            }

            row_id += 1;
            let record = [
                row_id.to_string(),
                ts.year().to_string(),
                ts.month().to_string(),
                ts.day().to_string(),
                ts.hour().to_string(),
                cell(&mut rng, pm25),
                cell(&mut rng, pm25 * 1.3),
                cell(&mut rng, no2 / 4.0),
                cell(&mut rng, no2),
                cell(&mut rng, 800.0 + 10.0 * pm25),
                cell(&mut rng, 60.0 - 0.4 * no2 + 10.0 * daily),
                format!("{temp:.1}"),
                format!("{:.1}", 1015.0 - 10.0 * seasonal + rng.gauss(0.0, 3.0)),
                format!("{:.1}", temp - 12.0 + rng.gauss(0.0, 2.0)),
                format!("{rain:.1}"),
                WIND_DIRECTIONS[wd_idx].to_string(),
                format!("{wspm:.1}"),
                station.to_string(),
                ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            ];
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;

    println!(
        "Wrote {row_id} rows ({} stations × {hours} hours) to {}",
        STATIONS.len(),
        args.output.display()
    );
    Ok(())
}
