// ============================================================
// Layer 6 — Probe Report Logger
// ============================================================
// Records one row per `probe` run to a CSV file.
//
// Columns:
//   - batch:      number of series in the random batch
//   - q_len:      encoder sequence length after the input encoder
//   - params:     number of learned scalars in the model
//   - elapsed_ms: wall time of the forward pass
//   - min / max / mean of the output tensor
//   - finite:     false if any output value was NaN or infinite
//
// Output file: {dir}/probe.csv
//
// Example CSV output:
//   batch,q_len,params,elapsed_ms,min,max,mean,finite
//   4,50,232961,12.804000,-1.203411,1.190022,0.004317,true

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const HEADER: &str = "batch,q_len,params,elapsed_ms,min,max,mean,finite";

/// Summary of one forward pass over random input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub batch:      usize,
    pub q_len:      usize,
    pub params:     usize,
    pub elapsed_ms: f64,
    pub min:        f64,
    pub max:        f64,
    pub mean:       f64,
    pub finite:     bool,
}

impl ProbeReport {
    /// Fold raw output values into min / max / mean.
    /// An empty slice reports zeros.
    pub fn from_values(
        values:     &[f32],
        batch:      usize,
        q_len:      usize,
        params:     usize,
        elapsed_ms: f64,
    ) -> Self {
        let finite = values.iter().all(|v| v.is_finite());
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &v| {
                let v = v as f64;
                (lo.min(v), hi.max(v), sum + v)
            },
        );

        let (min, max, mean) = if values.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (min, max, sum / values.len() as f64)
        };

        Self { batch, q_len, params, elapsed_ms, min, max, mean, finite }
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{},{},{:.6},{:.6},{:.6},{:.6},{}",
            self.batch,
            self.q_len,
            self.params,
            self.elapsed_ms,
            self.min,
            self.max,
            self.mean,
            self.finite,
        )
    }
}

/// Appends probe reports to `{dir}/probe.csv`.
pub struct ReportLogger {
    csv_path: PathBuf,
}

impl ReportLogger {
    /// Create the directory and write the header if the file is new.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create report directory '{}'", dir.display()))?;

        let csv_path = dir.join("probe.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created probe report: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, report: &ProbeReport) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", report.csv_row())?;

        tracing::debug!(
            "Logged probe: batch={}, elapsed={:.3}ms",
            report.batch,
            report.elapsed_ms,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let r = ProbeReport::from_values(&[-1.0, 0.5, 2.5], 1, 3, 10, 1.0);
        assert_eq!(r.min, -1.0);
        assert_eq!(r.max, 2.5);
        assert!((r.mean - 2.0 / 3.0).abs() < 1e-9);
        assert!(r.finite);
    }

    #[test]
    fn test_nan_marks_report_not_finite() {
        let r = ProbeReport::from_values(&[0.0, f32::NAN], 1, 2, 1, 0.0);
        assert!(!r.finite);
    }

    #[test]
    fn test_empty_values_report_zeros() {
        let r = ProbeReport::from_values(&[], 0, 0, 0, 0.0);
        assert_eq!((r.min, r.max, r.mean), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_log_appends_rows_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ReportLogger::new(dir.path()).unwrap();
        let r = ProbeReport::from_values(&[1.0, 3.0], 2, 5, 7, 0.25);
        logger.log(&r).unwrap();

        // A second logger on the same directory must not rewrite the header.
        let again = ReportLogger::new(dir.path()).unwrap();
        again.log(&r).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "2,5,7,0.250000,1.000000,3.000000,2.000000,true");
        assert_eq!(lines[1], lines[2]);
    }
}
