// ============================================================
// Layer 2 — ProbeUseCase
// ============================================================
// Runs the model on random input and summarises the output:
//
//   Step 1: Resolve the config       (Layer 6 or Layer 1)
//   Step 2: Build the model          (Layer 5)
//   Step 3: Timed forward pass       (Layer 5)
//   Step 4: Fold output statistics   (Layer 6)
//   Step 5: Append CSV row, optional (Layer 6)

use anyhow::{ensure, Result};
use std::path::PathBuf;

use crate::domain::{mode::ForwardMode, traits::ConfigSource};
use crate::infra::report::{ProbeReport, ReportLogger};
use crate::ml::{
    model::TstConfig,
    probe::{ProbeBackend, Prober},
};

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub batch:      usize,
    pub seed:       Option<u64>,
    pub causal:     bool,
    pub mode:       ForwardMode,
    pub report_dir: Option<PathBuf>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            batch:      4,
            seed:       None,
            causal:     false,
            mode:       ForwardMode::Eval,
            report_dir: None,
        }
    }
}

pub struct ProbeUseCase<S> {
    source:  S,
    options: ProbeOptions,
}

impl<S: ConfigSource<TstConfig>> ProbeUseCase<S> {
    pub fn new(source: S, options: ProbeOptions) -> Self {
        Self { source, options }
    }

    pub fn execute(&self) -> Result<ProbeReport> {
        let opts = &self.options;
        ensure!(opts.batch > 0, "batch must be at least 1");

        let cfg    = self.source.load_config()?;
        let prober = Prober::<ProbeBackend>::new(&cfg, Default::default(), opts.seed)?;
        let sample = prober.run(opts.batch, opts.causal, opts.mode)?;

        let report = ProbeReport::from_values(
            &sample.values,
            sample.dims[0],
            prober.model().q_len(),
            prober.model().num_params(),
            sample.elapsed.as_secs_f64() * 1e3,
        );
        if !report.finite {
            tracing::warn!("Output contains non-finite values");
        }

        if let Some(dir) = &opts.report_dir {
            let logger = ReportLogger::new(dir)?;
            logger.log(&report)?;
            tracing::info!("Appended probe report to '{}'", logger.csv_path().display());
        }

        Ok(report)
    }
}
