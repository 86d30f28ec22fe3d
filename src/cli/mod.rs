// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `init-config` — writes a model config JSON file
//   2. `describe`    — builds the model and prints its shape
//   3. `probe`       — times a forward pass on random input
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InitConfigArgs, ModelArgs, ProbeArgs};

use crate::domain::traits::ConfigSource;

#[derive(Parser, Debug)]
#[command(
    name = "tst",
    version,
    about = "Build and probe a Time Series Transformer (TST) encoder."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::InitConfig(args) => run_init_config(args),
            Commands::Describe(args)   => run_describe(args),
            Commands::Probe(args)      => run_probe(args),
        }
    }
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    use crate::infra::config_store::ConfigStore;
    use crate::ml::probe::ProbeBackend;

    let cfg = args.model.load_config()?;
    // Build once so an unusable config is never written.
    cfg.init::<ProbeBackend>(&Default::default())?;

    let store = ConfigStore::new(&args.out);
    store.save(&cfg)?;
    println!("Wrote model config to {}", store.path().display());
    Ok(())
}

fn run_describe(args: ModelArgs) -> Result<()> {
    use crate::application::describe_use_case::DescribeUseCase;

    let summary = DescribeUseCase::new(args).execute()?;
    println!("{summary}");
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    use crate::application::probe_use_case::ProbeUseCase;

    tracing::info!("Probing with batch size {}", args.batch);
    let options = (&args).into();
    let report = ProbeUseCase::new(args.model, options).execute()?;

    println!("output  : [{}, c_out, seq_len], q_len={}", report.batch, report.q_len);
    println!("elapsed : {:.3} ms", report.elapsed_ms);
    println!(
        "values  : min={:.6} max={:.6} mean={:.6} finite={}",
        report.min, report.max, report.mean, report.finite
    );
    Ok(())
}
