// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and their flags:
//   `init-config`, `describe`, `probe`
//
// Every command shares ModelArgs. A model is described either
// by `--config <file.json>` or by `--c-in/--c-out/--seq-len`;
// any other flag overrides the corresponding config field.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::probe_use_case::ProbeOptions;
use crate::domain::{activation::ActivationKind, mode::ForwardMode, traits::ConfigSource};
use crate::infra::config_store::ConfigStore;
use crate::ml::{input::ConvResamplingConfig, model::TstConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a model config JSON file from flags
    InitConfig(InitConfigArgs),

    /// Build the model and print its architecture
    Describe(ModelArgs),

    /// Time one forward pass over random input
    Probe(ProbeArgs),
}

/// Model hyperparameters. Unset flags keep the config file's value,
/// or the model default when no file is given.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Start from this config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of input channels (required without --config)
    #[arg(long)]
    pub c_in: Option<usize>,

    /// Number of output channels per time step (required without --config)
    #[arg(long)]
    pub c_out: Option<usize>,

    /// Time steps per series (required without --config)
    #[arg(long)]
    pub seq_len: Option<usize>,

    /// Resample to this many steps when seq_len is longer
    #[arg(long)]
    pub max_seq_len: Option<usize>,

    #[arg(long)]
    pub d_model: Option<usize>,

    /// d_model must be divisible by n_heads
    #[arg(long)]
    pub n_heads: Option<usize>,

    #[arg(long)]
    pub d_k: Option<usize>,

    #[arg(long)]
    pub d_v: Option<usize>,

    #[arg(long)]
    pub d_ff: Option<usize>,

    /// Residual dropout in the encoder
    #[arg(long)]
    pub dropout: Option<f64>,

    /// relu or gelu
    #[arg(long)]
    pub activation: Option<ActivationKind>,

    #[arg(long)]
    pub n_layers: Option<usize>,

    /// Dropout before the head's linear layer
    #[arg(long)]
    pub fc_dropout: Option<f64>,

    /// Lower bound of the output range
    #[arg(long, requires = "y_high")]
    pub y_low: Option<f64>,

    /// Upper bound of the output range
    #[arg(long, requires = "y_low")]
    pub y_high: Option<f64>,

    /// Kernel size of a custom input convolution
    #[arg(long)]
    pub conv_kernel: Option<usize>,

    #[arg(long, default_value_t = 1)]
    pub conv_stride: usize,

    #[arg(long, default_value_t = 0)]
    pub conv_padding: usize,

    #[arg(long, default_value_t = 1)]
    pub conv_dilation: usize,

    #[arg(long, default_value_t = 1)]
    pub conv_groups: usize,

    /// Drop the custom convolution's bias
    #[arg(long)]
    pub conv_no_bias: bool,

    /// Reject batches of any other size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl ModelArgs {
    fn base_config(&self) -> Result<TstConfig> {
        if let Some(path) = &self.config {
            return ConfigStore::new(path).load();
        }
        let missing = |flag: &str| anyhow!("--{flag} is required when --config is not given");
        Ok(TstConfig::new(
            self.c_in.ok_or_else(|| missing("c-in"))?,
            self.c_out.ok_or_else(|| missing("c-out"))?,
            self.seq_len.ok_or_else(|| missing("seq-len"))?,
        ))
    }

    fn resampling(&self) -> Option<ConvResamplingConfig> {
        self.conv_kernel.map(|kernel| {
            ConvResamplingConfig::new(kernel)
                .with_stride(self.conv_stride)
                .with_padding(self.conv_padding)
                .with_dilation(self.conv_dilation)
                .with_groups(self.conv_groups)
                .with_bias(!self.conv_no_bias)
        })
    }
}

impl ConfigSource<TstConfig> for ModelArgs {
    fn load_config(&self) -> Result<TstConfig> {
        let mut cfg = self.base_config()?;

        if let Some(v) = self.c_in        { cfg.c_in = v; }
        if let Some(v) = self.c_out       { cfg.c_out = v; }
        if let Some(v) = self.seq_len     { cfg.seq_len = v; }
        if let Some(v) = self.d_model     { cfg.d_model = v; }
        if let Some(v) = self.n_heads     { cfg.n_heads = v; }
        if let Some(v) = self.d_ff        { cfg.d_ff = v; }
        if let Some(v) = self.dropout     { cfg.dropout = v; }
        if let Some(v) = self.activation  { cfg.activation = v; }
        if let Some(v) = self.n_layers    { cfg.n_layers = v; }
        if let Some(v) = self.fc_dropout  { cfg.fc_dropout = v; }
        if self.max_seq_len.is_some()     { cfg.max_seq_len = self.max_seq_len; }
        if self.d_k.is_some()             { cfg.d_k = self.d_k; }
        if self.d_v.is_some()             { cfg.d_v = self.d_v; }
        if self.batch_size.is_some()      { cfg.batch_size = self.batch_size; }
        if let (Some(low), Some(high)) = (self.y_low, self.y_high) {
            cfg.y_range = Some((low, high));
        }
        if let Some(conv) = self.resampling() {
            cfg.resampling = Some(conv);
        }

        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Where to write the JSON file
    #[arg(long, default_value = "tst_config.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of random series in the batch
    #[arg(long, default_value_t = 4)]
    pub batch: usize,

    /// Seed for weights and input
    #[arg(long)]
    pub seed: Option<u64>,

    /// Block attention to future steps
    #[arg(long)]
    pub causal: bool,

    /// Run in train mode (dropout on, batch statistics)
    #[arg(long)]
    pub train: bool,

    /// Append a row to <DIR>/probe.csv
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

/// Convert CLI ProbeArgs into the application-layer options.
/// The application layer never sees clap types.
impl From<&ProbeArgs> for ProbeOptions {
    fn from(a: &ProbeArgs) -> Self {
        ProbeOptions {
            batch:      a.batch,
            seed:       a.seed,
            causal:     a.causal,
            mode:       if a.train { ForwardMode::Train } else { ForwardMode::Eval },
            report_dir: a.report_dir.clone(),
        }
    }
}
