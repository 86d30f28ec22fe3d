// ============================================================
// Layer 2 — DescribeUseCase
// ============================================================
// Builds the model a config describes and reports what was
// actually constructed: which input encoder won, the encoder
// sequence length and the parameter count.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::domain::traits::ConfigSource;
use crate::ml::{
    model::TstConfig,
    probe::{ProbeBackend, Prober},
};

/// What a TstConfig turns into once initialised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub c_in:       usize,
    pub c_out:      usize,
    pub seq_len:    usize,
    pub q_len:      usize,
    pub input:      &'static str,
    pub d_model:    usize,
    pub n_heads:    usize,
    pub n_layers:   usize,
    pub activation: String,
    pub head_nf:    usize,
    pub num_params: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input      : [batch, {}, {}] via {} encoder", self.c_in, self.seq_len, self.input)?;
        writeln!(f, "encoder    : {} layers, d_model={}, n_heads={}, q_len={}",
            self.n_layers, self.d_model, self.n_heads, self.q_len)?;
        writeln!(f, "activation : {}", self.activation)?;
        writeln!(f, "head       : {} → {}", self.head_nf, self.c_out * self.seq_len)?;
        writeln!(f, "output     : [batch, {}, {}]", self.c_out, self.seq_len)?;
        write!(f, "parameters : {}", self.num_params)
    }
}

pub struct DescribeUseCase<S> {
    source: S,
}

impl<S: ConfigSource<TstConfig>> DescribeUseCase<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn execute(&self) -> Result<ModelSummary> {
        let cfg    = self.source.load_config()?;
        let prober = Prober::<ProbeBackend>::new(&cfg, Default::default(), None)?;
        let model  = prober.model();
        let module = model.module();

        Ok(ModelSummary {
            c_in:       cfg.c_in,
            c_out:      cfg.c_out,
            seq_len:    cfg.seq_len,
            q_len:      model.q_len(),
            input:      module.input.variant_name(),
            d_model:    cfg.d_model,
            n_heads:    cfg.n_heads,
            n_layers:   module.encoder.len(),
            activation: cfg.activation.to_string(),
            head_nf:    module.head.head_nf,
            num_params: model.num_params(),
        })
    }
}
