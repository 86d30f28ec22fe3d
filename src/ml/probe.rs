// ============================================================
// Layer 5 — Prober
// ============================================================
// Builds a model from a TstConfig and runs it on random
// standard-normal input. Used by the `describe` and `probe`
// commands; the rest of the crate never picks a backend.

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::Distribution};
use std::time::{Duration, Instant};

use crate::domain::mode::ForwardMode;
use crate::ml::{
    attention::causal_mask,
    model::{Tst, TstConfig},
};

#[cfg(not(feature = "wgpu"))]
pub type ProbeBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type ProbeBackend = burn::backend::Wgpu;

/// Raw result of one forward pass.
#[derive(Debug, Clone)]
pub struct ProbeSample {
    pub dims:    [usize; 3],
    pub values:  Vec<f32>,
    pub elapsed: Duration,
}

pub struct Prober<B: Backend> {
    model:  Tst<B>,
    device: B::Device,
}

impl<B: Backend> Prober<B> {
    /// Seeds the backend RNG (when given) before initialising parameters,
    /// so the same seed reproduces the same weights and inputs.
    pub fn new(cfg: &TstConfig, device: B::Device, seed: Option<u64>) -> Result<Self> {
        if let Some(seed) = seed {
            B::seed(seed);
        }
        let model = cfg.init::<B>(&device).context("Cannot build model from config")?;
        tracing::info!(
            "Model ready: q_len={}, {} parameters",
            model.q_len(),
            model.num_params()
        );
        Ok(Self { model, device })
    }

    pub fn model(&self) -> &Tst<B> {
        &self.model
    }

    /// One timed forward pass over `batch` random series.
    pub fn run(&self, batch: usize, causal: bool, mode: ForwardMode) -> Result<ProbeSample> {
        let module = self.model.module();
        let x = Tensor::<B, 3>::random(
            [batch, module.c_in, module.seq_len],
            Distribution::Normal(0.0, 1.0),
            &self.device,
        );
        let mask = causal.then(|| causal_mask::<B>(self.model.q_len(), &self.device));

        let start = Instant::now();
        let y = self.model.forward(x, mask, mode)?;
        let dims = y.dims();
        let values = y
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read output tensor: {e:?}"))?;
        let elapsed = start.elapsed();

        tracing::debug!("Forward {:?} took {:?}", dims, elapsed);
        Ok(ProbeSample { dims, values, elapsed })
    }
}
