// ============================================================
// Layer 5 — Batch-style Normalisation over (batch, time)
// ============================================================
// The encoder normalises each of the d_model feature channels
// with statistics taken jointly over the batch AND time axes,
// i.e. BatchNorm1d applied to [batch, d_model, time]. This is
// not LayerNorm: a single timestep is never normalised on its
// own.
//
//   Train: mean/var of the current batch (biased variance)
//   Eval:  running_mean / running_var
//
// The running statistics are `RunningState`s, outside the
// autograd graph and invisible to optimizers. Forward never
// touches them; `accumulate` returns a new module with the
// batch statistics blended in, for whoever drives training.

use burn::{
    module::{Param, RunningState},
    prelude::*,
};

use crate::domain::mode::ForwardMode;

const EPSILON: f64 = 1e-5;
const MOMENTUM: f64 = 0.1;

#[derive(Module, Debug)]
pub struct BatchNorm<B: Backend> {
    pub gamma:        Param<Tensor<B, 1>>,
    pub beta:         Param<Tensor<B, 1>>,
    pub running_mean: RunningState<Tensor<B, 1>>,
    pub running_var:  RunningState<Tensor<B, 1>>,
    momentum:         f64,
    epsilon:          f64,
}

impl<B: Backend> BatchNorm<B> {
    pub fn new(num_features: usize, device: &B::Device) -> Self {
        Self {
            gamma:        Param::from_tensor(Tensor::ones([num_features], device)),
            beta:         Param::from_tensor(Tensor::zeros([num_features], device)),
            running_mean: RunningState::new(Tensor::zeros([num_features], device)),
            running_var:  RunningState::new(Tensor::ones([num_features], device)),
            momentum:     MOMENTUM,
            epsilon:      EPSILON,
        }
    }

    /// x: [batch, time, features] → same shape
    pub fn forward(&self, x: Tensor<B, 3>, mode: ForwardMode) -> Tensor<B, 3> {
        let [_, _, features] = x.dims();

        let (mean, var) = match mode {
            ForwardMode::Train => Self::statistics(x.clone()),
            ForwardMode::Eval  => (self.running_mean.value(), self.running_var.value()),
        };

        let mean  = mean.reshape([1, 1, features]);
        let std   = var.add_scalar(self.epsilon).sqrt().reshape([1, 1, features]);
        let gamma = self.gamma.val().reshape([1, 1, features]);
        let beta  = self.beta.val().reshape([1, 1, features]);

        x.sub(mean).div(std).mul(gamma).add(beta)
    }

    /// Per-feature mean and biased variance over batch and time.
    pub fn statistics(x: Tensor<B, 3>) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let [batch, time, features] = x.dims();
        let flat     = x.reshape([batch * time, features]);
        let mean     = flat.clone().mean_dim(0);
        let centered = flat - mean.clone();
        let var      = (centered.clone() * centered).mean_dim(0);
        (mean.reshape([features]), var.reshape([features]))
    }

    /// Blends the statistics of `x` into the running statistics.
    /// The running variance uses the unbiased estimate.
    pub fn accumulate(self, x: Tensor<B, 3>) -> Self {
        let [batch, time, _] = x.dims();
        let count = (batch * time) as f64;
        let (mean, var) = Self::statistics(x.detach());
        let var = if count > 1.0 { var.mul_scalar(count / (count - 1.0)) } else { var };

        let m = self.momentum;
        let running_mean = self.running_mean.value().mul_scalar(1.0 - m) + mean.mul_scalar(m);
        let running_var  = self.running_var.value().mul_scalar(1.0 - m) + var.mul_scalar(m);

        Self {
            running_mean: RunningState::new(running_mean.detach()),
            running_var:  RunningState::new(running_var.detach()),
            ..self
        }
    }

    /// Scalars held in running statistics; `num_params` counts them too.
    pub fn num_running(&self) -> usize {
        2 * self.running_mean.value().dims()[0]
    }
}
