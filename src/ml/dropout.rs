// ============================================================
// Layer 5 — Mode-aware Dropout
// ============================================================
// burn's own Dropout switches on the backend (autodiff or not).
// Here the switch is the ForwardMode passed into each call, so
// the same parameters can be evaluated deterministically on an
// autodiff backend as well.
//
// Train: zero each element with probability `prob` and rescale
//        survivors by 1 / (1 - prob) (inverted dropout)
// Eval:  identity

use burn::{prelude::*, tensor::Distribution};

use crate::domain::mode::ForwardMode;

#[derive(Module, Clone, Debug)]
pub struct Dropout {
    pub prob: f64,
}

impl Dropout {
    pub fn new(prob: f64) -> Self {
        Self { prob }
    }

    pub fn forward<B: Backend, const D: usize>(
        &self,
        x:    Tensor<B, D>,
        mode: ForwardMode,
    ) -> Tensor<B, D> {
        if !mode.is_train() || self.prob == 0.0 {
            return x;
        }
        let keep = 1.0 - self.prob;
        let mask = x.random_like(Distribution::Bernoulli(keep));
        (x * mask).div_scalar(keep)
    }
}
