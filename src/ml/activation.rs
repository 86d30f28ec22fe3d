// ============================================================
// Layer 5 — Activation
// ============================================================
// Closed set of activations used by the feed-forward block and
// by the output head. The choice is resolved once when the model
// is initialised; forward calls only match on the enum.
//
//   Relu / Gelu  — come from ActivationKind in the JSON config
//   Custom(fn)   — any caller-supplied tensor function, passed
//                  to TstConfig::init_with_activation

use burn::{prelude::*, tensor::activation};

use crate::domain::activation::ActivationKind;

/// A caller-supplied activation over (batch, rows, cols) tensors.
pub type ActivationFn<B> = fn(Tensor<B, 3>) -> Tensor<B, 3>;

#[derive(Clone, Debug)]
pub enum Activation<B: Backend> {
    Relu,
    Gelu,
    Custom(ActivationFn<B>),
}

impl<B: Backend> Activation<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            Self::Relu      => activation::relu(x),
            Self::Gelu      => activation::gelu(x),
            Self::Custom(f) => f(x),
        }
    }

    /// The serialisable kind, `None` for a custom function.
    pub fn kind(&self) -> Option<ActivationKind> {
        match self {
            Self::Relu      => Some(ActivationKind::Relu),
            Self::Gelu      => Some(ActivationKind::Gelu),
            Self::Custom(_) => None,
        }
    }
}

impl<B: Backend> From<ActivationKind> for Activation<B> {
    fn from(kind: ActivationKind) -> Self {
        match kind {
            ActivationKind::Relu => Self::Relu,
            ActivationKind::Gelu => Self::Gelu,
        }
    }
}
