// ============================================================
// Layer 5 — Output Head
// ============================================================
//   z [batch, q_len, d_model]
//     → transpose     [batch, d_model, q_len]
//     → activation
//     → flatten       [batch, d_model * q_len]
//     → dropout       (only when fc_dropout > 0)
//     → Linear        [batch, c_out * seq_len]
//     → SigmoidRange  (only when y_range is set)
//     → reshape       [batch, c_out, seq_len]
//
// The batch size of the reshape is read from z, never from
// configuration.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::domain::{
    error::{Result as TstResult, TstError},
    mode::ForwardMode,
};
use crate::ml::{activation::Activation, dropout::Dropout};

/// Squashes values into [low, high] with a scaled sigmoid.
#[derive(Module, Clone, Debug)]
pub struct SigmoidRange {
    pub low:  f64,
    pub high: f64,
}

impl SigmoidRange {
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        sigmoid(x).mul_scalar(self.high - self.low).add_scalar(self.low)
    }
}

#[derive(Config, Debug)]
pub struct OutputHeadConfig {
    pub q_len:      usize,
    pub d_model:    usize,
    pub c_out:      usize,
    pub seq_len:    usize,
    #[config(default = 0.0)]
    pub fc_dropout: f64,
    pub y_range:    Option<(f64, f64)>,
}

impl OutputHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TstResult<OutputHead<B>> {
        if !(0.0..1.0).contains(&self.fc_dropout) {
            return Err(TstError::config(format!(
                "fc_dropout ({}) must be in [0, 1)", self.fc_dropout
            )));
        }
        let range = match self.y_range {
            Some((low, high)) if !(low.is_finite() && high.is_finite() && low < high) => {
                return Err(TstError::config(format!(
                    "y_range ({low}, {high}) must be finite with low < high"
                )));
            }
            Some((low, high)) => Some(SigmoidRange { low, high }),
            None => None,
        };

        let head_nf = self.q_len * self.d_model;
        Ok(OutputHead {
            dropout: (self.fc_dropout > 0.0).then(|| Dropout::new(self.fc_dropout)),
            linear:  LinearConfig::new(head_nf, self.c_out * self.seq_len).init(device),
            range,
            head_nf,
            c_out:   self.c_out,
            seq_len: self.seq_len,
        })
    }
}

#[derive(Module, Debug)]
pub struct OutputHead<B: Backend> {
    pub dropout: Option<Dropout>,
    pub linear:  Linear<B>,
    pub range:   Option<SigmoidRange>,
    pub head_nf: usize,
    pub c_out:   usize,
    pub seq_len: usize,
}

impl<B: Backend> OutputHead<B> {
    pub fn forward(
        &self,
        z:          Tensor<B, 3>,
        mode:       ForwardMode,
        activation: &Activation<B>,
    ) -> Tensor<B, 3> {
        let [batch, q_len, d_model] = z.dims();

        let z = activation.forward(z.swap_dims(1, 2));
        let z = z.reshape([batch, d_model * q_len]);
        let z = match &self.dropout {
            Some(dropout) => dropout.forward(z, mode),
            None          => z,
        };

        let y = self.linear.forward(z);
        let y = match &self.range {
            Some(range) => range.forward(y),
            None        => y,
        };
        y.reshape([batch, self.c_out, self.seq_len])
    }
}
