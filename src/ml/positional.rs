// ============================================================
// Layer 5 — Learned Positional Encoding
// ============================================================
// Self-attention is permutation-invariant, so position must be
// injected explicitly. Here it is a free parameter W_pos of shape
// [q_len, d_model], initialised U(-0.02, 0.02) and added to every
// sample of the batch. There is no sinusoidal structure, so q_len
// is fixed once the model is built.

use burn::{module::Param, prelude::*, tensor::Distribution};

pub const INIT_RANGE: f64 = 0.02;

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    pub bias: Param<Tensor<B, 2>>,
}

impl<B: Backend> PositionalEncoding<B> {
    pub fn new(q_len: usize, d_model: usize, device: &B::Device) -> Self {
        let bias = Tensor::random(
            [q_len, d_model],
            Distribution::Uniform(-INIT_RANGE, INIT_RANGE),
            device,
        );
        Self { bias: Param::from_tensor(bias) }
    }

    /// x: [batch, q_len, d_model] → x + W_pos
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        x + self.bias.val().unsqueeze::<3>()
    }

    pub fn dims(&self) -> [usize; 2] {
        self.bias.val().dims()
    }
}
