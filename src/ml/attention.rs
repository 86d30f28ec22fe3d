// ============================================================
// Layer 5 — Scaled Dot-Product & Multi-Head Self-Attention
// ============================================================
// Shapes (b = batch, h = heads, q/k = query/key length):
//
//   ScaledDotProductAttention
//     Q [b, h, q, d_k]   K [b, h, d_k, k] (already transposed)
//     V [b, h, k, d_v]   mask [q, k] (true = blocked)
//     → context [b, h, q, d_v], weights [b, h, q, k]
//
//   MultiHeadAttention
//     Q, K, V [b, len, d_model] → context [b, q, d_model]
//
// All heads go through ONE batched matmul; the head axis is just
// another batch axis. Blocked scores are filled with -1e9 rather
// than -inf, so a query whose keys are all blocked ends up with a
// uniform distribution instead of NaN.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need §3.2

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::softmax, Bool, Shape, TensorData},
};

use crate::domain::error::{Result as TstResult, TstError};

/// Score written into blocked (query, key) pairs before the softmax.
pub const MASK_FILL: f32 = -1e9;

// ─── ScaledDotProductAttention ───────────────────────────────────────────────

#[derive(Module, Clone, Debug)]
pub struct ScaledDotProductAttention {
    pub d_k: usize,
}

impl ScaledDotProductAttention {
    pub fn new(d_k: usize) -> Self {
        Self { d_k }
    }

    pub fn forward<B: Backend>(
        &self,
        q:    Tensor<B, 4>,
        k:    Tensor<B, 4>,
        v:    Tensor<B, 4>,
        mask: Option<Tensor<B, 2, Bool>>,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let scores = q.matmul(k).div_scalar((self.d_k as f64).sqrt());

        let scores = match mask {
            Some(mask) => {
                let [batch, heads, q_len, k_len] = scores.dims();
                let mask = mask
                    .unsqueeze::<4>()
                    .expand(Shape::new([batch, heads, q_len, k_len]));
                scores.mask_fill(mask, MASK_FILL)
            }
            None => scores,
        };

        let weights = softmax(scores, 3);
        let context = weights.clone().matmul(v);
        (context, weights)
    }
}

// ─── Head split / merge ──────────────────────────────────────────────────────

/// [b, len, h * d] → [b, h, len, d]
pub fn split_heads<B: Backend>(x: Tensor<B, 3>, n_heads: usize) -> Tensor<B, 4> {
    let [batch, len, features] = x.dims();
    x.reshape([batch, len, n_heads, features / n_heads])
        .swap_dims(1, 2)
}

/// [b, h, len, d] → [b, len, h * d], the exact inverse of `split_heads`.
pub fn merge_heads<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, heads, len, d] = x.dims();
    x.swap_dims(1, 2).reshape([batch, len, heads * d])
}

// ─── Mask builders ───────────────────────────────────────────────────────────

/// Builds a [q_len, k_len] mask; `blocked(i, j)` = query i may not see key j.
pub fn attention_mask<B: Backend>(
    q_len:   usize,
    k_len:   usize,
    device:  &B::Device,
    blocked: impl Fn(usize, usize) -> bool,
) -> Tensor<B, 2, Bool> {
    let flags: Vec<bool> = (0..q_len * k_len)
        .map(|idx| blocked(idx / k_len, idx % k_len))
        .collect();
    Tensor::from_data(TensorData::new(flags, [q_len, k_len]), device)
}

/// Blocks every key that lies after the query position.
pub fn causal_mask<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    attention_mask(len, len, device, |i, j| j > i)
}

// ─── MultiHeadAttention ──────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    pub d_model: usize,
    pub n_heads: usize,
    /// Per-head query/key size, defaults to d_model / n_heads
    pub d_k: Option<usize>,
    /// Per-head value size, defaults to d_model / n_heads
    pub d_v: Option<usize>,
}

impl MultiHeadAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TstResult<MultiHeadAttention<B>> {
        if self.n_heads == 0 || self.d_model == 0 {
            return Err(TstError::config("d_model and n_heads must be positive"));
        }
        if self.d_model % self.n_heads != 0 {
            return Err(TstError::config(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                self.d_model, self.n_heads
            )));
        }
        let d_k = self.d_k.unwrap_or(self.d_model / self.n_heads);
        let d_v = self.d_v.unwrap_or(self.d_model / self.n_heads);
        if d_k == 0 || d_v == 0 {
            return Err(TstError::config("d_k and d_v must be positive"));
        }

        let projection = |d_in: usize, d_out: usize| -> Linear<B> {
            LinearConfig::new(d_in, d_out).with_bias(false).init(device)
        };

        Ok(MultiHeadAttention {
            w_q:       projection(self.d_model, d_k * self.n_heads),
            w_k:       projection(self.d_model, d_k * self.n_heads),
            w_v:       projection(self.d_model, d_v * self.n_heads),
            w_o:       projection(d_v * self.n_heads, self.d_model),
            attention: ScaledDotProductAttention::new(d_k),
            n_heads:   self.n_heads,
            d_k,
            d_v,
        })
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub w_q:       Linear<B>,
    pub w_k:       Linear<B>,
    pub w_v:       Linear<B>,
    pub w_o:       Linear<B>,
    pub attention: ScaledDotProductAttention,
    pub n_heads:   usize,
    pub d_k:       usize,
    pub d_v:       usize,
}

pub struct AttentionOutput<B: Backend> {
    /// [batch, q_len, d_model]
    pub context: Tensor<B, 3>,
    /// [batch, n_heads, q_len, k_len]
    pub weights: Tensor<B, 4>,
}

impl<B: Backend> MultiHeadAttention<B> {
    pub fn forward(
        &self,
        q:    Tensor<B, 3>,
        k:    Tensor<B, 3>,
        v:    Tensor<B, 3>,
        mask: Option<Tensor<B, 2, Bool>>,
    ) -> AttentionOutput<B> {
        let q_s = split_heads(self.w_q.forward(q), self.n_heads);
        let k_s = split_heads(self.w_k.forward(k), self.n_heads).swap_dims(2, 3);
        let v_s = split_heads(self.w_v.forward(v), self.n_heads);

        let (context, weights) = self.attention.forward(q_s, k_s, v_s, mask);

        AttentionOutput {
            context: self.w_o.forward(merge_heads(context)),
            weights,
        }
    }
}
