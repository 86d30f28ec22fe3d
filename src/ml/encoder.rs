// ============================================================
// Layer 5 — Encoder Layer and Encoder Stack
// ============================================================
// One encoder layer is two sublayers, each "Add & Norm":
//
//   src = norm_attn(src + dropout(MHA(src, src, src, mask)))
//   src = norm_ffn (src + dropout(W2(dropout(act(W1(src))))))
//
// Both norms are batch-style (see norm.rs). Every layer maps
// [batch, q_len, d_model] → [batch, q_len, d_model], so the
// stack is a plain fold over its layers.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::Bool,
};

use crate::domain::{error::Result as TstResult, mode::ForwardMode};
use crate::ml::{
    activation::Activation,
    attention::{MultiHeadAttention, MultiHeadAttentionConfig},
    dropout::Dropout,
    norm::BatchNorm,
};

#[derive(Config, Debug)]
pub struct EncoderLayerConfig {
    pub d_model: usize,
    pub n_heads: usize,
    pub d_k:     Option<usize>,
    pub d_v:     Option<usize>,
    #[config(default = 256)]
    pub d_ff:    usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl EncoderLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TstResult<EncoderLayer<B>> {
        let self_attn = MultiHeadAttentionConfig::new(self.d_model, self.n_heads)
            .with_d_k(self.d_k)
            .with_d_v(self.d_v)
            .init(device)?;

        Ok(EncoderLayer {
            self_attn,
            dropout_attn: Dropout::new(self.dropout),
            norm_attn:    BatchNorm::new(self.d_model, device),
            ff_in:        LinearConfig::new(self.d_model, self.d_ff).init(device),
            ff_dropout:   Dropout::new(self.dropout),
            ff_out:       LinearConfig::new(self.d_ff, self.d_model).init(device),
            dropout_ffn:  Dropout::new(self.dropout),
            norm_ffn:     BatchNorm::new(self.d_model, device),
        })
    }
}

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub self_attn:    MultiHeadAttention<B>,
    pub dropout_attn: Dropout,
    pub norm_attn:    BatchNorm<B>,
    pub ff_in:        Linear<B>,
    pub ff_dropout:   Dropout,
    pub ff_out:       Linear<B>,
    pub dropout_ffn:  Dropout,
    pub norm_ffn:     BatchNorm<B>,
}

impl<B: Backend> EncoderLayer<B> {
    /// src: [batch, q_len, d_model] → (same shape, attention [batch, heads, q_len, q_len])
    pub fn forward(
        &self,
        src:        Tensor<B, 3>,
        mask:       Option<Tensor<B, 2, Bool>>,
        mode:       ForwardMode,
        activation: &Activation<B>,
    ) -> (Tensor<B, 3>, Tensor<B, 4>) {
        let (src, attention) = self.attention_residual(src, mask, mode);
        let src = self.norm_attn.forward(src, mode);

        let src = self.feed_forward_residual(src, mode, activation);
        (self.norm_ffn.forward(src, mode), attention)
    }

    /// Runs the layer in train mode and folds the statistics seen by
    /// both norms into their running statistics.
    pub fn accumulate(
        self,
        src:        Tensor<B, 3>,
        mask:       Option<Tensor<B, 2, Bool>>,
        activation: &Activation<B>,
    ) -> (Self, Tensor<B, 3>) {
        let mode = ForwardMode::Train;

        let (pre_attn_norm, _) = self.attention_residual(src, mask, mode);
        let src = self.norm_attn.forward(pre_attn_norm.clone(), mode);

        let pre_ffn_norm = self.feed_forward_residual(src, mode, activation);
        let out = self.norm_ffn.forward(pre_ffn_norm.clone(), mode);

        let layer = Self {
            norm_attn: self.norm_attn.accumulate(pre_attn_norm),
            norm_ffn:  self.norm_ffn.accumulate(pre_ffn_norm),
            ..self
        };
        (layer, out)
    }

    fn attention_residual(
        &self,
        src:  Tensor<B, 3>,
        mask: Option<Tensor<B, 2, Bool>>,
        mode: ForwardMode,
    ) -> (Tensor<B, 3>, Tensor<B, 4>) {
        let attn = self.self_attn.forward(src.clone(), src.clone(), src.clone(), mask);
        (src + self.dropout_attn.forward(attn.context, mode), attn.weights)
    }

    fn feed_forward_residual(
        &self,
        src:        Tensor<B, 3>,
        mode:       ForwardMode,
        activation: &Activation<B>,
    ) -> Tensor<B, 3> {
        let hidden = activation.forward(self.ff_in.forward(src.clone()));
        let ff_out = self.ff_out.forward(self.ff_dropout.forward(hidden, mode));
        src + self.dropout_ffn.forward(ff_out, mode)
    }
}

// ─── EncoderStack ────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderStack<B: Backend> {
    pub layers: Vec<EncoderLayer<B>>,
}

impl<B: Backend> EncoderStack<B> {
    pub fn new(config: &EncoderLayerConfig, n_layers: usize, device: &B::Device) -> TstResult<Self> {
        let layers = (0..n_layers)
            .map(|_| config.init(device))
            .collect::<TstResult<Vec<_>>>()?;
        Ok(Self { layers })
    }

    /// Returns the encoded sequence and one attention map per layer.
    pub fn forward(
        &self,
        src:        Tensor<B, 3>,
        mask:       Option<Tensor<B, 2, Bool>>,
        mode:       ForwardMode,
        activation: &Activation<B>,
    ) -> (Tensor<B, 3>, Vec<Tensor<B, 4>>) {
        let mut attention = Vec::with_capacity(self.layers.len());
        let mut output = src;
        for layer in &self.layers {
            let (next, weights) = layer.forward(output, mask.clone(), mode, activation);
            attention.push(weights);
            output = next;
        }
        (output, attention)
    }

    pub fn accumulate(
        self,
        src:        Tensor<B, 3>,
        mask:       Option<Tensor<B, 2, Bool>>,
        activation: &Activation<B>,
    ) -> Self {
        let mut output = src;
        let mut layers = Vec::with_capacity(self.layers.len());
        for layer in self.layers {
            let (layer, next) = layer.accumulate(output, mask.clone(), activation);
            layers.push(layer);
            output = next;
        }
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }
}
