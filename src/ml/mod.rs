// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer builds tensors directly, only this one.
//
// What's in this layer, leaf first:
//
//   activation.rs — Relu / Gelu / Custom(fn), resolved at init
//   dropout.rs    — dropout driven by ForwardMode, not backend
//   norm.rs       — batch-style norm over (batch, time)
//   attention.rs  — scaled dot-product + multi-head attention
//   encoder.rs    — encoder layer (2× Add & Norm) and stack
//   input.rs      — input encoder: linear / strided / conv
//   positional.rs — learned positional bias
//   head.rs       — flatten + linear head, optional y_range
//   model.rs      — TstConfig, TstModule (parameters), Tst
//   probe.rs      — backend choice + timed random forward pass
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Zerveas et al. (2021) A Transformer-based Framework
//            for Multivariate Time Series Representation Learning

pub mod activation;
pub mod dropout;
pub mod norm;
pub mod attention;
pub mod encoder;
pub mod input;
pub mod positional;
pub mod head;

/// Model configuration, parameter bundle and forward entry points
pub mod model;

/// Random-input forward passes for the CLI
pub mod probe;
