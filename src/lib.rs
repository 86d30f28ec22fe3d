#![recursion_limit = "256"]

//! Time Series Transformer (TST) encoder on Burn.
//!
//! Build a [`TstConfig`], call [`TstConfig::init`] and feed
//! `(batch, c_in, seq_len)` tensors to [`Tst::forward`].

pub mod cli;
pub mod application;
pub mod domain;
pub mod ml;
pub mod infra;

pub use domain::{
    error::{Result, TstError},
    mode::ForwardMode,
};
pub use ml::{
    activation::Activation,
    attention::{attention_mask, causal_mask},
    input::ConvResamplingConfig,
    model::{Tst, TstConfig, TstModule, TstOutput},
};
