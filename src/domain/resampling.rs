// ============================================================
// Layer 3 — Temporal Resampling Arithmetic
// ============================================================
// Attention cost grows with the square of the sequence length.
// When a series is longer than `max_seq_len`, the input encoder
// compresses time with a strided convolution whose kernel and
// stride are both the resampling factor:
//
//   factor        = ceil(seq_len / max_seq_len)
//   total_padding = factor * max_seq_len - seq_len
//   padding       = (total / 2, total - total / 2)   odd extra → right
//   q_len         = (seq_len + total_padding) / factor = max_seq_len
//
// Example: seq_len=100, max_seq_len=30
//   factor=4, total_padding=20, padding=(10, 10), q_len=30
//
// Custom convolutions get no closed form for their output length
// (it is measured on a probe tensor in ml::input), but their
// geometry is checked here so the probe cannot panic.

use crate::domain::error::{Result, TstError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplingPlan {
    pub seq_len:   usize,
    pub factor:    usize,
    pub pad_left:  usize,
    pub pad_right: usize,
    pub q_len:     usize,
}

impl ResamplingPlan {
    /// Returns `None` when the series already fits in `max_seq_len`.
    pub fn new(seq_len: usize, max_seq_len: usize) -> Result<Option<Self>> {
        if max_seq_len == 0 {
            return Err(TstError::config("max_seq_len must be positive"));
        }
        if seq_len <= max_seq_len {
            return Ok(None);
        }

        let factor        = seq_len.div_ceil(max_seq_len);
        let total_padding = factor * max_seq_len - seq_len;
        let pad_left      = total_padding / 2;
        let pad_right     = total_padding - pad_left;

        Ok(Some(Self {
            seq_len,
            factor,
            pad_left,
            pad_right,
            q_len: max_seq_len,
        }))
    }

    pub fn padded_len(&self) -> usize {
        self.seq_len + self.pad_left + self.pad_right
    }
}

/// Rejects a 1-D convolution geometry that would produce an empty
/// (or undefined) output for a series of `seq_len` steps.
pub fn check_conv_geometry(
    seq_len:     usize,
    kernel_size: usize,
    stride:      usize,
    padding:     usize,
    dilation:    usize,
) -> Result<()> {
    if kernel_size == 0 || stride == 0 || dilation == 0 {
        return Err(TstError::config(format!(
            "convolution kernel_size ({kernel_size}), stride ({stride}) and \
             dilation ({dilation}) must be positive"
        )));
    }
    let receptive = dilation * (kernel_size - 1) + 1;
    let padded    = seq_len + 2 * padding;
    if receptive > padded {
        return Err(TstError::config(format!(
            "convolution with receptive field {receptive} yields no output \
             for {seq_len} time steps padded to {padded}"
        )));
    }
    Ok(())
}
