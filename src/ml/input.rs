// ============================================================
// Layer 5 — Input Encoder
// ============================================================
// Maps a raw series [batch, c_in, seq_len] into the model space
// [batch, q_len, d_model]. Exactly one variant is chosen when
// the model is built and kept for its lifetime:
//
//   Linear   — seq_len fits: per-timestep Linear(c_in → d_model),
//              q_len = seq_len
//   Strided  — seq_len > max_seq_len: zero-pad time, then
//              Conv1d(c_in → d_model, kernel = stride = factor),
//              q_len = max_seq_len (see domain::resampling)
//   Conv     — caller-supplied Conv1d geometry; q_len is measured
//              by running a 1→1 channel conv of the same geometry
//              over a probe of seq_len steps
//
// Precedence: Strided, then Conv, then Linear.

use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        Linear, LinearConfig, PaddingConfig1d,
    },
    prelude::*,
};

use crate::domain::{
    error::{Result as TstResult, TstError},
    resampling::{check_conv_geometry, ResamplingPlan},
};

/// Geometry of a caller-supplied input convolution.
#[derive(Config, Debug, PartialEq)]
pub struct ConvResamplingConfig {
    pub kernel_size: usize,
    #[config(default = 1)]
    pub stride:      usize,
    #[config(default = 0)]
    pub padding:     usize,
    #[config(default = 1)]
    pub dilation:    usize,
    #[config(default = 1)]
    pub groups:      usize,
    #[config(default = true)]
    pub bias:        bool,
}

impl ConvResamplingConfig {
    fn conv_config(&self, channels_in: usize, channels_out: usize, groups: usize) -> Conv1dConfig {
        Conv1dConfig::new(channels_in, channels_out, self.kernel_size)
            .with_stride(self.stride)
            .with_padding(PaddingConfig1d::Explicit(self.padding))
            .with_dilation(self.dilation)
            .with_groups(groups)
            .with_bias(self.bias)
    }
}

#[derive(Config, Debug)]
pub struct InputEncoderConfig {
    pub c_in:        usize,
    pub d_model:     usize,
    pub seq_len:     usize,
    pub max_seq_len: Option<usize>,
    pub resampling:  Option<ConvResamplingConfig>,
}

impl InputEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TstResult<InputEncoder<B>> {
        if self.c_in == 0 || self.d_model == 0 || self.seq_len == 0 {
            return Err(TstError::config("c_in, d_model and seq_len must be positive"));
        }

        if let Some(max_seq_len) = self.max_seq_len {
            if let Some(plan) = ResamplingPlan::new(self.seq_len, max_seq_len)? {
                return Ok(InputEncoder::Strided(self.strided(plan, device)));
            }
        }
        if let Some(geometry) = &self.resampling {
            return Ok(InputEncoder::Conv(self.custom_conv(geometry, device)?));
        }

        Ok(InputEncoder::Linear(LinearEncoder {
            projection: LinearConfig::new(self.c_in, self.d_model).init(device),
            q_len:      self.seq_len,
        }))
    }

    fn strided<B: Backend>(&self, plan: ResamplingPlan, device: &B::Device) -> StridedEncoder<B> {
        tracing::info!(
            "temporal resolution modified: {} --> {} time steps: kernel_size={}, stride={}, padding=({}, {})",
            self.seq_len, plan.q_len, plan.factor, plan.factor, plan.pad_left, plan.pad_right,
        );
        let conv = Conv1dConfig::new(self.c_in, self.d_model, plan.factor)
            .with_stride(plan.factor)
            .with_padding(PaddingConfig1d::Explicit(0))
            .init(device);
        StridedEncoder {
            conv,
            pad_left:  plan.pad_left,
            pad_right: plan.pad_right,
            q_len:     plan.q_len,
        }
    }

    fn custom_conv<B: Backend>(
        &self,
        geometry: &ConvResamplingConfig,
        device:   &B::Device,
    ) -> TstResult<ConvEncoder<B>> {
        check_conv_geometry(
            self.seq_len,
            geometry.kernel_size,
            geometry.stride,
            geometry.padding,
            geometry.dilation,
        )?;
        let groups = geometry.groups;
        if groups == 0 || self.c_in % groups != 0 || self.d_model % groups != 0 {
            return Err(TstError::config(format!(
                "groups ({groups}) must divide both c_in ({}) and d_model ({})",
                self.c_in, self.d_model
            )));
        }

        // Measure the output length on a single-channel probe.
        let probe: Conv1d<B> = geometry.conv_config(1, 1, 1).init(device);
        let q_len = probe
            .forward(Tensor::zeros([1, 1, self.seq_len], device))
            .dims()[2];
        if q_len == 0 {
            return Err(TstError::config(format!(
                "input convolution {geometry:?} produces no time steps from {}",
                self.seq_len
            )));
        }

        tracing::info!(
            "Conv1d with kernel_size={}, stride={}, padding={}, dilation={} applied to input: {} --> {} time steps",
            geometry.kernel_size, geometry.stride, geometry.padding, geometry.dilation,
            self.seq_len, q_len,
        );

        Ok(ConvEncoder {
            conv: geometry.conv_config(self.c_in, self.d_model, groups).init(device),
            q_len,
        })
    }
}

// ─── Variants ────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct LinearEncoder<B: Backend> {
    pub projection: Linear<B>,
    pub q_len:      usize,
}

#[derive(Module, Debug)]
pub struct StridedEncoder<B: Backend> {
    pub conv:      Conv1d<B>,
    pub pad_left:  usize,
    pub pad_right: usize,
    pub q_len:     usize,
}

#[derive(Module, Debug)]
pub struct ConvEncoder<B: Backend> {
    pub conv:  Conv1d<B>,
    pub q_len: usize,
}

impl<B: Backend> StridedEncoder<B> {
    /// Zero-pads the time axis of [batch, channels, len].
    fn pad(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        x.pad((self.pad_left, self.pad_right, 0, 0), 0.0)
    }
}

#[derive(Module, Debug)]
pub enum InputEncoder<B: Backend> {
    Linear(LinearEncoder<B>),
    Strided(StridedEncoder<B>),
    Conv(ConvEncoder<B>),
}

impl<B: Backend> InputEncoder<B> {
    /// x: [batch, c_in, seq_len] → [batch, q_len, d_model]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            Self::Linear(enc)  => enc.projection.forward(x.swap_dims(1, 2)),
            Self::Strided(enc) => enc.conv.forward(enc.pad(x)).swap_dims(1, 2),
            Self::Conv(enc)    => enc.conv.forward(x).swap_dims(1, 2),
        }
    }

    /// Sequence length after encoding, fixed at construction.
    pub fn q_len(&self) -> usize {
        match self {
            Self::Linear(enc)  => enc.q_len,
            Self::Strided(enc) => enc.q_len,
            Self::Conv(enc)    => enc.q_len,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Linear(_)  => "linear",
            Self::Strided(_) => "strided",
            Self::Conv(_)    => "conv",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{assert_close, values, TestBackend};
    use burn::tensor::Distribution;

    fn series(shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_linear_variant_keeps_length() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(3, 16, 50).init::<TestBackend>(&device).unwrap();
        assert_eq!(enc.variant_name(), "linear");
        assert_eq!(enc.q_len(), 50);
        assert_eq!(enc.forward(series([4, 3, 50])).dims(), [4, 50, 16]);
    }

    #[test]
    fn test_linear_variant_projects_each_timestep_independently() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(2, 4, 6).init::<TestBackend>(&device).unwrap();
        let x = series([1, 2, 6]);
        let full = values(enc.forward(x.clone()));
        let step3 = values(enc.forward(x.slice([0..1, 0..2, 3..4])));
        assert_close(&full[12..16], &step3, 1e-6);
    }

    #[test]
    fn test_strided_variant_for_100_into_30() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(3, 16, 100)
            .with_max_seq_len(Some(30))
            .init::<TestBackend>(&device)
            .unwrap();
        match &enc {
            InputEncoder::Strided(s) => {
                assert_eq!((s.pad_left, s.pad_right), (10, 10));
                assert_eq!(s.q_len, 30);
            }
            other => panic!("expected strided encoder, got {}", other.variant_name()),
        }
        assert_eq!(enc.forward(series([2, 3, 100])).dims(), [2, 30, 16]);
    }

    #[test]
    fn test_strided_padding_surrounds_series_with_zeros() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(3, 16, 100)
            .with_max_seq_len(Some(30))
            .init::<TestBackend>(&device)
            .unwrap();
        let InputEncoder::Strided(strided) = &enc else {
            panic!("expected strided encoder, got {}", enc.variant_name());
        };
        let padded = strided.pad(Tensor::ones([2, 3, 100], &device));
        assert_eq!(padded.dims(), [2, 3, 120]);

        let row = values(padded.slice([1..2, 2..3, 0..120]));
        assert!(row[..10].iter().all(|v| *v == 0.0));
        assert!(row[10..110].iter().all(|v| *v == 1.0));
        assert!(row[110..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_strided_variant_with_odd_padding() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(2, 8, 101)
            .with_max_seq_len(Some(30))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(enc.q_len(), 30);
        assert_eq!(enc.forward(series([3, 2, 101])).dims(), [3, 30, 8]);
    }

    #[test]
    fn test_max_len_not_exceeded_falls_back_to_linear() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(3, 8, 20)
            .with_max_seq_len(Some(30))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(enc.variant_name(), "linear");
    }

    #[test]
    fn test_strided_wins_over_custom_conv() {
        let device = Default::default();
        let enc = InputEncoderConfig::new(3, 8, 100)
            .with_max_seq_len(Some(30))
            .with_resampling(Some(ConvResamplingConfig::new(3)))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(enc.variant_name(), "strided");
    }

    #[test]
    fn test_custom_conv_length_is_measured() {
        let device = Default::default();
        // (50 + 2*1 - 2*(5-1) - 1) / 3 + 1 = 15
        let geometry = ConvResamplingConfig::new(5)
            .with_stride(3)
            .with_padding(1)
            .with_dilation(2);
        let enc = InputEncoderConfig::new(4, 8, 50)
            .with_resampling(Some(geometry))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(enc.variant_name(), "conv");
        assert_eq!(enc.q_len(), 15);
        assert_eq!(enc.forward(series([2, 4, 50])).dims(), [2, 15, 8]);
    }

    #[test]
    fn test_custom_conv_with_groups() {
        let device = Default::default();
        let geometry = ConvResamplingConfig::new(3).with_padding(1).with_groups(2);
        let enc = InputEncoderConfig::new(4, 8, 20)
            .with_resampling(Some(geometry))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(enc.forward(series([1, 4, 20])).dims(), [1, 20, 8]);
    }

    #[test]
    fn test_custom_conv_with_no_output_is_config_error() {
        let device = Default::default();
        let err = InputEncoderConfig::new(3, 8, 4)
            .with_resampling(Some(ConvResamplingConfig::new(9)))
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_groups_must_divide_channels() {
        let device = Default::default();
        let err = InputEncoderConfig::new(3, 8, 20)
            .with_resampling(Some(ConvResamplingConfig::new(3).with_groups(2)))
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
