use burn::{prelude::*, tensor::Bool};

use crate::domain::{
    activation::ActivationKind,
    error::{Result as TstResult, TstError},
    mode::ForwardMode,
    shape::SeriesShape,
};
use crate::ml::{
    activation::Activation,
    dropout::Dropout,
    encoder::{EncoderLayerConfig, EncoderStack},
    head::{OutputHead, OutputHeadConfig},
    input::{ConvResamplingConfig, InputEncoder, InputEncoderConfig},
    positional::PositionalEncoding,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TstConfig {
    /// Number of input variables (channels)
    pub c_in:        usize,
    /// Number of output channels per time step
    pub c_out:       usize,
    /// Number of time steps in each input series
    pub seq_len:     usize,
    /// Compress time with a strided conv when seq_len exceeds this
    pub max_seq_len: Option<usize>,
    #[config(default = 128)]
    pub d_model:     usize,
    #[config(default = 16)]
    pub n_heads:     usize,
    pub d_k:         Option<usize>,
    pub d_v:         Option<usize>,
    #[config(default = 256)]
    pub d_ff:        usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
    #[config(default = "ActivationKind::Gelu")]
    pub activation:  ActivationKind,
    #[config(default = 3)]
    pub n_layers:    usize,
    #[config(default = 0.0)]
    pub fc_dropout:  f64,
    /// Squash outputs into (low, high)
    pub y_range:     Option<(f64, f64)>,
    /// Caller-supplied input convolution
    pub resampling:  Option<ConvResamplingConfig>,
    /// Reject batches of any other size
    pub batch_size:  Option<usize>,
}

impl TstConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TstResult<Tst<B>> {
        self.init_with_activation(device, self.activation.into())
    }

    /// Same as `init`, with an activation that overrides `self.activation`.
    pub fn init_with_activation<B: Backend>(
        &self,
        device:     &B::Device,
        activation: Activation<B>,
    ) -> TstResult<Tst<B>> {
        self.validate()?;

        let input = InputEncoderConfig::new(self.c_in, self.d_model, self.seq_len)
            .with_max_seq_len(self.max_seq_len)
            .with_resampling(self.resampling.clone())
            .init(device)?;
        let q_len = input.q_len();

        let positional = PositionalEncoding::new(q_len, self.d_model, device);

        let layer_cfg = EncoderLayerConfig::new(self.d_model, self.n_heads)
            .with_d_k(self.d_k)
            .with_d_v(self.d_v)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout);
        let encoder = EncoderStack::new(&layer_cfg, self.n_layers, device)?;

        let head = OutputHeadConfig::new(q_len, self.d_model, self.c_out, self.seq_len)
            .with_fc_dropout(self.fc_dropout)
            .with_y_range(self.y_range)
            .init(device)?;

        tracing::debug!(
            "TST built: input={} q_len={} d_model={} heads={} layers={} head_nf={}",
            input.variant_name(), q_len, self.d_model, self.n_heads, self.n_layers, head.head_nf,
        );

        let module = TstModule {
            input,
            positional,
            dropout: Dropout::new(self.dropout),
            encoder,
            head,
            c_in:    self.c_in,
            seq_len: self.seq_len,
            q_len,
        };
        Tst::from_parts(module, activation, self.batch_size)
    }

    fn validate(&self) -> TstResult<()> {
        let positive = [
            ("c_in", self.c_in),
            ("c_out", self.c_out),
            ("seq_len", self.seq_len),
            ("d_model", self.d_model),
            ("n_heads", self.n_heads),
            ("d_ff", self.d_ff),
            ("n_layers", self.n_layers),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(TstError::config(format!("{name} must be positive")));
        }
        if self.d_model % self.n_heads != 0 {
            return Err(TstError::config(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                self.d_model, self.n_heads
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(TstError::config(format!(
                "dropout ({}) must be in [0, 1)", self.dropout
            )));
        }
        if self.batch_size == Some(0) {
            return Err(TstError::config("batch_size must be positive when set"));
        }
        Ok(())
    }
}

// ─── Parameters ──────────────────────────────────────────────────────────────
// Every learned tensor of the model lives in this module tree.
// Forward only reads it; a trainer that owns it by value is the
// single writer (e.g. `module = optim.step(lr, module, grads)`).

#[derive(Module, Debug)]
pub struct TstModule<B: Backend> {
    pub input:      InputEncoder<B>,
    pub positional: PositionalEncoding<B>,
    pub dropout:    Dropout,
    pub encoder:    EncoderStack<B>,
    pub head:       OutputHead<B>,
    pub c_in:       usize,
    pub seq_len:    usize,
    pub q_len:      usize,
}

pub struct TstOutput<B: Backend> {
    /// [batch, c_out, seq_len]
    pub output:    Tensor<B, 3>,
    /// One [batch, n_heads, q_len, q_len] map per encoder layer
    pub attention: Vec<Tensor<B, 4>>,
}

impl<B: Backend> TstModule<B> {
    /// x: [batch, c_in, seq_len]; shapes are assumed checked by `Tst`.
    pub fn forward(
        &self,
        x:          Tensor<B, 3>,
        mask:       Option<Tensor<B, 2, Bool>>,
        mode:       ForwardMode,
        activation: &Activation<B>,
    ) -> TstOutput<B> {
        let u = self.embed(x, mode);
        let (z, attention) = self.encoder.forward(u, mask, mode, activation);
        let output = self.head.forward(z, mode, activation);
        TstOutput { output, attention }
    }

    /// Input encoding + positional bias + residual dropout.
    fn embed(&self, x: Tensor<B, 3>, mode: ForwardMode) -> Tensor<B, 3> {
        let u = self.input.forward(x);
        self.dropout.forward(self.positional.forward(u), mode)
    }
}

// ─── Tst ─────────────────────────────────────────────────────────────────────
// The parameter module plus the two things that cannot be
// parameters: the resolved activation and the optional fixed
// batch size. All shape checks of a forward call happen here.

#[derive(Clone, Debug)]
pub struct Tst<B: Backend> {
    module:      TstModule<B>,
    activation:  Activation<B>,
    fixed_batch: Option<usize>,
}

impl<B: Backend> Tst<B> {
    pub fn from_parts(
        module:      TstModule<B>,
        activation:  Activation<B>,
        fixed_batch: Option<usize>,
    ) -> TstResult<Self> {
        let [pos_len, d_model] = module.positional.dims();
        let q_len = module.input.q_len();
        if pos_len != q_len || module.q_len != q_len || module.head.head_nf != q_len * d_model {
            return Err(TstError::shape(
                "positional encoding",
                &[q_len, d_model],
                &[pos_len, module.head.head_nf / pos_len.max(1)],
            ));
        }
        Ok(Self { module, activation, fixed_batch })
    }

    pub fn module(&self) -> &TstModule<B> {
        &self.module
    }

    /// Sequence length seen by the encoder (after any resampling).
    pub fn q_len(&self) -> usize {
        self.module.q_len
    }

    /// Learned scalars. Batch-norm running statistics are not learned
    /// and are left out.
    pub fn num_params(&self) -> usize {
        let running: usize = self
            .module
            .encoder
            .layers
            .iter()
            .map(|layer| layer.norm_attn.num_running() + layer.norm_ffn.num_running())
            .sum();
        self.module.num_params() - running
    }

    /// x: [batch, c_in, seq_len] → [batch, c_out, seq_len]
    pub fn forward(
        &self,
        x:    Tensor<B, 3>,
        mask: Option<Tensor<B, 2, Bool>>,
        mode: ForwardMode,
    ) -> TstResult<Tensor<B, 3>> {
        Ok(self.forward_with_attention(x, mask, mode)?.output)
    }

    /// Like `forward`, also returning every layer's attention weights.
    pub fn forward_with_attention(
        &self,
        x:    Tensor<B, 3>,
        mask: Option<Tensor<B, 2, Bool>>,
        mode: ForwardMode,
    ) -> TstResult<TstOutput<B>> {
        self.check_inputs(&x, mask.as_ref())?;
        Ok(self.module.forward(x, mask, mode, &self.activation))
    }

    /// Runs `x` through the model in train mode and returns a model whose
    /// batch-norm running statistics include this batch.
    pub fn accumulate_norm_statistics(
        self,
        x:    Tensor<B, 3>,
        mask: Option<Tensor<B, 2, Bool>>,
    ) -> TstResult<Self> {
        self.check_inputs(&x, mask.as_ref())?;
        let Self { module, activation, fixed_batch } = self;

        let u = module.embed(x, ForwardMode::Train);
        let encoder = module.encoder.accumulate(u, mask, &activation);

        Ok(Self {
            module: TstModule { encoder, ..module },
            activation,
            fixed_batch,
        })
    }

    fn check_inputs(&self, x: &Tensor<B, 3>, mask: Option<&Tensor<B, 2, Bool>>) -> TstResult<()> {
        SeriesShape::from_dims(x.dims()).check(
            self.module.c_in,
            self.module.seq_len,
            self.fixed_batch,
        )?;
        if let Some(mask) = mask {
            let q_len = self.module.q_len;
            if mask.dims() != [q_len, q_len] {
                return Err(TstError::shape("attention mask", &[q_len, q_len], &mask.dims()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        attention::{attention_mask, causal_mask},
        test_utils::{assert_close, values, TestBackend},
    };
    use burn::tensor::Distribution;

    fn series(shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    fn small_config() -> TstConfig {
        TstConfig::new(3, 2, 20)
            .with_d_model(16)
            .with_n_heads(4)
            .with_d_ff(32)
            .with_n_layers(2)
    }

    #[test]
    fn test_defaults_follow_the_reference_model() {
        let cfg = TstConfig::new(3, 1, 50);
        assert_eq!(cfg.d_model, 128);
        assert_eq!(cfg.n_heads, 16);
        assert_eq!(cfg.d_ff, 256);
        assert_eq!(cfg.n_layers, 3);
        assert_eq!(cfg.activation, ActivationKind::Gelu);
        assert_eq!(cfg.dropout, 0.1);
        assert_eq!(cfg.fc_dropout, 0.0);
        assert_eq!(cfg.max_seq_len, None);
    }

    #[test]
    fn test_shape_for_any_batch_size() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        for batch in [1, 2, 5] {
            let y = model.forward(series([batch, 3, 20]), None, ForwardMode::Eval).unwrap();
            assert_eq!(y.dims(), [batch, 2, 20]);
        }
    }

    #[test]
    fn test_train_mode_shape_and_finite() {
        let device = Default::default();
        let model = small_config().with_fc_dropout(0.2).init::<TestBackend>(&device).unwrap();
        let y = model.forward(series([4, 3, 20]), None, ForwardMode::Train).unwrap();
        assert_eq!(y.dims(), [4, 2, 20]);
        assert!(values(y).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_resampled_model_keeps_output_length() {
        let device = Default::default();
        let model = TstConfig::new(3, 1, 100)
            .with_max_seq_len(Some(30))
            .with_d_model(16)
            .with_n_heads(2)
            .with_d_ff(16)
            .with_n_layers(1)
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(model.q_len(), 30);
        assert_eq!(model.module().positional.dims(), [30, 16]);
        assert_eq!(model.module().head.head_nf, 30 * 16);

        let out = model
            .forward_with_attention(series([2, 3, 100]), None, ForwardMode::Eval)
            .unwrap();
        assert_eq!(out.output.dims(), [2, 1, 100]);
        assert_eq!(out.attention[0].dims(), [2, 2, 30, 30]);
    }

    #[test]
    fn test_custom_conv_model() {
        let device = Default::default();
        let model = small_config()
            .with_resampling(Some(ConvResamplingConfig::new(4).with_stride(2)))
            .init::<TestBackend>(&device)
            .unwrap();
        // (20 - 3 - 1) / 2 + 1 = 9
        assert_eq!(model.q_len(), 9);
        let y = model.forward(series([3, 3, 20]), None, ForwardMode::Eval).unwrap();
        assert_eq!(y.dims(), [3, 2, 20]);
    }

    #[test]
    fn test_eval_is_deterministic() {
        let device = Default::default();
        let model = small_config().with_dropout(0.3).init::<TestBackend>(&device).unwrap();
        let x = series([2, 3, 20]);
        let a = model.forward(x.clone(), None, ForwardMode::Eval).unwrap();
        let b = model.forward(x, None, ForwardMode::Eval).unwrap();
        assert_eq!(values(a), values(b));
    }

    #[test]
    fn test_y_range_holds_over_random_trials() {
        let device = Default::default();
        let model = small_config()
            .with_y_range(Some((-0.5, 1.5)))
            .init::<TestBackend>(&device)
            .unwrap();
        for trial in 0..5 {
            let std = 10f64.powi(trial);
            let x = Tensor::random([3, 3, 20], Distribution::Normal(0.0, std), &device);
            for mode in [ForwardMode::Train, ForwardMode::Eval] {
                let y = values(model.forward(x.clone(), None, mode).unwrap());
                assert!(y.iter().all(|v| (-0.5..=1.5).contains(v)), "trial {trial}");
            }
        }
    }

    #[test]
    fn test_attention_rows_sum_to_one() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        let out = model
            .forward_with_attention(series([2, 3, 20]), Some(causal_mask(20, &device)), ForwardMode::Eval)
            .unwrap();
        assert_eq!(out.attention.len(), 2);
        for weights in out.attention {
            let sums = values(weights.sum_dim(3));
            assert_close(&sums, &vec![1.0; sums.len()], 1e-5);
        }
    }

    #[test]
    fn test_fully_masked_query_gives_finite_output() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        let mask = attention_mask(20, 20, &device, |i, _| i == 7);
        let y = model.forward(series([2, 3, 20]), Some(mask), ForwardMode::Eval).unwrap();
        assert!(values(y).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_custom_activation_is_used() {
        fn zero(x: Tensor<TestBackend, 3>) -> Tensor<TestBackend, 3> {
            x.zeros_like()
        }
        let device = Default::default();
        let model = small_config()
            .init_with_activation::<TestBackend>(&device, Activation::Custom(zero))
            .unwrap();
        // The head sees only zeros, so the output is the head bias.
        let bias = values(model.module().head.linear.bias.as_ref().unwrap().val());
        let y = values(model.forward(series([1, 3, 20]), None, ForwardMode::Eval).unwrap());
        assert_close(&y, &bias, 1e-6);
    }

    #[test]
    fn test_input_shape_mismatch() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        let err = model.forward(series([2, 4, 20]), None, ForwardMode::Eval).unwrap_err();
        assert_eq!(err, TstError::shape("input", &[2, 3, 20], &[2, 4, 20]));
        let err = model.forward(series([2, 3, 21]), None, ForwardMode::Eval).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_fixed_batch_size_is_enforced() {
        let device = Default::default();
        let model = small_config()
            .with_batch_size(Some(4))
            .init::<TestBackend>(&device)
            .unwrap();
        assert!(model.forward(series([4, 3, 20]), None, ForwardMode::Eval).is_ok());
        let err = model.forward(series([3, 3, 20]), None, ForwardMode::Eval).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let device = Default::default();
        let model = TstConfig::new(3, 1, 100)
            .with_max_seq_len(Some(30))
            .with_d_model(8)
            .with_n_heads(2)
            .with_d_ff(8)
            .with_n_layers(1)
            .init::<TestBackend>(&device)
            .unwrap();
        // A mask over the raw length is wrong once time is resampled.
        let err = model
            .forward(series([1, 3, 100]), Some(causal_mask(100, &device)), ForwardMode::Eval)
            .unwrap_err();
        assert_eq!(err, TstError::shape("attention mask", &[30, 30], &[100, 100]));
    }

    #[test]
    fn test_configuration_errors() {
        let device = Default::default();
        let cases = [
            small_config().with_n_heads(3),
            small_config().with_n_layers(0),
            small_config().with_dropout(1.0),
            small_config().with_y_range(Some((2.0, 1.0))),
            small_config().with_batch_size(Some(0)),
            small_config().with_max_seq_len(Some(0)),
            small_config().with_resampling(Some(ConvResamplingConfig::new(50))),
        ];
        for cfg in cases {
            let err = cfg.init::<TestBackend>(&device).unwrap_err();
            assert!(err.is_configuration(), "{err}");
        }
    }

    #[test]
    fn test_accumulated_statistics_change_eval_output() {
        let device = Default::default();
        let model = small_config().with_dropout(0.0).init::<TestBackend>(&device).unwrap();
        let x = series([4, 3, 20]).add_scalar(2.0);
        let before = values(model.forward(x.clone(), None, ForwardMode::Eval).unwrap());
        let model = model.accumulate_norm_statistics(x.clone(), None).unwrap();
        let after = values(model.forward(x, None, ForwardMode::Eval).unwrap());
        assert!(before.iter().zip(&after).any(|(a, b)| (a - b).abs() > 1e-6));
    }

    #[test]
    fn test_config_json_round_trip_keeps_options() {
        let cfg = small_config()
            .with_max_seq_len(Some(10))
            .with_y_range(Some((0.0, 1.0)))
            .with_activation(ActivationKind::Relu);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TstConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_seq_len, Some(10));
        assert_eq!(back.y_range, Some((0.0, 1.0)));
        assert_eq!(back.activation, ActivationKind::Relu);
    }

    #[test]
    fn test_num_params_counts_learned_scalars_only() {
        let model = TstConfig::new(2, 1, 4)
            .with_d_model(4)
            .with_n_heads(2)
            .with_d_ff(8)
            .with_n_layers(1)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        // input 2·4+4, positional 4·4, attention 4·(4·4), feed-forward
        // (4·8+8)+(8·4+4), two norms 2·(4+4), head 16·4+4
        assert_eq!(model.num_params(), 12 + 16 + 64 + 76 + 16 + 68);
    }

    #[test]
    fn test_accumulate_on_autodiff_backend() {
        type AdBackend = burn::backend::Autodiff<TestBackend>;
        let device = Default::default();
        let model = small_config().with_dropout(0.0).init::<AdBackend>(&device).unwrap();
        let x = Tensor::<AdBackend, 3>::random([4, 3, 20], Distribution::Normal(0.0, 1.0), &device);

        let model = model.accumulate_norm_statistics(x.clone(), None).unwrap();
        let stats = &model.module().encoder.layers[0].norm_attn;
        assert!(!stats.running_var.value().is_require_grad());

        // Still trainable afterwards, and the running stats stay out of the graph.
        let grads = model.forward(x, None, ForwardMode::Eval).unwrap().sum().backward();
        let layer = &model.module().encoder.layers[0];
        assert!(layer.norm_attn.gamma.val().grad(&grads).is_some());
        assert!(layer.norm_attn.running_mean.value().grad(&grads).is_none());
    }

    #[test]
    fn test_gradients_reach_parameters() {
        type AdBackend = burn::backend::Autodiff<TestBackend>;
        let device = Default::default();
        let model = small_config().init::<AdBackend>(&device).unwrap();
        let x = Tensor::<AdBackend, 3>::random([2, 3, 20], Distribution::Default, &device);
        let y = model.forward(x, None, ForwardMode::Train).unwrap();
        let grads = y.sum().backward();

        let module = model.module();
        assert!(module.positional.bias.val().grad(&grads).is_some());
        assert!(module.encoder.layers[0].self_attn.w_q.weight.val().grad(&grads).is_some());
        assert!(module.encoder.layers[1].norm_ffn.gamma.val().grad(&grads).is_some());
    }
}
