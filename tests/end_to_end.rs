use burn::{backend::NdArray, prelude::*, tensor::Distribution};
use tst::{causal_mask, ForwardMode, TstConfig};

type B = NdArray;

fn series(shape: [usize; 3]) -> Tensor<B, 3> {
    Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
}

fn to_vec(t: Tensor<B, 3>) -> Vec<f32> {
    t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
}

#[test]
fn three_channel_series_maps_to_one_output_channel() {
    let device = Default::default();
    let model = TstConfig::new(3, 1, 50)
        .with_d_model(64)
        .with_n_heads(8)
        .with_d_ff(256)
        .with_n_layers(2)
        .init::<B>(&device)
        .unwrap();

    let y = model.forward(series([4, 3, 50]), None, ForwardMode::Eval).unwrap();
    assert_eq!(y.dims(), [4, 1, 50]);
    assert!(to_vec(y).iter().all(|v| v.is_finite()));
}

#[test]
fn long_series_resampled_and_masked() {
    let device = Default::default();
    let model = TstConfig::new(2, 3, 100)
        .with_max_seq_len(Some(30))
        .with_d_model(32)
        .with_n_heads(4)
        .with_n_layers(2)
        .with_y_range(Some((-2.0, 2.0)))
        .init::<B>(&device)
        .unwrap();
    assert_eq!(model.q_len(), 30);

    let mask = causal_mask::<B>(30, &device);
    let out = model
        .forward_with_attention(series([5, 2, 100]), Some(mask), ForwardMode::Train)
        .unwrap();

    assert_eq!(out.output.dims(), [5, 3, 100]);
    assert_eq!(out.attention.len(), 2);
    assert_eq!(out.attention[0].dims(), [5, 4, 30, 30]);
    assert!(to_vec(out.output).iter().all(|v| (-2.0..=2.0).contains(v)));
}

#[test]
fn wrong_channel_count_is_a_shape_error() {
    let model = TstConfig::new(3, 1, 20)
        .with_d_model(16)
        .with_n_heads(4)
        .with_n_layers(1)
        .init::<B>(&Default::default())
        .unwrap();

    let err = model.forward(series([2, 4, 20]), None, ForwardMode::Eval).unwrap_err();
    assert!(err.is_shape_mismatch());
}
