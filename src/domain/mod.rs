// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the model without touching
// any tensor code:
//
//   error.rs      — TstError (configuration / shape mismatch)
//   mode.rs       — ForwardMode (train vs. eval per call)
//   activation.rs — ActivationKind, the serialisable choice
//   shape.rs      — SeriesShape, the (batch, channels, len) triple
//   resampling.rs — ResamplingPlan, the strided-conv arithmetic
//   traits.rs     — ConfigSource abstraction
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Error taxonomy shared by every layer of the model
pub mod error;

/// Train / eval switch passed into every forward call
pub mod mode;

/// Activation choice as it appears in configuration
pub mod activation;

/// (batch, channels, len) metadata for input series
pub mod shape;

/// Temporal resampling arithmetic for long series
pub mod resampling;

/// Core abstractions (traits) that other layers implement
pub mod traits;
