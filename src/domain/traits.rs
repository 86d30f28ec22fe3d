// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer needs a model configuration but does
// not care where it comes from: a JSON file written earlier,
// or flags typed on the command line. Both implement
// ConfigSource.

use anyhow::Result;

// ─── ConfigSource ─────────────────────────────────────────────────────────────
/// Any component that can produce a model configuration.
///
/// Implementations:
///   - ConfigStore → reads a JSON file from disk
///   - ModelArgs   → builds it from CLI flags
pub trait ConfigSource<C> {
    fn load_config(&self) -> Result<C>;
}
