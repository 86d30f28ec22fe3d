// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns used by the application layer:
//
//   config_store.rs — Model configuration persistence
//                     Saves a TstConfig as pretty JSON so a
//                     later run rebuilds the same architecture.
//
//   report.rs       — Probe report logging
//                     Appends one CSV row per probe run
//                     (timing and output statistics).
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Rust Book §12 (I/O and File Handling)

/// TstConfig JSON save / load
pub mod config_store;

/// Probe run CSV logger
pub mod report;
