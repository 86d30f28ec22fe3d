// ============================================================
// Layer 3 — Forward Mode
// ============================================================
// Dropout and batch-norm statistics depend on whether the
// caller is training or evaluating. The mode is chosen per
// forward call by whoever drives the model; the model never
// remembers it between calls.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForwardMode {
    /// Dropout active, normalisation uses batch statistics
    Train,
    /// Dropout is identity, normalisation uses running statistics
    #[default]
    Eval,
}

impl ForwardMode {
    pub fn is_train(self) -> bool {
        matches!(self, Self::Train)
    }
}
