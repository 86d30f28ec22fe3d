// ============================================================
// Layer 3 — Series Shape
// ============================================================
// Time series tensors follow the (batch, channels, len)
// convention. SeriesShape carries those three numbers so that
// a forward call can be checked against the shape fixed at
// construction before any tensor work happens.

use crate::domain::error::{Result, TstError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesShape {
    pub batch:    usize,
    pub channels: usize,
    pub len:      usize,
}

impl SeriesShape {
    pub fn new(batch: usize, channels: usize, len: usize) -> Self {
        Self { batch, channels, len }
    }

    pub fn from_dims(dims: [usize; 3]) -> Self {
        Self::new(dims[0], dims[1], dims[2])
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.batch, self.channels, self.len]
    }

    /// Checks an observed input shape against the channel count and
    /// length the model was built for. When `fixed_batch` is set the
    /// batch dimension must match it too.
    pub fn check(&self, channels: usize, len: usize, fixed_batch: Option<usize>) -> Result<()> {
        let batch = fixed_batch.unwrap_or(self.batch);
        if self.batch == 0 || self.channels != channels || self.len != len || self.batch != batch {
            return Err(TstError::shape(
                "input",
                &[batch.max(1), channels, len],
                &self.dims(),
            ));
        }
        Ok(())
    }
}
