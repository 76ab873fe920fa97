/*!
 * Slices over relation positions.
 *
 * Bounds follow the usual sequence conventions: missing bounds default to
 * the ends, negative bounds count from the end, out-of-range bounds are
 * clipped, and a negative step walks backwards.
 */

use crate::errors::{ModelError, ModelResult};

/// `start:stop:step` selection of positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// Every position
    pub fn full() -> Self {
        Self::default()
    }

    /// `start..stop` with both bounds given
    pub fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop))
    }

    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// True when the slice selects a run of adjacent positions
    pub fn is_contiguous(&self) -> bool {
        matches!(self.step, None | Some(1))
    }

    /// Normalized `(start, stop, step)` for a sequence of length `len`
    pub fn bounds(&self, len: usize) -> ModelResult<(isize, isize, isize)> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ModelError::InvalidSlice);
        }
        let len = len as isize;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clip = |bound: isize| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = match self.start {
            Some(s) => clip(s),
            None if step < 0 => upper,
            None => lower,
        };
        let stop = match self.stop {
            Some(s) => clip(s),
            None if step < 0 => lower,
            None => upper,
        };
        Ok((start, stop, step))
    }

    /// Positions selected in a sequence of length `len`, in slice order
    pub fn indices(&self, len: usize) -> ModelResult<Vec<usize>> {
        let (start, stop, step) = self.bounds(len)?;
        let mut indices = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(indices)
    }
}

impl From<std::ops::Range<isize>> for Slice {
    fn from(range: std::ops::Range<isize>) -> Self {
        Slice::range(range.start, range.end)
    }
}
