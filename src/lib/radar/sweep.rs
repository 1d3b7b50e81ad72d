use ndarray::{Array2, ArrayView1};

use super::RadarError;

/// One full rotation of intensity samples, `spokes` rows of `spoke_len` samples.
///
/// The grid is read-only once constructed. Spokes are handed out as row views
/// in batches; the cursor that remembers where the next batch starts wraps
/// around at the end of the sweep.
#[derive(Debug, Clone)]
pub struct SweepBuffer {
    grid: Array2<u8>,
    cursor: usize,
}

impl SweepBuffer {
    pub fn new(grid: Array2<u8>, spoke_len: usize) -> Result<Self, RadarError> {
        let (spokes, width) = grid.dim();
        if spokes == 0 || width != spoke_len {
            return Err(RadarError::SweepShape {
                spokes,
                spoke_len: width,
                expected: spoke_len,
            });
        }
        Ok(SweepBuffer { grid, cursor: 0 })
    }

    pub fn spokes(&self) -> usize {
        self.grid.nrows()
    }

    pub fn spoke_len(&self) -> usize {
        self.grid.ncols()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn seek(&mut self, position: usize) {
        self.cursor = position % self.spokes();
    }

    pub fn spoke(&self, index: usize) -> ArrayView1<'_, u8> {
        self.grid.row(index % self.spokes())
    }

    /// Returns the `count` spokes starting at the cursor as `(index, samples)`
    /// and moves the cursor past them.
    pub fn next_batch(
        &mut self,
        count: usize,
    ) -> impl Iterator<Item = (usize, ArrayView1<'_, u8>)> {
        let spokes = self.spokes();
        let start = self.cursor;
        self.cursor = (start + count) % spokes;

        let grid = &self.grid;
        (0..count).map(move |offset| {
            let index = (start + offset) % spokes;
            (index, grid.row(index))
        })
    }
}
