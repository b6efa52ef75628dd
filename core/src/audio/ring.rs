//! Overwrite-oldest stereo ring buffer

/// A single stereo sample pair
pub type StereoFrame = (f32, f32);

/// Fixed-capacity circular store of stereo frames.
///
/// Left and right channels live in parallel arrays indexed by two cursors
/// that wrap with a power-of-two mask. One slot is always left empty so that
/// `write == read` unambiguously means "empty"; the buffer therefore holds at
/// most `capacity - 1` frames.
///
/// Pushing never fails: when full, the oldest frame is dropped to make room.
/// Pulling never blocks: any shortfall is filled with silence.
#[derive(Debug, Clone)]
pub struct AudioRingBuffer {
    left: Box<[f32]>,
    right: Box<[f32]>,
    mask: usize,
    write: usize,
    read: usize,
    overwritten: u64,
}

impl AudioRingBuffer {
    /// Create a buffer with room for `capacity` slots.
    ///
    /// `capacity` is rounded up to the next power of two (minimum 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            left: vec![0.0; capacity].into_boxed_slice(),
            right: vec![0.0; capacity].into_boxed_slice(),
            mask: capacity - 1,
            write: 0,
            read: 0,
            overwritten: 0,
        }
    }

    /// Number of slots, including the one kept empty
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Frames currently buffered
    pub fn available_frames(&self) -> usize {
        self.write.wrapping_sub(self.read) & self.mask
    }

    pub fn is_empty(&self) -> bool {
        self.write == self.read
    }

    pub fn is_full(&self) -> bool {
        self.available_frames() == self.mask
    }

    /// Frames dropped by overwrite since creation
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    /// Append one frame, dropping the oldest if the buffer is full
    #[inline]
    pub fn push_frame(&mut self, (l, r): StereoFrame) {
        if self.is_full() {
            self.read = (self.read + 1) & self.mask;
            self.overwritten += 1;
        }
        self.left[self.write] = l;
        self.right[self.write] = r;
        self.write = (self.write + 1) & self.mask;
    }

    pub fn push<I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = StereoFrame>,
    {
        for frame in frames {
            self.push_frame(frame);
        }
    }

    /// Append interleaved `[l, r, l, r, ...]` samples. A trailing odd sample is ignored.
    pub fn push_interleaved(&mut self, samples: &[f32]) {
        for pair in samples.chunks_exact(2) {
            self.push_frame((pair[0], pair[1]));
        }
    }

    /// Fill `left` and `right` (same length) from the buffer.
    ///
    /// Returns how many frames were actually buffered; the rest of both
    /// slices is zeroed. Does not allocate.
    pub fn pull_into(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let requested = left.len().min(right.len());
        let count = requested.min(self.available_frames());

        for i in 0..count {
            let idx = (self.read + i) & self.mask;
            left[i] = self.left[idx];
            right[i] = self.right[idx];
        }
        self.read = (self.read + count) & self.mask;

        left[count..].fill(0.0);
        right[count..].fill(0.0);
        count
    }

    /// Fill an interleaved stereo block. Returns frames actually buffered.
    pub fn pull_interleaved(&mut self, out: &mut [f32]) -> usize {
        let requested = out.len() / 2;
        let count = requested.min(self.available_frames());

        for (i, pair) in out.chunks_exact_mut(2).take(count).enumerate() {
            let idx = (self.read + i) & self.mask;
            pair[0] = self.left[idx];
            pair[1] = self.right[idx];
        }
        self.read = (self.read + count) & self.mask;

        out[count * 2..].fill(0.0);
        count
    }

    /// Exactly `n` frames: buffered ones first, then silence
    pub fn pull(&mut self, n: usize) -> Vec<StereoFrame> {
        let mut left = vec![0.0; n];
        let mut right = vec![0.0; n];
        self.pull_into(&mut left, &mut right);
        left.into_iter().zip(right).collect()
    }

    /// Take everything buffered as interleaved samples
    pub fn drain_interleaved(&mut self) -> Vec<f32> {
        let mut out = vec![0.0; self.available_frames() * 2];
        self.pull_interleaved(&mut out);
        out
    }

    pub fn clear(&mut self) {
        self.read = self.write;
    }
}
