//! Magnitude spectrum of the analysis window.
//!
//! The FFT is planned once at construction and all buffers are pre-sized,
//! so [`Spectrum::compute`] does not allocate.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Planned forward FFT with owned work buffers.
pub struct Spectrum {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl Spectrum {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            magnitudes: vec![0.0; size / 2],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Magnitudes of bins `0..size/2` of `window`.
    ///
    /// `window` shorter than the transform is zero-padded; longer is truncated.
    pub fn compute(&mut self, window: &[f32]) -> &[f32] {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(window.get(i).copied().unwrap_or(0.0), 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        for (m, c) in self.magnitudes.iter_mut().zip(self.buffer.iter()) {
            *m = c.norm();
        }
        &self.magnitudes
    }
}

impl std::fmt::Debug for Spectrum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spectrum").field("size", &self.size).finish()
    }
}
