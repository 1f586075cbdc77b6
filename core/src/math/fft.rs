use crate::prelude::{CoreError, CoreResult};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Pre-planned forward transform with reusable input, output and scratch
/// buffers, sized for exactly one sample count.
pub struct TransformResources {
    fft: Arc<dyn Fft<f64>>,
    input: Vec<f64>,
    spectrum: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl TransformResources {
    pub fn new(size: usize) -> CoreResult<Self> {
        if size < 2 {
            return Err(CoreError::HardwareUnavailable(format!(
                "cannot plan a transform of {} samples",
                size
            )));
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::zero(); fft.get_inplace_scratch_len()];
        Ok(Self {
            fft,
            input: vec![0.0; size],
            spectrum: vec![Complex64::zero(); size],
            scratch,
        })
    }

    pub fn size(&self) -> usize {
        self.input.len()
    }

    /// Real-valued input buffer, filled by the caller before `execute`.
    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut self.input
    }

    /// Runs the forward transform over the input buffer and returns the
    /// non-redundant half of the spectrum (bins `0..=n/2`).
    pub fn execute(&mut self) -> &[Complex64] {
        for (slot, &value) in self.spectrum.iter_mut().zip(self.input.iter()) {
            *slot = Complex64::new(value, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        let half = self.input.len() / 2;
        &self.spectrum[..=half]
    }
}
