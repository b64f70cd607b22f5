use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use sd_core::signal::{AudioSignal, SpectrumMagnitude};

use crate::error::AudioError;

/// Spectre d'amplitude plein : DFT sur toute la longueur du signal.
///
/// No window, no zero-padding. The real FFT yields `N/2+1` bins; the upper
/// half is rebuilt from conjugate symmetry (`|X[k]| = |X[N-k]|`), so the
/// output has exactly `N` bins, mirror frequencies included.
///
/// Plans are cached by the planner, so reusing one computer across clips of
/// the same length only plans once.
///
/// # Example
/// ```
/// use sd_audio::fft::SpectrumComputer;
/// use sd_core::signal::AudioSignal;
/// let mut computer = SpectrumComputer::new();
/// let spectrum = computer
///     .magnitude(&AudioSignal::new(vec![1.0, 0.0, 0.0, 0.0], 2000))
///     .unwrap();
/// assert_eq!(spectrum.len(), 4);
/// assert!(spectrum.bins().iter().all(|b| (b - 1.0).abs() < 1e-12));
/// ```
pub struct SpectrumComputer {
    planner: RealFftPlanner<f64>,
}

impl Default for SpectrumComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumComputer {
    /// Create a computer with an empty plan cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::<f64>::new(),
        }
    }

    /// Magnitude of every DFT coefficient of `signal`. Output length = input length.
    ///
    /// # Errors
    /// Returns [`AudioError::Spectrum`] if the FFT rejects its buffers.
    pub fn magnitude(&mut self, signal: &AudioSignal) -> Result<SpectrumMagnitude, AudioError> {
        let n = signal.len();
        if n == 0 {
            return Ok(SpectrumMagnitude::new(Vec::new()));
        }

        let plan = self.planner.plan_fft_forward(n);
        let mut input: Vec<f64> = signal.samples().iter().map(|&s| f64::from(s)).collect();
        let mut spectrum = plan.make_output_vec();
        forward(plan.as_ref(), &mut input, &mut spectrum)?;

        let half: Vec<f64> = spectrum.iter().map(|c| c.norm()).collect();
        let bins = (0..n)
            .map(|k| if k < half.len() { half[k] } else { half[n - k] })
            .collect();

        log::debug!("Spectre : {n} bins ({} calculés)", half.len());
        Ok(SpectrumMagnitude::new(bins))
    }
}

fn forward(
    plan: &dyn RealToComplex<f64>,
    input: &mut [f64],
    spectrum: &mut [Complex<f64>],
) -> Result<(), AudioError> {
    let n = input.len();
    let mut scratch = plan.make_scratch_vec();
    plan.process_with_scratch(input, spectrum, &mut scratch)
        .map_err(|e| AudioError::Spectrum(format!("FFT de taille {n} : {e}")))
}

/// One-shot convenience wrapper around [`SpectrumComputer::magnitude`].
///
/// # Errors
/// See [`SpectrumComputer::magnitude`].
pub fn magnitude_spectrum(signal: &AudioSignal) -> Result<SpectrumMagnitude, AudioError> {
    SpectrumComputer::new().magnitude(signal)
}
