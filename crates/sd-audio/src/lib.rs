// Audio loading, spectrum computation and spectral divergence for specdiv.

pub mod decode;
pub mod divergence;
pub mod error;
pub mod fft;
pub mod loader;
pub mod resample;
pub mod worker;

pub use divergence::{DivergenceCalculator, RelativeEntropy, compute};
pub use error::{AudioError, DegenerateInputError, LoadError};
pub use loader::{AudioLoader, AudioSource};
