use crate::signal::DivergenceScore;

/// Compare deux spectres d'amplitude tronqués à la même longueur.
///
/// Implémenté par : `RelativeEntropy` (sd-audio).
///
/// # Example
/// ```
/// use sd_core::traits::SpectralMetric;
/// use sd_core::signal::DivergenceScore;
///
/// struct L1;
/// impl SpectralMetric for L1 {
///     type Error = std::convert::Infallible;
///     fn divergence(&self, sample: &[f64], reference: &[f64]) -> Result<DivergenceScore, Self::Error> {
///         Ok(DivergenceScore::new(sample.iter().zip(reference).map(|(p, q)| (p - q).abs()).sum()))
///     }
///     fn name(&self) -> &'static str { "l1" }
/// }
/// assert_eq!(L1.divergence(&[1.0, 2.0], &[1.0, 1.0]).unwrap().value(), 1.0);
/// ```
pub trait SpectralMetric: Send + Sync {
    /// Failure raised on degenerate spectra.
    type Error;

    /// Dissimilarité de `sample` relativement à `reference`.
    ///
    /// CONTRAT : `sample.len() == reference.len()`. Les deux tranches sont des
    /// poids non négatifs non normalisés ; la métrique normalise elle-même.
    ///
    /// # Errors
    /// Implementation-defined, for inputs the metric cannot score.
    fn divergence(&self, sample: &[f64], reference: &[f64])
    -> Result<DivergenceScore, Self::Error>;

    /// Nom lisible pour le debug/logs.
    fn name(&self) -> &'static str;
}
