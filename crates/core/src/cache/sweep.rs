//! Probabilistic sweep scheduling.

/// Decides whether a request should run the expired-entry sweep.
///
/// Probabilities of exactly 0 and 1 never touch the random source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPolicy {
    probability: f64,
}

impl SweepPolicy {
    /// Sweep on roughly `probability` of requests. Clamped to `[0, 1]`.
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
        Self { probability }
    }

    /// Sweep on every request.
    pub fn always() -> Self {
        Self::new(1.0)
    }

    /// Never sweep.
    pub fn never() -> Self {
        Self::new(0.0)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Roll for this request.
    pub fn should_sweep(&self) -> bool {
        if self.probability <= 0.0 {
            false
        } else if self.probability >= 1.0 {
            true
        } else {
            rand::random::<f64>() < self.probability
        }
    }
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self::new(0.01)
    }
}
