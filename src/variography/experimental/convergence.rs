use ndarray::Array2;

/// Deviation of the running Monte-Carlo estimate from the model, recorded at checkpoints.
///
/// Each row of [`ConvergenceTracker::deltas`] is `running_estimate - true_variogram` for one
/// checkpoint, over all distance bins.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceTracker {
    midpoints: Vec<f64>,
    true_variogram: Vec<f64>,
    deltas: Vec<Vec<f64>>,
}

impl ConvergenceTracker {
    pub fn new(midpoints: Vec<f64>, true_variogram: Vec<f64>) -> Self {
        Self {
            midpoints,
            true_variogram,
            deltas: Vec::new(),
        }
    }

    /// Record the running estimate at a checkpoint
    pub(crate) fn feed(&mut self, estimate: &[f64]) {
        let delta = estimate
            .iter()
            .zip(self.true_variogram.iter())
            .map(|(e, t)| e - t)
            .collect();
        self.deltas.push(delta);
    }

    pub fn midpoints(&self) -> &[f64] {
        &self.midpoints
    }

    pub fn true_variogram(&self) -> &[f64] {
        &self.true_variogram
    }

    /// Number of checkpoints recorded
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Deviations at the last checkpoint
    pub fn last(&self) -> Option<&[f64]> {
        self.deltas.last().map(|d| d.as_slice())
    }

    /// Checkpoints by bins
    pub fn deltas(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.deltas.len(), self.midpoints.len()), |(i, j)| {
            self.deltas[i][j]
        })
    }
}
