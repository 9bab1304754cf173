use ndarray::{Array3, ArrayView1};
use tracing::warn;

/// Padding × range × distance-bin deviations of the converged estimate from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddingErrorTensor {
    deltas: Array3<f64>,
}

/// A bin whose deviation grew when padding increased.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonotonicityViolation {
    pub range: usize,
    pub bin: usize,
    /// Padding index with the smaller padding
    pub from_padding: usize,
    /// Padding index with the larger padding and the larger deviation
    pub to_padding: usize,
    pub from_deviation: f64,
    pub to_deviation: f64,
}

impl PaddingErrorTensor {
    pub fn new(deltas: Array3<f64>) -> Self {
        Self { deltas }
    }

    pub(crate) fn zeros(n_padding: usize, n_range: usize, n_bins: usize) -> Self {
        Self::new(Array3::zeros((n_padding, n_range, n_bins)))
    }

    pub(crate) fn set(&mut self, padding: usize, range: usize, deltas: &[f64]) {
        for (cell, delta) in self
            .deltas
            .slice_mut(ndarray::s![padding, range, ..])
            .iter_mut()
            .zip(deltas)
        {
            *cell = *delta;
        }
    }

    pub fn n_padding(&self) -> usize {
        self.deltas.shape()[0]
    }

    pub fn n_range(&self) -> usize {
        self.deltas.shape()[1]
    }

    pub fn n_bins(&self) -> usize {
        self.deltas.shape()[2]
    }

    pub fn get(&self, padding: usize, range: usize, bin: usize) -> f64 {
        self.deltas[[padding, range, bin]]
    }

    /// Deviations over all bins for one sweep cell
    pub fn bins(&self, padding: usize, range: usize) -> ArrayView1<'_, f64> {
        self.deltas.slice(ndarray::s![padding, range, ..])
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.deltas
    }

    pub fn into_array(self) -> Array3<f64> {
        self.deltas
    }

    /// Every place among the first `max_bin` bins where the deviation magnitude grows with
    /// padding.
    ///
    /// Padding indexes are compared in the order given by `padding_order`, which must list
    /// them from the smallest to the largest padding. NaN deviations are skipped.
    pub fn monotonicity_violations(
        &self,
        max_bin: usize,
        padding_order: &[usize],
    ) -> Vec<MonotonicityViolation> {
        let mut violations = Vec::new();
        for range in 0..self.n_range() {
            for bin in 0..max_bin.min(self.n_bins()) {
                for pair in padding_order.windows(2) {
                    let (from, to) = (pair[0], pair[1]);
                    let a = self.get(from, range, bin).abs();
                    let b = self.get(to, range, bin).abs();
                    if b > a {
                        let violation = MonotonicityViolation {
                            range,
                            bin,
                            from_padding: from,
                            to_padding: to,
                            from_deviation: a,
                            to_deviation: b,
                        };
                        warn!(?violation, "deviation grows with padding");
                        violations.push(violation);
                    }
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_growing_deviation() {
        //two paddings, two ranges, three bins
        let deltas = Array3::from_shape_vec(
            (2, 2, 3),
            vec![
                0.3, -0.2, 0.1, //
                0.0, 0.5, f64::NAN, //
                0.1, 0.2, -0.4, //
                0.0, -0.6, 0.2,
            ],
        )
        .unwrap();
        let tensor = PaddingErrorTensor::new(deltas);
        assert_eq!(tensor.n_padding(), 2);
        assert_eq!(tensor.bins(1, 0).len(), 3);

        let violations = tensor.monotonicity_violations(3, &[0, 1]);
        assert_eq!(violations.len(), 2);
        assert_eq!((violations[0].range, violations[0].bin), (0, 2));
        assert_eq!((violations[1].range, violations[1].bin), (1, 1));

        //restricted to short distances
        assert!(tensor.monotonicity_violations(1, &[0, 1]).is_empty());
        //reversed order flips the verdict for the first bin
        assert_eq!(tensor.monotonicity_violations(1, &[1, 0]).len(), 1);
    }
}
