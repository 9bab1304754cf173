use super::IsoCorrelationModel;

/// Exponential correlation, scaled to roughly 0.05 at the range
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsoExponential;

impl IsoCorrelationModel for IsoExponential {
    fn corr(&self, r: f64) -> f64 {
        (-3.0 * r).exp()
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        2.33
    }
}
