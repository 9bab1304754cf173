use super::IsoCorrelationModel;

/// Fully correlated field: every realization is a single constant value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsoConstant;

impl IsoCorrelationModel for IsoConstant {
    fn corr(&self, _r: f64) -> f64 {
        1.0
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        1.0
    }
}
