use super::IsoCorrelationModel;

#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct IsoSpherical;

impl IsoCorrelationModel for IsoSpherical {
    fn corr(&self, r: f64) -> f64 {
        if r < 1.0 {
            return 1.0 - r * (1.5 - 0.5 * r * r);
        }
        0.0
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        1.92
    }
}
