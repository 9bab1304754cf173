use super::IsoCorrelationModel;

#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct IsoGaussian;

impl IsoCorrelationModel for IsoGaussian {
    fn corr(&self, r: f64) -> f64 {
        (-3f64 * r * r).exp()
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        6.67
    }
}
