use super::IsoCorrelationModel;

// distance scalings giving 0.05 correlation at the range
const MATERN32_SCALE: f64 = 4.744;
const MATERN52_SCALE: f64 = 5.918;
const MATERN72_SCALE: f64 = 6.877;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsoMatern32;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsoMatern52;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsoMatern72;

impl IsoCorrelationModel for IsoMatern32 {
    fn corr(&self, r: f64) -> f64 {
        let sd = MATERN32_SCALE * r;
        (-sd).exp() * (1.0 + sd)
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        4.0
    }
}

impl IsoCorrelationModel for IsoMatern52 {
    fn corr(&self, r: f64) -> f64 {
        let sd = MATERN52_SCALE * r;
        (-sd).exp() * (1.0 + sd + sd * sd / 3.0)
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        4.76
    }
}

impl IsoCorrelationModel for IsoMatern72 {
    fn corr(&self, r: f64) -> f64 {
        let sd = MATERN72_SCALE * r;
        (-sd).exp() * (1.0 + sd + 2.0 / 5.0 * sd.powi(2) + sd.powi(3) / 15.0)
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        5.26
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn matern_correlation_at_range() {
        assert_abs_diff_eq!(IsoMatern32.corr(1.0), 0.05, epsilon = 1e-3);
        assert_abs_diff_eq!(IsoMatern52.corr(1.0), 0.05, epsilon = 1e-3);
        assert_abs_diff_eq!(IsoMatern72.corr(1.0), 0.05, epsilon = 1e-3);

        for model in [
            &IsoMatern32 as &dyn IsoCorrelationModel,
            &IsoMatern52,
            &IsoMatern72,
        ] {
            assert_abs_diff_eq!(model.corr(0.0), 1.0);
        }
    }
}
