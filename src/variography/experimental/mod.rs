pub mod convergence;
pub mod distance_bins;
pub mod estimator;
pub mod exact;
pub mod reference_points;
