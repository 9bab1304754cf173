pub mod error;
pub mod padding;
pub mod simulation;
pub mod spatial_database;
pub mod variography;

pub mod prelude {

    pub mod re_exports {
        pub use nalgebra;
        pub use ndarray;
    }

    pub use crate::error::{Result, VariographyError};
    pub use crate::padding::{
        PaddingAnalysis, PaddingAnalyzer, PaddingAnalyzerParameters, PaddingErrorTensor,
    };
    pub use crate::simulation::{
        dummy::DummySimulator, reference_conditional::ReferenceConditionalSimulator, AxisPadding,
        Padding, SimulationRequest, Simulator,
    };
    pub use crate::spatial_database::lattice::{LatticeGeometry, LatticePoint};
    pub use crate::variography::{
        experimental::{
            convergence::ConvergenceTracker,
            distance_bins::{DistanceBin, DistanceBins},
            estimator::{EmpiricalVariogram, VariogramEstimate},
            exact::{ExactBinningParameters, ExactEmpiricalVariogram},
            reference_points::ReferenceStrategy,
        },
        model_variograms::{variogram::Variogram, VariogramModel, VariogramType},
    };
}
