pub mod integrator;
pub mod metrics;
pub mod plant;
pub mod runner;

pub use integrator::IntegratorKind;
pub use metrics::{chattering_index, control_effort, MetricsEvaluator, PerformanceMetrics};
pub use plant::{PlantModel, PlantParameters};
pub use runner::{DivergenceInfo, SimulationRunner, Trajectory};
