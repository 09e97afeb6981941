//! Double inverted pendulum on a cart, stabilised by sliding-mode controllers
//! whose gains are tuned with particle swarm optimization.

pub mod controllers;
pub mod core;
pub mod error;
pub mod optimization;
pub mod optimizer;
pub mod simulation;

#[cfg(feature = "python")]
mod python;

pub use crate::core::*;
pub use controllers::{build_controller, Controller};
pub use error::{DipError, DivergenceCause, Result};
pub use optimization::{CancellationToken, GenerationReport, Termination};
pub use optimizer::{compare_controllers, simulate, tune, SimulationOutcome, Tuner, TuningResult};
pub use simulation::{
    IntegratorKind, MetricsEvaluator, PerformanceMetrics, PlantModel, PlantParameters,
    SimulationRunner, Trajectory,
};
