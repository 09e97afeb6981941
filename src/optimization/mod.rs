pub mod callback;
pub mod problem;
pub mod solvers;

pub use callback::{CancellationToken, GenerationReport, TuningCallback};
pub use problem::{compute_cost, TuningProblem};
pub use solvers::{
    OptimizationCallback, ParticleOptimizer, Problem, Solver, SolverResult, Termination,
};
