mod particle;
pub mod traits;

pub use particle::{Particle, ParticleOptimizer, Swarm};
pub use traits::{OptimizationCallback, Problem, Solver, SolverResult, Termination};
