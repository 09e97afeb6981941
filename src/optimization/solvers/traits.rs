use crate::error::Result;
use crate::optimization::callback::GenerationReport;
use serde::{Deserialize, Serialize};

/// Why a solver stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    MaxIterations,
    /// Global best stopped improving for the configured patience
    Converged,
    Cancelled,
    StoppedByCallback,
}

#[derive(Clone, Debug)]
pub struct SolverResult {
    pub termination: Termination,
    pub cost: f64,
    pub iterations: usize,
    pub params: Vec<f64>,
    pub cost_evals: usize,
    /// Global-best cost after each generation
    pub history: Vec<f64>,
    pub seed: u64,
}

/// Callback interface for optimization progress
pub trait OptimizationCallback {
    /// Called once per generation after the global best is updated
    fn on_iteration(&mut self, report: &GenerationReport) -> Result<()>;

    /// Check if optimization should stop early
    fn should_stop(&self) -> bool {
        false
    }
}

/// Core problem definition
///
/// `cost` runs a full closed-loop simulation and is called from worker threads.
pub trait Problem: Sync {
    /// Evaluate cost for given parameters; must be finite
    fn cost(&self, params: &[f64]) -> f64;

    /// Number of parameters
    fn num_params(&self) -> usize;

    /// Parameter bounds (min, max) for each parameter
    fn bounds(&self) -> &[(f64, f64)];

    /// Substituted for any non-finite cost a problem lets through
    fn penalty(&self) -> f64 {
        1e6
    }
}

/// Solver interface - takes problem and callback
pub trait Solver {
    fn name(&self) -> &str;

    fn solve(
        &mut self,
        problem: &dyn Problem,
        callback: &mut dyn OptimizationCallback,
    ) -> Result<SolverResult>;
}
