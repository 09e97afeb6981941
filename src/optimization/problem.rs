use super::solvers::traits::Problem;
use crate::controllers::build_controller;
use crate::core::config::{Config, CostWeights};
use crate::core::types::{ControllerKind, Gains, State};
use crate::error::Result;
use crate::simulation::{MetricsEvaluator, PerformanceMetrics, PlantModel, SimulationRunner};
use tracing::{trace, warn};

/// Weighted scalar cost of one evaluated run
///
/// A diverged run costs between `penalty` and `2 * penalty`, lower the longer it
/// survived, so the swarm still sees a gradient among failing candidates.
pub fn compute_cost(metrics: &PerformanceMetrics, progress: f64, weights: &CostWeights) -> f64 {
    let penalty = weights.divergence_penalty;
    if metrics.diverged {
        return penalty * (2.0 - progress.clamp(0.0, 1.0));
    }

    let cost = weights.settling_time * metrics.settling_time
        + weights.overshoot * metrics.overshoot
        + weights.control_effort * metrics.control_effort
        + weights.chattering * metrics.chattering_index;

    if cost.is_finite() { cost } else { penalty }
}

/// Controller-gain tuning problem: one closed-loop simulation per cost call
pub struct TuningProblem<'a> {
    kind: ControllerKind,
    config: &'a Config,
    bounds: Vec<(f64, f64)>,
    weights: CostWeights,
    runner: SimulationRunner,
    evaluator: MetricsEvaluator,
    initial_state: State,
}

impl<'a> TuningProblem<'a> {
    pub fn new(
        kind: ControllerKind,
        config: &'a Config,
        bounds: Vec<(f64, f64)>,
        weights: CostWeights,
    ) -> Result<Self> {
        let plant = PlantModel::new(config.plant.clone())?;
        Ok(Self {
            kind,
            config,
            bounds,
            weights,
            runner: SimulationRunner::from_settings(plant, &config.simulation),
            evaluator: MetricsEvaluator::from_settings(&config.simulation),
            initial_state: config.simulation.initial_state(),
        })
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    /// Run one candidate; non-numerical failures are mapped to the penalty
    pub fn evaluate(&self, params: &[f64]) -> Result<(PerformanceMetrics, f64)> {
        let gains = Gains::new(self.kind, params.to_vec())?;
        let mut controller = build_controller(
            self.kind,
            &self.config.controllers,
            self.config.simulation.force_limits,
        );
        let sim = &self.config.simulation;
        let trajectory = self.runner.run(
            controller.as_mut(),
            &gains,
            self.initial_state,
            sim.duration,
            sim.dt,
        )?;

        let metrics = self.evaluator.evaluate(&trajectory);
        let progress = trajectory.steps() as f64 / sim.num_steps().max(1) as f64;
        let cost = compute_cost(&metrics, progress, &self.weights);
        Ok((metrics, cost))
    }
}

impl Problem for TuningProblem<'_> {
    fn cost(&self, params: &[f64]) -> f64 {
        match self.evaluate(params) {
            Ok((metrics, cost)) => {
                trace!(
                    controller = %self.kind,
                    ?params,
                    cost,
                    diverged = metrics.diverged,
                    "Evaluated candidate"
                );
                cost
            }
            Err(e) => {
                warn!(
                    controller = %self.kind,
                    ?params,
                    error = %e,
                    "Candidate rejected, applying penalty"
                );
                self.weights.divergence_penalty
            }
        }
    }

    fn num_params(&self) -> usize {
        self.kind.gain_count()
    }

    fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    fn penalty(&self) -> f64 {
        self.weights.divergence_penalty
    }
}
