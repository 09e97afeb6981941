mod compare;

pub use compare::compare_controllers;

use crate::controllers::build_controller;
use crate::core::config::{Config, CostWeights};
use crate::core::constraints::{validate_gain_bounds, validate_gain_cap};
use crate::core::types::{ControllerKind, Gains, State};
use crate::error::Result;
use crate::optimization::{
    CancellationToken, GenerationReport, ParticleOptimizer, Solver, Termination, TuningCallback,
    TuningProblem,
};
use crate::simulation::{
    MetricsEvaluator, PerformanceMetrics, PlantModel, SimulationRunner, Trajectory,
};
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::info;

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

// ===== RESULTS =====

/// One closed-loop run with its derived metrics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub controller: ControllerKind,
    pub gains: Vec<f64>,
    pub trajectory: Trajectory,
    pub metrics: PerformanceMetrics,
}

impl SimulationOutcome {
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(self, path.as_ref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub controller: ControllerKind,
    pub best_gains: Vec<f64>,
    pub best_cost: f64,
    /// Global-best cost after each generation
    pub convergence_history: Vec<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
    /// Seed that reproduces this run
    pub seed: u64,
}

impl TuningResult {
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(self, path.as_ref())
    }

    pub fn gains(&self) -> Result<Gains> {
        Gains::new(self.controller, self.best_gains.clone())
    }
}

// ===== ENTRY POINT =====

/// Simulation and tuning front end over one validated [`Config`]
pub struct Tuner {
    config: Config,
    verbose: bool,
    progress: Option<Sender<GenerationReport>>,
    cancellation: Option<CancellationToken>,
}

impl Tuner {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            verbose: false,
            progress: None,
            cancellation: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Log every generation at info level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_progress(mut self, sender: Sender<GenerationReport>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn runner(&self) -> Result<SimulationRunner> {
        let plant = PlantModel::new(self.config.plant.clone())?;
        Ok(SimulationRunner::from_settings(plant, &self.config.simulation))
    }

    /// Single closed-loop run; divergence is reported in the outcome, not as an error
    pub fn simulate(
        &self,
        kind: ControllerKind,
        gains: &[f64],
        initial_state: State,
        duration: f64,
        dt: f64,
    ) -> Result<SimulationOutcome> {
        let gains = Gains::new(kind, gains.to_vec())?;
        let mut controller = build_controller(
            kind,
            &self.config.controllers,
            self.config.simulation.force_limits,
        );
        let trajectory = self
            .runner()?
            .run(controller.as_mut(), &gains, initial_state, duration, dt)?;

        let evaluator = MetricsEvaluator::new(self.config.simulation.settle_tolerance, duration);
        let metrics = evaluator.evaluate(&trajectory);

        Ok(SimulationOutcome {
            controller: kind,
            gains: gains.as_slice().to_vec(),
            trajectory,
            metrics,
        })
    }

    /// Run the configured scenario with the configured default gains
    pub fn simulate_default(&self, kind: ControllerKind) -> Result<SimulationOutcome> {
        let sim = &self.config.simulation;
        let gains = self.config.controllers.default_gains(kind)?;
        self.simulate(kind, gains.as_slice(), sim.initial_state(), sim.duration, sim.dt)
    }

    /// Search gain space with the particle swarm
    ///
    /// Swarm coefficients, seed and workers come from the `pso` section; the
    /// scenario comes from the `simulation` section.
    pub fn tune(
        &self,
        kind: ControllerKind,
        bounds: &[(f64, f64)],
        num_particles: usize,
        num_iterations: usize,
        weights: CostWeights,
    ) -> Result<TuningResult> {
        validate_gain_bounds(kind, bounds)?;
        if let Some(cap) = self.config.controllers.gain_cap(kind) {
            validate_gain_cap(kind, bounds, cap)?;
        }
        weights.validate()?;

        let problem = TuningProblem::new(kind, &self.config, bounds.to_vec(), weights)?;

        let mut settings = self.config.pso.clone();
        settings.num_particles = num_particles;
        settings.num_iterations = num_iterations;
        settings.validate()?;

        let mut solver = ParticleOptimizer::from_settings(&settings);
        if let Some(token) = &self.cancellation {
            solver = solver.with_cancellation(token.clone());
        }

        let param_names = kind.gain_names().iter().map(|s| s.to_string()).collect();
        let mut callback = TuningCallback::new(self.verbose, num_iterations, param_names);
        if let Some(tx) = &self.progress {
            callback = callback.with_progress(tx.clone());
        }

        info!(
            controller = %kind,
            particles = num_particles,
            iterations = num_iterations,
            "Tuning controller gains"
        );
        let start = Instant::now();
        let result = solver.solve(&problem, &mut callback)?;

        info!(
            controller = %kind,
            best_cost = result.cost,
            iterations = result.iterations,
            evaluations = result.cost_evals,
            termination = ?result.termination,
            seed = result.seed,
            elapsed_s = start.elapsed().as_secs_f64(),
            "Tuning finished"
        );

        Ok(TuningResult {
            controller: kind,
            best_gains: result.params,
            best_cost: result.cost,
            convergence_history: result.history,
            iterations: result.iterations,
            evaluations: result.cost_evals,
            termination: result.termination,
            seed: result.seed,
        })
    }

    /// Tune with the bounds, swarm size and weights from the config
    pub fn tune_default(&self, kind: ControllerKind) -> Result<TuningResult> {
        self.tune(
            kind,
            self.config.controllers.bounds(kind),
            self.config.pso.num_particles,
            self.config.pso.num_iterations,
            self.config.cost,
        )
    }
}

/// [`Tuner::simulate`] on the default configuration
pub fn simulate(
    kind: ControllerKind,
    gains: &[f64],
    initial_state: State,
    duration: f64,
    dt: f64,
) -> Result<SimulationOutcome> {
    Tuner::new(Config::default())?.simulate(kind, gains, initial_state, duration, dt)
}

/// [`Tuner::tune`] on the default configuration
pub fn tune(
    kind: ControllerKind,
    bounds: &[(f64, f64)],
    num_particles: usize,
    num_iterations: usize,
    weights: CostWeights,
) -> Result<TuningResult> {
    Tuner::new(Config::default())?.tune(kind, bounds, num_particles, num_iterations, weights)
}
