use super::traits::{OptimizationCallback, Problem, Solver, SolverResult, Termination};
use crate::core::config::{InertiaSchedule, PsoSettings};
use crate::core::constraints::validate_bounds;
use crate::error::{DipError, Result};
use crate::optimization::callback::{CancellationToken, GenerationReport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{info, warn};

// ===== SWARM STATE =====

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub best_position: Vec<f64>,
    pub best_cost: f64,
}

/// Particles plus the single shared global best
#[derive(Clone, Debug)]
pub struct Swarm {
    pub particles: Vec<Particle>,
    pub global_best_position: Vec<f64>,
    pub global_best_cost: f64,
}

impl Swarm {
    /// Positions uniform in bounds, velocities uniform in +/-10% of each range
    pub fn initialize(size: usize, bounds: &[(f64, f64)], rng: &mut StdRng) -> Self {
        let particles: Vec<Particle> = (0..size)
            .map(|_| {
                let position: Vec<f64> = bounds
                    .iter()
                    .map(|&(min, max)| rng.gen_range(min..max))
                    .collect();
                let velocity: Vec<f64> = bounds
                    .iter()
                    .map(|&(min, max)| {
                        let v = (max - min) * 0.1;
                        rng.gen_range(-v..v)
                    })
                    .collect();
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best_cost: f64::INFINITY,
                }
            })
            .collect();

        let global_best_position = particles
            .first()
            .map(|p| p.position.clone())
            .unwrap_or_default();

        Self {
            particles,
            global_best_position,
            global_best_cost: f64::INFINITY,
        }
    }

    /// Single-writer update in particle order; only strict improvements count
    pub fn update_bests(&mut self, costs: &[f64]) {
        for (particle, &cost) in self.particles.iter_mut().zip(costs) {
            if cost < particle.best_cost {
                particle.best_cost = cost;
                particle.best_position.copy_from_slice(&particle.position);
            }
            if cost < self.global_best_cost {
                self.global_best_cost = cost;
                self.global_best_position.copy_from_slice(&particle.position);
            }
        }
    }
}

#[inline]
fn clamp_params(params: &mut [f64], bounds: &[(f64, f64)]) {
    for (p, &(min, max)) in params.iter_mut().zip(bounds) {
        *p = p.clamp(min, max);
    }
}

// ===== OPTIMIZER =====

/// Particle Swarm Optimization with seeded, scheduling-independent randomness
///
/// Evaluations of one generation run in parallel; every random draw happens on
/// the calling thread, so a fixed seed reproduces the whole swarm trajectory.
pub struct ParticleOptimizer {
    max_iter: usize,
    population_size: usize,
    inertia: InertiaSchedule,
    cognitive: f64, // c1 - personal best influence
    social: f64,    // c2 - global best influence
    v_max_fraction: f64,
    tolerance: f64,
    patience: usize,
    seed: Option<u64>,
    workers: usize,
    cancellation: Option<CancellationToken>,
}

impl ParticleOptimizer {
    pub fn new(max_iter: usize) -> Self {
        Self {
            max_iter,
            population_size: 20,
            inertia: InertiaSchedule::default(),
            cognitive: 1.5,
            social: 1.5,
            v_max_fraction: 0.2,
            tolerance: 1e-6,
            patience: 10,
            seed: None,
            workers: num_cpus::get(),
            cancellation: None,
        }
    }

    pub fn from_settings(settings: &PsoSettings) -> Self {
        let mut pso = Self::new(settings.num_iterations)
            .with_population_size(settings.num_particles)
            .with_inertia(settings.inertia)
            .with_pso_params(settings.cognitive, settings.social)
            .with_velocity_clamp(settings.v_max_fraction)
            .with_convergence(settings.tolerance, settings.patience);
        if let Some(seed) = settings.seed {
            pso = pso.with_seed(seed);
        }
        if let Some(workers) = settings.workers {
            pso = pso.with_workers(workers);
        }
        pso
    }

    /// Configure swarm size (default: 20)
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Configure inertia weight (default: constant 0.7)
    pub fn with_inertia(mut self, inertia: InertiaSchedule) -> Self {
        self.inertia = inertia;
        self
    }

    /// Configure acceleration coefficients (defaults: c1=1.5, c2=1.5)
    pub fn with_pso_params(mut self, cognitive: f64, social: f64) -> Self {
        self.cognitive = cognitive;
        self.social = social;
        self
    }

    /// Velocity limit as a fraction of each parameter range (default: 0.2)
    pub fn with_velocity_clamp(mut self, fraction: f64) -> Self {
        self.v_max_fraction = fraction;
        self
    }

    /// Stop after `patience` generations improving by less than `tolerance`; 0 disables
    pub fn with_convergence(mut self, tolerance: f64, patience: usize) -> Self {
        self.tolerance = tolerance;
        self.patience = patience;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Move every particle one step; positions are clamped, velocities kept
    fn advance(
        &self,
        swarm: &mut Swarm,
        iteration: usize,
        bounds: &[(f64, f64)],
        rng: &mut StdRng,
    ) {
        let w = self.inertia.weight(iteration, self.max_iter);
        let global_best = &swarm.global_best_position;

        for particle in swarm.particles.iter_mut() {
            for (i, &(min, max)) in bounds.iter().enumerate() {
                let r1 = rng.gen_range(0.0..1.0);
                let r2 = rng.gen_range(0.0..1.0);

                // PSO velocity update equation
                let v = w * particle.velocity[i]
                    + self.cognitive * r1 * (particle.best_position[i] - particle.position[i])
                    + self.social * r2 * (global_best[i] - particle.position[i]);

                // Clamp velocity to fraction of search space
                let v_max = (max - min) * self.v_max_fraction;
                particle.velocity[i] = v.clamp(-v_max, v_max);

                particle.position[i] += particle.velocity[i];
            }

            clamp_params(&mut particle.position, bounds);
        }
    }

    fn finish(
        &self,
        swarm: Swarm,
        termination: Termination,
        iterations: usize,
        cost_evals: usize,
        history: Vec<f64>,
        seed: u64,
    ) -> SolverResult {
        SolverResult {
            termination,
            cost: swarm.global_best_cost,
            iterations,
            params: swarm.global_best_position,
            cost_evals,
            history,
            seed,
        }
    }
}

impl Solver for ParticleOptimizer {
    fn name(&self) -> &str {
        "PSO"
    }

    fn solve(
        &mut self,
        problem: &dyn Problem,
        callback: &mut dyn OptimizationCallback,
    ) -> Result<SolverResult> {
        let bounds = problem.bounds();
        validate_bounds(bounds)?;
        if bounds.len() != problem.num_params() {
            return Err(DipError::bounds(format!(
                "{} bounds for {} parameters",
                bounds.len(),
                problem.num_params()
            )));
        }
        if self.population_size == 0 || self.max_iter == 0 {
            return Err(DipError::config(
                "swarm needs at least one particle and one iteration",
            ));
        }

        let seed = self.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| DipError::config(format!("failed to build worker pool: {}", e)))?;

        info!(
            particles = self.population_size,
            iterations = self.max_iter,
            workers = self.workers,
            seed,
            "Starting particle swarm"
        );

        let mut swarm = Swarm::initialize(self.population_size, bounds, &mut rng);
        let penalty = problem.penalty();
        let mut history = Vec::with_capacity(self.max_iter);
        let mut cost_evals = 0;
        let mut stagnation_counter = 0;

        for iter in 0..self.max_iter {
            let prev_global_best = swarm.global_best_cost;

            // Evaluate all particles (THIS RUNS SIMULATIONS)
            let costs: Vec<f64> = pool.install(|| {
                swarm
                    .particles
                    .par_iter()
                    .map(|p| {
                        let cost = problem.cost(&p.position);
                        if cost.is_finite() { cost } else { penalty }
                    })
                    .collect()
            });
            cost_evals += costs.len();

            swarm.update_bests(&costs);
            history.push(swarm.global_best_cost);

            let report = GenerationReport {
                iteration: iter + 1,
                best_cost: swarm.global_best_cost,
                best_params: swarm.global_best_position.clone(),
                mean_cost: costs.iter().sum::<f64>() / costs.len() as f64,
                evaluations: cost_evals,
            };
            callback.on_iteration(&report)?;

            if callback.should_stop() {
                return Ok(self.finish(
                    swarm,
                    Termination::StoppedByCallback,
                    iter + 1,
                    cost_evals,
                    history,
                    seed,
                ));
            }

            // Check for stagnation
            if prev_global_best - swarm.global_best_cost < self.tolerance {
                stagnation_counter += 1;
                if self.patience > 0 && stagnation_counter >= self.patience {
                    return Ok(self.finish(
                        swarm,
                        Termination::Converged,
                        iter + 1,
                        cost_evals,
                        history,
                        seed,
                    ));
                }
            } else {
                stagnation_counter = 0;
            }

            if self.is_cancelled() {
                warn!(iteration = iter + 1, "Particle swarm cancelled");
                return Ok(self.finish(
                    swarm,
                    Termination::Cancelled,
                    iter + 1,
                    cost_evals,
                    history,
                    seed,
                ));
            }

            if iter + 1 < self.max_iter {
                self.advance(&mut swarm, iter, bounds, &mut rng);
            }
        }

        Ok(self.finish(
            swarm,
            Termination::MaxIterations,
            self.max_iter,
            cost_evals,
            history,
            seed,
        ))
    }
}
