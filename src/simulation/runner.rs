use super::integrator::IntegratorKind;
use super::plant::PlantModel;
use crate::controllers::Controller;
use crate::core::config::SimulationSettings;
use crate::core::constraints::validate_timing;
use crate::core::types::{max_angle, state_is_finite, ForceLimits, Gains, State, THETA1, THETA2};
use crate::error::{DipError, DivergenceCause, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where and why a run stopped early
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DivergenceInfo {
    pub step: usize,
    pub time: f64,
    pub cause: DivergenceCause,
    /// Offending state component for non-finite failures
    pub component: Option<usize>,
}

/// Sampled closed-loop run
///
/// `states[0]` is the initial state; `forces[k]` is held from `states[k]` to `states[k + 1]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<State>,
    pub forces: Vec<f64>,
    pub divergence: Option<DivergenceInfo>,
}

impl Trajectory {
    fn start(initial_state: State, capacity: usize) -> Self {
        let mut times = Vec::with_capacity(capacity + 1);
        let mut states = Vec::with_capacity(capacity + 1);
        times.push(0.0);
        states.push(initial_state);
        Self {
            times,
            states,
            forces: Vec::with_capacity(capacity),
            divergence: None,
        }
    }

    fn push(&mut self, time: f64, state: State, force: f64) {
        self.times.push(time);
        self.states.push(state);
        self.forces.push(force);
    }

    pub fn diverged(&self) -> bool {
        self.divergence.is_some()
    }

    /// Number of completed integration steps
    pub fn steps(&self) -> usize {
        self.forces.len()
    }

    pub fn final_state(&self) -> Option<&State> {
        self.states.last()
    }

    pub fn theta1(&self) -> impl Iterator<Item = f64> + '_ {
        self.states.iter().map(|s| s[THETA1])
    }

    pub fn theta2(&self) -> impl Iterator<Item = f64> + '_ {
        self.states.iter().map(|s| s[THETA2])
    }
}

/// Closed-loop driver: controller -> saturation -> integrator -> record
///
/// Owns the plant for the lifetime of the runner; controllers are borrowed per run.
#[derive(Clone, Debug)]
pub struct SimulationRunner {
    plant: PlantModel,
    integrator: IntegratorKind,
    limits: ForceLimits,
    divergence_angle: f64,
}

impl SimulationRunner {
    pub fn new(plant: PlantModel) -> Self {
        Self {
            plant,
            integrator: IntegratorKind::Rk4,
            limits: ForceLimits::default(),
            divergence_angle: std::f64::consts::FRAC_PI_2,
        }
    }

    pub fn from_settings(plant: PlantModel, settings: &SimulationSettings) -> Self {
        Self::new(plant)
            .with_integrator(settings.integrator)
            .with_force_limits(settings.force_limits)
            .with_divergence_angle(settings.divergence_angle)
    }

    pub fn with_integrator(mut self, integrator: IntegratorKind) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_force_limits(mut self, limits: ForceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Angle (rad) beyond which the pendulum counts as fallen (default: pi/2)
    pub fn with_divergence_angle(mut self, angle: f64) -> Self {
        self.divergence_angle = angle;
        self
    }

    pub fn plant(&self) -> &PlantModel {
        &self.plant
    }

    /// Run `round(duration / dt)` steps from `initial_state`
    ///
    /// Configuration problems are returned as errors before any step is taken.
    /// Numerical failures end the run early and are recorded in
    /// [`Trajectory::divergence`] instead.
    pub fn run(
        &self,
        controller: &mut dyn Controller,
        gains: &Gains,
        initial_state: State,
        duration: f64,
        dt: f64,
    ) -> Result<Trajectory> {
        validate_timing(duration, dt)?;
        if !state_is_finite(&initial_state) {
            return Err(DipError::config("initial state must be finite"));
        }
        if gains.kind() != controller.kind() {
            return Err(DipError::config(format!(
                "gains for {} given to a {} controller",
                gains.kind(),
                controller.kind()
            )));
        }

        let steps = (duration / dt).round() as usize;
        debug!(
            controller = %controller.kind(),
            steps,
            dt,
            integrator = ?self.integrator,
            "Starting simulation"
        );

        controller.reset();
        let mut trajectory = Trajectory::start(initial_state, steps);
        let mut state = initial_state;

        for k in 0..steps {
            let time = k as f64 * dt;
            let force = self
                .limits
                .saturate(controller.compute_control(&state, gains, dt)?);

            if !force.is_finite() {
                trajectory.divergence = Some(DivergenceInfo {
                    step: k,
                    time,
                    cause: DivergenceCause::NonFinite,
                    component: None,
                });
                break;
            }

            let next = match self
                .integrator
                .step(&state, dt, |s| self.plant.derivatives(s, force))
            {
                Ok(next) => next,
                Err(e) if e.is_numerical() => {
                    let component = match &e {
                        DipError::Divergence { component, .. } => *component,
                        _ => None,
                    };
                    trajectory.divergence = e.divergence_cause().map(|cause| DivergenceInfo {
                        step: k,
                        time,
                        cause,
                        component,
                    });
                    break;
                }
                Err(e) => return Err(e),
            };

            let next_time = (k + 1) as f64 * dt;
            trajectory.push(next_time, next, force);
            state = next;

            if max_angle(&next) > self.divergence_angle {
                trajectory.divergence = Some(DivergenceInfo {
                    step: k + 1,
                    time: next_time,
                    cause: DivergenceCause::AngleLimit,
                    component: None,
                });
                break;
            }
        }

        if let Some(info) = &trajectory.divergence {
            debug!(
                step = info.step,
                time = info.time,
                cause = %info.cause,
                "Simulation diverged"
            );
        }

        Ok(trajectory)
    }
}
