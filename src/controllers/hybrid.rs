use super::super_twisting::twist;
use super::surface::SurfaceGains;
use super::{check_gains, ControlHistory, Controller};
use crate::core::types::{ControllerKind, ForceLimits, Gains, State};
use crate::error::{DipError, Result};

/// Super-twisting law with an adaptive integral gain
///
/// `beta <- min(beta + gamma*|s|*dt, beta_max)` from `beta0`; `z` and `beta`
/// reset together. A `beta0` above `beta_max` is rejected.
#[derive(Clone, Debug)]
pub struct HybridAdaptiveStaSmc {
    limits: ForceLimits,
    beta_max: f64,
    z: f64,
    beta: Option<f64>,
    history: ControlHistory,
}

impl HybridAdaptiveStaSmc {
    pub fn new(limits: ForceLimits) -> Self {
        Self {
            limits,
            beta_max: 30.0,
            z: 0.0,
            beta: None,
            history: ControlHistory::default(),
        }
    }

    pub fn with_beta_max(mut self, beta_max: f64) -> Self {
        self.beta_max = beta_max;
        self
    }

    pub fn integral_gain(&self) -> Option<f64> {
        self.beta
    }

    pub fn integral_state(&self) -> f64 {
        self.z
    }
}

impl Controller for HybridAdaptiveStaSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::HybridAdaptiveStaSmc
    }

    fn compute_control(&mut self, state: &State, gains: &Gains, dt: f64) -> Result<f64> {
        check_gains(self.kind(), gains)?;
        let surface = SurfaceGains::from_gains(gains);
        let (alpha, beta0, gamma) = (gains.get(5), gains.get(6), gains.get(7));

        if beta0 > self.beta_max {
            return Err(DipError::config(format!(
                "beta0 {} exceeds beta_max {}",
                beta0, self.beta_max
            )));
        }

        let s = surface.surface(state);
        let beta = (self.beta.unwrap_or(beta0) + gamma * s.abs() * dt).min(self.beta_max);
        self.beta = Some(beta);

        let force = twist(s, alpha, beta, &mut self.z, dt) + surface.equivalent_control(state);
        let force = self.limits.saturate(force);

        self.history.push(s, force);
        Ok(force)
    }

    fn reset(&mut self) {
        self.z = 0.0;
        self.beta = None;
        self.history.clear();
    }

    fn history(&self) -> &ControlHistory {
        &self.history
    }
}
