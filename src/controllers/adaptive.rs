use super::surface::SurfaceGains;
use super::{check_gains, ControlHistory, Controller};
use crate::core::types::{ControllerKind, ForceLimits, Gains, State};
use crate::error::{DipError, Result};

/// Classical law whose switching gain grows with `|s|`
///
/// `eta <- min(eta + gamma*|s|*dt, eta_max)` starting from `eta0`, with an
/// optional leak back toward `eta0`. `eta` stays in `[eta0, eta_max]`, so an
/// `eta0` above `eta_max` is rejected.
#[derive(Clone, Debug)]
pub struct AdaptiveSmc {
    limits: ForceLimits,
    boundary_layer: f64,
    eta_max: f64,
    leak: f64,
    // None until the first step after a reset, then seeded with eta0
    eta: Option<f64>,
    history: ControlHistory,
}

impl AdaptiveSmc {
    pub fn new(limits: ForceLimits) -> Self {
        Self {
            limits,
            boundary_layer: 0.5,
            eta_max: 40.0,
            leak: 0.0,
            eta: None,
            history: ControlHistory::default(),
        }
    }

    pub fn with_boundary_layer(mut self, epsilon: f64) -> Self {
        self.boundary_layer = epsilon;
        self
    }

    pub fn with_eta_max(mut self, eta_max: f64) -> Self {
        self.eta_max = eta_max;
        self
    }

    /// Leak rate toward eta0 (default: 0)
    pub fn with_leak(mut self, leak: f64) -> Self {
        self.leak = leak;
        self
    }

    /// Current switching gain, if a step has run since the last reset
    pub fn switching_gain(&self) -> Option<f64> {
        self.eta
    }
}

impl Controller for AdaptiveSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::AdaptiveSmc
    }

    fn compute_control(&mut self, state: &State, gains: &Gains, dt: f64) -> Result<f64> {
        check_gains(self.kind(), gains)?;
        let surface = SurfaceGains::from_gains(gains);
        let (eta0, gamma) = (gains.get(5), gains.get(6));

        if eta0 > self.eta_max {
            return Err(DipError::config(format!(
                "eta0 {} exceeds eta_max {}",
                eta0, self.eta_max
            )));
        }

        let s = surface.surface(state);
        let mut eta = self.eta.unwrap_or(eta0) + gamma * s.abs() * dt;
        if self.leak > 0.0 {
            eta -= self.leak * (eta - eta0) * dt;
        }
        let eta = eta.clamp(eta0, self.eta_max);
        self.eta = Some(eta);

        let force = surface.equivalent_control(state) - eta * (s / self.boundary_layer).tanh();
        let force = self.limits.saturate(force);

        self.history.push(s, force);
        Ok(force)
    }

    fn reset(&mut self) {
        self.eta = None;
        self.history.clear();
    }

    fn history(&self) -> &ControlHistory {
        &self.history
    }
}
