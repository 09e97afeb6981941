use super::surface::SurfaceGains;
use super::{check_gains, ControlHistory, Controller};
use crate::core::types::{ControllerKind, ForceLimits, Gains, State};
use crate::error::Result;

const SWITCHING_GAIN: usize = 5;

/// Boundary-layer sliding mode: `F = u_eq - eta * tanh(s / epsilon)`
#[derive(Clone, Debug)]
pub struct ClassicalSmc {
    limits: ForceLimits,
    boundary_layer: f64,
    history: ControlHistory,
}

impl ClassicalSmc {
    pub fn new(limits: ForceLimits) -> Self {
        Self {
            limits,
            boundary_layer: 0.5,
            history: ControlHistory::default(),
        }
    }

    /// Configure tanh width (default: 0.5); smaller approaches a relay
    pub fn with_boundary_layer(mut self, epsilon: f64) -> Self {
        self.boundary_layer = epsilon;
        self
    }
}

impl Controller for ClassicalSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::ClassicalSmc
    }

    fn compute_control(&mut self, state: &State, gains: &Gains, _dt: f64) -> Result<f64> {
        check_gains(self.kind(), gains)?;
        let surface = SurfaceGains::from_gains(gains);
        let eta = gains.get(SWITCHING_GAIN);

        let s = surface.surface(state);
        let force = surface.equivalent_control(state) - eta * (s / self.boundary_layer).tanh();
        let force = self.limits.saturate(force);

        self.history.push(s, force);
        Ok(force)
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn history(&self) -> &ControlHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::state_from;
    use approx::assert_relative_eq;

    fn gains() -> Gains {
        Gains::new(
            ControllerKind::ClassicalSmc,
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 10.0],
        )
        .unwrap()
    }

    #[test]
    fn zero_state_gives_zero_force() {
        let mut c = ClassicalSmc::new(ForceLimits::default());
        assert_eq!(c.compute_control(&State::zeros(), &gains(), 0.01).unwrap(), 0.0);
    }

    #[test]
    fn force_opposes_surface_inside_boundary_layer() {
        let mut c = ClassicalSmc::new(ForceLimits::default()).with_boundary_layer(1.0);
        let state = state_from([0.0, 0.0, 0.1, 0.0, 0.0, 0.0]);
        let force = c.compute_control(&state, &gains(), 0.01).unwrap();
        assert_relative_eq!(force, -10.0 * 0.1f64.tanh(), epsilon = 1e-12);
        assert_eq!(c.history().last().unwrap().surface, 0.1);
    }

    #[test]
    fn narrow_layer_switches_harder() {
        let state = state_from([0.0, 0.0, 0.01, 0.0, 0.0, 0.0]);
        let mut wide = ClassicalSmc::new(ForceLimits::default()).with_boundary_layer(1.0);
        let mut narrow = ClassicalSmc::new(ForceLimits::default()).with_boundary_layer(0.01);
        let f_wide = wide.compute_control(&state, &gains(), 0.01).unwrap();
        let f_narrow = narrow.compute_control(&state, &gains(), 0.01).unwrap();
        assert!(f_narrow.abs() > f_wide.abs());
    }
}
