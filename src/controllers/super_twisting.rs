use super::surface::{sign, SurfaceGains};
use super::{check_gains, ControlHistory, Controller};
use crate::core::types::{ControllerKind, ForceLimits, Gains, State};
use crate::error::Result;

/// One super-twisting step with integral state `z`
///
/// Updates `z += -beta * sign(s) * dt` first, then returns
/// `-alpha * sqrt(|s|) * sign(s) + z` (unsaturated, without the cart term).
#[inline]
pub(crate) fn twist(s: f64, alpha: f64, beta: f64, z: &mut f64, dt: f64) -> f64 {
    *z += -beta * sign(s) * dt;
    -alpha * s.abs().sqrt() * sign(s) + *z
}

/// Second-order sliding mode (super-twisting algorithm)
#[derive(Clone, Debug)]
pub struct SuperTwistingSmc {
    limits: ForceLimits,
    z: f64,
    history: ControlHistory,
}

impl SuperTwistingSmc {
    pub fn new(limits: ForceLimits) -> Self {
        Self {
            limits,
            z: 0.0,
            history: ControlHistory::default(),
        }
    }

    pub fn integral_state(&self) -> f64 {
        self.z
    }
}

impl Controller for SuperTwistingSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::StaSmc
    }

    fn compute_control(&mut self, state: &State, gains: &Gains, dt: f64) -> Result<f64> {
        check_gains(self.kind(), gains)?;
        let surface = SurfaceGains::from_gains(gains);
        let (alpha, beta) = (gains.get(5), gains.get(6));

        let s = surface.surface(state);
        let force = twist(s, alpha, beta, &mut self.z, dt) + surface.equivalent_control(state);
        let force = self.limits.saturate(force);

        self.history.push(s, force);
        Ok(force)
    }

    fn reset(&mut self) {
        self.z = 0.0;
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
            ControllerKind::StaSmc,
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0],
        )
        .unwrap()
    }

    #[test]
    fn integral_updates_before_output() {
        let mut c = SuperTwistingSmc::new(ForceLimits::default());
        let state = state_from([0.0, 0.0, 0.04, 0.0, 0.0, 0.0]);
        let force = c.compute_control(&state, &gains(), 0.1).unwrap();
        // z = -3 * 0.1, F = -2 * sqrt(0.04) + z
        assert_relative_eq!(c.integral_state(), -0.3, epsilon = 1e-12);
        assert_relative_eq!(force, -0.4 - 0.3, epsilon = 1e-12);
    }

    #[test]
    fn zero_surface_leaves_integral_untouched() {
        let mut c = SuperTwistingSmc::new(ForceLimits::default());
        let force = c.compute_control(&State::zeros(), &gains(), 0.1).unwrap();
        assert_eq!(force, 0.0);
        assert_eq!(c.integral_state(), 0.0);
    }

    #[test]
    fn reset_zeroes_integral() {
        let mut c = SuperTwistingSmc::new(ForceLimits::default());
        let state = state_from([0.0, 0.0, 0.2, 0.0, 0.0, 0.0]);
        for _ in 0..5 {
            c.compute_control(&state, &gains(), 0.01).unwrap();
        }
        assert!(c.integral_state() < 0.0);
        c.reset();
        assert_eq!(c.integral_state(), 0.0);
    }
}
