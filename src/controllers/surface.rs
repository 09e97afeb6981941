use crate::core::types::{Gains, State, THETA1, THETA1_DOT, THETA2, THETA2_DOT, X, X_DOT};

/// Sign with `sign(0) = 0`
#[inline]
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// The five gains every variant starts with: `[k1, k2, k3, k4, lambda]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceGains {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub lambda: f64,
}

impl SurfaceGains {
    pub fn from_gains(gains: &Gains) -> Self {
        Self {
            k1: gains.get(0),
            k2: gains.get(1),
            k3: gains.get(2),
            k4: gains.get(3),
            lambda: gains.get(4),
        }
    }

    /// `s = theta1 + k1*theta1_dot + lambda*(theta2 + k2*theta2_dot)`
    #[inline]
    pub fn surface(&self, state: &State) -> f64 {
        state[THETA1]
            + self.k1 * state[THETA1_DOT]
            + self.lambda * (state[THETA2] + self.k2 * state[THETA2_DOT])
    }

    /// Cart position feedback `-(k3*x + k4*x_dot)`
    #[inline]
    pub fn equivalent_control(&self, state: &State) -> f64 {
        -(self.k3 * state[X] + self.k4 * state[X_DOT])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{state_from, ControllerKind};
    use approx::assert_relative_eq;

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-1e-300), -1.0);
    }

    #[test]
    fn surface_combines_both_links() {
        let gains = Gains::new(
            ControllerKind::ClassicalSmc,
            vec![2.0, 0.5, 3.0, 4.0, 10.0, 1.0],
        )
        .unwrap();
        let surface = SurfaceGains::from_gains(&gains);
        let state = state_from([1.0, -0.5, 0.1, 0.2, -0.05, 0.4]);

        // 0.1 + 2*0.2 + 10*(-0.05 + 0.5*0.4)
        assert_relative_eq!(surface.surface(&state), 2.0, epsilon = 1e-12);
        // -(3*1 + 4*(-0.5))
        assert_relative_eq!(surface.equivalent_control(&state), -1.0, epsilon = 1e-12);
    }
}
