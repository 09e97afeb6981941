use crate::core::types::{State, THETA1, THETA1_DOT, THETA2, THETA2_DOT, X_DOT};
use crate::error::{DipError, DivergenceCause, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Physical constants of the cart and both links
///
/// `link*_com` is the distance from a link's pivot to its centre of mass and
/// `link*_inertia` the moment of inertia about that centre of mass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParameters {
    pub cart_mass: f64,
    pub link1_mass: f64,
    pub link2_mass: f64,
    pub link1_length: f64,
    pub link2_length: f64,
    pub link1_com: f64,
    pub link2_com: f64,
    pub link1_inertia: f64,
    pub link2_inertia: f64,
    pub gravity: f64,
    pub cart_friction: f64,
    pub joint1_friction: f64,
    pub joint2_friction: f64,
}

impl Default for PlantParameters {
    fn default() -> Self {
        // uniform rods: I = m*l^2/12
        Self {
            cart_mass: 1.0,
            link1_mass: 0.1,
            link2_mass: 0.1,
            link1_length: 0.5,
            link2_length: 0.5,
            link1_com: 0.25,
            link2_com: 0.25,
            link1_inertia: 0.1 * 0.5 * 0.5 / 12.0,
            link2_inertia: 0.1 * 0.5 * 0.5 / 12.0,
            gravity: 9.81,
            cart_friction: 0.1,
            joint1_friction: 0.001,
            joint2_friction: 0.001,
        }
    }
}

impl PlantParameters {
    /// Same plant with all damping removed
    pub fn frictionless(mut self) -> Self {
        self.cart_friction = 0.0;
        self.joint1_friction = 0.0;
        self.joint2_friction = 0.0;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cart_mass", self.cart_mass),
            ("link1_mass", self.link1_mass),
            ("link2_mass", self.link2_mass),
            ("link1_length", self.link1_length),
            ("link2_length", self.link2_length),
            ("link1_com", self.link1_com),
            ("link2_com", self.link2_com),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DipError::config(format!(
                    "plant parameter '{}' must be > 0, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("link1_inertia", self.link1_inertia),
            ("link2_inertia", self.link2_inertia),
            ("gravity", self.gravity),
            ("cart_friction", self.cart_friction),
            ("joint1_friction", self.joint1_friction),
            ("joint2_friction", self.joint2_friction),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(DipError::config(format!(
                    "plant parameter '{}' must be >= 0, got {}",
                    name, value
                )));
            }
        }

        if self.link1_com > self.link1_length || self.link2_com > self.link2_length {
            return Err(DipError::config(
                "centre of mass must lie on its link (com <= length)",
            ));
        }
        Ok(())
    }
}

/// Relative determinant threshold below which the mass matrix is treated as singular
const SINGULARITY_THRESHOLD: f64 = 1e-12;

/// Cart + double inverted pendulum dynamics
///
/// Generalised coordinates `q = [x, theta1, theta2]` with `theta2` relative to link 1.
/// Solves `M(q) q_ddot = B F - C(q, q_dot) q_dot - G(q) - D q_dot` with `B = [1, 0, 0]`.
#[derive(Clone, Debug)]
pub struct PlantModel {
    params: PlantParameters,
    total_mass: f64,
    h1: f64,
    h2: f64,
    h3: f64,
    j1: f64,
    j2: f64,
}

impl PlantModel {
    pub fn new(params: PlantParameters) -> Result<Self> {
        params.validate()?;
        let p = &params;
        let total_mass = p.cart_mass + p.link1_mass + p.link2_mass;
        let h1 = p.link1_mass * p.link1_com + p.link2_mass * p.link1_length;
        let h2 = p.link2_mass * p.link2_com;
        let h3 = p.link2_mass * p.link1_length * p.link2_com;
        let j1 = p.link1_mass * p.link1_com.powi(2)
            + p.link2_mass * p.link1_length.powi(2)
            + p.link1_inertia;
        let j2 = p.link2_mass * p.link2_com.powi(2) + p.link2_inertia;

        Ok(Self {
            params,
            total_mass,
            h1,
            h2,
            h3,
            j1,
            j2,
        })
    }

    pub fn params(&self) -> &PlantParameters {
        &self.params
    }

    #[inline]
    fn q_dot(state: &State) -> Vector3<f64> {
        Vector3::new(state[X_DOT], state[THETA1_DOT], state[THETA2_DOT])
    }

    pub fn mass_matrix(&self, state: &State) -> Matrix3<f64> {
        let a = state[THETA1];
        let b = a + state[THETA2];
        let cos_rel = state[THETA2].cos();

        let m01 = self.h1 * a.cos() + self.h2 * b.cos();
        let m02 = self.h2 * b.cos();
        let m11 = self.j1 + self.j2 + 2.0 * self.h3 * cos_rel;
        let m12 = self.j2 + self.h3 * cos_rel;

        Matrix3::new(
            self.total_mass, m01, m02, //
            m01, m11, m12, //
            m02, m12, self.j2,
        )
    }

    /// Coriolis and centrifugal terms `C(q, q_dot) q_dot`
    pub fn velocity_terms(&self, state: &State) -> Vector3<f64> {
        let a = state[THETA1];
        let b = a + state[THETA2];
        let a_dot = state[THETA1_DOT];
        let b_dot = a_dot + state[THETA2_DOT];
        let sin_rel = state[THETA2].sin();

        Vector3::new(
            -self.h1 * a.sin() * a_dot * a_dot - self.h2 * b.sin() * b_dot * b_dot,
            self.h3 * sin_rel * (a_dot * a_dot - b_dot * b_dot),
            self.h3 * sin_rel * a_dot * a_dot,
        )
    }

    /// Gradient of the potential energy, `G(q)`
    pub fn gravity_terms(&self, state: &State) -> Vector3<f64> {
        let g = self.params.gravity;
        let a = state[THETA1];
        let b = a + state[THETA2];

        let link2 = -self.h2 * g * b.sin();
        Vector3::new(0.0, -self.h1 * g * a.sin() + link2, link2)
    }

    fn friction_terms(&self, state: &State) -> Vector3<f64> {
        let p = &self.params;
        Self::q_dot(state).component_mul(&Vector3::new(
            p.cart_friction,
            p.joint1_friction,
            p.joint2_friction,
        ))
    }

    /// State derivative `[x_dot, x_ddot, theta1_dot, theta1_ddot, theta2_dot, theta2_ddot]`
    ///
    /// A non-finite state or force fails with [`DipError::Divergence`] before the
    /// mass matrix is formed, so overflow is never reported as a singularity.
    pub fn derivatives(&self, state: &State, force: f64) -> Result<State> {
        if let Some(component) = state.iter().position(|v| !v.is_finite()) {
            return Err(DipError::Divergence {
                cause: DivergenceCause::NonFinite,
                component: Some(component),
            });
        }
        if !force.is_finite() {
            return Err(DipError::Divergence {
                cause: DivergenceCause::NonFinite,
                component: None,
            });
        }

        let mass = self.mass_matrix(state);

        let determinant = mass.determinant();
        let scale = (mass[(0, 0)] * mass[(1, 1)] * mass[(2, 2)]).abs();
        if !determinant.is_finite() || determinant.abs() < SINGULARITY_THRESHOLD * scale {
            return Err(DipError::SingularConfiguration { determinant });
        }

        let rhs = Vector3::new(force, 0.0, 0.0)
            - self.velocity_terms(state)
            - self.gravity_terms(state)
            - self.friction_terms(state);

        let q_ddot = mass
            .lu()
            .solve(&rhs)
            .ok_or(DipError::SingularConfiguration { determinant })?;

        Ok(State::new(
            state[X_DOT],
            q_ddot[0],
            state[THETA1_DOT],
            q_ddot[1],
            state[THETA2_DOT],
            q_ddot[2],
        ))
    }

    /// Total mechanical energy, zero potential at the pivot height
    pub fn energy(&self, state: &State) -> f64 {
        let q_dot = Self::q_dot(state);
        let kinetic = 0.5 * q_dot.dot(&(self.mass_matrix(state) * q_dot));

        let a = state[THETA1];
        let b = a + state[THETA2];
        let potential = self.params.gravity * (self.h1 * a.cos() + self.h2 * b.cos());

        kinetic + potential
    }
}
