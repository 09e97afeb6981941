use crate::core::types::State;
use crate::error::{DipError, DivergenceCause, Result};
use serde::{Deserialize, Serialize};

/// Fixed-step explicit integration scheme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Euler,
    #[default]
    Rk4,
}

impl IntegratorKind {
    /// Advance `state` by one step of `dt`
    ///
    /// Errors from `derivative` propagate unchanged; a non-finite component in the
    /// result fails with [`DipError::Divergence`] naming that component.
    pub fn step<F>(&self, state: &State, dt: f64, mut derivative: F) -> Result<State>
    where
        F: FnMut(&State) -> Result<State>,
    {
        let next = match self {
            Self::Euler => state + derivative(state)? * dt,
            Self::Rk4 => {
                let k1 = derivative(state)?;
                let k2 = derivative(&(state + k1 * (0.5 * dt)))?;
                let k3 = derivative(&(state + k2 * (0.5 * dt)))?;
                let k4 = derivative(&(state + k3 * dt))?;
                state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
            }
        };

        if let Some(component) = next.iter().position(|v| !v.is_finite()) {
            return Err(DipError::Divergence {
                cause: DivergenceCause::NonFinite,
                component: Some(component),
            });
        }
        Ok(next)
    }
}
