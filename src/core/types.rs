use crate::core::constraints::validate_gains;
use crate::error::{DipError, Result};
use nalgebra::Vector6;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== STATE =====

/// `[x, x_dot, theta1, theta1_dot, theta2, theta2_dot]`
///
/// `theta1` is the absolute angle of the lower link from upright, `theta2` the
/// joint angle of the upper link relative to the lower one. Positive leans toward +x.
pub type State = Vector6<f64>;

pub const X: usize = 0;
pub const X_DOT: usize = 1;
pub const THETA1: usize = 2;
pub const THETA1_DOT: usize = 3;
pub const THETA2: usize = 4;
pub const THETA2_DOT: usize = 5;

pub fn state_from(values: [f64; 6]) -> State {
    State::from_column_slice(&values)
}

pub fn state_is_finite(state: &State) -> bool {
    state.iter().all(|v| v.is_finite())
}

/// Largest absolute pendulum angle of a state
#[inline]
pub fn max_angle(state: &State) -> f64 {
    state[THETA1].abs().max(state[THETA2].abs())
}

// ===== ENUMS =====

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    ClassicalSmc,
    StaSmc,
    AdaptiveSmc,
    HybridAdaptiveStaSmc,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 4] = [
        Self::ClassicalSmc,
        Self::StaSmc,
        Self::AdaptiveSmc,
        Self::HybridAdaptiveStaSmc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClassicalSmc => "classical_smc",
            Self::StaSmc => "sta_smc",
            Self::AdaptiveSmc => "adaptive_smc",
            Self::HybridAdaptiveStaSmc => "hybrid_adaptive_sta_smc",
        }
    }

    /// Names of the gains in the order the controller expects them
    pub fn gain_names(&self) -> &'static [&'static str] {
        match self {
            Self::ClassicalSmc => &["k1", "k2", "k3", "k4", "lambda", "eta"],
            Self::StaSmc => &["k1", "k2", "k3", "k4", "lambda", "alpha", "beta"],
            Self::AdaptiveSmc => &["k1", "k2", "k3", "k4", "lambda", "eta0", "gamma"],
            Self::HybridAdaptiveStaSmc => {
                &["k1", "k2", "k3", "k4", "lambda", "alpha", "beta0", "gamma"]
            }
        }
    }

    pub fn gain_count(&self) -> usize {
        self.gain_names().len()
    }

    /// Index of the initial adaptive gain, which must not start above its cap
    pub fn capped_gain(&self) -> Option<usize> {
        match self {
            Self::AdaptiveSmc => Some(5),
            Self::HybridAdaptiveStaSmc => Some(6),
            Self::ClassicalSmc | Self::StaSmc => None,
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControllerKind {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "classical_smc" | "classical" => Ok(Self::ClassicalSmc),
            "sta_smc" | "sta" | "super_twisting" => Ok(Self::StaSmc),
            "adaptive_smc" | "adaptive" => Ok(Self::AdaptiveSmc),
            "hybrid_adaptive_sta_smc" | "hybrid" => Ok(Self::HybridAdaptiveStaSmc),
            _ => Err(DipError::config(format!("unknown controller type '{}'", s))),
        }
    }
}

// ===== CORE DATA TYPES =====

/// Validated gain vector tagged with the controller it belongs to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Gains {
    kind: ControllerKind,
    values: Vec<f64>,
}

impl Gains {
    pub fn new(kind: ControllerKind, values: Vec<f64>) -> Result<Self> {
        validate_gains(kind, &values)?;
        Ok(Self { kind, values })
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, idx: usize) -> f64 {
        self.values[idx]
    }
}

/// Actuator saturation range in newtons
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ForceLimits {
    fn default() -> Self {
        Self {
            min: -20.0,
            max: 20.0,
        }
    }
}

impl ForceLimits {
    pub fn symmetric(limit: f64) -> Self {
        Self {
            min: -limit,
            max: limit,
        }
    }

    #[inline]
    pub fn saturate(&self, force: f64) -> f64 {
        force.clamp(self.min, self.max)
    }

    pub fn contains(&self, force: f64) -> bool {
        force >= self.min && force <= self.max
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min >= self.max {
            return Err(DipError::config(format!(
                "force limits must satisfy min < max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_kind_parses_aliases() {
        assert_eq!(
            "classical_smc".parse::<ControllerKind>().unwrap(),
            ControllerKind::ClassicalSmc
        );
        assert_eq!(
            "Super-Twisting".parse::<ControllerKind>().unwrap(),
            ControllerKind::StaSmc
        );
        assert_eq!(
            "hybrid".parse::<ControllerKind>().unwrap(),
            ControllerKind::HybridAdaptiveStaSmc
        );
        assert!("pid".parse::<ControllerKind>().is_err());
    }

    #[test]
    fn controller_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ControllerKind::HybridAdaptiveStaSmc).unwrap();
        assert_eq!(json, "\"hybrid_adaptive_sta_smc\"");
        for kind in ControllerKind::ALL {
            let back: ControllerKind =
                serde_json::from_str(&format!("\"{}\"", kind.name())).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn gains_reject_wrong_count_and_sign() {
        let kind = ControllerKind::ClassicalSmc;
        assert!(Gains::new(kind, vec![1.0; 6]).is_ok());
        assert!(Gains::new(kind, vec![1.0; 5]).is_err());
        assert!(Gains::new(kind, vec![1.0, 1.0, 0.0, 1.0, 1.0, 1.0]).is_err());
        assert!(Gains::new(kind, vec![1.0, -1.0, 1.0, 1.0, 1.0, 1.0]).is_err());
        assert!(Gains::new(kind, vec![1.0, f64::NAN, 1.0, 1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn force_limits_saturate() {
        let limits = ForceLimits::default();
        assert_eq!(limits.saturate(35.0), 20.0);
        assert_eq!(limits.saturate(-35.0), -20.0);
        assert_eq!(limits.saturate(3.5), 3.5);
        assert!(ForceLimits { min: 1.0, max: 1.0 }.validate().is_err());
    }
}
