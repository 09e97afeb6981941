use std::fmt;

/// Why a simulation stopped producing valid states
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceCause {
    /// A state component became NaN or infinite
    NonFinite,
    /// A pendulum angle left the configured envelope (the pendulum fell)
    AngleLimit,
    /// The mass matrix could not be solved
    SingularMassMatrix,
}

impl fmt::Display for DivergenceCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite => write!(f, "non-finite state"),
            Self::AngleLimit => write!(f, "angle limit exceeded"),
            Self::SingularMassMatrix => write!(f, "singular mass matrix"),
        }
    }
}

#[derive(Debug)]
pub enum DipError {
    /// Invalid gains, plant parameters, timing or config file contents
    Configuration(String),
    /// Non-finite or out-of-envelope state during integration
    Divergence {
        cause: DivergenceCause,
        component: Option<usize>,
    },
    /// Mass matrix numerically singular for the current configuration
    SingularConfiguration { determinant: f64 },
    /// Malformed optimizer bounds
    BoundsViolation(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DipError>;

impl DipError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn bounds(msg: impl Into<String>) -> Self {
        Self::BoundsViolation(msg.into())
    }

    /// Runtime numerical failures are contained by the runner; everything else is fatal
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::Divergence { .. } | Self::SingularConfiguration { .. }
        )
    }

    pub fn divergence_cause(&self) -> Option<DivergenceCause> {
        match self {
            Self::Divergence { cause, .. } => Some(*cause),
            Self::SingularConfiguration { .. } => Some(DivergenceCause::SingularMassMatrix),
            _ => None,
        }
    }
}

impl fmt::Display for DipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Self::Divergence {
                cause,
                component: Some(idx),
            } => write!(f, "simulation diverged ({}) at state component {}", cause, idx),
            Self::Divergence { cause, .. } => write!(f, "simulation diverged ({})", cause),
            Self::SingularConfiguration { determinant } => write!(
                f,
                "mass matrix is singular (determinant {:.3e})",
                determinant
            ),
            Self::BoundsViolation(msg) => write!(f, "invalid bounds: {}", msg),
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for DipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DipError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for DipError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerical_errors_are_classified() {
        let div = DipError::Divergence {
            cause: DivergenceCause::NonFinite,
            component: Some(3),
        };
        assert!(div.is_numerical());
        assert_eq!(div.divergence_cause(), Some(DivergenceCause::NonFinite));

        let singular = DipError::SingularConfiguration { determinant: 0.0 };
        assert!(singular.is_numerical());
        assert_eq!(
            singular.divergence_cause(),
            Some(DivergenceCause::SingularMassMatrix)
        );

        assert!(!DipError::config("bad gains").is_numerical());
        assert!(!DipError::bounds("min >= max").is_numerical());
    }

    #[test]
    fn display_mentions_component() {
        let div = DipError::Divergence {
            cause: DivergenceCause::NonFinite,
            component: Some(2),
        };
        let msg = div.to_string();
        assert!(msg.contains("component 2"));
        assert!(msg.contains("non-finite"));
    }
}
