use super::constraints::{validate_gain_bounds, validate_gain_cap, validate_timing};
use super::types::{state_from, state_is_finite, ControllerKind, ForceLimits, Gains, State};
use crate::error::{DipError, Result};
use crate::simulation::{IntegratorKind, PlantParameters};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ===== SIMULATION =====

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub duration: f64,
    pub dt: f64,
    pub integrator: IntegratorKind,
    pub force_limits: ForceLimits,
    /// Pendulum is considered fallen once |theta1| or |theta2| exceeds this (rad)
    pub divergence_angle: f64,
    /// Band for settling time (rad)
    pub settle_tolerance: f64,
    pub initial_state: [f64; 6],
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration: 10.0,
            dt: 0.01,
            integrator: IntegratorKind::Rk4,
            force_limits: ForceLimits::default(),
            divergence_angle: std::f64::consts::FRAC_PI_2,
            settle_tolerance: 0.01,
            initial_state: [0.0, 0.0, 0.1, 0.0, 0.1, 0.0],
        }
    }
}

impl SimulationSettings {
    pub fn initial_state(&self) -> State {
        state_from(self.initial_state)
    }

    pub fn num_steps(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }

    pub fn validate(&self) -> Result<()> {
        validate_timing(self.duration, self.dt)?;
        self.force_limits.validate()?;
        if !self.divergence_angle.is_finite() || self.divergence_angle <= 0.0 {
            return Err(DipError::config(format!(
                "divergence_angle must be > 0, got {}",
                self.divergence_angle
            )));
        }
        if !self.settle_tolerance.is_finite() || self.settle_tolerance <= 0.0 {
            return Err(DipError::config(format!(
                "settle_tolerance must be > 0, got {}",
                self.settle_tolerance
            )));
        }
        if !state_is_finite(&self.initial_state()) {
            return Err(DipError::config("initial_state must be finite"));
        }
        Ok(())
    }
}

// ===== CONTROLLERS =====

/// Default gains and PSO search bounds for one controller variant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerProfile {
    pub gains: Vec<f64>,
    pub bounds: Vec<(f64, f64)>,
}

impl ControllerProfile {
    fn new(gains: &[f64], bounds: &[(f64, f64)]) -> Self {
        Self {
            gains: gains.to_vec(),
            bounds: bounds.to_vec(),
        }
    }
}

const SURFACE_GAINS: [f64; 5] = [0.64, 0.125, 2.6, 5.5, 6.1];
const SURFACE_BOUNDS: [(f64, f64); 5] = [
    (0.1, 5.0),
    (0.01, 2.0),
    (0.1, 20.0),
    (0.1, 20.0),
    (0.5, 20.0),
];

fn profile_with(tail_gains: &[f64], tail_bounds: &[(f64, f64)]) -> ControllerProfile {
    let gains: Vec<f64> = SURFACE_GAINS.iter().chain(tail_gains).copied().collect();
    let bounds: Vec<(f64, f64)> = SURFACE_BOUNDS.iter().chain(tail_bounds).copied().collect();
    ControllerProfile::new(&gains, &bounds)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub classical_smc: ControllerProfile,
    pub sta_smc: ControllerProfile,
    pub adaptive_smc: ControllerProfile,
    pub hybrid_adaptive_sta_smc: ControllerProfile,
    /// tanh boundary-layer width for the classical and adaptive laws
    pub boundary_layer: f64,
    /// Ceiling of the adaptive switching gain
    pub eta_max: f64,
    /// Ceiling of the hybrid integral gain
    pub beta_max: f64,
    /// Leak rate pulling the adaptive gain back toward eta0 (0 disables)
    pub leak: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            classical_smc: profile_with(&[16.0], &[(1.0, 40.0)]),
            sta_smc: profile_with(&[18.0, 8.0], &[(1.0, 40.0), (0.5, 30.0)]),
            adaptive_smc: profile_with(&[16.0, 5.0], &[(1.0, 40.0), (0.1, 20.0)]),
            hybrid_adaptive_sta_smc: profile_with(
                &[18.0, 5.0, 5.0],
                &[(1.0, 40.0), (0.5, 30.0), (0.1, 20.0)],
            ),
            boundary_layer: 0.5,
            eta_max: 40.0,
            beta_max: 30.0,
            leak: 0.0,
        }
    }
}

impl ControllerSettings {
    pub fn profile(&self, kind: ControllerKind) -> &ControllerProfile {
        match kind {
            ControllerKind::ClassicalSmc => &self.classical_smc,
            ControllerKind::StaSmc => &self.sta_smc,
            ControllerKind::AdaptiveSmc => &self.adaptive_smc,
            ControllerKind::HybridAdaptiveStaSmc => &self.hybrid_adaptive_sta_smc,
        }
    }

    pub fn default_gains(&self, kind: ControllerKind) -> Result<Gains> {
        Gains::new(kind, self.profile(kind).gains.clone())
    }

    pub fn bounds(&self, kind: ControllerKind) -> &[(f64, f64)] {
        &self.profile(kind).bounds
    }

    /// Upper limit of the adapted gain (`eta_max` or `beta_max`), if `kind` adapts one
    pub fn gain_cap(&self, kind: ControllerKind) -> Option<f64> {
        match kind {
            ControllerKind::AdaptiveSmc => Some(self.eta_max),
            ControllerKind::HybridAdaptiveStaSmc => Some(self.beta_max),
            ControllerKind::ClassicalSmc | ControllerKind::StaSmc => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("boundary_layer", self.boundary_layer),
            ("eta_max", self.eta_max),
            ("beta_max", self.beta_max),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DipError::config(format!("{} must be > 0, got {}", name, value)));
            }
        }
        if !self.leak.is_finite() || self.leak < 0.0 {
            return Err(DipError::config(format!("leak must be >= 0, got {}", self.leak)));
        }
        for kind in ControllerKind::ALL {
            let gains = self.default_gains(kind)?;
            validate_gain_bounds(kind, self.bounds(kind))
                .map_err(|e| DipError::config(format!("{} bounds: {}", kind, e)))?;
            if let (Some(idx), Some(cap)) = (kind.capped_gain(), self.gain_cap(kind)) {
                if gains.get(idx) > cap {
                    return Err(DipError::config(format!(
                        "{} default {} = {} exceeds cap {}",
                        kind,
                        kind.gain_names()[idx],
                        gains.get(idx),
                        cap
                    )));
                }
                validate_gain_cap(kind, self.bounds(kind), cap)
                    .map_err(|e| DipError::config(format!("{} bounds: {}", kind, e)))?;
            }
        }
        Ok(())
    }
}

// ===== PSO =====

/// Inertia weight as a function of the generation index
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InertiaSchedule {
    Constant { value: f64 },
    /// Linear decay from `start` at the first generation to `end` at the last
    Linear { start: f64, end: f64 },
}

impl Default for InertiaSchedule {
    fn default() -> Self {
        Self::Constant { value: 0.7 }
    }
}

impl InertiaSchedule {
    pub fn weight(&self, iteration: usize, max_iterations: usize) -> f64 {
        match *self {
            Self::Constant { value } => value,
            Self::Linear { start, end } => {
                if max_iterations <= 1 {
                    return start;
                }
                let frac = iteration.min(max_iterations - 1) as f64 / (max_iterations - 1) as f64;
                start + (end - start) * frac
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let ok = match *self {
            Self::Constant { value } => value.is_finite() && value >= 0.0,
            Self::Linear { start, end } => {
                start.is_finite() && end.is_finite() && start >= 0.0 && end >= 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(DipError::config(format!("invalid inertia schedule {:?}", self)))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoSettings {
    pub num_particles: usize,
    pub num_iterations: usize,
    pub inertia: InertiaSchedule,
    /// c1 - personal best influence
    pub cognitive: f64,
    /// c2 - global best influence
    pub social: f64,
    /// Velocity clamp as a fraction of each dimension's range
    pub v_max_fraction: f64,
    /// Minimum global-best improvement that resets the stagnation counter
    pub tolerance: f64,
    /// Consecutive stagnant generations before stopping (0 disables)
    pub patience: usize,
    /// Fixed seed for reproducible runs; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Evaluation thread count; defaults to the number of CPUs
    pub workers: Option<usize>,
}

impl Default for PsoSettings {
    fn default() -> Self {
        Self {
            num_particles: 20,
            num_iterations: 50,
            inertia: InertiaSchedule::default(),
            cognitive: 1.5,
            social: 1.5,
            v_max_fraction: 0.2,
            tolerance: 1e-6,
            patience: 10,
            seed: None,
            workers: None,
        }
    }
}

impl PsoSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(DipError::config("num_particles must be at least 1"));
        }
        if self.num_iterations == 0 {
            return Err(DipError::config("num_iterations must be at least 1"));
        }
        self.inertia.validate()?;
        for (name, value) in [("cognitive", self.cognitive), ("social", self.social)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DipError::config(format!("{} must be >= 0, got {}", name, value)));
            }
        }
        if !self.v_max_fraction.is_finite() || self.v_max_fraction <= 0.0 {
            return Err(DipError::config(format!(
                "v_max_fraction must be > 0, got {}",
                self.v_max_fraction
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(DipError::config(format!(
                "tolerance must be >= 0, got {}",
                self.tolerance
            )));
        }
        if self.workers == Some(0) {
            return Err(DipError::config("workers must be at least 1"));
        }
        Ok(())
    }
}

// ===== COST =====

/// Weights of the scalar tuning cost
/// `w1*settling + w2*overshoot + w3*effort + w4*chattering`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub settling_time: f64,
    pub overshoot: f64,
    pub control_effort: f64,
    pub chattering: f64,
    /// Finite cost assigned to diverged or invalid candidates
    pub divergence_penalty: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            settling_time: 1.0,
            overshoot: 1.0,
            control_effort: 0.01,
            chattering: 0.1,
            divergence_penalty: 1e6,
        }
    }
}

impl CostWeights {
    pub fn new(settling_time: f64, overshoot: f64, control_effort: f64, chattering: f64) -> Self {
        Self {
            settling_time,
            overshoot,
            control_effort,
            chattering,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("settling_time", self.settling_time),
            ("overshoot", self.overshoot),
            ("control_effort", self.control_effort),
            ("chattering", self.chattering),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DipError::config(format!(
                    "cost weight '{}' must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        if !self.divergence_penalty.is_finite() || self.divergence_penalty <= 0.0 {
            return Err(DipError::config(format!(
                "divergence_penalty must be finite and > 0, got {}",
                self.divergence_penalty
            )));
        }
        Ok(())
    }
}

// ===== TOP LEVEL =====

/// Immutable parameters threaded through every run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plant: PlantParameters,
    pub simulation: SimulationSettings,
    pub controllers: ControllerSettings,
    pub pso: PsoSettings,
    pub cost: CostWeights,
}

impl Config {
    /// Parse and validate a JSON config; missing sections and fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.plant.validate()?;
        self.simulation.validate()?;
        self.controllers.validate()?;
        self.pso.validate()?;
        self.cost.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        for kind in ControllerKind::ALL {
            let gains = config.controllers.default_gains(kind).unwrap();
            for (g, &(min, max)) in gains.as_slice().iter().zip(config.controllers.bounds(kind)) {
                assert!(*g >= min && *g <= max, "{} default gain outside bounds", kind);
            }
        }
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config = Config::from_json_str(
            r#"{ "simulation": { "dt": 0.005 }, "pso": { "seed": 7, "num_particles": 8 } }"#,
        )
        .unwrap();
        assert_relative_eq!(config.simulation.dt, 0.005);
        assert_relative_eq!(config.simulation.duration, 10.0);
        assert_eq!(config.pso.seed, Some(7));
        assert_eq!(config.pso.num_particles, 8);
        assert_eq!(config.pso.num_iterations, 50);
        assert_eq!(config.plant, PlantParameters::default());
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let mut config = Config::default();
        config.pso.inertia = InertiaSchedule::Linear { start: 0.9, end: 0.4 };
        config.pso.seed = Some(42);
        config.simulation.integrator = IntegratorKind::Euler;

        let json = config.to_json_string().unwrap();
        let back = Config::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn invalid_sections_are_rejected() {
        assert!(matches!(
            Config::from_json_str(r#"{ "simulation": { "dt": 0.0 } }"#),
            Err(DipError::Configuration(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "controllers": { "classical_smc": { "gains": [1, 1], "bounds": [] } } }"#),
            Err(DipError::Configuration(_))
        ));
        assert!(matches!(
            Config::from_json_str("{ not json"),
            Err(DipError::Serialization(_))
        ));
    }

    #[test]
    fn adaptive_defaults_must_respect_caps() {
        let mut config = Config::default();
        config.controllers.eta_max = 10.0;
        assert!(matches!(
            config.validate(),
            Err(DipError::Configuration(msg)) if msg.contains("eta0")
        ));

        let mut config = Config::default();
        config.controllers.adaptive_smc.bounds[5] = (1.0, 60.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.controllers.beta_max = 4.0;
        assert!(matches!(
            config.validate(),
            Err(DipError::Configuration(msg)) if msg.contains("beta0")
        ));

        let mut config = Config::default();
        config.controllers.hybrid_adaptive_sta_smc.bounds[6] = (0.5, 31.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn linear_inertia_interpolates() {
        let schedule = InertiaSchedule::Linear { start: 0.9, end: 0.4 };
        assert_relative_eq!(schedule.weight(0, 11), 0.9);
        assert_relative_eq!(schedule.weight(5, 11), 0.65);
        assert_relative_eq!(schedule.weight(10, 11), 0.4);
        assert_relative_eq!(InertiaSchedule::default().weight(3, 10), 0.7);
    }
}
