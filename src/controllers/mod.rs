mod adaptive;
mod classical;
mod hybrid;
mod super_twisting;
pub mod surface;

pub use adaptive::AdaptiveSmc;
pub use classical::ClassicalSmc;
pub use hybrid::HybridAdaptiveStaSmc;
pub use super_twisting::SuperTwistingSmc;

use crate::core::config::ControllerSettings;
use crate::core::types::{ControllerKind, ForceLimits, Gains, State};
use crate::error::{DipError, Result};
use std::collections::VecDeque;

/// Samples kept per controller for diagnostics
pub const HISTORY_CAPACITY: usize = 1024;

/// One control step as seen by the controller
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlSample {
    pub surface: f64,
    pub force: f64,
}

/// Bounded ring of recent `(s, force)` samples
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlHistory {
    samples: VecDeque<ControlSample>,
}

impl ControlHistory {
    pub fn push(&mut self, surface: f64, force: f64) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(ControlSample { surface, force });
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&ControlSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlSample> {
        self.samples.iter()
    }
}

/// Sliding-mode control law producing a saturated cart force
///
/// Implementations own their accumulators; call [`Controller::reset`] before
/// reusing an instance for a new run.
pub trait Controller: Send {
    fn kind(&self) -> ControllerKind;

    /// Force for the current state; `dt` drives internal integrators
    fn compute_control(&mut self, state: &State, gains: &Gains, dt: f64) -> Result<f64>;

    fn reset(&mut self);

    fn history(&self) -> &ControlHistory;
}

/// Gains built for one variant must not be fed to another
pub(crate) fn check_gains(kind: ControllerKind, gains: &Gains) -> Result<()> {
    if gains.kind() != kind {
        return Err(DipError::config(format!(
            "{} controller received gains for {}",
            kind,
            gains.kind()
        )));
    }
    Ok(())
}

/// Construct a fresh controller of `kind` from the shared settings
pub fn build_controller(
    kind: ControllerKind,
    settings: &ControllerSettings,
    limits: ForceLimits,
) -> Box<dyn Controller> {
    match kind {
        ControllerKind::ClassicalSmc => {
            Box::new(ClassicalSmc::new(limits).with_boundary_layer(settings.boundary_layer))
        }
        ControllerKind::StaSmc => Box::new(SuperTwistingSmc::new(limits)),
        ControllerKind::AdaptiveSmc => Box::new(
            AdaptiveSmc::new(limits)
                .with_boundary_layer(settings.boundary_layer)
                .with_eta_max(settings.eta_max)
                .with_leak(settings.leak),
        ),
        ControllerKind::HybridAdaptiveStaSmc => {
            Box::new(HybridAdaptiveStaSmc::new(limits).with_beta_max(settings.beta_max))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::types::state_from;

    fn states() -> Vec<State> {
        (0..50)
            .map(|i| {
                let t = i as f64 * 0.1;
                state_from([
                    0.5 * t.sin(),
                    t.cos(),
                    0.3 * (2.0 * t).sin(),
                    -0.2 * t.cos(),
                    0.25 * (3.0 * t).cos(),
                    0.7 * t.sin(),
                ])
            })
            .collect()
    }

    #[test]
    fn every_variant_saturates() {
        let config = Config::default();
        let limits = ForceLimits::symmetric(5.0);
        let big = state_from([3.0, -4.0, 1.2, 5.0, -1.0, 8.0]);
        for kind in ControllerKind::ALL {
            let gains = config.controllers.default_gains(kind).unwrap();
            let mut controller = build_controller(kind, &config.controllers, limits);
            for state in [big, -big] {
                for _ in 0..20 {
                    let force = controller.compute_control(&state, &gains, 0.01).unwrap();
                    assert!(limits.contains(force), "{} produced {}", kind, force);
                }
            }
        }
    }

    #[test]
    fn reset_reproduces_a_fresh_instance() {
        let config = Config::default();
        let limits = ForceLimits::default();
        for kind in ControllerKind::ALL {
            let gains = config.controllers.default_gains(kind).unwrap();
            let mut fresh = build_controller(kind, &config.controllers, limits);
            let mut reused = build_controller(kind, &config.controllers, limits);

            for state in states().iter().rev() {
                reused.compute_control(state, &gains, 0.01).unwrap();
            }
            reused.reset();
            assert!(reused.history().is_empty());

            for state in &states() {
                let a = fresh.compute_control(state, &gains, 0.01).unwrap();
                let b = reused.compute_control(state, &gains, 0.01).unwrap();
                assert_eq!(a.to_bits(), b.to_bits(), "{} diverged after reset", kind);
            }
        }
    }

    #[test]
    fn mismatched_gains_are_rejected() {
        let config = Config::default();
        let gains = config
            .controllers
            .default_gains(ControllerKind::StaSmc)
            .unwrap();
        let mut controller = build_controller(
            ControllerKind::ClassicalSmc,
            &config.controllers,
            ForceLimits::default(),
        );
        assert!(matches!(
            controller.compute_control(&State::zeros(), &gains, 0.01),
            Err(DipError::Configuration(_))
        ));
    }

    #[test]
    fn history_is_bounded() {
        let mut history = ControlHistory::default();
        for i in 0..(HISTORY_CAPACITY + 10) {
            history.push(i as f64, 0.0);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.iter().next().unwrap().surface, 10.0);
    }
}
