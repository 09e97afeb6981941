use super::runner::Trajectory;
use crate::core::config::SimulationSettings;
use crate::core::types::max_angle;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Scalar summary of one trajectory
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Seconds until both angles stay inside the band; the run duration if never
    pub settling_time: f64,
    pub settled: bool,
    /// Peak angle above the initial peak angle (rad), never negative
    pub overshoot: f64,
    /// Trapezoidal integral of F^2
    pub control_effort: f64,
    /// std(diff(F)) / mean(|F|)
    pub chattering_index: f64,
    pub diverged: bool,
    pub divergence_step: Option<usize>,
}

impl PerformanceMetrics {
    /// Ordered name -> value map for tabular reports
    pub fn to_row(&self) -> IndexMap<&'static str, f64> {
        let mut row = IndexMap::new();
        row.insert("settling_time", self.settling_time);
        row.insert("settled", if self.settled { 1.0 } else { 0.0 });
        row.insert("overshoot", self.overshoot);
        row.insert("control_effort", self.control_effort);
        row.insert("chattering_index", self.chattering_index);
        row.insert("diverged", if self.diverged { 1.0 } else { 0.0 });
        row
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsEvaluator {
    settle_tolerance: f64,
    duration: f64,
}

impl MetricsEvaluator {
    /// `duration` is reported as the settling time of runs that never settle
    pub fn new(settle_tolerance: f64, duration: f64) -> Self {
        Self {
            settle_tolerance,
            duration,
        }
    }

    pub fn from_settings(settings: &SimulationSettings) -> Self {
        Self::new(settings.settle_tolerance, settings.duration)
    }

    pub fn evaluate(&self, trajectory: &Trajectory) -> PerformanceMetrics {
        let (settling_time, settled) = self.settling_time(trajectory);
        PerformanceMetrics {
            settling_time,
            settled,
            overshoot: overshoot(trajectory),
            control_effort: control_effort(&trajectory.times, &trajectory.forces),
            chattering_index: chattering_index(&trajectory.forces),
            diverged: trajectory.diverged(),
            divergence_step: trajectory.divergence.as_ref().map(|d| d.step),
        }
    }

    fn settling_time(&self, trajectory: &Trajectory) -> (f64, bool) {
        if trajectory.diverged() || trajectory.states.is_empty() {
            return (self.duration, false);
        }

        let last_outside = trajectory
            .states
            .iter()
            .rposition(|s| max_angle(s) > self.settle_tolerance);

        match last_outside {
            None => (0.0, true),
            Some(i) if i + 1 >= trajectory.states.len() => (self.duration, false),
            Some(i) => (trajectory.times[i + 1], true),
        }
    }
}

fn overshoot(trajectory: &Trajectory) -> f64 {
    let Some(initial) = trajectory.states.first() else {
        return 0.0;
    };
    let peak = trajectory
        .states
        .iter()
        .map(max_angle)
        .fold(0.0f64, f64::max);
    (peak - max_angle(initial)).max(0.0)
}

/// Trapezoidal `integral F^2 dt`, force `k` sampled at `times[k]`
pub fn control_effort(times: &[f64], forces: &[f64]) -> f64 {
    forces
        .windows(2)
        .zip(times.windows(2))
        .map(|(f, t)| 0.5 * (f[0] * f[0] + f[1] * f[1]) * (t[1] - t[0]))
        .sum()
}

/// Population std of successive force differences over mean |F|
pub fn chattering_index(forces: &[f64]) -> f64 {
    if forces.len() < 2 {
        return 0.0;
    }
    let mean_abs = forces.iter().map(|f| f.abs()).sum::<f64>() / forces.len() as f64;
    if mean_abs < 1e-12 {
        return 0.0;
    }

    let diffs: Vec<f64> = forces.windows(2).map(|w| w[1] - w[0]).collect();
    let n = diffs.len() as f64;
    let mean = diffs.iter().sum::<f64>() / n;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean_abs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::state_from;
    use crate::error::DivergenceCause;
    use crate::simulation::DivergenceInfo;
    use approx::assert_relative_eq;

    fn trajectory(angles: &[f64], forces: &[f64]) -> Trajectory {
        Trajectory {
            times: (0..angles.len()).map(|i| i as f64 * 0.1).collect(),
            states: angles
                .iter()
                .map(|&a| state_from([0.0, 0.0, a, 0.0, -a / 2.0, 0.0]))
                .collect(),
            forces: forces.to_vec(),
            divergence: None,
        }
    }

    #[test]
    fn settling_time_is_first_sample_of_final_band() {
        let traj = trajectory(&[0.1, 0.05, 0.005, 0.02, 0.004, 0.001], &[0.0; 5]);
        let metrics = MetricsEvaluator::new(0.01, 10.0).evaluate(&traj);
        assert!(metrics.settled);
        assert_relative_eq!(metrics.settling_time, 0.4);
    }

    #[test]
    fn unsettled_and_diverged_runs_report_duration() {
        let evaluator = MetricsEvaluator::new(0.01, 10.0);
        let mut traj = trajectory(&[0.1, 0.05, 0.02], &[1.0, 1.0]);
        let metrics = evaluator.evaluate(&traj);
        assert!(!metrics.settled);
        assert_eq!(metrics.settling_time, 10.0);

        traj = trajectory(&[0.1, 0.001, 0.0], &[1.0, 1.0]);
        traj.divergence = Some(DivergenceInfo {
            step: 2,
            time: 0.2,
            cause: DivergenceCause::AngleLimit,
            component: None,
        });
        let metrics = evaluator.evaluate(&traj);
        assert!(!metrics.settled);
        assert!(metrics.diverged);
        assert_eq!(metrics.divergence_step, Some(2));
        assert_eq!(metrics.settling_time, 10.0);
    }

    #[test]
    fn always_in_band_settles_immediately() {
        let traj = trajectory(&[0.001, -0.002, 0.0], &[0.0, 0.0]);
        let metrics = MetricsEvaluator::new(0.01, 10.0).evaluate(&traj);
        assert!(metrics.settled);
        assert_eq!(metrics.settling_time, 0.0);
    }

    #[test]
    fn overshoot_is_peak_above_initial() {
        let traj = trajectory(&[0.1, -0.25, 0.05], &[0.0, 0.0]);
        let metrics = MetricsEvaluator::new(0.01, 10.0).evaluate(&traj);
        assert_relative_eq!(metrics.overshoot, 0.15, epsilon = 1e-12);

        let decaying = trajectory(&[0.1, 0.05, 0.0], &[0.0, 0.0]);
        assert_eq!(MetricsEvaluator::new(0.01, 10.0).evaluate(&decaying).overshoot, 0.0);
    }

    #[test]
    fn effort_is_trapezoidal() {
        // (0.5*(4+16) + 0.5*(16+0)) * 0.5
        assert_relative_eq!(
            control_effort(&[0.0, 0.5, 1.0], &[2.0, 4.0, 0.0]),
            9.0,
            epsilon = 1e-12
        );
        assert_eq!(control_effort(&[0.0], &[3.0]), 0.0);
    }

    #[test]
    fn chattering_of_constant_and_alternating_forces() {
        assert_eq!(chattering_index(&[3.0; 10]), 0.0);
        assert_eq!(chattering_index(&[0.0; 10]), 0.0);
        assert_eq!(chattering_index(&[5.0]), 0.0);

        // diffs alternate -2, +2: std 2, mean |F| 1
        let alternating: Vec<f64> = (0..11).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_relative_eq!(chattering_index(&alternating), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn row_keeps_column_order() {
        let traj = trajectory(&[0.0, 0.0], &[0.0]);
        let row = MetricsEvaluator::new(0.01, 1.0).evaluate(&traj).to_row();
        let keys: Vec<_> = row.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                "settling_time",
                "settled",
                "overshoot",
                "control_effort",
                "chattering_index",
                "diverged"
            ]
        );
    }
}
