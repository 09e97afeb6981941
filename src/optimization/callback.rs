use super::solvers::traits::OptimizationCallback;
use crate::error::Result;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Swarm summary published after every generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// 1-based generation index
    pub iteration: usize,
    pub best_cost: f64,
    pub best_params: Vec<f64>,
    /// Mean cost of this generation's evaluations
    pub mean_cost: f64,
    /// Total cost evaluations so far
    pub evaluations: usize,
}

/// Cooperative stop flag, checked by solvers between generations
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Callback for tracking, logging and streaming tuning progress
pub struct TuningCallback {
    verbose: bool,
    max_iterations: usize,
    history: Vec<GenerationReport>,
    param_names: Vec<String>,
    target_cost: Option<f64>,
    progress: Option<Sender<GenerationReport>>,
    reached_target: bool,
}

impl TuningCallback {
    pub fn new(verbose: bool, max_iterations: usize, param_names: Vec<String>) -> Self {
        Self {
            verbose,
            max_iterations,
            history: Vec::new(),
            param_names,
            target_cost: None,
            progress: None,
            reached_target: false,
        }
    }

    /// Stop as soon as the global best drops to `cost` or below
    pub fn with_target_cost(mut self, cost: f64) -> Self {
        self.target_cost = Some(cost);
        self
    }

    /// Forward every report to an observer; a dropped receiver is ignored
    pub fn with_progress(mut self, sender: Sender<GenerationReport>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Get iteration history
    pub fn history(&self) -> &[GenerationReport] {
        &self.history
    }

    fn format_params(&self, params: &[f64]) -> String {
        self.param_names
            .iter()
            .zip(params)
            .map(|(name, value)| format!("{}={:.4}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl OptimizationCallback for TuningCallback {
    fn on_iteration(&mut self, report: &GenerationReport) -> Result<()> {
        if self.verbose {
            info!(
                "Generation {}/{}: best={:.6} mean={:.6} [{}]",
                report.iteration,
                self.max_iterations,
                report.best_cost,
                report.mean_cost,
                self.format_params(&report.best_params)
            );
        }

        if let Some(target) = self.target_cost {
            self.reached_target = report.best_cost <= target;
        }

        if let Some(tx) = &self.progress {
            let _ = tx.send(report.clone());
        }

        self.history.push(report.clone());
        Ok(())
    }

    fn should_stop(&self) -> bool {
        self.reached_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;

    fn report(iteration: usize, best_cost: f64) -> GenerationReport {
        GenerationReport {
            iteration,
            best_cost,
            best_params: vec![1.0, 2.0],
            mean_cost: best_cost * 2.0,
            evaluations: iteration * 4,
        }
    }

    #[test]
    fn streams_reports_and_keeps_history() {
        let (tx, rx) = unbounded();
        let mut callback =
            TuningCallback::new(false, 3, vec!["k1".into(), "k2".into()]).with_progress(tx);
        callback.on_iteration(&report(1, 5.0)).unwrap();
        callback.on_iteration(&report(2, 4.0)).unwrap();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].best_cost, 4.0);
        assert_eq!(callback.history().len(), 2);
    }

    #[test]
    fn dropped_receiver_is_not_an_error() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut callback = TuningCallback::new(false, 1, Vec::new()).with_progress(tx);
        assert!(callback.on_iteration(&report(1, 1.0)).is_ok());
    }

    #[test]
    fn target_cost_requests_stop() {
        let mut callback = TuningCallback::new(false, 10, Vec::new()).with_target_cost(2.0);
        callback.on_iteration(&report(1, 3.0)).unwrap();
        assert!(!callback.should_stop());
        callback.on_iteration(&report(2, 1.5)).unwrap();
        assert!(callback.should_stop());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
