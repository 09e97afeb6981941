use super::{SimulationOutcome, Tuner};
use crate::core::config::Config;
use crate::core::types::{ControllerKind, State};
use crate::error::Result;
use indexmap::IndexMap;
use rayon::prelude::*;

/// Run each controller with its default gains from the same initial state
///
/// Runs execute in parallel; the table keeps the order of `kinds`.
pub fn compare_controllers(
    config: &Config,
    kinds: &[ControllerKind],
    initial_state: State,
) -> Result<IndexMap<ControllerKind, SimulationOutcome>> {
    let tuner = Tuner::new(config.clone())?;
    let sim = &config.simulation;

    let outcomes: Vec<_> = kinds
        .par_iter()
        .map(|&kind| -> Result<(ControllerKind, SimulationOutcome)> {
            let gains = config.controllers.default_gains(kind)?;
            let outcome =
                tuner.simulate(kind, gains.as_slice(), initial_state, sim.duration, sim.dt)?;
            Ok((kind, outcome))
        })
        .collect();

    outcomes.into_iter().collect()
}
