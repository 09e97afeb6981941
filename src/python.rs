use crate::core::config::{Config, CostWeights};
use crate::core::types::{state_from, ControllerKind};
use crate::error::DipError;
use crate::optimizer::Tuner;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(e: DipError) -> PyErr {
    match e {
        DipError::Io(io) => PyIOError::new_err(io.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn load_config(config_json: Option<&str>) -> PyResult<Config> {
    match config_json {
        Some(json) => Config::from_json_str(json).map_err(to_py_err),
        None => Ok(Config::default()),
    }
}

fn initial_state(values: Vec<f64>) -> PyResult<[f64; 6]> {
    values.try_into().map_err(|v: Vec<f64>| {
        PyValueError::new_err(format!("initial_state needs 6 values, got {}", v.len()))
    })
}

/// Simulate one controller and return the outcome as JSON
#[pyfunction]
#[pyo3(signature = (controller, gains, initial_state, duration=10.0, dt=0.01, config_json=None))]
fn simulate(
    controller: &str,
    gains: Vec<f64>,
    initial_state: Vec<f64>,
    duration: f64,
    dt: f64,
    config_json: Option<&str>,
) -> PyResult<String> {
    let kind: ControllerKind = controller.parse().map_err(to_py_err)?;
    let state = state_from(self::initial_state(initial_state)?);
    let tuner = Tuner::new(load_config(config_json)?).map_err(to_py_err)?;
    let outcome = tuner
        .simulate(kind, &gains, state, duration, dt)
        .map_err(to_py_err)?;
    serde_json::to_string(&outcome).map_err(|e| to_py_err(e.into()))
}

/// Tune controller gains with PSO and return the result as JSON
#[pyfunction]
#[pyo3(signature = (controller, bounds, num_particles=20, num_iterations=50, weights=None, config_json=None))]
fn tune(
    py: Python<'_>,
    controller: &str,
    bounds: Vec<(f64, f64)>,
    num_particles: usize,
    num_iterations: usize,
    weights: Option<(f64, f64, f64, f64)>,
    config_json: Option<&str>,
) -> PyResult<String> {
    let kind: ControllerKind = controller.parse().map_err(to_py_err)?;
    let config = load_config(config_json)?;
    let weights = match weights {
        Some((settling, overshoot, effort, chattering)) => CostWeights {
            divergence_penalty: config.cost.divergence_penalty,
            ..CostWeights::new(settling, overshoot, effort, chattering)
        },
        None => config.cost,
    };
    let tuner = Tuner::new(config).map_err(to_py_err)?;

    let result = py
        .allow_threads(|| tuner.tune(kind, &bounds, num_particles, num_iterations, weights))
        .map_err(to_py_err)?;
    serde_json::to_string(&result).map_err(|e| to_py_err(e.into()))
}

/// Default configuration as JSON, for editing on the Python side
#[pyfunction]
fn default_config() -> PyResult<String> {
    Config::default().to_json_string().map_err(to_py_err)
}

#[pymodule]
fn dip_smc_pso(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate, m)?)?;
    m.add_function(wrap_pyfunction!(tune, m)?)?;
    m.add_function(wrap_pyfunction!(default_config, m)?)?;
    Ok(())
}
