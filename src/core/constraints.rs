use super::types::ControllerKind;
use crate::error::{DipError, Result};

/// Validate a gain vector for a controller variant
///
/// Checks the gain count against the variant's layout, then that every gain is
/// finite and strictly positive.
pub fn validate_gains(kind: ControllerKind, gains: &[f64]) -> Result<()> {
    if gains.len() != kind.gain_count() {
        return Err(DipError::config(format!(
            "{} expects {} gains {:?}, got {}",
            kind,
            kind.gain_count(),
            kind.gain_names(),
            gains.len()
        )));
    }

    for (name, &value) in kind.gain_names().iter().zip(gains.iter()) {
        if !value.is_finite() || value <= 0.0 {
            return Err(DipError::config(format!(
                "{} gain '{}' must be finite and > 0, got {}",
                kind, name, value
            )));
        }
    }

    Ok(())
}

/// Validate optimizer bounds: non-empty, finite, min < max in every dimension
pub fn validate_bounds(bounds: &[(f64, f64)]) -> Result<()> {
    if bounds.is_empty() {
        return Err(DipError::bounds("search space has no dimensions"));
    }

    for (i, &(min, max)) in bounds.iter().enumerate() {
        if !min.is_finite() || !max.is_finite() {
            return Err(DipError::bounds(format!(
                "dimension {} has non-finite bounds [{}, {}]",
                i, min, max
            )));
        }
        if min >= max {
            return Err(DipError::bounds(format!(
                "dimension {} requires min < max, got [{}, {}]",
                i, min, max
            )));
        }
    }

    Ok(())
}

/// Bounds used to tune a controller must also keep every candidate a valid gain vector
pub fn validate_gain_bounds(kind: ControllerKind, bounds: &[(f64, f64)]) -> Result<()> {
    validate_bounds(bounds)?;

    if bounds.len() != kind.gain_count() {
        return Err(DipError::bounds(format!(
            "{} has {} gains but {} bounds were given",
            kind,
            kind.gain_count(),
            bounds.len()
        )));
    }

    for (name, &(min, _)) in kind.gain_names().iter().zip(bounds.iter()) {
        if min <= 0.0 {
            return Err(DipError::bounds(format!(
                "lower bound of gain '{}' must be > 0, got {}",
                name, min
            )));
        }
    }

    Ok(())
}

/// Initial adaptive gains must start at or below the adaptation cap
///
/// `bounds` are the search bounds of `kind`; variants without an adaptive gain
/// always pass.
pub fn validate_gain_cap(kind: ControllerKind, bounds: &[(f64, f64)], cap: f64) -> Result<()> {
    let Some(idx) = kind.capped_gain() else {
        return Ok(());
    };
    let Some(&(_, max)) = bounds.get(idx) else {
        return Ok(());
    };
    if max > cap {
        return Err(DipError::bounds(format!(
            "upper bound of gain '{}' is {}, above the adaptation cap {}",
            kind.gain_names()[idx],
            max,
            cap
        )));
    }
    Ok(())
}

/// Largest number of integration steps a single run may request
pub const MAX_STEPS: usize = 10_000_000;

/// Duration and timestep must be positive and finite, with between one and
/// [`MAX_STEPS`] steps
pub fn validate_timing(duration: f64, dt: f64) -> Result<()> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(DipError::config(format!("timestep must be > 0, got {}", dt)));
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(DipError::config(format!(
            "duration must be > 0, got {}",
            duration
        )));
    }
    if duration < dt {
        return Err(DipError::config(format!(
            "duration {} is shorter than one timestep {}",
            duration, dt
        )));
    }
    let steps = (duration / dt).round();
    if steps > MAX_STEPS as f64 {
        return Err(DipError::config(format!(
            "duration {} at timestep {} needs {} steps, more than {}",
            duration, dt, steps, MAX_STEPS
        )));
    }
    Ok(())
}
