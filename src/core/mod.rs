pub mod config;
pub mod constraints;
pub mod types;

pub use config::*;
pub use constraints::{
    validate_bounds, validate_gain_bounds, validate_gain_cap, validate_gains, validate_timing,
    MAX_STEPS,
};
pub use types::*;
