//! # Trajectory Generator Executable Parameters
//!
//! This module provide parameters for the trajectory generator executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::sim::SimParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JtgExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycle overruns after which the executable is
    /// made safe.
    pub max_consec_cycle_overruns: u64,

    /// Longest time to keep running after the end of the script while the
    /// trajectory generator is still moving.
    ///
    /// Units: seconds
    pub end_of_script_timeout_s: f64,

    /// Simulated joint plant.
    pub sim: SimParams,
}
