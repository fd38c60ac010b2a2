//! # Joint Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Reference demands sent to the joints every cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JointDems {
    /// Demanded position of each joint.
    ///
    /// Units: radians
    pub position_rad: Vec<f64>,

    /// Demanded velocity of each joint.
    ///
    /// Units: radians/second
    pub velocity_rads: Vec<f64>,
}

/// Snapshot of the desired joint state, published at a throttled rate for
/// monitoring.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointStateDesired {
    /// Wall-clock time at which this state was the reference.
    pub stamp: DateTime<Utc>,

    /// Units: radians
    pub position_rad: Vec<f64>,

    /// Units: radians/second
    pub velocity_rads: Vec<f64>,
}
