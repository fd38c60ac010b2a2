//! # Joint motion telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single joint-space target to be reached as fast as the joint limits
/// allow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointPositionCmd {
    /// Target position of each joint, in the configured joint order.
    ///
    /// Units: radians
    pub positions: Vec<f64>,
}

/// A timed sequence of joint-space waypoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointTrajectory {
    /// Wall-clock time at which the trajectory should start. If `None` the
    /// trajectory starts as soon as it is received.
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,

    /// Names of the joints in the order used by the waypoints. If empty the
    /// waypoints are assumed to be in the configured joint order.
    #[serde(default)]
    pub joint_names: Vec<String>,

    /// The waypoints, in execution order.
    pub points: Vec<JointTrajectoryPoint>,
}

/// One waypoint of a `JointTrajectory`.
///
/// Any of the state vectors may be left empty, in which case the goal for
/// that quantity is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointTrajectoryPoint {
    /// Units: radians
    #[serde(default)]
    pub positions: Vec<f64>,

    /// Units: radians/second
    #[serde(default)]
    pub velocities: Vec<f64>,

    /// Units: radians/second^2
    #[serde(default)]
    pub accelerations: Vec<f64>,

    /// Time after the trajectory start at which this waypoint shall be
    /// reached.
    ///
    /// Units: seconds
    pub time_from_start_s: f64,
}
