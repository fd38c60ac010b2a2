//! Trajectory generator parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory generator.
///
/// All per-joint vectors must have `num_dof` elements, in the same order as
/// `joint_names`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Number of controlled joints. Fixed for the lifetime of the module.
    pub num_dof: usize,

    /// Name of each joint. May be left empty, in which case trajectories
    /// carrying joint names are rejected.
    #[serde(default)]
    pub joint_names: Vec<String>,

    /// Maximum allowed difference between the last generated position and
    /// the measured position before the trajectory is recomputed from the
    /// measured state.
    ///
    /// Units: radians
    pub position_tolerance_rad: Vec<f64>,

    /// Units: radians/second
    pub max_velocity_rads: Vec<f64>,

    /// Units: radians/second^2
    pub max_acceleration_rads2: Vec<f64>,

    /// Units: radians/second^3
    pub max_jerk_rads3: Vec<f64>,

    /// Period of the control cycle the OTG solver is sampled at.
    ///
    /// Units: seconds
    pub sampling_resolution_s: f64,

    /// Minimum control time between two desired state snapshots.
    ///
    /// Units: seconds
    #[serde(default = "default_snapshot_period_s")]
    pub snapshot_period_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a parameter set cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("The number of joints must be at least 1")]
    ZeroDof,

    #[error("Expected {expected} elements in {name}, found {found}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(
        "{name}[{index}] is {value}, OTG limits must all be finite and greater than zero \
        for a solution to exist"
    )]
    InvalidLimit {
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("position_tolerance_rad[{0}] must be finite and not negative")]
    InvalidTolerance(usize),

    #[error("sampling_resolution_s must be finite and greater than zero")]
    InvalidSamplingResolution,

    #[error("snapshot_period_s must be finite and not negative")]
    InvalidSnapshotPeriod,

    #[error("Joint name {0} appears more than once")]
    DuplicateJointName(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a usable generator.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.num_dof == 0 {
            return Err(ParamsError::ZeroDof);
        }

        if !self.joint_names.is_empty() {
            self.check_len("joint_names", self.joint_names.len())?;

            for (i, name) in self.joint_names.iter().enumerate() {
                if self.joint_names[..i].contains(name) {
                    return Err(ParamsError::DuplicateJointName(name.clone()));
                }
            }
        }

        self.check_len("position_tolerance_rad", self.position_tolerance_rad.len())?;
        for (i, tol) in self.position_tolerance_rad.iter().enumerate() {
            if !tol.is_finite() || *tol < 0.0 {
                return Err(ParamsError::InvalidTolerance(i));
            }
        }

        for (name, limits) in [
            ("max_velocity_rads", &self.max_velocity_rads),
            ("max_acceleration_rads2", &self.max_acceleration_rads2),
            ("max_jerk_rads3", &self.max_jerk_rads3),
        ]
        .iter()
        {
            self.check_len(name, limits.len())?;

            for (index, value) in limits.iter().enumerate() {
                if !value.is_finite() || *value <= 0.0 {
                    return Err(ParamsError::InvalidLimit {
                        name,
                        index,
                        value: *value,
                    });
                }
            }
        }

        if !self.sampling_resolution_s.is_finite() || self.sampling_resolution_s <= 0.0 {
            return Err(ParamsError::InvalidSamplingResolution);
        }

        if !self.snapshot_period_s.is_finite() || self.snapshot_period_s < 0.0 {
            return Err(ParamsError::InvalidSnapshotPeriod);
        }

        Ok(())
    }

    fn check_len(&self, name: &'static str, found: usize) -> Result<(), ParamsError> {
        if found == self.num_dof {
            Ok(())
        } else {
            Err(ParamsError::LengthMismatch {
                name,
                expected: self.num_dof,
                found,
            })
        }
    }
}

fn default_snapshot_period_s() -> f64 {
    0.02
}
