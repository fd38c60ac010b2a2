//! # Simulated joint plant
//!
//! Stands in for the joint controllers and encoders when running the
//! executable without hardware. Each joint follows the demanded velocity and
//! closes the position error with a first order lag, so a well behaved
//! reference is tracked closely while a jump in the reference shows up as a
//! tracking error.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traj_gen::{ControlSample, InputData};
use util::{
    archive::{vector_columns, Archived},
    maths,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated plant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Joint positions at the start of the simulation.
    ///
    /// Units: radians
    pub initial_position_rad: Vec<f64>,

    /// Time constant of the position error lag.
    ///
    /// Units: seconds
    pub time_constant_s: f64,
}

/// First order joint plant with velocity feed-forward.
#[derive(Debug, Clone)]
pub struct SimPlant {
    position_rad: Vec<f64>,
    velocity_rads: Vec<f64>,
    time_constant_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("Expected {expected} initial joint positions, found {found}")]
    DofMismatch { expected: usize, found: usize },

    #[error("The plant initial position contains a NaN or infinite value")]
    NonFiniteInitialPosition,

    #[error("The plant time constant must be finite and greater than zero, found {0}")]
    InvalidTimeConstant(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimPlant {
    /// Create a plant at rest at the initial position.
    pub fn new(params: &SimParams, num_dof: usize) -> Result<Self, SimError> {
        if params.initial_position_rad.len() != num_dof {
            return Err(SimError::DofMismatch {
                expected: num_dof,
                found: params.initial_position_rad.len(),
            });
        }

        if !maths::all_finite(&params.initial_position_rad) {
            return Err(SimError::NonFiniteInitialPosition);
        }

        if !params.time_constant_s.is_finite() || params.time_constant_s <= 0.0 {
            return Err(SimError::InvalidTimeConstant(params.time_constant_s));
        }

        Ok(Self {
            position_rad: params.initial_position_rad.clone(),
            velocity_rads: vec![0.0; num_dof],
            time_constant_s: params.time_constant_s,
        })
    }

    /// Advance the plant by `dt_s` seconds towards `dems`.
    ///
    /// With no demand the joints stop where they are.
    pub fn step(&mut self, dems: Option<&ControlSample>, dt_s: f64) {
        let dems = match dems {
            Some(d) if d.position.len() == self.position_rad.len() && dt_s > 0.0 => d,
            _ => {
                self.velocity_rads.iter_mut().for_each(|v| *v = 0.0);
                return;
            }
        };

        // Fraction of the position error removed this step, capped so a long
        // step never overshoots
        let gain = (dt_s / self.time_constant_s).min(1.0);

        for i in 0..self.position_rad.len() {
            let correction = gain * (dems.position[i] - self.position_rad[i]);
            let feed_forward = dems.velocity[i] * dt_s;

            self.position_rad[i] += feed_forward + correction;
            self.velocity_rads[i] = dems.velocity[i] + correction / dt_s;
        }
    }

    /// Publish the plant state as fresh feedback.
    pub fn write_feedback(&self, input: &mut InputData) {
        input.joint_position_in.write(self.position_rad.clone());
        input.joint_velocity_in.write(self.velocity_rads.clone());
    }

    pub fn position_rad(&self) -> &[f64] {
        &self.position_rad
    }

    pub fn velocity_rads(&self) -> &[f64] {
        &self.velocity_rads
    }
}

impl Archived for SimPlant {
    fn columns(&self) -> Vec<String> {
        let mut cols = vector_columns("position_rad", self.position_rad.len());
        cols.extend(vector_columns("velocity_rads", self.velocity_rads.len()));
        cols
    }

    fn values(&self) -> Vec<f64> {
        self.position_rad
            .iter()
            .chain(self.velocity_rads.iter())
            .copied()
            .collect()
    }
}
