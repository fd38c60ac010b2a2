//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface. Telecommands are JSON objects of the form
//!
//! ```text
//! {"type": "<TYPE>", "payload": <payload object>}
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod joint_traj;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde_json::{self, Value};
use thiserror::Error;

pub use joint_traj::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the trajectory generator.
#[derive(Debug, Clone, PartialEq)]
pub enum Tc {
    /// Move to a single joint position as fast as possible.
    JointPosition(JointPositionCmd),

    /// Execute a timed joint trajectory.
    JointTrajectory(JointTrajectory),

    /// Clear a latched trajectory generator fault.
    Reset,
}

/// Telecommand types.
///
/// The type is used to identify the purpose of the telecommand, and decides
/// which payload is expected.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TcType {
    JointPosition,
    JointTrajectory,
    Reset,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0:?} is expected to have a payload but it doesn't")]
    MissingPayload(TcType),

    #[error("TC of type {0:?} has an invalid payload: {1}")]
    InvalidPayload(TcType, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        let val: Value = serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)?;

        // Get the type of the TC
        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => {
                return Err(TcParseError::InvalidType(String::from(
                    "Expected \"type\" to be a string",
                )))
            }
        };
        let tc_type = match TcType::from_str(type_str) {
            Some(t) => t,
            None => {
                return Err(TcParseError::InvalidType(format!(
                    "{} is not a recognised TC type",
                    type_str
                )))
            }
        };

        if !tc_type.has_payload() {
            return Ok(Tc::Reset);
        }

        // Get the payload. If it's null for a type which needs one an error
        // is returned
        let payload = &val["payload"];
        if payload.is_null() {
            return Err(TcParseError::MissingPayload(tc_type));
        }

        match tc_type {
            TcType::JointPosition => serde_json::from_value(payload.clone())
                .map(Tc::JointPosition)
                .map_err(|e| TcParseError::InvalidPayload(tc_type, e)),
            TcType::JointTrajectory => serde_json::from_value(payload.clone())
                .map(Tc::JointTrajectory)
                .map_err(|e| TcParseError::InvalidPayload(tc_type, e)),
            TcType::Reset => Ok(Tc::Reset),
        }
    }

    /// Get the type of this TC
    pub fn tc_type(&self) -> TcType {
        match self {
            Tc::JointPosition(_) => TcType::JointPosition,
            Tc::JointTrajectory(_) => TcType::JointTrajectory,
            Tc::Reset => TcType::Reset,
        }
    }
}

impl TcType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "POINT" => Some(TcType::JointPosition),
            "TRAJ" => Some(TcType::JointTrajectory),
            "RESET" => Some(TcType::Reset),
            _ => None,
        }
    }

    fn has_payload(&self) -> bool {
        !matches!(self, TcType::Reset)
    }
}
