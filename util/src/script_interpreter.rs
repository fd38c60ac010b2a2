//! # Command script interpreter module
//!
//! This module provides an interpreter for command scripts, allowing
//! telecommands to be executed at fixed times during a session. A script is
//! a list of lines of the form
//!
//! ```text
//! <exec_time_s>: <tc_json>;
//! ```
//!
//! for example `0.5: {"type": "POINT", "payload": {"positions": [1.0]}};`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug)]
pub struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_tcs` to acquire a list of telecommands that need executing.
#[derive(Debug)]
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script commands are not in time order at {0} s")]
    OutOfOrder(f64),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),
}

#[derive(Debug)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let cmds = Self::parse(&script)?;

        Ok(ScriptInterpreter {
            _script_path: path,
            cmds,
        })
    }

    /// Parse the contents of a script into a time-ordered command queue.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        Ok(ScriptInterpreter {
            _script_path: PathBuf::new(),
            cmds: Self::parse(script)?,
        })
    }

    fn parse(script: &str) -> Result<VecDeque<Command>, ScriptError> {
        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

        for cap in re.captures_iter(script) {
            // Groups 1 and 3 are not optional so always exist on a match
            let (time_str, tc_str) = match (cap.get(1), cap.get(3)) {
                (Some(t), Some(c)) => (t.as_str(), c.as_str()),
                _ => continue,
            };

            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = tc_queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s));
                }
            }

            // Parse the TC from the payload. The scripts contain JSON only.
            let tc = Tc::from_json(tc_str).map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            tc_queue.push_back(Command { exec_time_s, tc });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(tc_queue)
    }

    /// Return all TCs whose execution time is at or before `current_time_s`.
    pub fn get_pending_tcs(&mut self, current_time_s: f64) -> PendingTcs {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript;
        }

        let mut tc_vec: Vec<Tc> = vec![];

        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > current_time_s {
                break;
            }
            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        if tc_vec.is_empty() {
            PendingTcs::None
        } else {
            PendingTcs::Some(tc_vec)
        }
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
        0.0: {"type": "POINT", "payload": {"positions": [1.0, 2.0]}};
        1.5: {"type": "RESET"};
        1.5: {"type": "TRAJ", "payload": {"points": [{"positions": [0.0, 0.0], "time_from_start_s": 1.0}]}};
    "#;

    #[test]
    fn test_parse_and_release() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_tcs(), 3);
        assert_eq!(si.get_duration(), 1.5);

        match si.get_pending_tcs(0.0) {
            PendingTcs::Some(tcs) => {
                assert_eq!(tcs.len(), 1);
                assert!(matches!(tcs[0], Tc::JointPosition(_)));
            }
            other => panic!("Expected one pending TC, got {:?}", other),
        }

        assert!(matches!(si.get_pending_tcs(1.0), PendingTcs::None));

        match si.get_pending_tcs(2.0) {
            PendingTcs::Some(tcs) => {
                assert_eq!(tcs.len(), 2);
                assert!(matches!(tcs[0], Tc::Reset));
                assert!(matches!(tcs[1], Tc::JointTrajectory(_)));
            }
            other => panic!("Expected two pending TCs, got {:?}", other),
        }

        assert!(matches!(si.get_pending_tcs(3.0), PendingTcs::EndOfScript));
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::from_str("nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str(r#"0.0: {"type": "WIBBLE"};"#),
            Err(ScriptError::InvalidTc(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::from_str("1.0: {\"type\": \"RESET\"};\n0.5: {\"type\": \"RESET\"};"),
            Err(ScriptError::OutOfOrder(_))
        ));
    }
}
