//! # Data Store

use log::{info, warn};
use serde::Serialize;

use crate::{otg::QuinticOtg, traj_gen};
use util::time::ClockSample;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the executable has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum SafeModeCause {
    /// TrajGen latched an error, cleared by a reset telecommand.
    TrajGenFault,

    /// Too many consecutive cycles overran the cycle period.
    CycleOverruns,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    // Safe mode variables
    /// Determines if the executable is in safe mode. In safe mode motion
    /// telecommands are rejected.
    pub safe: bool,

    /// Gives the reason for being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // TrajGen
    pub traj_gen: traj_gen::TrajGen<QuinticOtg>,
    pub traj_gen_input: traj_gen::InputData,
    pub traj_gen_output: traj_gen::OutputData,
    pub traj_gen_status_rpt: traj_gen::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// Record saved to the session when TrajGen fails.
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    pub cycle: u128,
    pub time_s: f64,
    pub error: String,
    pub last_status: traj_gen::StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a data store with an uninitialised trajectory generator.
    pub fn new(clock: ClockSample) -> Self {
        Self {
            num_cycles: 0,
            safe: false,
            safe_cause: None,
            traj_gen: traj_gen::TrajGen::default(),
            traj_gen_input: traj_gen::InputData::new(clock),
            traj_gen_output: traj_gen::OutputData::default(),
            traj_gen_status_rpt: traj_gen::StatusReport::default(),
            num_consec_cycle_overruns: 0,
        }
    }

    /// Puts the executable into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) if root_cause == cause => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");
                Ok(())
            }
            _ => Err(()),
        }
    }

    /// Prepare the store for a new cycle sampled at `clock`.
    pub fn cycle_start(&mut self, clock: ClockSample) {
        self.traj_gen_input.clock = clock;
    }

    /// Finish the cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ds() -> DataStore {
        DataStore::new(ClockSample {
            now_s: 0.0,
            epoch: Utc.timestamp(0, 0),
        })
    }

    #[test]
    fn test_safe_mode() {
        let mut ds = ds();
        assert_eq!(ds.make_unsafe(SafeModeCause::TrajGenFault), Ok(()));

        ds.make_safe(SafeModeCause::TrajGenFault);
        ds.make_safe(SafeModeCause::CycleOverruns);
        assert!(ds.safe);
        assert_eq!(ds.safe_cause, Some(SafeModeCause::TrajGenFault));

        // Only the root cause can clear safe mode
        assert_eq!(ds.make_unsafe(SafeModeCause::CycleOverruns), Err(()));
        assert!(ds.safe);
        assert_eq!(ds.make_unsafe(SafeModeCause::TrajGenFault), Ok(()));
        assert!(!ds.safe);
    }
}
