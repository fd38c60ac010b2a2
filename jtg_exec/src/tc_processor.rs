//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use crate::data_store::{DataStore, SafeModeCause};
use comms_if::tc::Tc;
use util::module::State;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Motion commands are written into the trajectory generator's command
/// ports, where they are picked up on the next fresh-feedback cycle. While
/// safe only `Reset` is executed.
pub fn exec(ds: &mut DataStore, tc: &Tc) {
    if ds.safe && !matches!(tc, Tc::Reset) {
        warn!(
            "In safe mode ({:?}), {:?} TC not executed",
            ds.safe_cause,
            tc.tc_type()
        );
        return;
    }

    match tc {
        Tc::JointPosition(cmd) => {
            debug!("Received JointPosition command");
            ds.traj_gen_input.position_cmd_in.write(cmd.clone());
        }
        Tc::JointTrajectory(traj) => {
            debug!(
                "Received JointTrajectory command with {} points",
                traj.points.len()
            );
            ds.traj_gen_input.traj_cmd_in.write(traj.clone());
        }
        Tc::Reset => {
            debug!("Received Reset command");
            ds.traj_gen.reset();
            ds.make_unsafe(SafeModeCause::TrajGenFault).ok();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use comms_if::tc::JointPositionCmd;
    use util::time::ClockSample;

    fn ds() -> DataStore {
        DataStore::new(ClockSample {
            now_s: 0.0,
            epoch: Utc.timestamp(0, 0),
        })
    }

    #[test]
    fn test_exec_motion() {
        let mut ds = ds();
        let cmd = JointPositionCmd {
            positions: vec![1.0],
        };

        exec(&mut ds, &Tc::JointPosition(cmd.clone()));
        assert_eq!(ds.traj_gen_input.position_cmd_in.peek(), Some(&cmd));
        assert!(ds.traj_gen_input.position_cmd_in.has_fresh());
    }

    #[test]
    fn test_safe_mode_rejects_motion() {
        let mut ds = ds();
        ds.make_safe(SafeModeCause::TrajGenFault);

        exec(
            &mut ds,
            &Tc::JointPosition(JointPositionCmd {
                positions: vec![1.0],
            }),
        );
        assert!(!ds.traj_gen_input.position_cmd_in.has_fresh());

        exec(&mut ds, &Tc::Reset);
        assert!(!ds.safe);
    }
}
