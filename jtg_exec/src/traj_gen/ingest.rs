//! Conversion of incoming commands into segments

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::DVector;
use thiserror::Error;

// Internal
use super::Segment;
use comms_if::{
    port::Reading,
    tc::{JointPositionCmd, JointTrajectory},
};
use util::{maths, time::ClockSample};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Validates commands against the configured joints and builds segments from
/// them.
#[derive(Debug, Default, Clone)]
pub struct Ingestor {
    num_dof: usize,
    joint_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The command to act on this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewCommand<'a> {
    Point(&'a JointPositionCmd),
    Trajectory(&'a JointTrajectory),
}

/// Reasons a command is rejected. A rejected command never modifies the
/// segment queue.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IngestError {
    #[error("Point command has no positions")]
    EmptyPoint,

    #[error("Trajectory has no waypoints")]
    EmptyTrajectory,

    #[error("Expected {expected} elements in {field}, found {found}")]
    DofMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{0} contains a NaN or infinite value")]
    NonFinite(&'static str),

    #[error(
        "Waypoint {index} has time_from_start_s = {time_from_start_s}, times must be \
        finite, not negative and not decreasing"
    )]
    InvalidTiming { index: usize, time_from_start_s: f64 },

    #[error("Trajectory start stamp cannot be expressed in control time")]
    InvalidStamp,

    #[error("Trajectory names joints but no joint names are configured")]
    NoJointNames,

    #[error("Unknown joint {0}")]
    UnknownJoint(String),

    #[error("Joint {0} appears more than once")]
    DuplicateJoint(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Ingestor {
    pub fn new(num_dof: usize, joint_names: Vec<String>) -> Self {
        Self {
            num_dof,
            joint_names,
        }
    }

    /// Build the segment for a point command received at `now_s`.
    ///
    /// The segment is due immediately and ends at rest at the commanded
    /// positions.
    pub fn point_to_segment(
        &self,
        cmd: &JointPositionCmd,
        now_s: f64,
    ) -> Result<Segment, IngestError> {
        if cmd.positions.is_empty() {
            return Err(IngestError::EmptyPoint);
        }

        let mut seg = Segment::zeros(self.num_dof, now_s, now_s);
        self.fill("positions", &cmd.positions, None, &mut seg.goal_position)?;

        Ok(seg)
    }

    /// Build one segment per waypoint of a trajectory.
    ///
    /// The first segment starts at the trajectory stamp, or at `clock.now_s`
    /// if the trajectory is not stamped. Each later segment starts at the
    /// goal time of the one before it.
    pub fn trajectory_to_segments(
        &self,
        traj: &JointTrajectory,
        clock: &ClockSample,
    ) -> Result<Vec<Segment>, IngestError> {
        if traj.points.is_empty() {
            return Err(IngestError::EmptyTrajectory);
        }

        let order = self.joint_order(&traj.joint_names)?;

        let traj_start_s = match traj.stamp {
            Some(stamp) => clock
                .wall_to_control_s(stamp)
                .ok_or(IngestError::InvalidStamp)?,
            None => clock.now_s,
        };

        let mut segments = Vec::with_capacity(traj.points.len());
        let mut start_time_s = traj_start_s;
        let mut last_time_from_start_s = 0.0;

        for (index, point) in traj.points.iter().enumerate() {
            let tfs = point.time_from_start_s;
            if !tfs.is_finite() || tfs < last_time_from_start_s {
                return Err(IngestError::InvalidTiming {
                    index,
                    time_from_start_s: tfs,
                });
            }
            last_time_from_start_s = tfs;

            let goal_time_s = traj_start_s + tfs;
            let mut seg = Segment::zeros(self.num_dof, start_time_s, goal_time_s);

            self.fill("positions", &point.positions, order.as_deref(), &mut seg.goal_position)?;
            self.fill("velocities", &point.velocities, order.as_deref(), &mut seg.goal_velocity)?;
            self.fill(
                "accelerations",
                &point.accelerations,
                order.as_deref(),
                &mut seg.goal_acceleration,
            )?;

            segments.push(seg);
            start_time_s = goal_time_s;
        }

        Ok(segments)
    }

    /// Map each position in the command's joint order to the configured
    /// joint index. `None` means the command already uses configured order.
    fn joint_order(&self, names: &[String]) -> Result<Option<Vec<usize>>, IngestError> {
        if names.is_empty() {
            return Ok(None);
        }

        if self.joint_names.is_empty() {
            return Err(IngestError::NoJointNames);
        }

        if names.len() != self.num_dof {
            return Err(IngestError::DofMismatch {
                field: "joint_names",
                expected: self.num_dof,
                found: names.len(),
            });
        }

        let mut order = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .joint_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| IngestError::UnknownJoint(name.clone()))?;

            if order.contains(&index) {
                return Err(IngestError::DuplicateJoint(name.clone()));
            }
            order.push(index);
        }

        Ok(Some(order))
    }

    /// Copy a command field into a goal vector. An empty field leaves the
    /// goal at zero.
    fn fill(
        &self,
        field: &'static str,
        values: &[f64],
        order: Option<&[usize]>,
        goal: &mut DVector<f64>,
    ) -> Result<(), IngestError> {
        if values.is_empty() {
            return Ok(());
        }

        if values.len() != self.num_dof {
            return Err(IngestError::DofMismatch {
                field,
                expected: self.num_dof,
                found: values.len(),
            });
        }

        if !maths::all_finite(values) {
            return Err(IngestError::NonFinite(field));
        }

        for (i, v) in values.iter().enumerate() {
            let joint = order.map_or(i, |o| o[i]);
            goal[joint] = *v;
        }

        Ok(())
    }
}

/// Pick the command to act on from the two command ports.
///
/// Both ports are read, so a trajectory arriving on the same cycle as a point
/// command is consumed and dropped. A fresh point command always wins.
pub fn select_command<'a>(
    point: Reading<'a, JointPositionCmd>,
    traj: Reading<'a, JointTrajectory>,
) -> Option<NewCommand<'a>> {
    match (point.fresh(), traj.fresh()) {
        (Some(p), _) => Some(NewCommand::Point(p)),
        (None, Some(t)) => Some(NewCommand::Trajectory(t)),
        (None, None) => None,
    }
}
