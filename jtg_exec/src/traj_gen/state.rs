//! Implementations for the TrajGen state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, trace, warn};
use nalgebra::DVector;
use serde::Serialize;

// Internal
use super::{
    select_command, Ingestor, NewCommand, OtgAdapter, OtgResult, OtgSolver, OtgState,
    OtgTarget, Params, SegmentQueue, TrajGenError,
};
use comms_if::{
    eqpt::joint::{JointDems, JointStateDesired},
    port::DataPort,
    tc::{JointPositionCmd, JointTrajectory},
};
use util::{
    archive::{vector_columns, Archived},
    maths, params,
    module::State,
    session::Session,
    time::{ClockSample, Throttle},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Joint trajectory generator module state
pub struct TrajGen<S> {
    pub(crate) params: Params,
    configured: bool,

    mode: TrajGenMode,
    report: StatusReport,

    ingestor: Ingestor,
    queue: SegmentQueue,

    otg: OtgAdapter<S>,
    otg_state: OtgState,
    recompute_required: bool,

    /// Measured joint state from the newest fresh feedback.
    joint_position: DVector<f64>,
    joint_velocity: DVector<f64>,

    position_tolerance: DVector<f64>,

    /// The reference published every cycle, `None` until the first fresh
    /// feedback has been received.
    held: Option<ControlSample>,

    snapshot_throttle: Throttle,
}

/// Input data to TrajGen.
///
/// The ports are read, not drained, by `proc`. A cycle skipped for stale
/// feedback leaves any pending command in its port for the next cycle.
pub struct InputData {
    /// Control clock at the start of this cycle.
    pub clock: ClockSample,

    /// Units: radians
    pub joint_position_in: DataPort<Vec<f64>>,

    /// Units: radians/second
    pub joint_velocity_in: DataPort<Vec<f64>>,

    pub position_cmd_in: DataPort<JointPositionCmd>,
    pub traj_cmd_in: DataPort<JointTrajectory>,
}

/// Position and velocity reference for one control cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSample {
    /// Units: radians
    pub position: DVector<f64>,

    /// Units: radians/second
    pub velocity: DVector<f64>,
}

/// Output data from TrajGen.
#[derive(Debug, Clone, Default)]
pub struct OutputData {
    /// Reference for the joint controllers, `None` if the cycle was skipped.
    pub sample: Option<ControlSample>,

    /// Desired state snapshot, published at the snapshot rate.
    pub snapshot: Option<JointStateDesired>,
}

/// Status report for TrajGen processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub mode: TrajGenMode,

    /// Feedback was not fresh so nothing was done this cycle.
    pub feedback_skipped: bool,

    pub cmd_accepted: bool,
    pub cmd_rejected: bool,

    /// At least one segment was expired from the queue.
    pub expired: bool,

    pub tolerance_exceeded: bool,

    /// Largest difference between the last generated position and the
    /// measured position, and the joint it occurred on.
    ///
    /// Units: radians
    pub max_tracking_error_rad: f64,
    pub max_tracking_error_joint: usize,

    pub recomputed: bool,
    pub segment_completed: bool,

    pub num_segments: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating mode of the trajectory generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrajGenMode {
    /// No segment is active, the last reference is held.
    Idle,

    /// Sampling the current trajectory.
    Tracking,

    /// A new trajectory was computed this cycle.
    Recomputing,

    /// The OTG failed. No processing happens until `reset` is called.
    Error,
}

impl Default for TrajGenMode {
    fn default() -> Self {
        TrajGenMode::Idle
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: OtgSolver + Default> Default for TrajGen<S> {
    fn default() -> Self {
        Self::unconfigured(S::default())
    }
}

impl<S: OtgSolver> TrajGen<S> {
    /// Create a configured trajectory generator.
    pub fn new(params: Params, solver: S) -> Result<Self, TrajGenError> {
        let mut traj_gen = Self::unconfigured(solver);
        traj_gen.configure(params)?;
        Ok(traj_gen)
    }

    fn unconfigured(solver: S) -> Self {
        Self {
            params: Params::default(),
            configured: false,
            mode: TrajGenMode::Idle,
            report: StatusReport::default(),
            ingestor: Ingestor::default(),
            queue: SegmentQueue::new(),
            otg: OtgAdapter::new(solver, 0, 1.0),
            otg_state: OtgState::from_params(&Params::default()),
            recompute_required: true,
            joint_position: DVector::zeros(0),
            joint_velocity: DVector::zeros(0),
            position_tolerance: DVector::zeros(0),
            held: None,
            snapshot_throttle: Throttle::new(0.0),
        }
    }

    /// Validate `params` and size every buffer from them.
    fn configure(&mut self, params: Params) -> Result<(), TrajGenError> {
        params.validate().map_err(TrajGenError::InvalidParams)?;

        let num_dof = params.num_dof;

        self.otg.configure(num_dof, params.sampling_resolution_s);

        self.ingestor = Ingestor::new(num_dof, params.joint_names.clone());
        self.otg_state = OtgState::from_params(&params);
        self.joint_position = DVector::zeros(num_dof);
        self.joint_velocity = DVector::zeros(num_dof);
        self.position_tolerance = DVector::from_column_slice(&params.position_tolerance_rad);
        self.snapshot_throttle = Throttle::new(params.snapshot_period_s);
        self.queue.clear();
        self.held = None;
        self.mode = TrajGenMode::Idle;
        self.recompute_required = true;

        info!(
            "TrajGen configured for {} joints at {:.4} s resolution",
            num_dof, params.sampling_resolution_s
        );

        self.params = params;
        self.configured = true;

        Ok(())
    }

    pub fn mode(&self) -> TrajGenMode {
        self.mode
    }

    pub fn queue(&self) -> &SegmentQueue {
        &self.queue
    }

    pub fn otg(&self) -> &OtgAdapter<S> {
        &self.otg
    }

    pub fn num_dof(&self) -> usize {
        self.params.num_dof
    }

    /// Read both feedback ports. Returns false if the cycle must be skipped.
    fn read_feedback(&mut self, input: &InputData) -> bool {
        let position = input.joint_position_in.read_newest().fresh();
        let velocity = input.joint_velocity_in.read_newest().fresh();

        let (position, velocity) = match (position, velocity) {
            (Some(p), Some(v)) => (p, v),
            _ => {
                debug!("Joint feedback is not fresh, skipping cycle");
                return false;
            }
        };

        let num_dof = self.params.num_dof;
        if position.len() != num_dof || velocity.len() != num_dof {
            warn!(
                "Joint feedback has {} positions and {} velocities, expected {}, skipping cycle",
                position.len(),
                velocity.len(),
                num_dof
            );
            return false;
        }

        if !maths::all_finite(position) || !maths::all_finite(velocity) {
            warn!("Joint feedback contains non-finite values, skipping cycle");
            return false;
        }

        self.joint_position.copy_from_slice(position);
        self.joint_velocity.copy_from_slice(velocity);

        true
    }

    /// Apply a new command to the queue, or reject it leaving the queue as
    /// it was.
    fn handle_command(&mut self, cmd: NewCommand, clock: &ClockSample) {
        let result = match cmd {
            NewCommand::Point(p) => self
                .ingestor
                .point_to_segment(p, clock.now_s)
                .map(|seg| {
                    info!(
                        "Point command accepted, replacing {} queued segment(s)",
                        self.queue.len()
                    );
                    self.queue.replace(seg);
                }),
            NewCommand::Trajectory(t) => self
                .ingestor
                .trajectory_to_segments(t, clock)
                .map(|segs| {
                    let num_new = segs.len();
                    // Ingested trajectories always hold at least one segment
                    let discarded = self.queue.splice(segs).unwrap_or(0);
                    info!(
                        "Trajectory of {} waypoint(s) accepted, {} queued segment(s) discarded",
                        num_new, discarded
                    );
                }),
        };

        match result {
            Ok(()) => {
                self.report.cmd_accepted = true;
                self.recompute_required = true;
            }
            Err(e) => {
                warn!("Command rejected: {}", e);
                self.report.cmd_rejected = true;
            }
        }
    }

    /// Run the OTG for the active segment, if there is one.
    fn step_otg(&mut self, now_s: f64) -> Result<(), TrajGenError> {
        let active = match self.queue.active(now_s) {
            Some(s) => s,
            None => {
                self.mode = TrajGenMode::Idle;
                return Ok(());
            }
        };

        // The last OTG output is only a valid reference once it has been
        // solved for the active segment
        if !self.recompute_required {
            let last_position = &self.otg.last_output().position;

            if let Some((joint, err)) =
                maths::max_abs_diff(last_position.as_slice(), self.joint_position.as_slice())
            {
                self.report.max_tracking_error_joint = joint;
                self.report.max_tracking_error_rad = err;
            }

            if maths::tolerance_exceeded(
                last_position,
                &self.joint_position,
                &self.position_tolerance,
            ) {
                debug!(
                    "Tracking error of {:.4} rad on joint {} exceeds tolerance",
                    self.report.max_tracking_error_rad, self.report.max_tracking_error_joint
                );
                self.report.tolerance_exceeded = true;
                self.recompute_required = true;
            }
        }

        let recompute = self.recompute_required;

        let result = if recompute {
            self.otg_state.seed(
                &self.joint_position,
                &self.joint_velocity,
                active.duration_s(),
            );

            debug!(
                "Recomputing OTG towards segment [{:.3}, {:.3}] s, min sync {:.3} s",
                active.start_time_s,
                active.goal_time_s,
                self.otg_state.min_sync_time_s
            );

            let target = OtgTarget {
                position: &active.goal_position,
                velocity: &active.goal_velocity,
                acceleration: &active.goal_acceleration,
            };

            self.otg.recompute(&self.otg_state, &target)
        } else {
            self.otg.sample(now_s - active.start_time_s)
        };

        let (sample, completed) = match result {
            OtgResult::Working(s) => (s, false),
            OtgResult::FinalStateReached(s) => (s, true),
            OtgResult::Failed(code) => {
                error!(
                    "OTG {} failed with code {}, TrajGen entering the error state",
                    if recompute { "recompute" } else { "sample" },
                    code
                );
                self.mode = TrajGenMode::Error;
                return Err(TrajGenError::OtgFailed(code));
            }
        };

        if let Some(held) = self.held.as_mut() {
            held.position.copy_from(&sample.position);
            held.velocity.copy_from(&sample.velocity);
        }

        trace!(
            "TrajGen output:\n    pos: {:?}\n    vel: {:?}",
            sample.position.as_slice(),
            sample.velocity.as_slice()
        );

        if recompute {
            self.recompute_required = false;
            self.report.recomputed = true;
            self.mode = TrajGenMode::Recomputing;
        } else {
            self.mode = TrajGenMode::Tracking;
        }

        if completed {
            self.queue.pop_front();
            self.report.segment_completed = true;

            // The next segment has never been solved for
            self.recompute_required = true;

            if self.queue.is_empty() {
                info!("Final segment complete, holding position");
                self.mode = TrajGenMode::Idle;
            } else {
                debug!("Segment complete, {} remaining", self.queue.len());
            }
        }

        Ok(())
    }

    fn build_snapshot(&mut self, clock: &ClockSample) -> Option<JointStateDesired> {
        let held = self.held.as_ref()?;

        if !self.snapshot_throttle.ready(clock.now_s) {
            return None;
        }

        Some(JointStateDesired {
            stamp: clock.control_to_wall(clock.now_s),
            position_rad: held.position.as_slice().to_vec(),
            velocity_rads: held.velocity.as_slice().to_vec(),
        })
    }
}

impl<S: OtgSolver> State for TrajGen<S> {
    type InitData = &'static str;
    type InitError = TrajGenError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TrajGenError;

    /// Initialise the TrajGen module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data).map_err(TrajGenError::ParamLoadError)?;

        self.configure(params)
    }

    /// Perform one control cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.configured {
            return Err(TrajGenError::NotInit);
        }

        if self.mode == TrajGenMode::Error {
            return Err(TrajGenError::InErrorState);
        }

        self.report = StatusReport {
            mode: self.mode,
            num_segments: self.queue.len(),
            ..StatusReport::default()
        };

        let now_s = input_data.clock.now_s;

        if !self.read_feedback(input_data) {
            self.report.feedback_skipped = true;
            return Ok((OutputData::default(), self.report));
        }

        // Until a segment is executed the reference holds the first measured
        // position at rest
        if self.held.is_none() {
            info!(
                "First joint feedback received, holding at {:?}",
                self.joint_position.as_slice()
            );
            self.held = Some(ControlSample {
                position: self.joint_position.clone(),
                velocity: DVector::zeros(self.params.num_dof),
            });
        }

        let cmd = select_command(
            input_data.position_cmd_in.read_newest(),
            input_data.traj_cmd_in.read_newest(),
        );
        if let Some(cmd) = cmd {
            self.handle_command(cmd, &input_data.clock);
        }

        if self.queue.expire(now_s) > 0 {
            self.report.expired = true;
            self.recompute_required = true;
        }

        self.step_otg(now_s)?;

        self.report.mode = self.mode;
        self.report.num_segments = self.queue.len();

        let output = OutputData {
            sample: self.held.clone(),
            snapshot: self.build_snapshot(&input_data.clock),
        };

        Ok((output, self.report))
    }

    /// Clear a latched error.
    ///
    /// The queue is emptied and the held reference is kept, so the joints
    /// stay where the last valid output left them until a new command is
    /// received.
    fn reset(&mut self) {
        if self.mode == TrajGenMode::Error {
            info!("TrajGen reset from the error state");
        } else {
            debug!("TrajGen reset");
        }

        self.mode = TrajGenMode::Idle;
        self.queue.clear();
        self.recompute_required = true;
    }
}

impl InputData {
    /// Create inputs with empty ports.
    pub fn new(clock: ClockSample) -> Self {
        Self {
            clock,
            joint_position_in: DataPort::new(),
            joint_velocity_in: DataPort::new(),
            position_cmd_in: DataPort::new(),
            traj_cmd_in: DataPort::new(),
        }
    }
}

impl ControlSample {
    pub fn zeros(num_dof: usize) -> Self {
        Self {
            position: DVector::zeros(num_dof),
            velocity: DVector::zeros(num_dof),
        }
    }
}

impl From<&ControlSample> for JointDems {
    fn from(sample: &ControlSample) -> Self {
        JointDems {
            position_rad: sample.position.as_slice().to_vec(),
            velocity_rads: sample.velocity.as_slice().to_vec(),
        }
    }
}

impl Archived for ControlSample {
    fn columns(&self) -> Vec<String> {
        let mut cols = vector_columns("position_rad", self.position.len());
        cols.extend(vector_columns("velocity_rads", self.velocity.len()));
        cols
    }

    fn values(&self) -> Vec<f64> {
        self.position.iter().chain(self.velocity.iter()).copied().collect()
    }
}

impl Archived for StatusReport {
    fn columns(&self) -> Vec<String> {
        [
            "mode",
            "feedback_skipped",
            "cmd_accepted",
            "cmd_rejected",
            "expired",
            "tolerance_exceeded",
            "max_tracking_error_rad",
            "max_tracking_error_joint",
            "recomputed",
            "segment_completed",
            "num_segments",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn values(&self) -> Vec<f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        vec![
            self.mode as u8 as f64,
            flag(self.feedback_skipped),
            flag(self.cmd_accepted),
            flag(self.cmd_rejected),
            flag(self.expired),
            flag(self.tolerance_exceeded),
            self.max_tracking_error_rad,
            self.max_tracking_error_joint as f64,
            flag(self.recomputed),
            flag(self.segment_completed),
            self.num_segments as f64,
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_gen::{OtgSample, OTG_FINAL_STATE_REACHED};
    use chrono::{TimeZone, Utc};
    use comms_if::tc::JointTrajectoryPoint;

    /// Solver which jumps straight to the target and returns scripted codes.
    #[derive(Default)]
    struct MockSolver {
        solve_code: i32,
        sample_code: i32,
        target: Vec<f64>,
        num_solves: usize,
        min_sync_s: Vec<f64>,
    }

    impl OtgSolver for MockSolver {
        fn configure(&mut self, _: usize, _: f64) {}

        fn solve(&mut self, state: &OtgState, target: &OtgTarget, output: &mut OtgSample) -> i32 {
            self.num_solves += 1;
            self.min_sync_s.push(state.min_sync_time_s);
            self.target = target.position.as_slice().to_vec();
            output.position.copy_from(target.position);
            output.velocity.fill(0.0);
            self.solve_code
        }

        fn sample_at(&self, elapsed_s: f64, output: &mut OtgSample) -> i32 {
            output.position.copy_from_slice(&self.target);
            output.velocity.fill(elapsed_s);
            self.sample_code
        }
    }

    fn params(num_dof: usize) -> Params {
        Params {
            num_dof,
            joint_names: Vec::new(),
            position_tolerance_rad: vec![0.1; num_dof],
            max_velocity_rads: vec![1.0; num_dof],
            max_acceleration_rads2: vec![5.0; num_dof],
            max_jerk_rads3: vec![50.0; num_dof],
            sampling_resolution_s: 0.01,
            snapshot_period_s: 0.0,
        }
    }

    fn traj_gen(num_dof: usize) -> TrajGen<MockSolver> {
        TrajGen::new(params(num_dof), MockSolver::default()).unwrap()
    }

    fn input() -> InputData {
        InputData::new(ClockSample {
            now_s: 0.0,
            epoch: Utc.timestamp(1_600_000_000, 0),
        })
    }

    /// Write fresh feedback and move the clock to `now_s`.
    fn feed(input: &mut InputData, now_s: f64, position: &[f64]) {
        input.clock.now_s = now_s;
        input.joint_position_in.write(position.to_vec());
        input.joint_velocity_in.write(vec![0.0; position.len()]);
    }

    fn point(positions: Vec<f64>) -> JointPositionCmd {
        JointPositionCmd { positions }
    }

    #[test]
    fn test_holds_first_feedback() {
        let mut tg = traj_gen(2);
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.3, -0.2]);
        let (out, report) = tg.proc(&inp).unwrap();

        assert_eq!(report.mode, TrajGenMode::Idle);
        assert!(!report.recomputed);
        assert_eq!(
            out.sample,
            Some(ControlSample {
                position: DVector::from_vec(vec![0.3, -0.2]),
                velocity: DVector::zeros(2),
            })
        );
        assert!(out.snapshot.is_some());
    }

    #[test]
    fn test_point_command() {
        let mut tg = traj_gen(1);
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0]);
        inp.position_cmd_in.write(point(vec![5.0]));

        let (out, report) = tg.proc(&inp).unwrap();

        assert!(report.cmd_accepted);
        assert!(report.recomputed);
        assert_eq!(report.mode, TrajGenMode::Recomputing);
        assert_eq!(tg.queue().len(), 1);

        let seg = tg.queue().front().unwrap();
        assert_eq!(seg.start_time_s, 0.0);
        assert_eq!(seg.goal_time_s, 0.0);
        assert_eq!(seg.goal_position, DVector::from_vec(vec![5.0]));

        assert_eq!(out.sample.unwrap().position, DVector::from_vec(vec![5.0]));

        // The finished point segment stays at the front and is sampled, not
        // solved again
        feed(&mut inp, 0.01, &[5.0]);
        let (out, report) = tg.proc(&inp).unwrap();

        assert!(!report.recomputed);
        assert!(!report.expired);
        assert_eq!(report.mode, TrajGenMode::Tracking);
        assert_eq!(tg.queue().len(), 1);
        assert_eq!(tg.otg().solver().num_solves, 1);
        assert!((out.sample.unwrap().velocity[0] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_point_overrides_trajectory() {
        let mut tg = traj_gen(1);
        let mut inp = input();

        // Trajectory with waypoints 1 s and 2 s after t = 0
        feed(&mut inp, 0.0, &[0.0]);
        inp.traj_cmd_in.write(JointTrajectory {
            points: vec![
                JointTrajectoryPoint {
                    positions: vec![1.0],
                    time_from_start_s: 1.0,
                    ..Default::default()
                },
                JointTrajectoryPoint {
                    positions: vec![2.0],
                    time_from_start_s: 2.0,
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.cmd_accepted);
        assert_eq!(report.num_segments, 2);

        // At 1.0 s the second segment has started and the first is dropped
        feed(&mut inp, 1.0, &[1.0]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.expired);
        assert!(report.recomputed);
        assert_eq!(tg.queue().front().unwrap().start_time_s, 1.0);

        // A point command at 1.5 s replaces everything
        feed(&mut inp, 1.5, &[1.5]);
        inp.position_cmd_in.write(point(vec![0.0]));
        let (_, report) = tg.proc(&inp).unwrap();

        assert!(report.cmd_accepted);
        assert_eq!(tg.queue().len(), 1);
        let seg = tg.queue().front().unwrap();
        assert_eq!(seg.start_time_s, 1.5);
        assert_eq!(seg.goal_time_s, 1.5);
        assert_eq!(seg.goal_position, DVector::from_vec(vec![0.0]));
    }

    #[test]
    fn test_final_state_holds_output() {
        let mut tg = TrajGen::new(
            params(1),
            MockSolver {
                solve_code: OTG_FINAL_STATE_REACHED,
                ..Default::default()
            },
        )
        .unwrap();
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0]);
        inp.position_cmd_in.write(point(vec![0.5]));
        let (out, report) = tg.proc(&inp).unwrap();

        assert!(report.segment_completed);
        assert_eq!(report.mode, TrajGenMode::Idle);
        assert_eq!(report.num_segments, 0);
        let held = out.sample.unwrap();
        assert_eq!(held.position, DVector::from_vec(vec![0.5]));

        // The next cycle has nothing to do and republishes the same output
        feed(&mut inp, 0.01, &[0.1]);
        let (out, report) = tg.proc(&inp).unwrap();
        assert_eq!(report.mode, TrajGenMode::Idle);
        assert!(!report.recomputed);
        assert_eq!(out.sample, Some(held));
    }

    #[test]
    fn test_stale_feedback_skips_cycle() {
        let mut tg = traj_gen(1);
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0]);
        tg.proc(&inp).unwrap();

        // No new feedback, a command arrives
        inp.clock.now_s = 0.01;
        inp.position_cmd_in.write(point(vec![1.0]));
        let (out, report) = tg.proc(&inp).unwrap();

        assert!(report.feedback_skipped);
        assert!(out.sample.is_none());
        assert!(out.snapshot.is_none());
        assert!(tg.queue().is_empty());
        assert!(inp.position_cmd_in.has_fresh());

        // The pending command is picked up once feedback is fresh again
        feed(&mut inp, 0.02, &[0.0]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.cmd_accepted);
        assert_eq!(tg.queue().len(), 1);
    }

    #[test]
    fn test_stale_feedback_defers_expiry() {
        let mut tg = traj_gen(1);
        let mut inp = input();

        // Segments [0, 1) and [1, 2)
        feed(&mut inp, 0.0, &[0.0]);
        inp.traj_cmd_in.write(JointTrajectory {
            points: vec![
                JointTrajectoryPoint {
                    positions: vec![1.0],
                    time_from_start_s: 1.0,
                    ..Default::default()
                },
                JointTrajectoryPoint {
                    positions: vec![2.0],
                    time_from_start_s: 2.0,
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        tg.proc(&inp).unwrap();
        assert_eq!(tg.otg().solver().num_solves, 1);

        // The second segment has started, but without fresh feedback nothing
        // is expired or solved
        inp.clock.now_s = 1.5;
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.feedback_skipped);
        assert!(!report.expired);
        assert!(!report.recomputed);
        assert_eq!(tg.queue().len(), 2);
        assert_eq!(tg.otg().solver().num_solves, 1);

        // With fresh feedback the first segment goes and one solve follows
        feed(&mut inp, 1.5, &[1.0]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.expired);
        assert!(report.recomputed);
        assert_eq!(tg.queue().len(), 1);
        assert_eq!(tg.otg().solver().num_solves, 2);

        feed(&mut inp, 1.51, &[2.0]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(!report.recomputed);
        assert_eq!(tg.otg().solver().num_solves, 2);
    }

    #[test]
    fn test_bad_feedback_skips_cycle() {
        let mut tg = traj_gen(2);
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0]);
        let (out, report) = tg.proc(&inp).unwrap();
        assert!(report.feedback_skipped);
        assert!(out.sample.is_none());

        feed(&mut inp, 0.0, &[0.0, f64::INFINITY]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.feedback_skipped);
    }

    #[test]
    fn test_rejected_command_keeps_queue() {
        let mut tg = traj_gen(2);
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0, 0.0]);
        inp.position_cmd_in.write(point(vec![1.0, 1.0]));
        tg.proc(&inp).unwrap();
        let before = tg.queue().front().cloned();

        feed(&mut inp, 0.01, &[1.0, 1.0]);
        inp.position_cmd_in.write(point(vec![1.0]));
        let (_, report) = tg.proc(&inp).unwrap();

        assert!(report.cmd_rejected);
        assert!(!report.cmd_accepted);
        assert_eq!(tg.queue().front().cloned(), before);

        feed(&mut inp, 0.02, &[1.0, 1.0]);
        inp.traj_cmd_in.write(JointTrajectory::default());
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.cmd_rejected);
        assert_eq!(tg.queue().front().cloned(), before);
    }

    #[test]
    fn test_tolerance_triggers_recompute() {
        let mut tg = traj_gen(1);
        let mut inp = input();

        // A trajectory segment from 0 s to 10 s towards 1.0
        feed(&mut inp, 0.0, &[0.0]);
        inp.traj_cmd_in.write(JointTrajectory {
            points: vec![JointTrajectoryPoint {
                positions: vec![1.0],
                time_from_start_s: 10.0,
                ..Default::default()
            }],
            ..Default::default()
        });
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.recomputed);

        // Joints on the reference, sampling continues
        feed(&mut inp, 0.01, &[1.0]);
        let (out, report) = tg.proc(&inp).unwrap();
        assert!(!report.recomputed);
        assert!(!report.tolerance_exceeded);
        assert_eq!(report.mode, TrajGenMode::Tracking);
        assert!((out.sample.unwrap().velocity[0] - 0.01).abs() < 1e-12);

        // Joints off the reference by more than the tolerance
        feed(&mut inp, 0.02, &[0.8]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.tolerance_exceeded);
        assert!(report.recomputed);
        assert_eq!(report.max_tracking_error_joint, 0);
        assert!((report.max_tracking_error_rad - 0.2).abs() < 1e-12);
        assert_eq!(tg.otg().solver().num_solves, 2);

        // Sampling stays timed from the segment start
        feed(&mut inp, 0.05, &[1.0]);
        let (out, report) = tg.proc(&inp).unwrap();
        assert!(!report.recomputed);
        assert!((out.sample.unwrap().velocity[0] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_recompute_time_base() {
        let mut tg = traj_gen(1);
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0]);
        inp.traj_cmd_in.write(JointTrajectory {
            points: vec![JointTrajectoryPoint {
                positions: vec![1.0],
                time_from_start_s: 10.0,
                ..Default::default()
            }],
            ..Default::default()
        });
        tg.proc(&inp).unwrap();

        // Half way through the segment the joints fall behind
        feed(&mut inp, 5.0, &[0.5]);
        let (_, report) = tg.proc(&inp).unwrap();
        assert!(report.tolerance_exceeded);
        assert!(report.recomputed);

        // Both solves use the full segment duration
        assert_eq!(tg.otg().solver().min_sync_s, vec![10.0, 10.0]);

        // and sampling is relative to the segment start
        feed(&mut inp, 6.0, &[1.0]);
        let (out, report) = tg.proc(&inp).unwrap();
        assert!(!report.recomputed);
        assert!((out.sample.unwrap().velocity[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_tracking_error_before_first_solve() {
        let mut tg = traj_gen(2);
        let mut inp = input();

        // Far from the zero vector the OTG starts with
        feed(&mut inp, 0.0, &[0.3, -2.0]);
        inp.position_cmd_in.write(point(vec![1.0, 1.0]));
        let (_, report) = tg.proc(&inp).unwrap();

        assert!(report.recomputed);
        assert!(!report.tolerance_exceeded);
        assert_eq!(report.max_tracking_error_rad, 0.0);
        assert_eq!(tg.otg().solver().num_solves, 1);
    }

    #[test]
    fn test_otg_failure_latches() {
        let mut tg = TrajGen::new(
            params(1),
            MockSolver {
                solve_code: -100,
                ..Default::default()
            },
        )
        .unwrap();
        let mut inp = input();

        feed(&mut inp, 0.0, &[0.0]);
        inp.position_cmd_in.write(point(vec![1.0]));
        assert!(matches!(tg.proc(&inp), Err(TrajGenError::OtgFailed(-100))));
        assert_eq!(tg.mode(), TrajGenMode::Error);

        feed(&mut inp, 0.01, &[0.0]);
        assert!(matches!(tg.proc(&inp), Err(TrajGenError::InErrorState)));

        tg.reset();
        assert_eq!(tg.mode(), TrajGenMode::Idle);
        assert!(tg.queue().is_empty());

        feed(&mut inp, 0.02, &[0.0]);
        let (out, report) = tg.proc(&inp).unwrap();
        assert_eq!(report.mode, TrajGenMode::Idle);
        assert_eq!(out.sample.unwrap().position, DVector::from_vec(vec![0.0]));
    }

    #[test]
    fn test_not_configured() {
        let mut tg: TrajGen<MockSolver> = TrajGen::default();
        let mut inp = input();
        feed(&mut inp, 0.0, &[0.0]);

        assert!(matches!(tg.proc(&inp), Err(TrajGenError::NotInit)));
        assert!(matches!(
            TrajGen::new(params(0), MockSolver::default()),
            Err(TrajGenError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_status_report_archive_columns() {
        let report = StatusReport {
            mode: TrajGenMode::Recomputing,
            recomputed: true,
            num_segments: 3,
            ..Default::default()
        };

        assert_eq!(report.columns().len(), report.values().len());
        assert_eq!(report.values()[0], 2.0);
        assert_eq!(report.values()[10], 3.0);
    }
}
