//! Online trajectory generator interface
//!
//! The generator is driven through the `OtgSolver` trait. Solvers report
//! their progress as integer result codes, which the `OtgAdapter` turns into
//! an `OtgResult` so the rest of the module never handles raw codes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::DVector;
use serde::Serialize;

// Internal
use super::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The solver is still moving towards the target.
pub const OTG_WORKING: i32 = 0;

/// The solver output has reached the target state.
pub const OTG_FINAL_STATE_REACHED: i32 = 1;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An online trajectory generator.
///
/// Any code other than `OTG_WORKING` or `OTG_FINAL_STATE_REACHED` is an
/// error. On error the solver may leave `output` in any state.
pub trait OtgSolver {
    /// Prepare the solver for `num_dof` joints sampled every
    /// `cycle_time_s` seconds. Called once before any other method.
    fn configure(&mut self, num_dof: usize, cycle_time_s: f64);

    /// Compute a new trajectory from `state` to `target` and write the
    /// state one cycle ahead into `output`.
    fn solve(&mut self, state: &OtgState, target: &OtgTarget, output: &mut OtgSample) -> i32;

    /// Sample the last computed trajectory `elapsed_s` seconds after its
    /// start. Must not change the solver, so sampling the same time twice
    /// gives the same output.
    fn sample_at(&self, elapsed_s: f64, output: &mut OtgSample) -> i32;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Current kinematic state and limits handed to the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct OtgState {
    pub position: DVector<f64>,
    pub velocity: DVector<f64>,
    pub acceleration: DVector<f64>,

    pub max_velocity: DVector<f64>,
    pub max_acceleration: DVector<f64>,
    pub max_jerk: DVector<f64>,

    /// Minimum duration of the computed trajectory.
    ///
    /// Units: seconds
    pub min_sync_time_s: f64,
}

/// Goal state of a trajectory, borrowed from the segment being executed.
#[derive(Debug, Clone, Copy)]
pub struct OtgTarget<'a> {
    pub position: &'a DVector<f64>,
    pub velocity: &'a DVector<f64>,
    pub acceleration: &'a DVector<f64>,
}

/// One sample of the generated trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtgSample {
    /// Units: radians
    pub position: DVector<f64>,

    /// Units: radians/second
    pub velocity: DVector<f64>,

    /// Units: radians/second^2
    pub acceleration: DVector<f64>,
}

/// Wraps a solver, keeping its newest valid output.
#[derive(Debug, Clone)]
pub struct OtgAdapter<S> {
    solver: S,
    output: OtgSample,
    scratch: OtgSample,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Interpreted result of a solver call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OtgResult<'a> {
    Working(&'a OtgSample),
    FinalStateReached(&'a OtgSample),
    Failed(i32),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OtgState {
    /// Build a state at rest at the origin with the limits from `params`.
    pub fn from_params(params: &Params) -> Self {
        Self {
            position: DVector::zeros(params.num_dof),
            velocity: DVector::zeros(params.num_dof),
            acceleration: DVector::zeros(params.num_dof),
            max_velocity: DVector::from_column_slice(&params.max_velocity_rads),
            max_acceleration: DVector::from_column_slice(&params.max_acceleration_rads2),
            max_jerk: DVector::from_column_slice(&params.max_jerk_rads3),
            min_sync_time_s: 0.0,
        }
    }

    /// Start the next trajectory from a measured state.
    ///
    /// Acceleration is not measured and is taken as zero.
    pub fn seed(&mut self, position: &DVector<f64>, velocity: &DVector<f64>, min_sync_time_s: f64) {
        self.position.copy_from(position);
        self.velocity.copy_from(velocity);
        self.acceleration.fill(0.0);
        self.min_sync_time_s = min_sync_time_s;
    }
}

impl OtgSample {
    pub fn zeros(num_dof: usize) -> Self {
        Self {
            position: DVector::zeros(num_dof),
            velocity: DVector::zeros(num_dof),
            acceleration: DVector::zeros(num_dof),
        }
    }
}

impl<S: OtgSolver> OtgAdapter<S> {
    /// Configure `solver` and wrap it.
    pub fn new(solver: S, num_dof: usize, cycle_time_s: f64) -> Self {
        let mut otg = Self {
            solver,
            output: OtgSample::zeros(num_dof),
            scratch: OtgSample::zeros(num_dof),
        };
        otg.configure(num_dof, cycle_time_s);
        otg
    }

    /// Reconfigure the solver, resetting the outputs to `num_dof` zeros.
    pub fn configure(&mut self, num_dof: usize, cycle_time_s: f64) {
        self.solver.configure(num_dof, cycle_time_s);
        self.output = OtgSample::zeros(num_dof);
        self.scratch = OtgSample::zeros(num_dof);
    }

    /// Compute a new trajectory towards `target`.
    pub fn recompute(&mut self, state: &OtgState, target: &OtgTarget) -> OtgResult<'_> {
        let code = self.solver.solve(state, target, &mut self.scratch);
        self.commit(code)
    }

    /// Sample the current trajectory `elapsed_s` seconds after its start.
    pub fn sample(&mut self, elapsed_s: f64) -> OtgResult<'_> {
        let code = self.solver.sample_at(elapsed_s, &mut self.scratch);
        self.commit(code)
    }

    /// The newest output from a successful solver call.
    pub fn last_output(&self) -> &OtgSample {
        &self.output
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Keep the scratch output only if the solver succeeded.
    fn commit(&mut self, code: i32) -> OtgResult<'_> {
        match code {
            OTG_WORKING => {
                std::mem::swap(&mut self.output, &mut self.scratch);
                OtgResult::Working(&self.output)
            }
            OTG_FINAL_STATE_REACHED => {
                std::mem::swap(&mut self.output, &mut self.scratch);
                OtgResult::FinalStateReached(&self.output)
            }
            code => OtgResult::Failed(code),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Solver which writes a fixed value and returns a fixed code.
    struct FixedSolver {
        code: i32,
        value: f64,
    }

    impl OtgSolver for FixedSolver {
        fn configure(&mut self, _: usize, _: f64) {}

        fn solve(&mut self, _: &OtgState, _: &OtgTarget, output: &mut OtgSample) -> i32 {
            output.position.fill(self.value);
            self.code
        }

        fn sample_at(&self, elapsed_s: f64, output: &mut OtgSample) -> i32 {
            output.position.fill(self.value + elapsed_s);
            self.code
        }
    }

    fn target(goal: &DVector<f64>) -> OtgTarget<'_> {
        OtgTarget {
            position: goal,
            velocity: goal,
            acceleration: goal,
        }
    }

    fn state() -> OtgState {
        OtgState::from_params(&Params {
            num_dof: 2,
            max_velocity_rads: vec![1.0, 1.0],
            max_acceleration_rads2: vec![1.0, 1.0],
            max_jerk_rads3: vec![1.0, 1.0],
            ..Default::default()
        })
    }

    #[test]
    fn test_code_mapping() {
        let goal = DVector::zeros(2);
        let expected = OtgSample {
            position: DVector::from_element(2, 3.0),
            ..OtgSample::zeros(2)
        };

        let mut otg = OtgAdapter::new(
            FixedSolver {
                code: OTG_WORKING,
                value: 3.0,
            },
            2,
            0.01,
        );
        assert_eq!(otg.recompute(&state(), &target(&goal)), OtgResult::Working(&expected));

        let mut otg = OtgAdapter::new(
            FixedSolver {
                code: OTG_FINAL_STATE_REACHED,
                value: 3.0,
            },
            2,
            0.01,
        );
        assert_eq!(
            otg.recompute(&state(), &target(&goal)),
            OtgResult::FinalStateReached(&expected)
        );

        let mut otg = OtgAdapter::new(FixedSolver { code: 7, value: 3.0 }, 2, 0.01);
        assert_eq!(otg.sample(0.5), OtgResult::Failed(7));
    }

    #[test]
    fn test_failure_keeps_last_output() {
        let goal = DVector::zeros(2);
        let mut otg = OtgAdapter::new(
            FixedSolver {
                code: OTG_WORKING,
                value: 1.0,
            },
            2,
            0.01,
        );

        assert!(matches!(otg.sample(0.5), OtgResult::Working(_)));
        assert_eq!(otg.last_output().position, DVector::from_element(2, 1.5));

        otg.solver.code = -100;
        otg.solver.value = 9.0;
        assert_eq!(otg.recompute(&state(), &target(&goal)), OtgResult::Failed(-100));
        assert_eq!(otg.last_output().position, DVector::from_element(2, 1.5));
    }

    #[test]
    fn test_seed() {
        let mut s = state();
        s.acceleration.fill(4.0);

        s.seed(
            &DVector::from_vec(vec![1.0, 2.0]),
            &DVector::from_vec(vec![0.5, -0.5]),
            2.5,
        );

        assert_eq!(s.position, DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(s.velocity, DVector::from_vec(vec![0.5, -0.5]));
        assert_eq!(s.acceleration, DVector::zeros(2));
        assert_eq!(s.min_sync_time_s, 2.5);
        assert_eq!(s.max_velocity, DVector::from_element(2, 1.0));
    }
}
