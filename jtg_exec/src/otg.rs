//! Quintic online trajectory generator
//!
//! Reference `OtgSolver` which moves every joint along a quintic polynomial
//! from its current position, velocity and acceleration to the target state.
//! All joints share one duration so they arrive together. The duration is
//! the longest of the minimum synchronisation time, one sampling period, and
//! the rest-to-rest estimate that keeps each joint inside its velocity,
//! acceleration and jerk limits. If sampling the resulting polynomials still
//! shows a limit being exceeded the duration is stretched a bounded number of
//! times.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use crate::traj_gen::{
    OtgSample, OtgSolver, OtgState, OtgTarget, OTG_FINAL_STATE_REACHED, OTG_WORKING,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The solver input has the wrong dimensions, non-finite values or
/// non-positive limits.
pub const OTG_ERROR_INVALID_INPUT: i32 = -100;

/// Sampling was requested before any trajectory was computed.
pub const OTG_ERROR_NOT_SOLVED: i32 = -101;

/// Peak velocity of a rest-to-rest quintic is this times distance/duration.
const PEAK_VEL_COEFF: f64 = 1.875;

/// Peak acceleration of a rest-to-rest quintic is this times
/// distance/duration^2.
const PEAK_ACC_COEFF: f64 = 5.773_502_691_896_258;

/// Peak jerk of a rest-to-rest quintic is this times distance/duration^3.
const PEAK_JERK_COEFF: f64 = 60.0;

/// Number of intervals the trajectory is split into when checking limits.
const NUM_LIMIT_CHECKS: usize = 16;

const MAX_STRETCHES: usize = 8;
const STRETCH_FACTOR: f64 = 1.25;

/// Relative slack allowed on each limit during the check.
const LIMIT_MARGIN: f64 = 1e-6;

/// Distance to the target below which a joint counts as arrived.
const AT_TARGET_POSITION_RAD: f64 = 1e-6;
const AT_TARGET_VELOCITY_RADS: f64 = 1e-5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Quintic online trajectory generator.
#[derive(Debug, Default, Clone)]
pub struct QuinticOtg {
    num_dof: usize,
    cycle_time_s: f64,

    /// One polynomial per joint, in seconds since the trajectory start.
    polys: Vec<Quintic>,

    /// Duration of the current trajectory, `None` if nothing is solved.
    duration_s: Option<f64>,
}

/// x(t) = c[0] + c[1] t + c[2] t^2 + c[3] t^3 + c[4] t^4 + c[5] t^5
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Quintic {
    c: [f64; 6],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuinticOtg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of the current trajectory.
    pub fn duration_s(&self) -> Option<f64> {
        self.duration_s
    }

    fn input_valid(&self, state: &OtgState, target: &OtgTarget, output: &OtgSample) -> bool {
        let n = self.num_dof;

        let dims_ok = [
            state.position.len(),
            state.velocity.len(),
            state.acceleration.len(),
            state.max_velocity.len(),
            state.max_acceleration.len(),
            state.max_jerk.len(),
            target.position.len(),
            target.velocity.len(),
            target.acceleration.len(),
            output.position.len(),
            output.velocity.len(),
            output.acceleration.len(),
        ]
        .iter()
        .all(|l| *l == n);

        if !dims_ok {
            return false;
        }

        let states_finite = state
            .position
            .iter()
            .chain(state.velocity.iter())
            .chain(state.acceleration.iter())
            .chain(target.position.iter())
            .chain(target.velocity.iter())
            .chain(target.acceleration.iter())
            .all(|v| v.is_finite());

        let limits_ok = state
            .max_velocity
            .iter()
            .chain(state.max_acceleration.iter())
            .chain(state.max_jerk.iter())
            .all(|l| l.is_finite() && *l > 0.0);

        states_finite
            && limits_ok
            && state.min_sync_time_s.is_finite()
            && state.min_sync_time_s >= 0.0
    }

    fn at_target(state: &OtgState, target: &OtgTarget) -> bool {
        state
            .position
            .iter()
            .zip(target.position.iter())
            .all(|(x, xf)| (xf - x).abs() <= AT_TARGET_POSITION_RAD)
            && state
                .velocity
                .iter()
                .zip(target.velocity.iter())
                .all(|(v, vf)| (vf - v).abs() <= AT_TARGET_VELOCITY_RADS)
    }

    /// Shortest duration which the rest-to-rest estimate allows for every
    /// joint.
    fn min_duration_s(&self, state: &OtgState, target: &OtgTarget) -> f64 {
        let mut duration_s = state.min_sync_time_s.max(self.cycle_time_s);

        for i in 0..self.num_dof {
            let dx = (target.position[i] - state.position[i]).abs();
            let dv = (target.velocity[i] - state.velocity[i]).abs();
            let vmax = state.max_velocity[i];
            let amax = state.max_acceleration[i];
            let jmax = state.max_jerk[i];

            duration_s = duration_s
                .max(PEAK_VEL_COEFF * dx / vmax)
                .max((PEAK_ACC_COEFF * dx / amax).sqrt())
                .max((PEAK_JERK_COEFF * dx / jmax).cbrt())
                .max(PEAK_VEL_COEFF * dv / amax)
                .max((PEAK_ACC_COEFF * dv / jmax).sqrt());
        }

        duration_s
    }

    fn fit(&mut self, state: &OtgState, target: &OtgTarget, duration_s: f64) {
        for i in 0..self.num_dof {
            self.polys[i] = Quintic::from_boundary(
                [
                    state.position[i],
                    state.velocity[i],
                    state.acceleration[i],
                ],
                [
                    target.position[i],
                    target.velocity[i],
                    target.acceleration[i],
                ],
                duration_s,
            );
        }
    }

    /// Check the fitted polynomials against the limits at evenly spaced
    /// points. Velocity and acceleration are fixed by the boundary
    /// conditions at either end so only interior points are checked for
    /// them.
    fn within_limits(&self, state: &OtgState, duration_s: f64) -> bool {
        let slack = 1.0 + LIMIT_MARGIN;

        for k in 0..=NUM_LIMIT_CHECKS {
            let t = duration_s * k as f64 / NUM_LIMIT_CHECKS as f64;
            let interior = k > 0 && k < NUM_LIMIT_CHECKS;

            for (i, p) in self.polys.iter().enumerate() {
                if p.jerk(t).abs() > state.max_jerk[i] * slack {
                    return false;
                }

                if interior
                    && (p.velocity(t).abs() > state.max_velocity[i] * slack
                        || p.acceleration(t).abs() > state.max_acceleration[i] * slack)
                {
                    return false;
                }
            }
        }

        true
    }

    /// Write the state at `t` into `output`.
    fn evaluate(&self, t: f64, output: &mut OtgSample) {
        for (i, p) in self.polys.iter().enumerate() {
            output.position[i] = p.position(t);
            output.velocity[i] = p.velocity(t);
            output.acceleration[i] = p.acceleration(t);
        }
    }
}

impl OtgSolver for QuinticOtg {
    fn configure(&mut self, num_dof: usize, cycle_time_s: f64) {
        self.num_dof = num_dof;
        self.cycle_time_s = cycle_time_s;
        self.polys = vec![Quintic::default(); num_dof];
        self.duration_s = None;
    }

    fn solve(&mut self, state: &OtgState, target: &OtgTarget, output: &mut OtgSample) -> i32 {
        self.duration_s = None;

        if !self.input_valid(state, target, output) {
            return OTG_ERROR_INVALID_INPUT;
        }

        // Already there with no time to wait out
        if state.min_sync_time_s <= self.cycle_time_s && Self::at_target(state, target) {
            for i in 0..self.num_dof {
                self.polys[i] = Quintic::constant(
                    target.position[i],
                    target.velocity[i],
                    target.acceleration[i],
                );
            }
            self.duration_s = Some(0.0);
            self.evaluate(0.0, output);
            return OTG_FINAL_STATE_REACHED;
        }

        let mut duration_s = self.min_duration_s(state, target);
        self.fit(state, target, duration_s);

        let mut num_stretches = 0;
        while num_stretches < MAX_STRETCHES && !self.within_limits(state, duration_s) {
            duration_s *= STRETCH_FACTOR;
            self.fit(state, target, duration_s);
            num_stretches += 1;
        }

        trace!(
            "Quintic OTG solved: duration {:.4} s after {} stretch(es)",
            duration_s,
            num_stretches
        );

        self.duration_s = Some(duration_s);

        if self.cycle_time_s >= duration_s {
            self.evaluate(duration_s, output);
            OTG_FINAL_STATE_REACHED
        } else {
            self.evaluate(self.cycle_time_s, output);
            OTG_WORKING
        }
    }

    fn sample_at(&self, elapsed_s: f64, output: &mut OtgSample) -> i32 {
        let duration_s = match self.duration_s {
            Some(d) => d,
            None => return OTG_ERROR_NOT_SOLVED,
        };

        if !elapsed_s.is_finite()
            || output.position.len() != self.num_dof
            || output.velocity.len() != self.num_dof
            || output.acceleration.len() != self.num_dof
        {
            return OTG_ERROR_INVALID_INPUT;
        }

        if elapsed_s >= duration_s {
            self.evaluate(duration_s, output);
            OTG_FINAL_STATE_REACHED
        } else {
            self.evaluate(elapsed_s.max(0.0), output);
            OTG_WORKING
        }
    }
}

impl Quintic {
    /// Fit the polynomial to start and end `[position, velocity,
    /// acceleration]` over `t` seconds.
    fn from_boundary(start: [f64; 3], end: [f64; 3], t: f64) -> Self {
        let [x0, v0, a0] = start;
        let [xf, vf, af] = end;

        if t <= f64::EPSILON {
            return Self::constant(xf, vf, af);
        }

        let h = xf - x0;
        let t2 = t * t;
        let t3 = t2 * t;
        let t4 = t3 * t;
        let t5 = t4 * t;

        Self {
            c: [
                x0,
                v0,
                0.5 * a0,
                (20.0 * h - (8.0 * vf + 12.0 * v0) * t - (3.0 * a0 - af) * t2) / (2.0 * t3),
                (-30.0 * h + (14.0 * vf + 16.0 * v0) * t + (3.0 * a0 - 2.0 * af) * t2)
                    / (2.0 * t4),
                (12.0 * h - 6.0 * (vf + v0) * t - (a0 - af) * t2) / (2.0 * t5),
            ],
        }
    }

    fn constant(x: f64, v: f64, a: f64) -> Self {
        Self {
            c: [x, v, 0.5 * a, 0.0, 0.0, 0.0],
        }
    }

    fn position(&self, t: f64) -> f64 {
        let c = &self.c;
        c[0] + t * (c[1] + t * (c[2] + t * (c[3] + t * (c[4] + t * c[5]))))
    }

    fn velocity(&self, t: f64) -> f64 {
        let c = &self.c;
        c[1] + t * (2.0 * c[2] + t * (3.0 * c[3] + t * (4.0 * c[4] + t * 5.0 * c[5])))
    }

    fn acceleration(&self, t: f64) -> f64 {
        let c = &self.c;
        2.0 * c[2] + t * (6.0 * c[3] + t * (12.0 * c[4] + t * 20.0 * c[5]))
    }

    fn jerk(&self, t: f64) -> f64 {
        let c = &self.c;
        6.0 * c[3] + t * (24.0 * c[4] + t * 60.0 * c[5])
    }
}
