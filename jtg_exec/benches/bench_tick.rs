//! # TrajGen Tick Benchmark

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::tc::{JointPositionCmd, JointTrajectory, JointTrajectoryPoint};
use jtg_lib::{
    otg::QuinticOtg,
    traj_gen::{InputData, Params, TrajGen},
};
use util::{module::State, time::ClockSample};

const NUM_DOF: usize = 6;
const CYCLE_S: f64 = 0.01;

fn params() -> Params {
    Params {
        num_dof: NUM_DOF,
        joint_names: Vec::new(),
        position_tolerance_rad: vec![0.05; NUM_DOF],
        max_velocity_rads: vec![1.5; NUM_DOF],
        max_acceleration_rads2: vec![4.0; NUM_DOF],
        max_jerk_rads3: vec![40.0; NUM_DOF],
        sampling_resolution_s: CYCLE_S,
        snapshot_period_s: 0.02,
    }
}

fn input() -> InputData {
    InputData::new(ClockSample {
        now_s: 0.0,
        epoch: Utc.timestamp(1_600_000_000, 0),
    })
}

fn trajectory() -> JointTrajectory {
    JointTrajectory {
        stamp: None,
        joint_names: Vec::new(),
        points: (1..=20)
            .map(|i| JointTrajectoryPoint {
                positions: vec![0.05 * i as f64; NUM_DOF],
                velocities: Vec::new(),
                accelerations: Vec::new(),
                time_from_start_s: 0.5 * i as f64,
            })
            .collect(),
    }
}

fn tick_benchmark(c: &mut Criterion) {
    // ---- Tracking tick, the generated reference is fed back as feedback ----

    c.bench_function("traj_gen_tick_tracking", |b| {
        let mut tg = TrajGen::new(params(), QuinticOtg::new()).unwrap();
        let mut inp = input();
        let mut position = vec![0.0; NUM_DOF];
        let mut velocity = vec![0.0; NUM_DOF];

        inp.traj_cmd_in.write(trajectory());

        b.iter(|| {
            inp.clock.now_s += CYCLE_S;
            inp.joint_position_in.write(position.clone());
            inp.joint_velocity_in.write(velocity.clone());

            let (out, _) = tg.proc(black_box(&inp)).unwrap();

            if let Some(sample) = out.sample {
                position.copy_from_slice(sample.position.as_slice());
                velocity.copy_from_slice(sample.velocity.as_slice());
            }
        })
    });

    // ---- Recompute tick, every cycle brings a new point command ----

    c.bench_function("traj_gen_tick_recompute", |b| {
        let mut tg = TrajGen::new(params(), QuinticOtg::new()).unwrap();
        let mut inp = input();
        let mut flip = false;

        b.iter(|| {
            flip = !flip;
            let goal = if flip { 1.0 } else { -1.0 };

            inp.clock.now_s += CYCLE_S;
            inp.joint_position_in.write(vec![0.0; NUM_DOF]);
            inp.joint_velocity_in.write(vec![0.0; NUM_DOF]);
            inp.position_cmd_in.write(JointPositionCmd {
                positions: vec![goal; NUM_DOF],
            });

            tg.proc(black_box(&inp)).unwrap()
        })
    });
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
