//! Main joint trajectory generator executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Sample the control clock
//!         - Joint feedback acquisition from the simulated plant
//!         - Telecommand processing from the script
//!         - Trajectory generator processing
//!         - Simulated plant update
//!         - Archiving
//!
//! # Modules
//!
//! All modules (e.g. `traj_gen`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use jtg_lib::{
    data_store::{DataStore, FaultReport, SafeModeCause},
    params::JtgExecParams,
    sim::SimPlant,
    tc_processor,
    traj_gen::{ControlSample, OutputData, TrajGenMode},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::eyre, eyre::WrapErr, Report};
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::eqpt::joint::{JointDems, JointStateDesired};
use util::{
    archive::{vector_columns, Archived, Archiver},
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
    time::ControlClock,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "jtg_exec",
    about = "Run the joint trajectory generator against a simulated plant"
)]
struct Opt {
    /// Path to the TC script to execute
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Include per-cycle trace output from the trajectory generator in the log
    #[structopt(short, long)]
    trace: bool,
}

/// Archive row for a desired state snapshot.
struct SnapshotRecord<'a>(&'a JointStateDesired);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("jtg_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let traj_gen_level = if opt.trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(
        LevelFilter::Debug,
        &[
            ("jtg_lib::traj_gen", traj_gen_level),
            ("jtg_lib::otg", LevelFilter::Info),
        ],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Joint Trajectory Generator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let exec_params: JtgExecParams =
        util::params::load("jtg_exec.toml").wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be greater than zero, found {}",
            exec_params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    info!("Loading script from {:?}", &opt.script);

    let mut script = ScriptInterpreter::new(&opt.script).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        script.get_duration(),
        script.get_num_tcs()
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let clock = ControlClock::new();
    let mut ds = DataStore::new(clock.sample());

    // ---- INITIALISE MODULES ----

    ds.traj_gen
        .init("traj_gen.toml", &session)
        .wrap_err("Failed to initialise TrajGen")?;
    info!("TrajGen init complete");

    let mut plant = SimPlant::new(&exec_params.sim, ds.traj_gen.num_dof())
        .wrap_err("Failed to initialise the simulated plant")?;
    info!("Simulated plant init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE ARCHIVES ----

    let mut arch_dems = Archiver::from_path(
        &session,
        "traj_gen/dems.csv",
        &ControlSample::zeros(ds.traj_gen.num_dof()).columns(),
    )
    .wrap_err("Failed to create the demands archive")?;
    let mut arch_status = Archiver::from_path(
        &session,
        "traj_gen/status_report.csv",
        &ds.traj_gen_status_rpt.columns(),
    )
    .wrap_err("Failed to create the status report archive")?;
    let mut arch_snapshot = Archiver::from_path(
        &session,
        "traj_gen/desired_state.csv",
        &SnapshotRecord::columns_for(ds.traj_gen.num_dof()),
    )
    .wrap_err("Failed to create the desired state archive")?;
    let mut arch_plant = Archiver::from_path(&session, "sim/plant.csv", &plant.columns())
        .wrap_err("Failed to create the plant archive")?;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut script_end_s: Option<f64> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let clock_sample = clock.sample();
        let now_s = clock_sample.now_s;
        ds.cycle_start(clock_sample);

        // ---- DATA INPUT ----

        plant.write_feedback(&mut ds.traj_gen_input);

        // ---- TELECOMMAND PROCESSING ----

        match script.get_pending_tcs(now_s) {
            PendingTcs::None => (),
            PendingTcs::Some(tc_vec) => {
                for tc in tc_vec.iter() {
                    tc_processor::exec(&mut ds, tc);
                }
            }
            PendingTcs::EndOfScript => {
                if script_end_s.is_none() {
                    info!("End of TC script reached, waiting for TrajGen to finish");
                    script_end_s = Some(now_s);
                }
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.traj_gen.proc(&ds.traj_gen_input) {
            Ok((o, r)) => {
                ds.traj_gen_output = o;
                ds.traj_gen_status_rpt = r;
            }
            Err(e) => {
                // Only report the fault once, later cycles just hold
                if !ds.safe {
                    error!("Error during TrajGen processing: {}", e);

                    session.save(
                        format!("traj_gen_fault_{}.json", ds.num_cycles),
                        FaultReport {
                            cycle: ds.num_cycles,
                            time_s: now_s,
                            error: e.to_string(),
                            last_status: ds.traj_gen_status_rpt,
                        },
                    );
                }

                ds.make_safe(SafeModeCause::TrajGenFault);
                ds.traj_gen_output = OutputData::default();
            }
        };

        if let Some(ref sample) = ds.traj_gen_output.sample {
            trace!("Joint demands: {:?}", JointDems::from(sample));
        }

        // ---- PLANT UPDATE ----

        plant.step(
            ds.traj_gen_output.sample.as_ref(),
            exec_params.cycle_period_s,
        );

        // ---- WRITE ARCHIVES ----

        if let Some(ref sample) = ds.traj_gen_output.sample {
            arch_dems
                .write(now_s, sample)
                .wrap_err("Failed to archive the demands")?;
        }
        if let Some(ref snapshot) = ds.traj_gen_output.snapshot {
            arch_snapshot
                .write(now_s, &SnapshotRecord(snapshot))
                .wrap_err("Failed to archive the desired state")?;
        }
        arch_status
            .write(now_s, &ds.traj_gen_status_rpt)
            .wrap_err("Failed to archive the status report")?;
        arch_plant
            .write(now_s, &plant)
            .wrap_err("Failed to archive the plant state")?;

        // ---- END OF EXECUTION CHECK ----

        if let Some(end_s) = script_end_s {
            let idle = ds.traj_gen.mode() == TrajGenMode::Idle && ds.traj_gen.queue().is_empty();

            if idle || ds.safe {
                info!("TrajGen finished, stopping");
                break;
            }

            if now_s - end_s > exec_params.end_of_script_timeout_s {
                warn!(
                    "TrajGen still active {:.02} s after the end of the script, stopping",
                    exec_params.end_of_script_timeout_s
                );
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                ds.make_unsafe(SafeModeCause::CycleOverruns).ok();
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns > exec_params.max_consec_cycle_overruns {
                    ds.make_safe(SafeModeCause::CycleOverruns);
                }
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    info!(
        "End of execution after {} cycles, final joint positions: {:?}",
        ds.num_cycles,
        plant.position_rad()
    );

    session.exit();

    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SnapshotRecord<'_> {
    fn columns_for(num_dof: usize) -> Vec<String> {
        let mut cols = vec![String::from("stamp_unix_s")];
        cols.extend(vector_columns("position_rad", num_dof));
        cols.extend(vector_columns("velocity_rads", num_dof));
        cols
    }
}

impl Archived for SnapshotRecord<'_> {
    fn columns(&self) -> Vec<String> {
        Self::columns_for(self.0.position_rad.len())
    }

    fn values(&self) -> Vec<f64> {
        let stamp = self.0.stamp.timestamp() as f64
            + self.0.stamp.timestamp_subsec_nanos() as f64 * 1e-9;

        std::iter::once(stamp)
            .chain(self.0.position_rad.iter().copied())
            .chain(self.0.velocity_rads.iter().copied())
            .collect()
    }
}
