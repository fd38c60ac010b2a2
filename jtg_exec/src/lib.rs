//! # Joint trajectory generator library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to
//! access items defined inside the trajectory generator crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// Reference quintic online trajectory generator
pub mod otg;

/// Executable parameters
pub mod params;

/// Simulated joint plant - provides joint feedback without hardware
pub mod sim;

/// Telecommand processor - routes telecommands to the modules
pub mod tc_processor;

/// Trajectory generator module - turns joint commands into a per-cycle reference
pub mod traj_gen;
