//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands, i.e. motion commands sent to the trajectory generator
pub mod tc;

/// Equipment interface definitions (joint feedback and demands)
pub mod eqpt;

/// Newest-value data ports connecting the cyclic modules
pub mod port;
