//! Joint trajectory generator module
//!
//! Turns point and trajectory commands into a queue of timed segments, and
//! each control cycle samples an online trajectory generator (OTG) towards
//! the active segment's goal. The OTG is recomputed from the measured joint
//! state whenever the queue changes or the joints stray from the generated
//! reference.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod ingest;
mod otg;
mod params;
mod segment;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use ingest::*;
pub use otg::*;
pub use params::*;
pub use segment::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TrajGen operation.
#[derive(Debug, thiserror::Error)]
pub enum TrajGenError {
    #[error("Could not load the TrajGen parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid TrajGen parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("TrajGen has not been initialised")]
    NotInit,

    #[error("The OTG solver failed with result code {0}")]
    OtgFailed(i32),

    #[error("TrajGen is in the error state and must be reset before use")]
    InErrorState,
}
