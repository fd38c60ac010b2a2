//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the joint
//! equipment: measured feedback in, demanded references out.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod joint;
