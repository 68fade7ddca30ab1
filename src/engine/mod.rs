//! Core engine — order sizing and the per-symbol buy cycle.

pub mod sizer;
pub mod orchestrator;
