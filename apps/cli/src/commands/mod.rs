//! Command implementations for the MIRT CLI.

pub mod pipeline;
pub mod runs;
