//! Command Line Interface for the dualdex search engine.

pub mod args;
pub mod commands;

pub use args::*;
pub use commands::*;
