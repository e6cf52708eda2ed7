// src/cli/mod.rs
//! Command-line surface: argument definitions, dispatch and output.

pub mod args;
pub mod dispatch;
pub mod handlers;

pub use args::Cli;
