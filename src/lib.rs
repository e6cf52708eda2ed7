// src/lib.rs
//! Local staging areas, shelves and branch switching over a Mercurial
//! working copy.

pub mod archive;
pub mod cli;
pub mod compensate;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit;
pub mod fingerprint;
pub mod merge;
pub mod shelf;
pub mod stage;
pub mod switch;
pub mod vcs;
