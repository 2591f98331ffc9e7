//! Library half of the `wdgate` binary, split out so the argument parsing
//! and command handlers can be tested without spawning a process.

pub mod cli;
pub mod commands;
pub mod config;
pub mod drivers;
pub mod logging;
