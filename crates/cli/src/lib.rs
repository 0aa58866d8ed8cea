//! StreamProbe CLI
//!
//! Runs the mobile search scenario matrix against real browsers, assembles
//! GIFs from screenshot directories, and lists device profiles.

pub mod commands;
pub mod output;
