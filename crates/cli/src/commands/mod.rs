//! CLI Commands

pub mod devices;
pub mod gif;
pub mod run;
