//! `teleop-cli` – shared pieces of the `teleop` and `teleop-head-keyboard`
//! binaries.

pub mod config;
