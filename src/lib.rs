//! preflight - pre-collection environment health checks for the data rig.
//!
//! The engine verifies host reachability, NAS mount health, and topic
//! publish rates, and hands back a `RunResult`. The table and JSON
//! outputs in the binary are thin adapters over that one result type.

pub mod capacity;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod exec;
pub mod mount;
pub mod render;
pub mod report;
pub mod retry;
pub mod runner;
pub mod throughput;
