//! hwmgr: hardware discovery, driver lifecycle and health monitoring for Linux
//!
//! The manager itself lives in `hwmgr-core`; device discovery and telemetry
//! in `hwmgr-sources`. This crate adds the persisted application settings and
//! the text/JSON rendering used by the command line front end.

pub mod config;
pub mod report;

pub use hwmgr_core as core;
pub use hwmgr_sources as sources;
