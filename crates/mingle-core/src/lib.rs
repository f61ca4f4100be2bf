#![forbid(unsafe_code)]
//! mingle-core library.
//!
//! Splits a roster of people into fixed-size groups, once per topic, while
//! trying to keep previous groupmates apart and to bias each group toward
//! shared (or distinct) departments and levels.
//!
//! # Conventions
//!
//! - **Errors**: Typed `thiserror` enums for I/O boundaries, `anyhow::Result`
//!   for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod allocate;
pub mod config;
pub mod error;
pub mod model;
pub mod roster;
pub mod shuffle;
pub mod sink;
pub mod topics;

pub use allocate::{Allocation, AllocationRules, Placement, allocate, distribute};
pub use model::{Group, OverlapPolicy, UserRecord};
pub use topics::{TopicPlan, run_topics};
