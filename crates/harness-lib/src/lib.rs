//! Harness library for NUMA placement-policy experiments
//!
//! This crate provides the core functionality for:
//! - Cycling memory placement policies across runs
//! - Launching the NUMA monitor around a workload
//! - Merging raw samples and benchmark summaries into append-only datasets
//! - Reducing raw samples into one feature row per run
//! - Batch metrics and structured logging

pub mod aggregate;
pub mod error;
pub mod features;
pub mod launcher;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod policy;
pub mod schema;
pub mod workload;

pub use error::{HarnessError, Result};
pub use models::*;
pub use observability::{HarnessMetrics, StructuredLogger};
