//! Rate-controlled load generation against a Kubernetes API server.
//!
//! Calls are admitted at a fixed cadence, fanned out round-robin over a pool
//! of independent clients, and counted until either a success target or a
//! deadline ends the run.

pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod kube;
pub mod report;
pub mod request;
pub mod signal;

pub use error::{Error, Result};
