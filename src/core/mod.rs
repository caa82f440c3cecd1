//! Core orchestration logic.
//!
//! This module contains:
//! - Orchestrator: concurrent batch downloads feeding the archive

pub mod orchestrator;

pub use orchestrator::Orchestrator;
