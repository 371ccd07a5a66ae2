//! Compiler feature probing harness.
//!
//! This crate provides:
//! - Snippet catalog: fixed C++ sources probing one capability each
//! - Feature runner: compile (and optionally execute) one snippet per case
//! - Session: version probe, library identity, required + optional suites
//! - Report generation: console progress, summary, verdict, markdown + JSON
//! - Structured logging: JSONL event records for each probe step

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod scratch;
pub mod session;
pub mod structured_log;

pub use catalog::{Catalog, FeatureCase, Group};
pub use config::{CompilerInvocation, ProbeConfig};
pub use error::ProbeError;
pub use report::{RunReport, Verdict};
pub use runner::{CaseResult, FeatureRunner, Outcome, ProgressSink, SuiteReport};
pub use session::run_probe;

/// Process exit code when the compiler cannot be used at all, or usage was shown.
pub const EXIT_UNUSABLE: u8 = 255;
/// Process exit code when scratch, report, or log files cannot be written.
pub const EXIT_IO_FAILED: u8 = 2;
/// Process exit code when at least one required feature failed.
pub const EXIT_REQUIRED_FAILED: u8 = 1;
