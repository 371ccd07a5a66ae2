//! Fatal harness errors.
//!
//! Per-case compile and run failures are not errors: they are recorded as
//! [`Outcome`](crate::Outcome) values and never abort a suite.

use std::path::PathBuf;

use thiserror::Error;

use crate::{EXIT_IO_FAILED, EXIT_UNUSABLE};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(
        "ERROR: Compiler '{}' doesn't seem to be working. Check path and name.\n{diagnostic}",
        .compiler.display()
    )]
    CompilerNotInvocable {
        compiler: PathBuf,
        diagnostic: String,
    },
    #[error("scratch file {}: {source}", .path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("structured log: {0}")]
    Log(#[source] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Process exit code for a run that ended with this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CompilerNotInvocable { .. } => EXIT_UNUSABLE,
            Self::Scratch { .. } | Self::Report { .. } | Self::Log(_) | Self::Json(_) => {
                EXIT_IO_FAILED
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_an_unusable_compiler_maps_to_the_unusable_code() {
        let unusable = ProbeError::CompilerNotInvocable {
            compiler: PathBuf::from("/usr/bin/c++"),
            diagnostic: String::from("not found\n"),
        };
        assert_eq!(unusable.exit_code(), EXIT_UNUSABLE);

        let report = ProbeError::Report {
            path: PathBuf::from("/ro/probe.md"),
            source: std::io::ErrorKind::PermissionDenied.into(),
        };
        assert_eq!(report.exit_code(), EXIT_IO_FAILED);
        assert_eq!(
            ProbeError::Log(std::io::ErrorKind::StorageFull.into()).exit_code(),
            EXIT_IO_FAILED
        );
    }
}
