//! Report generation for probe results.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::{FeatureCase, Group};
use crate::runner::{CaseResult, ProgressSink, SuiteReport};
use crate::{EXIT_REQUIRED_FAILED, ProbeError};

/// Width of the horizontal rule around the diagnostic dump.
pub const RULE_WIDTH: usize = 70;

pub const PASS_MARKER: &str = "Pass.";
pub const FAIL_MARKER: &str = "<<<FAILED!>>>";

/// Closing verdict, chosen by failure counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No failures at all.
    FullSupport,
    /// Every required case passed; some optional ones did not.
    CoreSupport,
    /// At least one required case failed.
    Unsuitable,
}

impl Verdict {
    #[must_use]
    pub fn from_failures(required_failures: usize, optional_failures: usize) -> Self {
        match (required_failures, optional_failures) {
            (0, 0) => Self::FullSupport,
            (0, _) => Self::CoreSupport,
            _ => Self::Unsuitable,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::FullSupport => "Congratulations! Your compiler supports every probed feature.",
            Self::CoreSupport => {
                "Your compiler should work for standard builds, but may not work with all extras builds."
            }
            Self::Unsuitable => {
                "Sorry, your compiler has issues which prevent it from compiling this project - try updating your compiler or altering settings."
            }
        }
    }
}

/// Everything one probe session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    /// Compiler executable and flags as invoked.
    pub compiler: String,
    /// First line of the compiler's `--version` banner.
    pub compiler_version: String,
    /// Standard library identity, if it could be determined.
    pub stdlib: Option<String>,
    pub timestamp: String,
    pub required: SuiteReport,
    pub optional: SuiteReport,
    pub verdict: Verdict,
}

impl RunReport {
    #[must_use]
    pub fn new(
        compiler: String,
        compiler_version: String,
        stdlib: Option<String>,
        timestamp: String,
        required: SuiteReport,
        optional: SuiteReport,
    ) -> Self {
        let verdict = Verdict::from_failures(required.failed(), optional.failed());
        Self {
            title: String::from("Compiler Feature Probe Report"),
            compiler,
            compiler_version,
            stdlib,
            timestamp,
            required,
            optional,
            verdict,
        }
    }

    /// Process exit code for this report: non-zero only for required failures.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.required.failed() > 0 {
            EXIT_REQUIRED_FAILED
        } else {
            0
        }
    }

    /// Full diagnostics are shown in verbose mode, or when every required case
    /// failed, and only if there is something to show.
    #[must_use]
    pub fn should_dump_diagnostics(&self, verbose: bool) -> bool {
        let any_failure = self.required.failed() > 0 || self.optional.failed() > 0;
        (verbose || self.required.all_failed()) && any_failure
    }

    /// Detailed error messages, required group first.
    #[must_use]
    pub fn render_diagnostics(&self) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut out = String::new();
        writeln!(out, "\n{rule}\n\nDetailed error messages:").ok();
        for suite in [&self.required, &self.optional] {
            for (name, diagnostic) in suite.failures() {
                writeln!(out, "============ {name} ============").ok();
                writeln!(out, "{diagnostic}").ok();
                writeln!(out).ok();
            }
        }
        writeln!(out, "{rule}").ok();
        out
    }

    /// Summary counts and the closing verdict.
    #[must_use]
    pub fn render_summary(&self, width: usize) -> String {
        let mut out = String::new();
        writeln!(out, "\nSummary:").ok();
        for suite in [&self.required, &self.optional] {
            writeln!(
                out,
                "{:<width$}\t{} of {} passed",
                suite.group.summary_label(),
                suite.passed(),
                suite.total(),
            )
            .ok();
        }
        writeln!(out, "\n{}\n", self.verdict.message()).ok();
        out
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        writeln!(out, "# {}\n", self.title).ok();
        writeln!(out, "- Compiler: `{}`", self.compiler).ok();
        writeln!(out, "- Version: {}", self.compiler_version).ok();
        writeln!(
            out,
            "- Standard library: {}",
            self.stdlib.as_deref().unwrap_or("unavailable")
        )
        .ok();
        writeln!(out, "- Timestamp: {}", self.timestamp).ok();
        for suite in [&self.required, &self.optional] {
            writeln!(
                out,
                "- {} {} of {} passed",
                suite.group.summary_label(),
                suite.passed(),
                suite.total()
            )
            .ok();
        }
        writeln!(out, "- Verdict: {}\n", self.verdict.message()).ok();

        out.push_str("| Group | Feature | Status | Time (ms) |\n");
        out.push_str("|-------|---------|--------|-----------|\n");
        for suite in [&self.required, &self.optional] {
            for r in &suite.results {
                let status = if r.outcome.passed() {
                    "PASS"
                } else {
                    "FAIL"
                };
                writeln!(
                    out,
                    "| {} | {} | {} ({}) | {} |",
                    suite.group.as_str(),
                    r.name,
                    status,
                    r.outcome.label(),
                    r.duration_ms
                )
                .ok();
            }
        }
        out
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the markdown report to `path` and the JSON report beside it.
    ///
    /// Returns `path#sha256` references for both artifacts.
    pub fn write_artifacts(&self, path: &Path) -> Result<Vec<String>, ProbeError> {
        let json_path = path.with_extension("json");
        let mut refs = Vec::with_capacity(2);
        for (target, body) in [
            (path, self.to_markdown()),
            (json_path.as_path(), self.to_json()?),
        ] {
            std::fs::write(target, &body).map_err(|source| ProbeError::Report {
                path: target.to_path_buf(),
                source,
            })?;
            refs.push(format!(
                "{}#{}",
                target.display(),
                sha256_hex(body.as_bytes())
            ));
        }
        Ok(refs)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Left-aligned `NAME:` label padded to the column width.
#[must_use]
pub fn progress_label(name: &str, width: usize) -> String {
    format!("{:<width$}", format!("{name}:"))
}

/// Prints live per-case progress lines to a writer (stdout in the binary).
pub struct ConsoleProgress<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> ConsoleProgress<W> {
    #[must_use]
    pub fn new(out: W, width: usize) -> Self {
        Self { out, width }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for ConsoleProgress<W> {
    fn probe_started(&mut self, compiler: &str, stdlib: Option<&str>) {
        let _ = writeln!(self.out, "Testing compiler '{compiler}' ...");
        if let Some(stdlib) = stdlib {
            let _ = writeln!(self.out, "Standard library: {stdlib}");
        }
    }

    fn suite_started(&mut self, group: Group) {
        let heading = match group {
            Group::Required => "\nMain tests:\n",
            Group::Optional => {
                "\nOptional tests (not needed for standard compiles, but for extra features like multithreading):\n"
            }
        };
        let _ = writeln!(self.out, "{heading}");
    }

    fn case_started(&mut self, _group: Group, case: &FeatureCase) {
        let _ = write!(self.out, "{}\t", progress_label(case.name, self.width));
        let _ = self.out.flush();
    }

    fn case_finished(&mut self, _group: Group, result: &CaseResult) {
        let marker = if result.outcome.passed() {
            PASS_MARKER
        } else {
            FAIL_MARKER
        };
        let _ = writeln!(self.out, "{marker}");
        let _ = self.out.flush();
    }
}
