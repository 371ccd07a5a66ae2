//! Feature execution engine.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::time::Instant;

use cxxprobe_exec::{CommandRunner, ProcessOutput};
use serde::{Deserialize, Serialize};

use crate::catalog::{FeatureCase, Group, STDLIB_IDENTITY_SOURCE};
use crate::config::{CompilerInvocation, ProbeConfig};
use crate::scratch::Scratch;
use crate::ProbeError;

/// Diagnostic recorded when the compiler fails without saying why.
pub const UNKNOWN_ERROR: &str = "UNKNOWN ERROR\n";

/// Prefix distinguishing run failures in rendered diagnostics.
pub const RUN_FAILURE_PREFIX: &str = "compiled but did not run";

/// Result of probing one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "diagnostic", rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    /// The compiler rejected the snippet.
    CompileFailure(String),
    /// The snippet compiled but the produced binary failed.
    RunFailure(String),
}

impl Outcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Diagnostic text as shown in the detailed error dump.
    #[must_use]
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::Pass => None,
            Self::CompileFailure(text) => Some(text.clone()),
            Self::RunFailure(text) => Some(format!("{RUN_FAILURE_PREFIX}:\n{text}")),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::CompileFailure(_) => "compile_failure",
            Self::RunFailure(_) => "run_failure",
        }
    }
}

/// One case's outcome plus timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Results of one catalog group, in execution (sorted) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub group: Group,
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.passed()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Failing feature name -> diagnostic text. Passing features are absent.
    #[must_use]
    pub fn failures(&self) -> BTreeMap<&str, String> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.diagnostic().map(|d| (r.name.as_str(), d)))
            .collect()
    }

    /// True when the group is non-empty and nothing passed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.total() > 0 && self.passed() == 0
    }
}

/// Receives live progress while suites run.
pub trait ProgressSink {
    /// Called once the compiler has answered the version probe.
    fn probe_started(&mut self, _compiler: &str, _stdlib: Option<&str>) {}
    fn suite_started(&mut self, _group: Group) {}
    fn case_started(&mut self, _group: Group, _case: &FeatureCase) {}
    fn case_finished(&mut self, _group: Group, _result: &CaseResult) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Compiles (and optionally runs) catalog cases through a [`CommandRunner`].
pub struct FeatureRunner<'a, R: CommandRunner + ?Sized> {
    runner: &'a mut R,
    config: &'a ProbeConfig,
    scratch: Scratch,
}

impl<'a, R: CommandRunner + ?Sized> FeatureRunner<'a, R> {
    #[must_use]
    pub fn new(runner: &'a mut R, config: &'a ProbeConfig) -> Self {
        Self {
            runner,
            config,
            scratch: Scratch::in_dir(&config.scratch_dir),
        }
    }

    #[must_use]
    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// Run every case of `cases` in name order. Case failures never stop the suite.
    pub fn run_suite(
        &mut self,
        group: Group,
        cases: &[FeatureCase],
        progress: &mut dyn ProgressSink,
    ) -> Result<SuiteReport, ProbeError> {
        let mut ordered: Vec<&FeatureCase> = cases.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(b.name));

        progress.suite_started(group);
        let mut results = Vec::with_capacity(ordered.len());
        for case in ordered {
            progress.case_started(group, case);
            let started = Instant::now();
            let outcome = self.run_case(case)?;
            let result = CaseResult {
                name: case.name.to_string(),
                outcome,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
            progress.case_finished(group, &result);
            results.push(result);
        }
        Ok(SuiteReport { group, results })
    }

    /// Probe a single case. Only scratch-file IO errors are returned as `Err`.
    pub fn run_case(&mut self, case: &FeatureCase) -> Result<Outcome, ProbeError> {
        if let Err(diagnostic) = self.compile(case.source)? {
            return Ok(Outcome::CompileFailure(diagnostic));
        }
        if !self.config.run_binaries {
            return Ok(Outcome::Pass);
        }
        match self.runner.run(self.scratch.binary_path(), &[]) {
            Ok(output) if output.success() => Ok(Outcome::Pass),
            Ok(output) => Ok(Outcome::RunFailure(run_diagnostic(&output))),
            Err(err) => Ok(Outcome::RunFailure(format!("{err}\n"))),
        }
    }

    /// Compile and run a snippet that reports which standard library is in use.
    ///
    /// Returns `None` when the run step is disabled or the snippet fails.
    pub fn identify_stdlib(&mut self) -> Result<Option<String>, ProbeError> {
        if !self.config.run_binaries || self.compile(STDLIB_IDENTITY_SOURCE)?.is_err() {
            return Ok(None);
        }
        let identity = match self.runner.run(self.scratch.binary_path(), &[]) {
            Ok(output) if output.success() => {
                let line = output.stdout.lines().next().unwrap_or("").trim();
                (!line.is_empty()).then(|| line.to_string())
            }
            _ => None,
        };
        Ok(identity)
    }

    fn compile(&mut self, source: &str) -> Result<Result<(), String>, ProbeError> {
        self.scratch.write_source(source)?;
        self.scratch.clear_binary()?;
        let args = self
            .config
            .compiler
            .compile_args(self.scratch.source_path(), self.scratch.binary_path());
        let compiled = match self.runner.run(&self.config.compiler.program, &args) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(compile_diagnostic(&output)),
            Err(err) => Err(format!("{err}\n")),
        };
        Ok(compiled)
    }
}

/// Check that the compiler answers `--version`. Returns the version banner.
pub fn probe_compiler_version<R: CommandRunner + ?Sized>(
    runner: &mut R,
    compiler: &CompilerInvocation,
) -> Result<String, ProbeError> {
    let args = [OsString::from("--version")];
    let diagnostic = match runner.run(&compiler.program, &args) {
        Ok(output) if output.success() => return Ok(output.stdout),
        Ok(output) => compile_diagnostic(&output),
        Err(err) => format!("{err}\n"),
    };
    Err(ProbeError::CompilerNotInvocable {
        compiler: compiler.program.clone(),
        diagnostic,
    })
}

fn compile_diagnostic(output: &ProcessOutput) -> String {
    if output.stderr.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        output.stderr.clone()
    }
}

fn run_diagnostic(output: &ProcessOutput) -> String {
    if !output.stderr.trim().is_empty() {
        output.stderr.clone()
    } else if !output.stdout.trim().is_empty() {
        output.stdout.clone()
    } else {
        format!("{}\n", output.status_description())
    }
}
