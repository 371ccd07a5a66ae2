//! One complete probe session: version probe, library identity, both suites.

use cxxprobe_exec::CommandRunner;

use crate::catalog::{Catalog, Group};
use crate::config::ProbeConfig;
use crate::report::RunReport;
use crate::runner::{FeatureRunner, ProgressSink, SuiteReport, probe_compiler_version};
use crate::structured_log::{EventOutcome, LogEmitter, LogEntry, LogLevel, now_utc};
use crate::ProbeError;

/// Probe `config.compiler` against every case in `catalog`.
///
/// The only early exits are an uninvocable compiler (before any scratch file
/// is written) and scratch/log IO failures. Case failures are data.
pub fn run_probe<R: CommandRunner + ?Sized>(
    runner: &mut R,
    config: &ProbeConfig,
    catalog: &Catalog,
    progress: &mut dyn ProgressSink,
    log: Option<&mut LogEmitter>,
) -> Result<RunReport, ProbeError> {
    let mut log = SessionLog(log);
    let compiler = config.compiler.display();

    log.emit(LogLevel::Info, "probe_start", |e| {
        e.with_compiler(&compiler).with_details(serde_json::json!({
            "scratch_dir": config.scratch_dir.display().to_string(),
            "run_binaries": config.run_binaries,
            "timeout_secs": config.timeout.map(|t| t.as_secs()),
        }))
    })?;

    let banner = match probe_compiler_version(runner, &config.compiler) {
        Ok(banner) => banner,
        Err(err) => {
            log.emit(LogLevel::Error, "version_probe", |e| {
                e.with_compiler(&compiler)
                    .with_outcome(EventOutcome::Error)
                    .with_details(serde_json::json!({ "diagnostic": err.to_string() }))
            })?;
            return Err(err);
        }
    };
    let version = banner.lines().next().unwrap_or("").trim().to_string();
    log.emit(LogLevel::Info, "version_probe", |e| {
        e.with_compiler(&compiler)
            .with_outcome(EventOutcome::Pass)
            .with_details(serde_json::json!({ "version": version }))
    })?;

    let mut features = FeatureRunner::new(runner, config);
    let stdlib = features.identify_stdlib()?;
    log.emit(LogLevel::Info, "stdlib_probe", |e| {
        e.with_details(serde_json::json!({ "stdlib": stdlib }))
    })?;
    progress.probe_started(&compiler, stdlib.as_deref());

    let required = features.run_suite(Group::Required, catalog.group(Group::Required), progress)?;
    log.suite(&required)?;
    let optional = features.run_suite(Group::Optional, catalog.group(Group::Optional), progress)?;
    log.suite(&optional)?;

    if !config.keep_scratch {
        features.scratch().remove()?;
    }

    Ok(RunReport::new(compiler, version, stdlib, now_utc(), required, optional))
}

struct SessionLog<'a>(Option<&'a mut LogEmitter>);

impl SessionLog<'_> {
    fn emit(
        &mut self,
        level: LogLevel,
        event: &str,
        fill: impl FnOnce(LogEntry) -> LogEntry,
    ) -> Result<(), ProbeError> {
        let Some(emitter) = self.0.as_deref_mut() else {
            return Ok(());
        };
        let entry = fill(emitter.entry(level, event));
        emitter.emit_entry(entry).map_err(ProbeError::Log)
    }

    fn suite(&mut self, suite: &SuiteReport) -> Result<(), ProbeError> {
        for result in &suite.results {
            let level = if result.outcome.passed() {
                LogLevel::Info
            } else {
                LogLevel::Warn
            };
            self.emit(level, "case_result", |e| {
                let e = e
                    .with_feature(suite.group, &result.name)
                    .with_outcome(EventOutcome::from(&result.outcome))
                    .with_duration_ms(result.duration_ms);
                match result.outcome.diagnostic() {
                    Some(diagnostic) => {
                        e.with_details(serde_json::json!({ "diagnostic": diagnostic }))
                    }
                    None => e,
                }
            })?;
        }
        Ok(())
    }
}
