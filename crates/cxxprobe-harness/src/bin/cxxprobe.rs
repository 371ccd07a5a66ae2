//! CLI entrypoint for the compiler feature probe.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use cxxprobe_exec::SystemRunner;
use cxxprobe_harness::config::{extract_verbose_flag, timeout_from_secs};
use cxxprobe_harness::report::ConsoleProgress;
use cxxprobe_harness::structured_log::{LogEmitter, LogLevel};
use cxxprobe_harness::{
    Catalog, CompilerInvocation, EXIT_UNUSABLE, ProbeConfig, ProbeError, RunReport, run_probe,
};

/// Probe a C++ compiler invocation for the language and library features
/// this project relies on.
///
/// Options go before the compiler; everything after the compiler path is
/// passed verbatim to every compile, e.g.
///
///     cxxprobe --report probe.md /usr/local/bin/g++ -std=c++11
///
/// Clang users may want to try adding -stdlib=libc++.
#[derive(Debug, Parser)]
#[command(name = "cxxprobe", version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Print full compiler diagnostics for every failing case.
    #[arg(short, long)]
    verbose: bool,
    /// Only compile the snippets; do not execute the produced binaries.
    #[arg(long)]
    compile_only: bool,
    /// Kill any compile or run that takes longer than this (0 disables).
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Directory for the scratch source/binary pair.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
    /// Leave the scratch source/binary pair on disk afterwards.
    #[arg(long)]
    keep_scratch: bool,
    /// Write a markdown report here, plus a JSON report alongside it.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write a structured JSONL event log here.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Compiler executable to probe (use the C++ driver, e.g. g++ or clang++).
    compiler: PathBuf,
    /// Flags passed to every compile, e.g. -std=c++11.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    flags: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_UNUSABLE),
            };
        }
    };

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<u8, ProbeError> {
    let mut flags = cli.flags;
    let verbose = extract_verbose_flag(&mut flags) || cli.verbose;

    let mut config = ProbeConfig::from_env(CompilerInvocation::new(cli.compiler, flags))
        .with_verbose(verbose)
        .with_keep_scratch(cli.keep_scratch);
    if let Some(dir) = cli.scratch_dir {
        config.scratch_dir = dir;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = timeout_from_secs(secs);
    }
    if cli.compile_only {
        config.run_binaries = false;
    }

    let mut log = match &cli.log {
        Some(path) => Some(LogEmitter::to_file(path, &run_id()).map_err(ProbeError::Log)?),
        None => None,
    };

    let catalog = Catalog::builtin();
    let width = catalog.name_width();
    let mut system = SystemRunner::new(config.timeout);
    let mut console = ConsoleProgress::new(std::io::stdout(), width);

    let report = match run_probe(&mut system, &config, &catalog, &mut console, log.as_mut()) {
        Ok(report) => report,
        Err(err) => {
            if let Some(log) = log.as_mut() {
                let entry = log
                    .entry(LogLevel::Error, "probe_end")
                    .with_exit_code(i32::from(err.exit_code()))
                    .with_details(serde_json::json!({ "error": err.to_string() }));
                let _ = log.emit_entry(entry);
                let _ = log.flush();
            }
            return Err(err);
        }
    };

    render(&report, config.verbose, width);

    let artifacts = match &cli.report {
        Some(path) => report.write_artifacts(path).inspect(|_| {
            eprintln!("Wrote report to {}", path.display());
        }),
        None => Ok(Vec::new()),
    };

    let code = match &artifacts {
        Ok(_) => report.exit_code(),
        Err(err) => err.exit_code(),
    };
    if let Some(log) = log.as_mut() {
        let mut details = serde_json::json!({
            "verdict": report.verdict,
            "required_failed": report.required.failed(),
            "optional_failed": report.optional.failed(),
        });
        if let Err(err) = &artifacts {
            details["error"] = serde_json::Value::String(err.to_string());
        }
        let level = if artifacts.is_ok() {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        let entry = log
            .entry(level, "probe_end")
            .with_exit_code(i32::from(code))
            .with_artifacts(artifacts.as_ref().cloned().unwrap_or_default())
            .with_details(details);
        log.emit_entry(entry).map_err(ProbeError::Log)?;
        log.flush().map_err(ProbeError::Log)?;
    }
    artifacts.map(|_| code)
}

fn render(report: &RunReport, verbose: bool, width: usize) {
    if report.should_dump_diagnostics(verbose) {
        print!("{}", report.render_diagnostics());
    }
    print!("{}", report.render_summary(width));
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("cxxprobe-{secs}-{}", std::process::id())
}
