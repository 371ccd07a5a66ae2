//! Probe configuration.
//!
//! Defaults can be set through the environment; command-line flags override
//! them:
//! - `CXXPROBE_SCRATCH_DIR`: directory holding the scratch source/binary pair
//!   (default: the current directory).
//! - `CXXPROBE_TIMEOUT_SECS`: per-process timeout in seconds. `0` or an
//!   unparseable value disables the timeout (the default).
//! - `CXXPROBE_RUN`: whether produced binaries are executed
//!   (`1|true|yes|on`, `0|false|no|off`; default on).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SCRATCH_DIR_ENV: &str = "CXXPROBE_SCRATCH_DIR";
pub const TIMEOUT_ENV: &str = "CXXPROBE_TIMEOUT_SECS";
pub const RUN_ENV: &str = "CXXPROBE_RUN";

/// The compiler executable plus the flags passed verbatim to every compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    pub program: PathBuf,
    pub flags: Vec<String>,
}

impl CompilerInvocation {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, flags: Vec<String>) -> Self {
        Self {
            program: program.into(),
            flags,
        }
    }

    /// Arguments for compiling `source` into `binary`.
    #[must_use]
    pub fn compile_args(&self, source: &Path, binary: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push(source.into());
        args.push("-o".into());
        args.push(binary.into());
        args
    }

    /// Executable and flags joined for display.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.flags.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything a probe session needs to know.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub compiler: CompilerInvocation,
    pub scratch_dir: PathBuf,
    /// Per-process timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Execute each produced binary and require exit status zero.
    pub run_binaries: bool,
    /// Leave the scratch pair on disk after the session.
    pub keep_scratch: bool,
    /// Dump diagnostics for every failure, not only when all required cases fail.
    pub verbose: bool,
}

impl ProbeConfig {
    /// Built-in defaults, ignoring the environment.
    #[must_use]
    pub fn new(compiler: CompilerInvocation) -> Self {
        Self {
            compiler,
            scratch_dir: PathBuf::from("."),
            timeout: None,
            run_binaries: true,
            keep_scratch: false,
            verbose: false,
        }
    }

    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env(compiler: CompilerInvocation) -> Self {
        Self::from_env_vars(compiler, |key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    #[must_use]
    pub fn from_env_vars(
        compiler: CompilerInvocation,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Self::new(compiler);
        if let Some(dir) = lookup(SCRATCH_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.timeout = parse_timeout_secs(&raw);
        }
        if let Some(run) = lookup(RUN_ENV).as_deref().and_then(parse_bool_loose) {
            config.run_binaries = run;
        }
        config
    }

    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_run_binaries(mut self, run: bool) -> Self {
        self.run_binaries = run;
        self
    }

    #[must_use]
    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Parse a boolean switch (case-insensitive).
#[must_use]
pub fn parse_bool_loose(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout in whole seconds; zero and garbage mean "no timeout".
#[must_use]
pub fn parse_timeout_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .replace('_', "")
        .parse::<u64>()
        .ok()
        .and_then(timeout_from_secs)
}

#[must_use]
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Remove bare `-v` tokens from the compiler flags, returning whether any
/// were present. `-v` is the tool's verbose switch, never forwarded.
pub fn extract_verbose_flag(flags: &mut Vec<String>) -> bool {
    let before = flags.len();
    flags.retain(|flag| flag != "-v");
    flags.len() != before
}
