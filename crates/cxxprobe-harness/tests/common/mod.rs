//! Scripted stand-in for a C++ compiler driver.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use cxxprobe_exec::{CommandRunner, ExecError, ProcessOutput};
use cxxprobe_harness::{CompilerInvocation, ProbeConfig};

pub const FAKE_COMPILER: &str = "/opt/fake/bin/fake++";
pub const FAKE_STDLIB: &str = "libstdc++ 20240904";

/// Decides compile and run results from the scratch source text.
#[derive(Debug, Default)]
pub struct FakeCompiler {
    /// The executable does not exist at all.
    missing: bool,
    /// `--version` is rejected.
    rejects_version: bool,
    /// Sources containing any of these fail to compile.
    compile_rejects: Vec<&'static str>,
    /// Binaries built from sources containing any of these abort at run time.
    run_rejects: Vec<&'static str>,
    /// Every source handed to the compiler, in order.
    pub compiled: Vec<String>,
    /// Number of produced binaries executed.
    pub executed: usize,
    last_built: Option<String>,
}

impl FakeCompiler {
    pub fn conformant() -> Self {
        Self::default()
    }

    pub fn rejecting(patterns: &[&'static str]) -> Self {
        Self {
            compile_rejects: patterns.to_vec(),
            ..Self::default()
        }
    }

    pub fn aborting_at_run(patterns: &[&'static str]) -> Self {
        Self {
            run_rejects: patterns.to_vec(),
            ..Self::default()
        }
    }

    pub fn without_version_flag() -> Self {
        Self {
            rejects_version: true,
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    fn compile(&mut self, args: &[OsString]) -> ProcessOutput {
        let source_path = args
            .iter()
            .map(Path::new)
            .find(|p| p.extension().is_some_and(|ext| ext == "cc"))
            .expect("compile invocation names a .cc source");
        let source = std::fs::read_to_string(source_path).expect("scratch source exists");
        self.compiled.push(source.clone());

        if let Some(bad) = self.compile_rejects.iter().find(|p| source.contains(**p)) {
            return ProcessOutput::exited(1, "", format!("error: unsupported construct '{bad}'\n"));
        }

        let out = args
            .iter()
            .position(|a| a == "-o")
            .expect("compile invocation has -o");
        std::fs::write(Path::new(&args[out + 1]), b"fake binary").expect("write fake binary");
        self.last_built = Some(source);
        ProcessOutput::exited(0, "", "")
    }

    fn execute(&mut self, binary: &Path) -> Result<ProcessOutput, ExecError> {
        self.executed += 1;
        if !binary.exists() {
            return Err(ExecError::Spawn {
                program: binary.display().to_string(),
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        let source = self.last_built.clone().unwrap_or_default();
        if source.contains("_LIBCPP_VERSION") {
            return Ok(ProcessOutput::exited(0, format!("{FAKE_STDLIB}\n"), ""));
        }
        if self.run_rejects.iter().any(|p| source.contains(*p)) {
            return Ok(ProcessOutput::exited(
                134,
                "",
                "terminate called after throwing an instance of 'std::regex_error'\n",
            ));
        }
        Ok(ProcessOutput::exited(0, "", ""))
    }
}

impl CommandRunner for FakeCompiler {
    fn run(&mut self, program: &Path, args: &[OsString]) -> Result<ProcessOutput, ExecError> {
        if program != Path::new(FAKE_COMPILER) {
            return self.execute(program);
        }
        if self.missing {
            return Err(ExecError::Spawn {
                program: program.display().to_string(),
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        if args.len() == 1 && args[0] == "--version" {
            return Ok(if self.rejects_version {
                ProcessOutput::exited(1, "", "fake++: error: unrecognized option '--version'\n")
            } else {
                ProcessOutput::exited(0, "fake++ (Fake) 14.2.0\nCopyright (C) 2024\n", "")
            });
        }
        Ok(self.compile(args))
    }
}

pub fn config(scratch_dir: PathBuf) -> ProbeConfig {
    ProbeConfig::new(CompilerInvocation::new(
        FAKE_COMPILER,
        vec!["-std=c++11".to_string()],
    ))
    .with_scratch_dir(scratch_dir)
}
