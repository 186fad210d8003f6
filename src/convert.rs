//! External RAW-to-DNG converter invocation

use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

/// What the converter process reported
#[derive(Debug, Clone, Default)]
pub struct ConverterOutput {
    /// Process exited with status zero
    pub success: bool,
    /// Exit code, if the process wasn't killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ConverterOutput {
    /// Both the exit status and the printed marker confirm the conversion
    pub fn confirms(&self, success_marker: &str) -> bool {
        self.success && self.stdout.contains(success_marker)
    }
}

/// Converts one RAW file to DNG
pub trait Converter {
    /// Run the conversion; `Err` only if the converter could not be started
    fn convert(&self, source: &Path, destination: &Path) -> Result<ConverterOutput>;
}

/// Converter running `<path> convert [flags...] <source> <destination>`
#[derive(Debug, Clone)]
pub struct DngConverter {
    program: PathBuf,
    flags: Vec<String>,
}

impl DngConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.path.clone(),
            flags: config.flags.clone(),
        }
    }

    fn command(&self, source: &Path, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("convert")
            .args(&self.flags)
            .arg(source)
            .arg(destination);
        cmd
    }
}

impl Converter for DngConverter {
    fn convert(&self, source: &Path, destination: &Path) -> Result<ConverterOutput> {
        debug!(?source, ?destination, program = ?self.program, "Running converter");

        let output = self
            .command(source, destination)
            .output()
            .map_err(|e| Error::Process {
                program: self.program.clone(),
                source: e,
            })?;

        let result = ConverterOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(stdout = %result.stdout, stderr = %result.stderr, "Converter output");

        Ok(result)
    }
}
