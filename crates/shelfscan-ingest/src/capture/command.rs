//! Camera and barcode capabilities backed by external programs.

use std::io::Write;
use std::process::{Command, Output};

use shelfscan_core::config::CaptureConfig;

use super::{BarcodeDecoder, Frame, FrameSource};
use crate::error::{IngestError, Result};

/// `zbarimg` exit status when the image was read but held no symbol.
const ZBAR_NO_SYMBOL: i32 = 4;

fn run(program: &str, command: &mut Command) -> Result<Output> {
    command.output().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            IngestError::Capture(format!("{program} is not installed"))
        } else {
            IngestError::Capture(format!("failed to run {program}: {err}"))
        }
    })
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

// ─── camera ──────────────────────────────────────────────────────────────────

/// Runs a command that writes one encoded frame to stdout.
pub struct CommandFrameSource {
    program: String,
    args: Vec<String>,
}

impl CommandFrameSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        let (program, args) = config
            .camera_command
            .split_first()
            .ok_or_else(|| IngestError::Capture("capture.camera_command is empty".to_string()))?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl FrameSource for CommandFrameSource {
    fn read_frame(&self) -> Result<Frame> {
        let output = run(&self.program, Command::new(&self.program).args(&self.args))?;
        if !output.status.success() {
            return Err(IngestError::Capture(format!(
                "{} failed: {}",
                self.program,
                stderr_of(&output)
            )));
        }
        if output.stdout.is_empty() {
            return Err(IngestError::Capture(format!("{} produced no frame", self.program)));
        }
        Ok(Frame(output.stdout))
    }
}

// ─── zbar ────────────────────────────────────────────────────────────────────

pub struct ZbarDecoder {
    command: String,
}

impl ZbarDecoder {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl BarcodeDecoder for ZbarDecoder {
    fn decode(&self, frame: &Frame) -> Result<Vec<String>> {
        let mut image = tempfile::Builder::new().suffix(".png").tempfile()?;
        image.write_all(frame.as_bytes())?;
        image.flush()?;

        let output = run(
            &self.command,
            Command::new(&self.command).args(["--raw", "-q"]).arg(image.path()),
        )?;
        match output.status.code() {
            Some(0) => Ok(payloads(&output.stdout)),
            Some(ZBAR_NO_SYMBOL) => Ok(Vec::new()),
            _ => Err(IngestError::Capture(format!(
                "{} failed: {}",
                self.command,
                stderr_of(&output)
            ))),
        }
    }
}

/// One symbol per line in `--raw` mode.
fn payloads(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
