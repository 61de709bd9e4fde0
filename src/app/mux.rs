//! External muxer invocation
//!
//! The muxer is a black box that consumes the ordered concat descriptor and
//! produces one output artifact without re-encoding. It is invoked once per
//! job; a non-zero exit is logged and marks the job failed for muxing
//! purposes, but is never retried and never stops the run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::constants::mux;
use crate::errors::{MuxError, MuxResult};

/// Configuration for the external muxer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxerConfig {
    /// Program to invoke; must accept ffmpeg concat-demuxer arguments
    pub program: String,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            program: mux::PROGRAM.to_string(),
        }
    }
}

impl MuxerConfig {
    /// Use a different muxer binary (tests substitute a stand-in here)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Invokes the external concatenation tool
#[derive(Debug, Clone, Default)]
pub struct Muxer {
    config: MuxerConfig,
}

impl Muxer {
    /// Create a muxer with the given configuration
    pub fn new(config: MuxerConfig) -> Self {
        Self { config }
    }

    /// Concatenate the descriptor's files into `output`
    ///
    /// Stdout and stderr are captured together and surfaced in the error on
    /// failure, since ffmpeg writes its diagnostics to stderr.
    pub async fn mux(&self, descriptor: &Path, output: &Path) -> MuxResult<()> {
        debug!(
            "Invoking {} for descriptor {}",
            self.config.program,
            descriptor.display()
        );

        let result = Command::new(&self.config.program)
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(descriptor)
            .arg("-c")
            .arg("copy")
            .arg(output)
            .output()
            .await
            .map_err(|source| MuxError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !result.status.success() {
            let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&result.stderr));
            error!(
                "Muxer {} exited with {:?}: {}",
                self.config.program,
                result.status.code(),
                combined.trim()
            );
            return Err(MuxError::ToolFailed {
                status: result.status.code(),
                output: combined,
            });
        }

        info!("Muxing complete: {}", output.display());
        Ok(())
    }
}
