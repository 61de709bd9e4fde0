//! Deterministic reassembly ordering and concat descriptor generation
//!
//! The ordered file list handed to the muxer is a pure function of manifest
//! ordinals, never of completion order. The orderer walks ordinals 0..N-1
//! and emits the persisted path for each; what happens at a missing ordinal
//! is the gap policy's decision.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::models::SegmentResult;
use crate::errors::{AssemblyError, AssemblyResult};

/// What to do when a segment never reached persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GapPolicy {
    /// Skip missing ordinals and mux the remainder
    #[default]
    BestEffort,
    /// Fail the job before muxing if any ordinal is missing
    FailJob,
}

/// Builds the muxer's ordered input list from per-segment results
#[derive(Debug, Clone, Copy, Default)]
pub struct ReassemblyOrderer {
    gap_policy: GapPolicy,
}

impl ReassemblyOrderer {
    /// Create an orderer with the given gap policy
    pub fn new(gap_policy: GapPolicy) -> Self {
        Self { gap_policy }
    }

    /// Produce segment paths in strict manifest-ordinal order
    ///
    /// `results` may arrive in any order; `total` is the manifest's segment
    /// count N. Ordinals 0..N-1 are walked in increasing order and each
    /// persisted path is emitted in turn.
    pub fn order(&self, total: usize, results: &[SegmentResult]) -> AssemblyResult<Vec<PathBuf>> {
        let mut by_ordinal: Vec<Option<&PathBuf>> = vec![None; total];
        for result in results {
            if let Some(path) = &result.path {
                // Each ordinal is written by exactly one task.
                by_ordinal[result.ordinal] = Some(path);
            }
        }

        let missing = by_ordinal.iter().filter(|slot| slot.is_none()).count();
        if missing > 0 {
            match self.gap_policy {
                GapPolicy::FailJob => {
                    return Err(AssemblyError::MissingSegments { missing, total });
                }
                GapPolicy::BestEffort => {
                    warn!(
                        "Reassembling with {} of {} segments missing; output will be gapped",
                        missing, total
                    );
                }
            }
        }

        Ok(by_ordinal
            .into_iter()
            .flatten()
            .cloned()
            .collect())
    }

    /// Write the transient concat descriptor consumed by the muxer
    ///
    /// Uses the ffmpeg concat demuxer syntax: one `file '<path>'` line per
    /// segment, single quotes escaped the way the demuxer expects.
    pub async fn write_descriptor(
        &self,
        descriptor_path: &Path,
        ordered_paths: &[PathBuf],
    ) -> AssemblyResult<()> {
        let mut body = String::new();
        for path in ordered_paths {
            let escaped = path.display().to_string().replace('\'', r"'\''");
            body.push_str(&format!("file '{}'\n", escaped));
        }

        tokio::fs::write(descriptor_path, body)
            .await
            .map_err(|source| AssemblyError::Descriptor {
                path: descriptor_path.to_path_buf(),
                source,
            })?;

        debug!(
            "Descriptor {} written with {} entries",
            descriptor_path.display(),
            ordered_paths.len()
        );
        Ok(())
    }

    /// Remove the descriptor; missing files are not an error
    pub async fn remove_descriptor(&self, descriptor_path: &Path) {
        if let Err(e) = tokio::fs::remove_file(descriptor_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove descriptor {}: {}",
                    descriptor_path.display(),
                    e
                );
            }
        }
    }
}
