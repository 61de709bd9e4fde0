//! Playlist manifest parsing and input queue reading
//!
//! A manifest is a line-oriented playlist: non-empty lines not starting
//! with `#` are segment references in file order. Order is significant,
//! duplicates are permitted and preserved, and the 0-based ordinal assigned
//! here is the single source of truth for reassembly order.

use std::path::Path;

use url::Url;

use crate::app::models::{parse_queue_line, JobSpec};
use crate::errors::{ManifestError, ManifestResult};

/// One segment reference extracted from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReference {
    /// 0-based position within the manifest; unique and dense
    pub ordinal: usize,
    /// Relative or absolute URL fragment, as written in the playlist
    pub reference: String,
}

impl SegmentReference {
    /// Final path component of the reference, used for segment file naming
    pub fn basename(&self) -> &str {
        self.reference
            .rsplit('/')
            .next()
            .unwrap_or(&self.reference)
    }
}

/// A parsed playlist manifest
///
/// Immutable once parsed; discarded after its job completes.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Job identifier the manifest belongs to
    pub id: String,
    /// URL the manifest was downloaded from; base for relative references
    pub source_url: Url,
    /// Segment references in file order
    pub segments: Vec<SegmentReference>,
}

impl Manifest {
    /// Parse a manifest body downloaded from `source_url`
    ///
    /// Filters out blank lines and `#`-prefixed tag/comment lines, keeping
    /// everything else as a segment reference in file order.
    pub fn parse(id: impl Into<String>, source_url: &str, body: &str) -> ManifestResult<Self> {
        let parsed_url = Url::parse(source_url).map_err(|_| ManifestError::InvalidUrl {
            url: source_url.to_string(),
        })?;

        let segments: Vec<SegmentReference> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .enumerate()
            .map(|(ordinal, line)| SegmentReference {
                ordinal,
                reference: line.to_string(),
            })
            .collect();

        if segments.is_empty() {
            return Err(ManifestError::Empty {
                url: source_url.to_string(),
            });
        }

        Ok(Self {
            id: id.into(),
            source_url: parsed_url,
            segments,
        })
    }

    /// Number of segments in the manifest
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the manifest has no segments (never true for parsed manifests)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve a segment reference against the manifest's directory prefix
    ///
    /// Relative references are joined onto the manifest URL with its trailing
    /// filename component stripped; absolute references pass through as-is.
    pub fn segment_url(&self, segment: &SegmentReference) -> ManifestResult<Url> {
        self.source_url
            .join(&segment.reference)
            .map_err(|_| ManifestError::InvalidUrl {
                url: segment.reference.clone(),
            })
    }
}

/// Read the input queue file, yielding one parse result per non-empty line
///
/// A malformed line aborts only its own job: the caller gets the per-line
/// error alongside the successfully parsed specs and decides how to report
/// it. Only an unreadable queue file fails the whole call.
pub async fn read_job_queue(path: &Path) -> ManifestResult<Vec<ManifestResult<JobSpec>>> {
    let content = tokio::fs::read_to_string(path).await?;

    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_queue_line(line, index + 1))
        .collect())
}
