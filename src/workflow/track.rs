//! Track Log Persistence
//!
//! On-disk format for captured sample streams, so a live run can be
//! replayed and analyzed offline.

use crate::ingest::types::LocationSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current track log format version.
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Checkpoint interval: save every N samples during live capture.
pub const CHECKPOINT_INTERVAL: usize = 100;

/// Get the checkpoint (temporary) path for a track log file.
fn checkpoint_path(final_path: &Path) -> std::path::PathBuf {
    final_path.with_extension("json.tmp")
}

/// Track log metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    /// Unique track ID.
    pub id: Uuid,
    /// Track name.
    pub name: String,
    /// Free-form note about the capture (route, conditions, device).
    pub note: Option<String>,
    /// Capture start time.
    pub started_at: DateTime<Utc>,
    /// Capture end time.
    pub ended_at: Option<DateTime<Utc>>,
    /// Total sample count.
    pub sample_count: usize,
    /// Capture duration in milliseconds.
    pub duration_ms: u64,
    /// Version of the track log format.
    pub format_version: String,
}

impl TrackMetadata {
    /// Create new metadata for a track.
    pub fn new(name: String, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            note,
            started_at: Utc::now(),
            ended_at: None,
            sample_count: 0,
            duration_ms: 0,
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }

    /// Finalize with end time and sample count.
    pub fn finalize(&mut self, sample_count: usize, duration_ms: u64) {
        self.ended_at = Some(Utc::now());
        self.sample_count = sample_count;
        self.duration_ms = duration_ms;
    }
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            note: None,
            started_at: Utc::now(),
            ended_at: None,
            sample_count: 0,
            duration_ms: 0,
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }
}

/// A recorded location sample stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackLog {
    /// Track metadata.
    pub metadata: TrackMetadata,
    /// Samples in arrival order.
    pub samples: Vec<LocationSample>,
}

impl TrackLog {
    /// Create a new empty track log.
    pub fn new(name: String, note: Option<String>) -> Self {
        Self {
            metadata: TrackMetadata::new(name, note),
            samples: Vec::new(),
        }
    }

    /// Append a sample.
    pub fn push_sample(&mut self, sample: LocationSample) {
        self.samples.push(sample);
    }

    /// Finalize the track.
    pub fn finalize(&mut self, duration_ms: u64) {
        self.metadata.finalize(self.samples.len(), duration_ms);
    }

    /// Time span covered by the recorded samples.
    pub fn recorded_span(&self) -> std::time::Duration {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp.elapsed_since(first.timestamp),
            _ => std::time::Duration::ZERO,
        }
    }

    /// Save the track to a file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Save a checkpoint to a temporary file for crash recovery.
    ///
    /// Writes to `<path>.tmp` so that if the process dies mid-capture,
    /// the track can be recovered on next launch.
    pub fn save_checkpoint(&self, final_path: &Path) -> crate::Result<()> {
        let tmp_path = checkpoint_path(final_path);
        let json = serde_json::to_string(self)?; // compact JSON for speed
        std::fs::write(&tmp_path, json)?;
        Ok(())
    }

    /// Finalize a checkpoint by renaming `.tmp` to the final path.
    pub fn finalize_checkpoint(final_path: &Path) -> crate::Result<()> {
        let tmp_path = checkpoint_path(final_path);
        if tmp_path.exists() {
            std::fs::rename(&tmp_path, final_path)?;
        }
        Ok(())
    }

    /// Remove a checkpoint file if it exists.
    pub fn remove_checkpoint(final_path: &Path) {
        let tmp_path = checkpoint_path(final_path);
        let _ = std::fs::remove_file(tmp_path);
    }

    /// Find and recover orphaned checkpoint files in a directory.
    ///
    /// Returns (checkpoint_path, recovered_track) pairs.
    pub fn recover_checkpoints(dir: &Path) -> Vec<(std::path::PathBuf, TrackLog)> {
        let mut recovered = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "tmp").unwrap_or(false) {
                    if let Ok(content) = std::fs::read_to_string(&path) {
                        if let Ok(track) = serde_json::from_str::<TrackLog>(&content) {
                            recovered.push((path, track));
                        }
                    }
                }
            }
        }
        recovered
    }

    /// Load a track from a file.
    ///
    /// Logs a warning for unknown format versions but still attempts to
    /// deserialize (forward-compatible via `#[serde(default)]`).
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let track: TrackLog = serde_json::from_str(&content)?;
        if track.metadata.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                name = %track.metadata.name,
                found = %track.metadata.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Track log has different format version; some fields may use default values"
            );
        }
        Ok(track)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the track has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
