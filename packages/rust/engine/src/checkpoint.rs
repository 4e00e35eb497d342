//! Durable checkpoint snapshots of run progress.
//!
//! Snapshots are written under uniquely-named files (sequence + unix
//! timestamp) so concurrent or repeated runs never overwrite each other.
//! A crash loses at most one checkpoint interval of work. Writes go to a
//! temp file first and are renamed into place, so a half-written snapshot
//! is never visible under its final name.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, instrument};

use listscout_shared::{
    CHECKPOINT_SCHEMA_VERSION, CheckpointFile, ListScoutError, ProjectIdea, Resource, Result,
    RunId, RunStats,
};

/// Stable name of the final artifact copy, for operator consumption.
const FINAL_ARTIFACT_NAME: &str = "new_projects.json";

/// Writes checkpoint snapshots for one run.
pub struct CheckpointStore {
    dir: PathBuf,
    every: usize,
    sequence: u64,
    saved_at_count: usize,
    corpus_fingerprint: Option<String>,
}

impl CheckpointStore {
    /// Create the checkpoint directory and a store writing into it.
    /// `every` is the number of newly accepted resources between
    /// intermediate snapshots.
    pub fn create(dir: impl Into<PathBuf>, every: usize) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| ListScoutError::io(&dir, e))?;
        Ok(Self {
            dir,
            every: every.max(1),
            sequence: 0,
            saved_at_count: 0,
            corpus_fingerprint: None,
        })
    }

    /// Record the seed corpus fingerprint for provenance.
    pub fn with_corpus_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.corpus_fingerprint = Some(fingerprint.into());
        self
    }

    /// Directory snapshots are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the accumulation threshold has been crossed since the last
    /// successful save.
    pub fn should_save(&self, accepted: usize) -> bool {
        accepted >= self.saved_at_count + self.every
    }

    /// Write a snapshot. Returns the path of the new file; the file is
    /// never mutated afterwards.
    #[instrument(skip_all, fields(run_id = %run_id, resources = resources.len(), is_final))]
    pub fn save(
        &mut self,
        run_id: &RunId,
        resources: &[Resource],
        ideas: &[ProjectIdea],
        stats: RunStats,
        is_final: bool,
    ) -> Result<PathBuf> {
        self.sequence += 1;
        let now = Utc::now();

        let checkpoint = CheckpointFile {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            run_id: run_id.clone(),
            sequence: self.sequence,
            timestamp: now,
            is_final,
            corpus_fingerprint: self.corpus_fingerprint.clone(),
            new_resources: resources.to_vec(),
            new_project_ideas: ideas.to_vec(),
            stats,
        };

        let stem = if is_final { "results" } else { "checkpoint" };
        let filename = format!("{stem}-{:04}-{}.json", self.sequence, now.timestamp());
        let path = self.dir.join(filename);

        write_json(&path, &checkpoint)?;
        self.saved_at_count = resources.len();

        if is_final {
            // A stable copy for operators, alongside the immutable snapshot.
            let stable = self.dir.join(FINAL_ARTIFACT_NAME);
            write_json(&stable, &checkpoint)?;
            info!(path = %path.display(), "final results written");
        } else {
            debug!(path = %path.display(), sequence = self.sequence, "checkpoint written");
        }

        Ok(path)
    }
}

/// Serialize a value to pretty JSON via a temp file and atomic rename.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| ListScoutError::validation(format!("checkpoint serialization: {e}")))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ListScoutError::validation("checkpoint path has no file name"))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| ListScoutError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ListScoutError::io(path, e))?;
    Ok(())
}
