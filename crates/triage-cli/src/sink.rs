use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use triage_spec::{Submission, SubmissionSink};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode submission: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write submission to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes each submission as pretty JSON to a fixed path, replacing the
/// previous one.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubmissionSink for JsonFileSink {
    type Error = SinkError;

    fn submit(&mut self, submission: &Submission) -> Result<(), Self::Error> {
        let json = submission.to_json_pretty()?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), form = %submission.form_id, "submission written");
        Ok(())
    }
}
