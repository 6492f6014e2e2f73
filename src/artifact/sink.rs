//! Append-only artifact log.
//!
//! Record layout:
//!
//! ```text
//!
//! Generated Code (<origin>, <rfc3339>):
//! <code>
//! --------------------------------------------------
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::CodeArtifact;
use crate::error::Result;

/// Line that starts every record, followed by provenance and a colon.
pub const RECORD_HEADER: &str = "Generated Code";

/// Line that ends every record.
pub const SEPARATOR: &str = "--------------------------------------------------";

/// Durable sink for generated artifacts. There is no read side.
pub trait ArtifactSink: Send + Sync {
    fn append(&self, artifact: &CodeArtifact) -> Result<()>;
}

/// Text file opened in append mode for every record.
#[derive(Debug, Clone)]
pub struct FileArtifactLog {
    path: PathBuf,
}

impl FileArtifactLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(artifact: &CodeArtifact) -> String {
        format!(
            "\n{} ({}, {}):\n{}\n{}\n",
            RECORD_HEADER,
            artifact.origin,
            artifact.created_at.to_rfc3339(),
            artifact.code,
            SEPARATOR
        )
    }
}

impl ArtifactSink for FileArtifactLog {
    fn append(&self, artifact: &CodeArtifact) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(Self::render(artifact).as_bytes())?;
        log::debug!("Logged {} artifact to {}", artifact.origin, self.path.display());
        Ok(())
    }
}
