//! Code artifacts and their audit log
//!
//! An artifact is one extracted code string plus where it came from. A
//! refinement produces a new artifact rather than editing the previous one.

mod sink;

pub use self::sink::{ArtifactSink, FileArtifactLog, RECORD_HEADER, SEPARATOR};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Extracted from the reply to the user's request
    Original,
    /// Extracted from the reply to a refinement prompt
    Refined,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Original => "original",
            Origin::Refined => "refined",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub code: String,
    pub origin: Origin,
    /// Execution error of the artifact this one replaces
    pub error: Option<String>,
    /// Human description of what was wrong with the artifact this one replaces
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CodeArtifact {
    pub fn original(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            origin: Origin::Original,
            error: None,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    pub fn refined(code: impl Into<String>, error: Option<String>, feedback: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            origin: Origin::Refined,
            error,
            feedback: Some(feedback.into()),
            created_at: Utc::now(),
        }
    }

    pub fn is_refined(&self) -> bool {
        self.origin == Origin::Refined
    }
}
