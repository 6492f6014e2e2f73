//! Fenced code block extraction from free-text model replies.

use regex::Regex;

/// Finds the first ```` ```<tag> ... ``` ```` block in a reply.
///
/// Only the first block counts. When the model answers with several blocks the
/// rest are dropped.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    language: String,
    pattern: Regex,
}

impl CodeExtractor {
    pub fn new(language: &str) -> Self {
        // Escaped tag, so the pattern always compiles
        let pattern = Regex::new(&format!(r"(?s)```{}(.*?)```", regex::escape(language)))
            .expect("escaped fence pattern is valid");
        Self {
            language: language.to_string(),
            pattern,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Trimmed interior of the first matching block, if any.
    pub fn extract(&self, response: &str) -> Option<String> {
        self.pattern
            .captures(response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new("python")
    }
}
