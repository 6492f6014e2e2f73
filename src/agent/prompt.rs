//! Refinement prompt construction.
//!
//! The model keeps no history, so the prompt carries the failing code, the
//! execution error and the user's description of the problem.

use crate::artifact::CodeArtifact;
use crate::sandbox::ExecutionOutcome;

pub fn refinement_prompt(
    artifact: &CodeArtifact,
    outcome: Option<&ExecutionOutcome>,
    issue: &str,
    language: &str,
) -> String {
    let issue = if issue.trim().is_empty() {
        "(no description given)"
    } else {
        issue.trim()
    };

    let mut prompt = format!("The following code did not work as expected. Issue: {}.\n", issue);

    if let Some(error) = outcome.and_then(|o| o.error.as_deref()) {
        prompt.push_str(&format!("When executed it failed with error: {}\n", error));
    }

    if let Some(stdout) = outcome.map(|o| o.stdout.trim_end()).filter(|out| !out.is_empty()) {
        prompt.push_str(&format!("Its output was:\n{}\n", stdout));
    }

    prompt.push_str(&format!(
        "Please fix it and reply with the corrected code in a single fenced {} code block:\n```{}\n{}\n```",
        language, language, artifact.code
    ));
    prompt
}
