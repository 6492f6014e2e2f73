//! Scripted collaborators for driving the agent without network or tty.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::artifact::{ArtifactSink, CodeArtifact};
use crate::error::Result;
use crate::llm::{LlmError, ModelClient};
use crate::sandbox::{ExecutionOutcome, Sandbox};
use crate::terminal::Terminal;

/// Shared, ordered event list for checking cross-collaborator ordering.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

enum Reply {
    Text(String),
    Failure(String),
}

/// Model client answering from a queue. Runs out into an error.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a transport-style failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Failure(message.into()));
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn query(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Failure(message)) => Err(LlmError::ApiError { status: 500, message }),
            None => Err(LlmError::InvalidResponse("no scripted reply left".to_string())),
        }
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Sandbox returning queued outcomes; succeeds once the queue is empty.
#[derive(Default)]
pub struct ScriptedSandbox {
    outcomes: Mutex<VecDeque<ExecutionOutcome>>,
    runs: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

impl ScriptedSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(self, outcome: ExecutionOutcome) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Code passed to `run`, in order.
    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn run(&self, code: &str) -> ExecutionOutcome {
        self.runs.lock().unwrap().push(code.to_string());
        if let Some(journal) = &self.journal {
            journal.push(format!("executed: {}", code));
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ExecutionOutcome::success(""))
    }
}

/// In-memory artifact sink.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<CodeArtifact>>,
    journal: Option<Journal>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn records(&self) -> Vec<CodeArtifact> {
        self.records.lock().unwrap().clone()
    }
}

impl ArtifactSink for RecordingSink {
    fn append(&self, artifact: &CodeArtifact) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.push(format!("logged {}: {}", artifact.origin, artifact.code));
        }
        self.records.lock().unwrap().push(artifact.clone());
        Ok(())
    }
}

/// Terminal fed from a fixed list of input lines.
///
/// The transcript holds every prompt and message in order.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    inputs: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn output(&self) -> String {
        self.transcript.join("\n")
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Terminal for ScriptedTerminal {
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        self.transcript.push(prompt.to_string());
        Ok(self.inputs.pop_front().map(|line| line.trim().to_string()))
    }

    fn say(&mut self, message: &str) -> Result<()> {
        self.transcript.push(message.to_string());
        Ok(())
    }
}
