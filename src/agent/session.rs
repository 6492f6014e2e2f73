//! Session state threaded through the agent's transitions.

use crate::artifact::CodeArtifact;
use crate::sandbox::ExecutionOutcome;

/// Where the agent is in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    AwaitingRequest,
    Classifying,
    Querying,
    Extracting,
    /// Request had no code keyword; reply shown as an answer
    NotCodeTask,
    /// Code request, but the reply held no fenced block; shown as an answer
    NoCodeFound,
    AwaitingConfirmation,
    Executing,
    AwaitingTaskFeedback,
    AwaitingIssueDescription,
    RefinementQuerying,
    RefinementExtracting,
    AwaitingRefinedConfirmation,
    /// Turn given up (declined, no refined code, model failure mid-refinement)
    Abandoned,
    Terminated,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::AwaitingRequest => "awaiting_request",
            AgentState::Classifying => "classifying",
            AgentState::Querying => "querying",
            AgentState::Extracting => "extracting",
            AgentState::NotCodeTask => "not_code_task",
            AgentState::NoCodeFound => "no_code_found",
            AgentState::AwaitingConfirmation => "awaiting_confirmation",
            AgentState::Executing => "executing",
            AgentState::AwaitingTaskFeedback => "awaiting_task_feedback",
            AgentState::AwaitingIssueDescription => "awaiting_issue_description",
            AgentState::RefinementQuerying => "refinement_querying",
            AgentState::RefinementExtracting => "refinement_extracting",
            AgentState::AwaitingRefinedConfirmation => "awaiting_refined_confirmation",
            AgentState::Abandoned => "abandoned",
            AgentState::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// User typed the exit command
    ExitRequested,
    /// Input closed at a prompt
    EndOfInput,
    /// User confirmed the task worked
    TaskSucceeded,
}

/// Counters reported when the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub exit_reason: ExitReason,
    pub turns: u32,
    pub artifacts_generated: u32,
    pub executions: u32,
}

/// Everything one run of the agent knows.
///
/// Holds at most one artifact; a refinement replaces it.
#[derive(Debug, Clone)]
pub struct Session {
    state: AgentState,
    trace: Vec<AgentState>,

    pub request: Option<String>,
    pub is_code_task: bool,
    pub response: Option<String>,
    pub artifact: Option<CodeArtifact>,
    pub outcome: Option<ExecutionOutcome>,
    pub issue: Option<String>,
    pub refinement_prompt: Option<String>,
    pub exit_reason: Option<ExitReason>,

    pub turns: u32,
    pub artifacts_generated: u32,
    pub executions: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: AgentState::AwaitingRequest,
            trace: vec![AgentState::AwaitingRequest],
            request: None,
            is_code_task: false,
            response: None,
            artifact: None,
            outcome: None,
            issue: None,
            refinement_prompt: None,
            exit_reason: None,
            turns: 0,
            artifacts_generated: 0,
            executions: 0,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Every state entered so far, in order, starting with `AwaitingRequest`.
    pub fn trace(&self) -> &[AgentState] {
        &self.trace
    }

    pub fn transition(&mut self, next: AgentState) {
        log::debug!("{} -> {}", self.state, next);
        self.state = next;
        self.trace.push(next);
    }

    /// Start a turn for `request`, dropping whatever the last turn left.
    pub fn begin_turn(&mut self, request: impl Into<String>) {
        self.end_turn();
        self.request = Some(request.into());
        self.turns += 1;
    }

    pub fn end_turn(&mut self) {
        self.request = None;
        self.is_code_task = false;
        self.response = None;
        self.artifact = None;
        self.outcome = None;
        self.issue = None;
        self.refinement_prompt = None;
    }

    /// Make `artifact` the live one; its predecessor and outcome are dropped.
    pub fn replace_artifact(&mut self, artifact: CodeArtifact) {
        self.artifacts_generated += 1;
        self.artifact = Some(artifact);
        self.outcome = None;
    }

    pub fn record_outcome(&mut self, outcome: ExecutionOutcome) {
        self.executions += 1;
        self.outcome = Some(outcome);
    }

    pub fn terminate(&mut self, reason: ExitReason) {
        self.exit_reason = Some(reason);
        self.transition(AgentState::Terminated);
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            exit_reason: self.exit_reason.unwrap_or(ExitReason::EndOfInput),
            turns: self.turns,
            artifacts_generated: self.artifacts_generated,
            executions: self.executions,
        }
    }
}
