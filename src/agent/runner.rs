//! Agent runner - the generate, confirm, execute, refine loop.
//!
//! Every retry is human-initiated: the loop only goes back to the model after
//! the user says the task did not work and describes why.

use colored::Colorize;

use crate::agent::prompt::refinement_prompt;
use crate::agent::session::{AgentState, ExitReason, Session, SessionSummary};
use crate::artifact::{ArtifactSink, CodeArtifact};
use crate::error::{CodeloopError, Result};
use crate::extract::CodeExtractor;
use crate::intent::is_code_task;
use crate::llm::ModelClient;
use crate::sandbox::Sandbox;
use crate::terminal::Terminal;

const REQUEST_PROMPT: &str = "You: ";
const CONFIRM_PROMPT: &str = "Do you want to execute this code? (yes/no): ";
const FEEDBACK_PROMPT: &str = "Was the task successful? (yes/no): ";
const REFINED_FEEDBACK_PROMPT: &str = "Was the refined task successful? (yes/no): ";
const ISSUE_PROMPT: &str = "Please describe what went wrong or what needs fixing: ";

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "yes" | "y")
}

fn is_no(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "no" | "n")
}

/// Drives one interactive session.
pub struct Agent<M, S, A, T>
where
    M: ModelClient,
    S: Sandbox,
    A: ArtifactSink,
    T: Terminal,
{
    model: M,
    sandbox: S,
    sink: A,
    terminal: T,
    extractor: CodeExtractor,
    exit_command: String,
}

impl<M, S, A, T> Agent<M, S, A, T>
where
    M: ModelClient,
    S: Sandbox,
    A: ArtifactSink,
    T: Terminal,
{
    pub fn new(model: M, sandbox: S, sink: A, terminal: T, extractor: CodeExtractor) -> Self {
        Self {
            model,
            sandbox,
            sink,
            terminal,
            extractor,
            exit_command: "exit".to_string(),
        }
    }

    pub fn with_exit_command(mut self, exit_command: impl Into<String>) -> Self {
        self.exit_command = exit_command.into();
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Run until the user exits, input ends, or a task is confirmed working.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        log::info!("Agent session started with model {}", self.model.model());
        self.terminal.say(&format!(
            "{} Type your task (or type '{}' to quit).\n",
            "AI Agent ready.".cyan().bold(),
            self.exit_command
        ))?;

        let mut session = Session::new();
        while !session.state().is_terminal() {
            self.step(&mut session).await?;
        }

        let summary = session.summary();
        log::info!("Agent session ended: {:?}", summary);
        Ok(summary)
    }

    /// Perform the work of the current state and move to the next one.
    pub async fn step(&mut self, session: &mut Session) -> Result<()> {
        match session.state() {
            AgentState::AwaitingRequest => self.await_request(session),
            AgentState::Classifying => {
                let code_task = is_code_task(current_request(session)?);
                session.is_code_task = code_task;
                log::debug!("Request classified as code task: {}", session.is_code_task);
                session.transition(AgentState::Querying);
                Ok(())
            }
            AgentState::Querying => {
                let request = current_request(session)?.to_string();
                match self.model.query(&request).await {
                    Ok(response) => {
                        session.response = Some(response);
                        session.transition(AgentState::Extracting);
                    }
                    Err(e) => {
                        log::warn!("Model query failed: {}", e);
                        self.terminal.say(&format!("{} {}", "Model request failed:".red(), e))?;
                        session.end_turn();
                        session.transition(AgentState::AwaitingRequest);
                    }
                }
                Ok(())
            }
            AgentState::Extracting => self.extract_original(session),
            AgentState::NotCodeTask | AgentState::NoCodeFound => {
                if session.state() == AgentState::NoCodeFound {
                    log::debug!("Code task reply contained no ```{} block", self.extractor.language());
                }
                self.terminal
                    .say(&"This doesn't appear to be a code task. See the response above.".yellow().to_string())?;
                session.end_turn();
                session.transition(AgentState::AwaitingRequest);
                Ok(())
            }
            AgentState::AwaitingConfirmation | AgentState::AwaitingRefinedConfirmation => self.confirm(session),
            AgentState::Executing => self.execute(session).await,
            AgentState::AwaitingTaskFeedback => self.task_feedback(session),
            AgentState::AwaitingIssueDescription => self.issue_description(session),
            AgentState::RefinementQuerying => {
                let prompt = session
                    .refinement_prompt
                    .clone()
                    .ok_or_else(|| CodeloopError::InvalidState("refinement without a prompt".to_string()))?;
                match self.model.query(&prompt).await {
                    Ok(response) => {
                        session.response = Some(response);
                        session.transition(AgentState::RefinementExtracting);
                    }
                    Err(e) => {
                        log::warn!("Refinement query failed: {}", e);
                        self.terminal.say(&format!("{} {}", "Model request failed:".red(), e))?;
                        session.transition(AgentState::Abandoned);
                    }
                }
                Ok(())
            }
            AgentState::RefinementExtracting => self.extract_refined(session),
            AgentState::Abandoned => {
                log::info!("Turn abandoned");
                session.end_turn();
                session.transition(AgentState::AwaitingRequest);
                Ok(())
            }
            AgentState::Terminated => Ok(()),
        }
    }

    fn await_request(&mut self, session: &mut Session) -> Result<()> {
        let Some(line) = self.terminal.prompt(REQUEST_PROMPT)? else {
            return self.end_of_input(session);
        };

        if line.eq_ignore_ascii_case(&self.exit_command) {
            self.terminal.say("Goodbye!")?;
            session.terminate(ExitReason::ExitRequested);
            return Ok(());
        }

        if line.is_empty() {
            return Ok(());
        }

        log::info!("New request: {}", line);
        session.begin_turn(line);
        session.transition(AgentState::Classifying);
        Ok(())
    }

    fn extract_original(&mut self, session: &mut Session) -> Result<()> {
        let response = current_response(session)?.to_string();
        self.terminal
            .say(&format!("\n{}\n{}\n", "AI Response:".cyan().bold(), response))?;

        if !session.is_code_task {
            session.transition(AgentState::NotCodeTask);
            return Ok(());
        }

        match self.extractor.extract(&response) {
            Some(code) => {
                self.record_artifact(session, CodeArtifact::original(code));
                session.transition(AgentState::AwaitingConfirmation);
            }
            None => session.transition(AgentState::NoCodeFound),
        }
        Ok(())
    }

    fn extract_refined(&mut self, session: &mut Session) -> Result<()> {
        let response = current_response(session)?.to_string();

        match self.extractor.extract(&response) {
            Some(code) => {
                let error = session.outcome.as_ref().and_then(|o| o.error.clone());
                let issue = session.issue.clone().unwrap_or_default();
                self.record_artifact(session, CodeArtifact::refined(code, error, issue));
                session.transition(AgentState::AwaitingRefinedConfirmation);
            }
            None => {
                self.terminal
                    .say(&"Couldn't extract code from AI response.".red().to_string())?;
                session.transition(AgentState::Abandoned);
            }
        }
        Ok(())
    }

    /// Log before the artifact becomes live; a failed write only warns.
    fn record_artifact(&mut self, session: &mut Session, artifact: CodeArtifact) {
        if let Err(e) = self.sink.append(&artifact) {
            log::warn!("Failed to log {} artifact: {}", artifact.origin, e);
        }
        session.replace_artifact(artifact);
    }

    fn confirm(&mut self, session: &mut Session) -> Result<()> {
        let refined = session.state() == AgentState::AwaitingRefinedConfirmation;
        let code = current_artifact(session)?.code.clone();

        let heading = if refined {
            "Refined code:"
        } else {
            "AI has generated the following code:"
        };
        self.terminal.say(&format!("\n{}\n\n{}\n", heading.cyan().bold(), code))?;

        let Some(answer) = self.terminal.prompt(CONFIRM_PROMPT)? else {
            return self.end_of_input(session);
        };

        if is_yes(&answer) {
            session.transition(AgentState::Executing);
        } else {
            let message = if refined {
                "Execution cancelled by user."
            } else {
                "Execution skipped."
            };
            self.terminal.say(&message.yellow().to_string())?;
            session.transition(AgentState::Abandoned);
        }
        Ok(())
    }

    async fn execute(&mut self, session: &mut Session) -> Result<()> {
        let code = current_artifact(session)?.code.clone();
        let outcome = self.sandbox.run(&code).await;

        if !outcome.stderr.trim().is_empty() {
            self.terminal.say(outcome.stderr.trim_end())?;
        }
        match &outcome.error {
            None => self.terminal.say(&"Execution finished.".green().to_string())?,
            Some(error) => self
                .terminal
                .say(&format!("{} {}", "Execution failed:".red(), error))?,
        }

        session.record_outcome(outcome);
        session.transition(AgentState::AwaitingTaskFeedback);
        Ok(())
    }

    fn task_feedback(&mut self, session: &mut Session) -> Result<()> {
        let question = if current_artifact(session)?.is_refined() {
            REFINED_FEEDBACK_PROMPT
        } else {
            FEEDBACK_PROMPT
        };

        let Some(answer) = self.terminal.prompt(question)? else {
            return self.end_of_input(session);
        };

        if is_yes(&answer) {
            self.terminal
                .say(&"Task completed successfully. Exiting...".green().bold().to_string())?;
            session.terminate(ExitReason::TaskSucceeded);
        } else if is_no(&answer) {
            session.transition(AgentState::AwaitingIssueDescription);
        } else {
            self.terminal.say("Please answer yes or no.")?;
        }
        Ok(())
    }

    fn issue_description(&mut self, session: &mut Session) -> Result<()> {
        let Some(issue) = self.terminal.prompt(ISSUE_PROMPT)? else {
            return self.end_of_input(session);
        };

        let prompt = refinement_prompt(
            current_artifact(session)?,
            session.outcome.as_ref(),
            &issue,
            self.extractor.language(),
        );
        log::debug!("Refinement prompt:\n{}", prompt);

        session.issue = Some(issue);
        session.refinement_prompt = Some(prompt);
        session.transition(AgentState::RefinementQuerying);
        Ok(())
    }

    fn end_of_input(&mut self, session: &mut Session) -> Result<()> {
        log::info!("Input closed in state {}", session.state());
        self.terminal.say("")?;
        session.terminate(ExitReason::EndOfInput);
        Ok(())
    }
}

fn current_request(session: &Session) -> Result<&str> {
    session
        .request
        .as_deref()
        .ok_or_else(|| CodeloopError::InvalidState(format!("no request in state {}", session.state())))
}

fn current_response(session: &Session) -> Result<&str> {
    session
        .response
        .as_deref()
        .ok_or_else(|| CodeloopError::InvalidState(format!("no model response in state {}", session.state())))
}

fn current_artifact(session: &Session) -> Result<&CodeArtifact> {
    session
        .artifact
        .as_ref()
        .ok_or_else(|| CodeloopError::InvalidState(format!("no artifact in state {}", session.state())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ExecutionOutcome;
    use crate::test_support::{Journal, RecordingSink, ScriptedModel, ScriptedSandbox, ScriptedTerminal};

    type TestAgent = Agent<ScriptedModel, ScriptedSandbox, RecordingSink, ScriptedTerminal>;

    fn agent(model: ScriptedModel, sandbox: ScriptedSandbox, inputs: &[&str]) -> TestAgent {
        Agent::new(
            model,
            sandbox,
            RecordingSink::new(),
            ScriptedTerminal::new(inputs),
            CodeExtractor::default(),
        )
    }

    const HELLO_REPLY: &str = "Here you go:\n```python\nprint(\"hello\")\n```";

    #[test]
    fn test_yes_no_parsing() {
        assert!(is_yes("yes"));
        assert!(is_yes("Y"));
        assert!(is_yes("YES"));
        assert!(!is_yes("yeah"));
        assert!(is_no("no"));
        assert!(is_no("N"));
        assert!(!is_no("nope"));
    }

    #[tokio::test]
    async fn test_exit_command_terminates() {
        let mut agent = agent(ScriptedModel::new(), ScriptedSandbox::new(), &["EXIT"]);
        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::ExitRequested);
        assert_eq!(summary.turns, 0);
        assert!(agent.model().prompts().is_empty());
        assert!(agent.terminal().output().contains("Goodbye!"));
    }

    #[tokio::test]
    async fn test_end_of_input_terminates() {
        let mut agent = agent(ScriptedModel::new(), ScriptedSandbox::new(), &[]);
        let summary = agent.run().await.unwrap();
        assert_eq!(summary.exit_reason, ExitReason::EndOfInput);
    }

    #[tokio::test]
    async fn test_custom_exit_command() {
        let model = ScriptedModel::new().reply("I am not sure what you mean.");
        let mut agent = agent(model, ScriptedSandbox::new(), &["exit", "quit"]).with_exit_command("quit");

        let summary = agent.run().await.unwrap();
        assert_eq!(summary.exit_reason, ExitReason::ExitRequested);
        // "exit" was treated as an ordinary request
        assert_eq!(agent.model().prompts(), vec!["exit".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_request_reprompts_without_query() {
        let mut agent = agent(ScriptedModel::new(), ScriptedSandbox::new(), &["", "   ", "exit"]);
        let summary = agent.run().await.unwrap();

        assert_eq!(summary.turns, 0);
        assert!(agent.model().prompts().is_empty());
    }

    #[tokio::test]
    async fn test_non_code_request_still_queries_model() {
        let model = ScriptedModel::new().reply("Paris. Also:\n```python\nprint('unused')\n```");
        let mut agent = agent(model, ScriptedSandbox::new(), &["what is the capital of France?", "exit"]);

        let mut session = Session::new();
        for _ in 0..5 {
            agent.step(&mut session).await.unwrap();
        }

        assert_eq!(
            session.trace(),
            &[
                AgentState::AwaitingRequest,
                AgentState::Classifying,
                AgentState::Querying,
                AgentState::Extracting,
                AgentState::NotCodeTask,
                AgentState::AwaitingRequest,
            ]
        );
        // No extraction attempted, so nothing logged or executed
        assert!(agent.sink().records().is_empty());
        assert!(agent.sandbox().runs().is_empty());
        assert!(agent.terminal().output().contains("Paris."));
    }

    #[tokio::test]
    async fn test_code_request_without_block_falls_back_to_answer() {
        let model = ScriptedModel::new().reply("I'd write it in a script, but here's prose only.");
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code to sort a list", "exit"]);

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.artifacts_generated, 0);
        assert!(agent.sink().records().is_empty());
        let output = agent.terminal().output();
        assert!(output.contains("prose only"));
        assert!(output.contains("doesn't appear to be a code task"));
    }

    #[tokio::test]
    async fn test_model_failure_ends_turn() {
        let model = ScriptedModel::new().fail("connection reset");
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code", "exit"]);

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::ExitRequested);
        assert_eq!(summary.turns, 1);
        let output = agent.terminal().output();
        assert!(output.contains("Model request failed:"));
        assert!(output.contains("connection reset"));
        assert!(!output.contains("AI Response:"));
    }

    #[tokio::test]
    async fn test_direct_success_terminates_session() {
        let model = ScriptedModel::new().reply(HELLO_REPLY);
        let mut agent = agent(
            model,
            ScriptedSandbox::new(),
            &["write a program that prints hello", "yes", "yes", "never read"],
        );

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::TaskSucceeded);
        assert_eq!(summary.executions, 1);
        assert_eq!(agent.sandbox().runs(), vec!["print(\"hello\")".to_string()]);
        assert_eq!(agent.terminal().remaining_inputs(), 1);
    }

    #[tokio::test]
    async fn test_artifact_logged_before_execution() {
        let journal = Journal::new();
        let model = ScriptedModel::new().reply(HELLO_REPLY);
        let mut agent = Agent::new(
            model,
            ScriptedSandbox::new().with_journal(journal.clone()),
            RecordingSink::new().with_journal(journal.clone()),
            ScriptedTerminal::new(&["write code", "yes", "yes"]),
            CodeExtractor::default(),
        );

        agent.run().await.unwrap();

        assert_eq!(
            journal.entries(),
            vec![
                "logged original: print(\"hello\")".to_string(),
                "executed: print(\"hello\")".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_declined_confirmation_abandons_turn() {
        let model = ScriptedModel::new().reply(HELLO_REPLY);
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code", "no", "exit"]);

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::ExitRequested);
        assert_eq!(summary.executions, 0);
        // Logged even though never run
        assert_eq!(agent.sink().records().len(), 1);
        assert!(agent.terminal().output().contains("Execution skipped."));
    }

    #[tokio::test]
    async fn test_unclear_feedback_reasks() {
        let model = ScriptedModel::new().reply(HELLO_REPLY);
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code", "yes", "maybe", "yes"]);

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::TaskSucceeded);
        assert!(agent.terminal().output().contains("Please answer yes or no."));
        let feedback_prompts = agent
            .terminal()
            .transcript()
            .iter()
            .filter(|line| line.as_str() == FEEDBACK_PROMPT)
            .count();
        assert_eq!(feedback_prompts, 2);
    }

    #[tokio::test]
    async fn test_refinement_prompt_carries_error_and_issue() {
        let model = ScriptedModel::new()
            .reply("```python\n1/0\n```")
            .reply("Fixed:\n```python\nprint(1)\n```");
        let sandbox = ScriptedSandbox::new()
            .outcome(ExecutionOutcome::failure("ZeroDivisionError: division by zero", ""))
            .outcome(ExecutionOutcome::success(""));
        let mut agent = agent(
            model,
            sandbox,
            &["generate a division script", "yes", "no", "it divides by zero", "yes", "yes"],
        );

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::TaskSucceeded);
        assert_eq!(summary.artifacts_generated, 2);
        assert_eq!(summary.executions, 2);

        let prompts = agent.model().prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("ZeroDivisionError: division by zero"));
        assert!(prompts[1].contains("it divides by zero"));
        assert!(prompts[1].contains("1/0"));

        let records = agent.sink().records();
        assert!(records[1].is_refined());
        assert_eq!(records[1].error.as_deref(), Some("ZeroDivisionError: division by zero"));
        assert!(agent.terminal().transcript().contains(&REFINED_FEEDBACK_PROMPT.to_string()));
    }

    #[tokio::test]
    async fn test_refinement_prompt_carries_program_output() {
        let model = ScriptedModel::new()
            .reply("```python\nprint(2)\n```")
            .reply("```python\nprint(3)\n```");
        let sandbox = ScriptedSandbox::new()
            .outcome(ExecutionOutcome::success("").with_stdout("2\n"))
            .outcome(ExecutionOutcome::success("").with_stdout("3\n"));
        let mut agent = agent(
            model,
            sandbox,
            &["write a program that prints three", "yes", "no", "it printed 2", "yes", "yes"],
        );

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::TaskSucceeded);
        let prompts = agent.model().prompts();
        assert!(prompts[1].contains("Its output was:\n2\n"));
        assert!(!prompts[1].contains("failed with error"));
    }

    #[tokio::test]
    async fn test_refinement_without_code_abandons_turn() {
        let model = ScriptedModel::new()
            .reply(HELLO_REPLY)
            .reply("Sorry, I can't help with that.");
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code", "yes", "no", "wrong text", "exit"]);

        let mut session = Session::new();
        while !session.state().is_terminal() {
            agent.step(&mut session).await.unwrap();
        }

        let trace = session.trace();
        let abandoned = trace.iter().position(|s| *s == AgentState::Abandoned).unwrap();
        assert_eq!(trace[abandoned - 1], AgentState::RefinementExtracting);
        assert_eq!(trace[abandoned + 1], AgentState::AwaitingRequest);
        assert_eq!(session.exit_reason, Some(ExitReason::ExitRequested));
        assert!(agent.terminal().output().contains("Couldn't extract code from AI response."));
    }

    #[tokio::test]
    async fn test_refinement_query_failure_abandons_turn() {
        let model = ScriptedModel::new().reply(HELLO_REPLY).fail("503 upstream");
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code", "yes", "no", "nothing printed", "exit"]);

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::ExitRequested);
        assert_eq!(summary.artifacts_generated, 1);
        assert!(agent.terminal().output().contains("503 upstream"));
    }

    #[tokio::test]
    async fn test_declined_refined_code_is_cancelled() {
        let model = ScriptedModel::new()
            .reply(HELLO_REPLY)
            .reply("```python\nprint('hello!')\n```");
        let mut agent = agent(
            model,
            ScriptedSandbox::new(),
            &["write code", "yes", "no", "needs an exclamation", "no", "exit"],
        );

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::ExitRequested);
        assert_eq!(summary.executions, 1);
        assert_eq!(agent.sink().records().len(), 2);
        let output = agent.terminal().output();
        assert!(output.contains("Refined code:"));
        assert!(output.contains("Execution cancelled by user."));
    }

    #[tokio::test]
    async fn test_end_of_input_mid_turn() {
        let model = ScriptedModel::new().reply(HELLO_REPLY);
        let mut agent = agent(model, ScriptedSandbox::new(), &["write code"]);

        let summary = agent.run().await.unwrap();

        assert_eq!(summary.exit_reason, ExitReason::EndOfInput);
        assert_eq!(summary.executions, 0);
    }

    #[tokio::test]
    async fn test_step_when_terminated_is_noop() {
        let mut agent = agent(ScriptedModel::new(), ScriptedSandbox::new(), &[]);
        let mut session = Session::new();
        session.terminate(ExitReason::ExitRequested);
        let before = session.trace().len();

        agent.step(&mut session).await.unwrap();
        assert_eq!(session.trace().len(), before);
    }

    #[tokio::test]
    async fn test_executing_without_artifact_is_invalid_state() {
        let mut agent = agent(ScriptedModel::new(), ScriptedSandbox::new(), &[]);
        let mut session = Session::new();
        session.transition(AgentState::Executing);

        let err = agent.step(&mut session).await.unwrap_err();
        assert!(matches!(err, CodeloopError::InvalidState(_)));
    }
}
