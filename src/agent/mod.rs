//! Agent loop - classification, extraction, confirmation, execution, refinement
//!
//! The loop is an explicit state machine over a [`Session`]. Each call to
//! [`Agent::step`] does the work of one state and moves to the next, so the
//! whole flow can be driven from tests with scripted collaborators.

pub mod prompt;
pub mod runner;
pub mod session;

pub use prompt::refinement_prompt;
pub use runner::Agent;
pub use session::{AgentState, ExitReason, Session, SessionSummary};
