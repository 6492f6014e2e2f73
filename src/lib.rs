//! codeloop - a human-supervised code generation loop
//!
//! A request goes to a language model; if it asks for code, the first fenced
//! block of the reply is logged, shown to the user, and run only after they
//! approve it. When the user reports that the result is wrong, the model is
//! asked again with the code, the error and the user's description, until the
//! user confirms success or gives up.

pub mod agent;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod intent;
pub mod llm;
pub mod sandbox;
pub mod terminal;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{CodeloopError, Result};
