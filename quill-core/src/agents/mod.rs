//! Writing agents.
//!
//! Each agent is one request/response against the generation service:
//! format a prompt from the bible and scene, call the model, read the reply.

mod gateway;
mod generator;
pub mod prompts;

pub use gateway::{AgentError, AgentKind, AgentModels, Agents};
pub use generator::Generator;
