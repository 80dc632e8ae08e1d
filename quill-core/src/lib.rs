//! Story bible, scenes and AI writing agents.
//!
//! This crate provides:
//! - The story bible (summary, characters, locations) and scenes
//! - Five writing agents backed by Gemini: planner, writer, continuity
//!   checker, editor and visualizer, plus speech synthesis
//! - Persistence of the bible and scenes
//! - `Studio`, the state owner the front ends talk to
//!
//! # Quick Start
//!
//! ```ignore
//! use quill_core::{AgentRequest, QuillConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuillConfig::from_env();
//!     let mut studio = config.studio();
//!     studio.load().await?;
//!
//!     studio
//!         .run_agent(AgentRequest::Plan { idea: "A chase through the bazaar".into() })
//!         .await?;
//!     println!("{}", studio.active_scene().beat_sheet);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod audio;
pub mod bible;
pub mod config;
pub mod continuity;
pub mod notice;
pub mod persist;
pub mod scene;
pub mod studio;
pub mod testing;

// Primary public API
pub use agents::{AgentError, AgentKind, AgentModels, Agents, Generator};
pub use audio::Pcm16;
pub use bible::{Bible, Character, CharacterField, Location, LocationField};
pub use config::QuillConfig;
pub use continuity::{ContinuityIssue, ContinuityReport, Severity};
pub use notice::{Notice, NoticeLevel};
pub use persist::{FileStore, KeyValueStore, MemoryStore, PersistError, StoryStore};
pub use scene::{AuthorAgent, Manuscript, Scene, SceneField};
pub use studio::{AgentRequest, AgentService, AgentStatus, Edit, Studio, StudioError};
pub use testing::{ScriptedModel, TestHarness};
