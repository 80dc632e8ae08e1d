//! The agent gateway.
//!
//! `Agents` turns domain data into model requests and model replies back
//! into domain values. It holds no state beyond the client and model ids.

use super::generator::Generator;
use super::prompts;
use crate::bible::Bible;
use crate::continuity::{self, ContinuityReport};
use crate::scene::AuthorAgent;
use gemini::{InlineData, Modality, Request};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";

/// Errors from an agent call.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Gemini API error: {0}")]
    Api(#[from] gemini::Error),
}

/// The five writing agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Planner,
    Writer,
    Continuity,
    Editor,
    Visualizer,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Planner,
        AgentKind::Writer,
        AgentKind::Continuity,
        AgentKind::Editor,
        AgentKind::Visualizer,
    ];

    /// Upper-case display name, e.g. "PLANNER".
    pub fn label(self) -> &'static str {
        match self {
            AgentKind::Planner => "PLANNER",
            AgentKind::Writer => "WRITER",
            AgentKind::Continuity => "CONTINUITY",
            AgentKind::Editor => "EDITOR",
            AgentKind::Visualizer => "VISUALIZER",
        }
    }

    /// The authorship marker stamped on a scene, if this agent writes one.
    pub fn author(self) -> Option<AuthorAgent> {
        match self {
            AgentKind::Planner => Some(AuthorAgent::Planner),
            AgentKind::Writer => Some(AuthorAgent::Writer),
            AgentKind::Editor => Some(AuthorAgent::Editor),
            AgentKind::Visualizer => Some(AuthorAgent::Visualizer),
            AgentKind::Continuity => None,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentKind::Planner => "planner",
            AgentKind::Writer => "writer",
            AgentKind::Continuity => "continuity",
            AgentKind::Editor => "editor",
            AgentKind::Visualizer => "visualizer",
        })
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" | "plan" => Ok(AgentKind::Planner),
            "writer" | "write" => Ok(AgentKind::Writer),
            "continuity" | "check" => Ok(AgentKind::Continuity),
            "editor" | "edit" => Ok(AgentKind::Editor),
            "visualizer" | "paint" | "visualize" => Ok(AgentKind::Visualizer),
            other => Err(format!("unknown agent '{other}'")),
        }
    }
}

/// Model ids and voice used by the agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentModels {
    pub text: String,
    pub image: String,
    pub speech: String,
    pub voice: String,
}

impl Default for AgentModels {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
            speech: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

impl AgentModels {
    /// The model an agent talks to.
    pub fn for_agent(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::Visualizer => &self.image,
            _ => &self.text,
        }
    }
}

/// The agent gateway.
pub struct Agents<G: Generator> {
    generator: G,
    models: AgentModels,
}

impl<G: Generator> Agents<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            models: AgentModels::default(),
        }
    }

    pub fn with_models(mut self, models: AgentModels) -> Self {
        self.models = models;
        self
    }

    pub fn models(&self) -> &AgentModels {
        &self.models
    }

    /// Produce a beat sheet for a scene idea.
    pub async fn plan(&self, bible: &Bible, idea: &str) -> Result<String, AgentError> {
        let request = Request::prompt(prompts::planner_prompt(bible, idea))
            .with_model(&self.models.text)
            .with_system(prompts::PLANNER_PERSONA)
            .with_temperature(0.7);

        let text = self.generator.generate(request).await?.text();
        Ok(or_sentinel(text))
    }

    /// Draft prose from a beat sheet.
    pub async fn write(
        &self,
        bible: &Bible,
        beat_sheet: &str,
        existing: &str,
    ) -> Result<String, AgentError> {
        let request = Request::prompt(prompts::writer_prompt(bible, beat_sheet, existing))
            .with_model(&self.models.text)
            .with_system(prompts::WRITER_PERSONA)
            .with_temperature(0.8);

        let text = self.generator.generate(request).await?.text();
        Ok(or_sentinel(text))
    }

    /// Look for contradictions between scene text and the bible.
    pub async fn check_continuity(
        &self,
        bible: &Bible,
        scene_text: &str,
    ) -> Result<ContinuityReport, AgentError> {
        let request = Request::prompt(prompts::continuity_prompt(bible, scene_text))
            .with_model(&self.models.text)
            .with_response_mime_type("application/json")
            .with_temperature(0.1);

        let text = self.generator.generate(request).await?.text();
        tracing::debug!(reply = %text, "continuity reply");

        let report = continuity::parse_report(&text);
        if report.unparsed {
            tracing::warn!(reply = %text, "continuity reply could not be parsed");
        }
        Ok(report)
    }

    /// Rewrite text following instructions. An empty reply leaves the text unchanged.
    pub async fn edit(&self, scene_text: &str, instructions: &str) -> Result<String, AgentError> {
        let request = Request::prompt(prompts::editor_prompt(scene_text, instructions))
            .with_model(&self.models.text)
            .with_system(prompts::EDITOR_PERSONA)
            .with_temperature(0.5);

        let text = self.generator.generate(request).await?.text();
        if text.trim().is_empty() {
            Ok(scene_text.to_string())
        } else {
            Ok(text)
        }
    }

    /// Illustrate a scene. Returns a `data:` URI, or `None` if no image came back.
    pub async fn visualize(
        &self,
        bible: &Bible,
        title: &str,
        content: &str,
    ) -> Result<Option<String>, AgentError> {
        let request = Request::prompt(prompts::visualizer_prompt(bible, title, content))
            .with_model(&self.models.image);

        let response = self.generator.generate(request).await?;
        Ok(response.inline_data().map(InlineData::to_data_uri))
    }

    /// Read text aloud. Any failure yields `None`.
    pub async fn synthesize_audio(&self, text: &str) -> Option<InlineData> {
        let request = Request::prompt(prompts::truncate_chars(text, prompts::SPEECH_CHARS))
            .with_model(&self.models.speech)
            .with_response_modalities(vec![Modality::Audio])
            .with_voice(&self.models.voice);

        match self.generator.generate(request).await {
            Ok(response) => response.inline_data().cloned(),
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed");
                None
            }
        }
    }
}

fn or_sentinel(text: String) -> String {
    if text.trim().is_empty() {
        prompts::FAILED_SENTINEL.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn test_plan_request() {
        let model = ScriptedModel::new().with_text("1. Kaito enters the bazaar.");
        let agents = Agents::new(model.clone());

        let plan = agents.plan(&Bible::default(), "A chase").await.unwrap();
        assert_eq!(plan, "1. Kaito enters the bazaar.");

        let request = model.last_request().unwrap();
        assert_eq!(request.model.as_deref(), Some(DEFAULT_TEXT_MODEL));
        assert_eq!(request.system.as_deref(), Some(prompts::PLANNER_PERSONA));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_empty_plan_is_sentinel() {
        let agents = Agents::new(ScriptedModel::new().with_empty());
        let plan = agents.plan(&Bible::default(), "idea").await.unwrap();
        assert_eq!(plan, "Failed.");
    }

    #[tokio::test]
    async fn test_writer_temperature() {
        let model = ScriptedModel::new().with_text("Rain.");
        let agents = Agents::new(model.clone());
        agents.write(&Bible::default(), "1. Rain", "").await.unwrap();
        assert_eq!(model.last_request().unwrap().temperature, Some(0.8));
    }

    #[tokio::test]
    async fn test_edit_empty_reply_is_identity() {
        let agents = Agents::new(ScriptedModel::new().with_empty());
        let edited = agents.edit("The rain fell.", "").await.unwrap();
        assert_eq!(edited, "The rain fell.");
    }

    #[tokio::test]
    async fn test_continuity_request_and_parse() {
        let model = ScriptedModel::new()
            .with_text("```json\n{\"errors\": [{\"type\": \"Character Inconsistency\", \"description\": \"Mori is dead.\"}]}\n```");
        let agents = Agents::new(model.clone());

        let report = agents
            .check_continuity(&Bible::default(), "Mori waved.")
            .await
            .unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.issues[0].is_character_issue());

        let request = model.last_request().unwrap();
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(request.temperature, Some(0.1));
        assert!(request.system.is_none());
    }

    #[tokio::test]
    async fn test_visualize_returns_data_uri() {
        let model = ScriptedModel::new().with_inline("image/png", "iVBORw0K");
        let agents = Agents::new(model.clone());

        let uri = agents
            .visualize(&Bible::default(), "The Glitch", "Neon rain.")
            .await
            .unwrap();
        assert_eq!(uri.as_deref(), Some("data:image/png;base64,iVBORw0K"));
        assert_eq!(
            model.last_request().unwrap().model.as_deref(),
            Some(DEFAULT_IMAGE_MODEL)
        );
    }

    #[tokio::test]
    async fn test_visualize_without_image() {
        let agents = Agents::new(ScriptedModel::new().with_text("I cannot draw that."));
        let uri = agents
            .visualize(&Bible::default(), "T", "C")
            .await
            .unwrap();
        assert!(uri.is_none());
    }

    #[tokio::test]
    async fn test_audio_failure_is_none() {
        let agents = Agents::new(ScriptedModel::new().with_error("boom"));
        assert!(agents.synthesize_audio("Hello").await.is_none());
    }

    #[tokio::test]
    async fn test_audio_request_truncates() {
        let model = ScriptedModel::new().with_inline("audio/L16;rate=24000", "AAAA");
        let agents = Agents::new(model.clone());

        let text = "a".repeat(5000);
        let audio = agents.synthesize_audio(&text).await.unwrap();
        assert_eq!(audio.data, "AAAA");

        let request = model.last_request().unwrap();
        assert_eq!(request.voice.as_deref(), Some(DEFAULT_VOICE));
        assert_eq!(request.response_modalities, vec![Modality::Audio]);
        assert_eq!(request.model.as_deref(), Some(DEFAULT_SPEECH_MODEL));
        match &request.contents[0].parts[0] {
            gemini::Part::Text { text } => assert_eq!(text.len(), 3000),
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[test]
    fn test_agent_kind_parsing() {
        assert_eq!("plan".parse::<AgentKind>(), Ok(AgentKind::Planner));
        assert_eq!("Visualizer".parse::<AgentKind>(), Ok(AgentKind::Visualizer));
        assert!("critic".parse::<AgentKind>().is_err());
        assert_eq!(AgentKind::Continuity.author(), None);
        assert_eq!(AgentKind::Writer.label(), "WRITER");
    }
}
