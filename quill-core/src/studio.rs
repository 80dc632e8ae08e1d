//! Studio - the single owner of all story state.
//!
//! The studio holds the bible, the scenes and the agent status. Front ends
//! change state through [`Studio::apply`] and ask for agent work through
//! [`Studio::run_agent`]; every change is written back to the store once
//! the initial load has finished.

use crate::agents::{AgentError, AgentKind, AgentModels, Agents, Generator};
use crate::audio::{AudioError, Pcm16};
use crate::bible::{Bible, CharacterField, LocationField};
use crate::continuity::ContinuityReport;
use crate::notice::{Notice, Notices};
use crate::persist::{PersistError, StoryStore};
use crate::scene::{Manuscript, Scene, SceneField};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const UNAVAILABLE_NOTICE: &str = "API Service is unavailable.";
pub const FAILED_NOTICE: &str = "AI Action failed. See log for details.";
pub const UNREADABLE_NOTICE: &str = "Continuity reply could not be read. Try the check again.";
pub const AUTO_CHECK_FAILED_NOTICE: &str =
    "Draft kept, but the continuity check failed. Run it again from the continuity tab.";

/// Errors from studio operations.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Agent service unavailable: {0}")]
    Unavailable(String),

    #[error("An agent is already working")]
    Busy,

    #[error("The active scene has no beat sheet")]
    MissingPlan,

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("The active scene has no image")]
    NoImage,

    #[error("Invalid image data: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether the agents can be reached.
pub enum AgentService<G: Generator> {
    Available(Agents<G>),
    Unavailable { reason: String },
}

impl<G: Generator> AgentService<G> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        AgentService::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AgentService::Available(_))
    }

    pub fn models(&self) -> Option<&AgentModels> {
        match self {
            AgentService::Available(agents) => Some(agents.models()),
            AgentService::Unavailable { .. } => None,
        }
    }
}

/// What the agents are doing right now. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStatus {
    pub is_working: bool,
    pub current_task: Option<String>,
    pub agent_name: Option<String>,
    pub model_name: Option<String>,
}

impl AgentStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn working(
        task: impl Into<String>,
        agent_name: impl Into<String>,
        model: Option<&str>,
    ) -> Self {
        Self {
            is_working: true,
            current_task: Some(task.into()),
            agent_name: Some(agent_name.into()),
            model_name: model.map(String::from),
        }
    }
}

/// A change to the bible or the scenes.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SetSummary(String),
    AddCharacter,
    UpdateCharacter {
        id: String,
        field: CharacterField,
        value: String,
    },
    DeleteCharacter(String),
    AddLocation,
    UpdateLocation {
        id: String,
        field: LocationField,
        value: String,
    },
    DeleteLocation(String),
    AddScene,
    DeleteScene(String),
    SelectScene(String),
    UpdateScene {
        field: SceneField,
        value: String,
    },
}

/// Work for one of the agents, always against the active scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRequest {
    Plan { idea: String },
    Write,
    CheckContinuity,
    Edit { instructions: String },
    Visualize,
}

impl AgentRequest {
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentRequest::Plan { .. } => AgentKind::Planner,
            AgentRequest::Write => AgentKind::Writer,
            AgentRequest::CheckContinuity => AgentKind::Continuity,
            AgentRequest::Edit { .. } => AgentKind::Editor,
            AgentRequest::Visualize => AgentKind::Visualizer,
        }
    }
}

/// The studio.
pub struct Studio<G: Generator> {
    store: StoryStore,
    service: AgentService<G>,
    bible: Bible,
    manuscript: Manuscript,
    status: AgentStatus,
    continuity: Option<ContinuityReport>,
    notices: Notices,
    loaded: bool,
}

impl<G: Generator> Studio<G> {
    /// Create a studio holding the default story. Call [`Studio::load`] next.
    pub fn new(store: StoryStore, service: AgentService<G>) -> Self {
        Self {
            store,
            service,
            bible: Bible::default(),
            manuscript: Manuscript::default(),
            status: AgentStatus::idle(),
            continuity: None,
            notices: Notices::default(),
            loaded: false,
        }
    }

    /// Replace the defaults with whatever the store holds.
    ///
    /// Until this succeeds nothing is written back, so a failed load can
    /// never overwrite saved work with defaults.
    pub async fn load(&mut self) -> Result<(), StudioError> {
        let snapshot = match self.store.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "failed to load saved story");
                self.notices.error("Could not load saved data; changes will not be saved.");
                return Err(e.into());
            }
        };

        if let Some(bible) = snapshot.bible {
            self.bible = bible;
        }
        if let Some(scenes) = snapshot.scenes {
            self.manuscript = Manuscript::from_scenes(scenes);
        }
        self.loaded = true;

        tracing::info!(
            scenes = self.manuscript.len(),
            characters = self.bible.characters.len(),
            "story loaded"
        );
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn bible(&self) -> &Bible {
        &self.bible
    }

    pub fn manuscript(&self) -> &Manuscript {
        &self.manuscript
    }

    pub fn scenes(&self) -> &[Scene] {
        self.manuscript.scenes()
    }

    pub fn active_scene(&self) -> &Scene {
        self.manuscript.active()
    }

    pub fn status(&self) -> &AgentStatus {
        &self.status
    }

    pub fn is_working(&self) -> bool {
        self.status.is_working
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn service(&self) -> &AgentService<G> {
        &self.service
    }

    pub fn has_agents(&self) -> bool {
        self.service.is_available()
    }

    /// Result of the most recent continuity check.
    pub fn continuity(&self) -> Option<&ContinuityReport> {
        self.continuity.as_ref()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.latest()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Apply an edit and persist the result. Returns false when the edit
    /// changed nothing (unknown id, last scene, and so on).
    pub async fn apply(&mut self, edit: Edit) -> bool {
        let persist = !matches!(edit, Edit::SelectScene(_));

        let changed = match edit {
            Edit::SetSummary(summary) => {
                self.bible.summary = summary;
                true
            }
            Edit::AddCharacter => {
                self.bible.add_character();
                true
            }
            Edit::UpdateCharacter { id, field, value } => {
                self.bible.update_character(&id, field, &value)
            }
            Edit::DeleteCharacter(id) => self.bible.delete_character(&id),
            Edit::AddLocation => {
                self.bible.add_location();
                true
            }
            Edit::UpdateLocation { id, field, value } => {
                self.bible.update_location(&id, field, &value)
            }
            Edit::DeleteLocation(id) => self.bible.delete_location(&id),
            Edit::AddScene => {
                self.manuscript.add_scene();
                true
            }
            Edit::DeleteScene(id) => self.manuscript.delete_scene(&id),
            Edit::SelectScene(id) => self.manuscript.select(&id),
            Edit::UpdateScene { field, value } => {
                self.manuscript.update_active(field, &value);
                true
            }
        };

        if changed && persist {
            self.persist().await;
        }
        changed
    }

    /// Move the scene selection by `offset`, wrapping around.
    pub fn select_relative(&mut self, offset: isize) {
        self.manuscript.select_offset(offset);
    }

    async fn persist(&mut self) {
        if !self.loaded {
            return;
        }
        if let Err(e) = self.store.save(&self.bible, self.manuscript.scenes()).await {
            tracing::error!(error = %e, "failed to save story");
            self.notices.error(format!("Save failed: {e}"));
        }
    }

    /// Erase all saved data and return to the default story.
    pub async fn reset(&mut self) -> Result<(), StudioError> {
        self.store.clear().await?;
        self.bible = Bible::default();
        self.manuscript = Manuscript::default();
        self.continuity = None;
        self.notices.success("All data reset.");
        tracing::info!("story reset to defaults");
        Ok(())
    }

    // ========================================================================
    // Agents
    // ========================================================================

    /// Run an agent against the active scene.
    ///
    /// Results land in the scene and in notices; the returned error is for
    /// callers that want to branch on it. The working flag is cleared on
    /// every path.
    pub async fn run_agent(&mut self, request: AgentRequest) -> Result<(), StudioError> {
        let kind = request.kind();

        let model = match &self.service {
            AgentService::Available(agents) => agents.models().for_agent(kind).to_string(),
            AgentService::Unavailable { reason } => {
                let reason = reason.clone();
                tracing::warn!(agent = %kind, %reason, "agent requested without a service");
                self.notices.error(UNAVAILABLE_NOTICE);
                return Err(StudioError::Unavailable(reason));
            }
        };

        if self.status.is_working {
            self.notices.error("An agent is already working.");
            return Err(StudioError::Busy);
        }

        if kind == AgentKind::Writer && self.manuscript.active().beat_sheet.trim().is_empty() {
            self.notices.error("Create a plan first.");
            return Err(StudioError::MissingPlan);
        }

        self.status = AgentStatus::working(kind.to_string(), kind.label(), Some(model.as_str()));
        tracing::info!(agent = %kind, model = %model, scene = %self.manuscript.active_id(), "agent started");

        let result = self.dispatch(request).await;
        self.status = AgentStatus::idle();

        match &result {
            Ok(()) => tracing::info!(agent = %kind, "agent finished"),
            Err(e) => {
                tracing::error!(agent = %kind, error = %e, "agent failed");
                self.notices.error(FAILED_NOTICE);
            }
        }

        self.persist().await;
        result
    }

    async fn dispatch(&mut self, request: AgentRequest) -> Result<(), StudioError> {
        let AgentService::Available(agents) = &self.service else {
            return Err(StudioError::Unavailable("no agent service".to_string()));
        };

        match request {
            AgentRequest::Plan { idea } => {
                let plan = agents.plan(&self.bible, &idea).await?;
                let scene = self.manuscript.active_mut();
                scene.beat_sheet = plan;
                scene.last_agent = AgentKind::Planner.author();
            }
            AgentRequest::Write => {
                let active = self.manuscript.active();
                let draft = agents
                    .write(&self.bible, &active.beat_sheet, &active.content)
                    .await?;

                let scene = self.manuscript.active_mut();
                scene.content = draft.clone();
                scene.last_agent = AgentKind::Writer.author();
                self.notices.success("Draft written! Now checking consistency...");

                self.status = AgentStatus::working(
                    AgentKind::Continuity.to_string(),
                    "AUTO-CHECK",
                    Some(agents.models().text.as_str()),
                );

                // The old report describes the previous draft.
                self.continuity = None;
                match agents.check_continuity(&self.bible, &draft).await {
                    Ok(report) => {
                        if report.unparsed {
                            self.notices.error(UNREADABLE_NOTICE);
                        } else if report.is_empty() {
                            self.notices.success("Perfect! No continuity errors found.");
                        } else {
                            self.notices.error(format!(
                                "Found {} continuity issues. Check the continuity tab.",
                                report.len()
                            ));
                        }
                        self.continuity = Some(report);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "automatic continuity check failed");
                        self.notices.error(AUTO_CHECK_FAILED_NOTICE);
                    }
                }
            }
            AgentRequest::CheckContinuity => {
                let content = &self.manuscript.active().content;
                let report = agents.check_continuity(&self.bible, content).await?;
                if report.unparsed {
                    self.notices.error(UNREADABLE_NOTICE);
                } else if report.is_empty() {
                    self.notices.success("No errors found.");
                } else {
                    self.notices.error(format!("Found {} continuity issues.", report.len()));
                }
                self.continuity = Some(report);
            }
            AgentRequest::Edit { instructions } => {
                let edited = agents
                    .edit(&self.manuscript.active().content, &instructions)
                    .await?;
                let scene = self.manuscript.active_mut();
                scene.content = edited;
                scene.last_agent = AgentKind::Editor.author();
            }
            AgentRequest::Visualize => {
                let active = self.manuscript.active();
                let source = if active.content.is_empty() {
                    &active.beat_sheet
                } else {
                    &active.content
                };
                let image = agents.visualize(&self.bible, &active.title, source).await?;

                match image {
                    Some(uri) => {
                        let scene = self.manuscript.active_mut();
                        scene.image_url = Some(uri);
                        scene.last_agent = AgentKind::Visualizer.author();
                    }
                    None => self.notices.info("The visualizer returned no image."),
                }
            }
        }
        Ok(())
    }

    /// Synthesize speech for the active scene's draft.
    ///
    /// Returns `Ok(None)` when there is nothing to read or the speech model
    /// produced nothing.
    pub async fn read_aloud(&mut self) -> Result<Option<Pcm16>, StudioError> {
        let model = match &self.service {
            AgentService::Available(agents) => agents.models().speech.clone(),
            AgentService::Unavailable { reason } => {
                let reason = reason.clone();
                self.notices.error(UNAVAILABLE_NOTICE);
                return Err(StudioError::Unavailable(reason));
            }
        };

        if self.manuscript.active().content.trim().is_empty() {
            self.notices.info("Nothing to read yet.");
            return Ok(None);
        }

        self.status = AgentStatus::working("audio", "NARRATOR", Some(model.as_str()));
        let audio = match &self.service {
            AgentService::Available(agents) => {
                agents
                    .synthesize_audio(&self.manuscript.active().content)
                    .await
            }
            AgentService::Unavailable { .. } => None,
        };
        self.status = AgentStatus::idle();

        let Some(inline) = audio else {
            self.notices.error("Audio generation failed.");
            return Ok(None);
        };

        match Pcm16::from_inline(&inline) {
            Ok(pcm) if !pcm.is_empty() => Ok(Some(pcm)),
            Ok(_) => {
                self.notices.error("Audio generation failed.");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "speech payload could not be decoded");
                self.notices.error("Audio generation failed.");
                Err(e.into())
            }
        }
    }

    /// Write the active scene's illustration to `path`.
    pub async fn export_image(&mut self, path: impl AsRef<Path>) -> Result<PathBuf, StudioError> {
        let uri = self
            .manuscript
            .active()
            .image_url
            .as_deref()
            .ok_or(StudioError::NoImage)?;
        let inline = gemini::InlineData::from_data_uri(uri)
            .ok_or_else(|| StudioError::Image("not a base64 data URI".to_string()))?;
        let bytes = inline
            .decode()
            .map_err(|e| StudioError::Image(e.to_string()))?;

        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&path, bytes).await?;

        self.notices.success(format!("Image saved to {}", path.display()));
        Ok(path)
    }
}

/// File extension for an image mime type.
pub fn image_extension(uri: &str) -> &'static str {
    let mime = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or("");
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    fn studio(model: ScriptedModel) -> Studio<ScriptedModel> {
        Studio::new(
            StoryStore::in_memory(),
            AgentService::Available(Agents::new(model)),
        )
    }

    #[tokio::test]
    async fn test_status_cleared_after_failure() {
        let mut studio = studio(ScriptedModel::new().with_error("connection reset"));
        studio.load().await.unwrap();

        let result = studio
            .run_agent(AgentRequest::Plan {
                idea: "chase".to_string(),
            })
            .await;

        assert!(matches!(result, Err(StudioError::Agent(_))));
        assert!(!studio.is_working());
        assert_eq!(studio.latest_notice().unwrap().message, FAILED_NOTICE);
        assert_eq!(studio.active_scene().beat_sheet, "");
    }

    #[tokio::test]
    async fn test_writer_requires_plan() {
        let model = ScriptedModel::new().with_text("never used");
        let mut studio = studio(model.clone());
        studio.load().await.unwrap();

        let result = studio.run_agent(AgentRequest::Write).await;
        assert!(matches!(result, Err(StudioError::MissingPlan)));
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_edits_before_load_stay_in_memory() {
        let mut studio = studio(ScriptedModel::new());
        assert!(studio.apply(Edit::AddScene).await);
        assert!(!studio.is_loaded());
        assert_eq!(studio.scenes().len(), 2);
    }

    #[tokio::test]
    async fn test_export_without_image() {
        let mut studio = studio(ScriptedModel::new());
        let dir = tempfile::TempDir::new().unwrap();
        let result = studio.export_image(dir.path().join("x.png")).await;
        assert!(matches!(result, Err(StudioError::NoImage)));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("data:image/jpeg;base64,AAA"), "jpg");
        assert_eq!(image_extension("data:image/png;base64,AAA"), "png");
        assert_eq!(image_extension("garbage"), "png");
    }
}
