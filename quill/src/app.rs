//! Main application state and logic

use std::collections::VecDeque;
use std::path::PathBuf;

use gemini::Gemini;
use quill_core::studio::image_extension;
use quill_core::{
    AgentKind, AgentRequest, Character, CharacterField, Edit, Generator, Location, LocationField,
    Notice, QuillConfig, SceneField, Studio, StudioError,
};

use crate::playback::Narrator;
use crate::ui::theme::StudioTheme;
use crate::ui::{FocusedPanel, Overlay};

/// Vim-style input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal mode - navigation and hotkeys (default)
    #[default]
    Normal,
    /// Insert mode - editing a field
    Insert,
    /// Command mode - entering : commands
    Command,
}

/// Tabs of the bible panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BibleTab {
    #[default]
    Summary,
    Characters,
    Locations,
    Settings,
}

impl BibleTab {
    pub const ALL: [BibleTab; 4] = [
        BibleTab::Summary,
        BibleTab::Characters,
        BibleTab::Locations,
        BibleTab::Settings,
    ];

    pub fn title(self) -> &'static str {
        match self {
            BibleTab::Summary => "Summary",
            BibleTab::Characters => "Cast",
            BibleTab::Locations => "Places",
            BibleTab::Settings => "Settings",
        }
    }
}

/// Step through a fixed list of tabs, wrapping around.
fn step<T: Copy + PartialEq>(all: &[T], current: T, offset: isize) -> T {
    let len = all.len() as isize;
    let index = all.iter().position(|t| *t == current).unwrap_or(0) as isize;
    all[(index + offset).rem_euclid(len) as usize]
}

/// What the input buffer is editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Summary,
    Character { id: String, field: CharacterField },
    Location { id: String, field: LocationField },
    Scene(SceneField),
    PlanIdea,
    EditInstructions,
}

impl EditTarget {
    pub fn label(&self) -> String {
        match self {
            EditTarget::Summary => "Story summary".to_string(),
            EditTarget::Character { field, .. } => format!("Character {field}"),
            EditTarget::Location { field, .. } => format!("Location {field}"),
            EditTarget::Scene(SceneField::Title) => "Scene title".to_string(),
            EditTarget::Scene(SceneField::BeatSheet) => "Beat sheet".to_string(),
            EditTarget::Scene(SceneField::Content) => "Draft".to_string(),
            EditTarget::PlanIdea => "Scene idea".to_string(),
            EditTarget::EditInstructions => "Editor instructions".to_string(),
        }
    }

    /// Multi-line targets take Enter as a newline and commit on Esc.
    pub fn is_multiline(&self) -> bool {
        matches!(
            self,
            EditTarget::Summary
                | EditTarget::Character {
                    field: CharacterField::Description,
                    ..
                }
                | EditTarget::Location {
                    field: LocationField::Description,
                    ..
                }
                | EditTarget::Scene(SceneField::BeatSheet | SceneField::Content)
        )
    }
}

/// Deletions and resets wait for a yes/no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    DeleteCharacter { id: String, name: String },
    DeleteLocation { id: String, name: String },
    DeleteScene { id: String, title: String },
    Reset,
}

impl Confirm {
    pub fn prompt(&self) -> String {
        match self {
            Confirm::DeleteCharacter { name, .. } => format!("Delete character \"{name}\"?"),
            Confirm::DeleteLocation { name, .. } => format!("Delete location \"{name}\"?"),
            Confirm::DeleteScene { title, .. } => format!("Delete scene \"{title}\"?"),
            Confirm::Reset => "Erase the bible and every scene?".to_string(),
        }
    }

    fn into_op(self) -> PendingOp {
        match self {
            Confirm::DeleteCharacter { id, .. } => PendingOp::Apply(Edit::DeleteCharacter(id)),
            Confirm::DeleteLocation { id, .. } => PendingOp::Apply(Edit::DeleteLocation(id)),
            Confirm::DeleteScene { id, .. } => PendingOp::Apply(Edit::DeleteScene(id)),
            Confirm::Reset => PendingOp::Reset,
        }
    }
}

/// Work the event loop awaits between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    Apply(Edit),
    Agent(AgentRequest),
    ReadAloud,
    ExportImage(Option<PathBuf>),
    Reset,
}

impl PendingOp {
    /// Status shown while a slow operation runs. `None` for quick ones.
    pub fn working_label(&self) -> Option<String> {
        match self {
            PendingOp::Agent(request) => Some(format!("{} is working...", request.kind().label())),
            PendingOp::ReadAloud => Some("NARRATOR is working...".to_string()),
            _ => None,
        }
    }
}

/// Main application state
pub struct App<G: Generator = Gemini> {
    pub studio: Studio<G>,

    // UI state
    pub theme: StudioTheme,
    pub focused_panel: FocusedPanel,
    pub bible_tab: BibleTab,
    pub agent_tab: AgentKind,
    overlay: Option<Overlay>,

    // Selection
    pub character_cursor: usize,
    pub location_cursor: usize,
    pub scene_field: SceneField,
    pub editor_scroll: u16,

    // Input state
    pub input_mode: InputMode,
    input_buffer: String,
    cursor_position: usize,
    edit_target: Option<EditTarget>,

    // Agent inputs
    pub plan_idea: String,
    pub edit_instructions: String,

    // Work for the event loop
    pending: VecDeque<PendingOp>,
    narrator: Narrator,

    // Status
    status_message: Option<String>,
    notice: Option<Notice>,
    pub should_quit: bool,

    // Paths
    data_dir: PathBuf,
    export_dir: PathBuf,
}

impl<G: Generator> App<G> {
    pub fn new(studio: Studio<G>, config: &QuillConfig) -> Self {
        let mut app = Self {
            studio,
            theme: StudioTheme::default(),
            focused_panel: FocusedPanel::default(),
            bible_tab: BibleTab::default(),
            agent_tab: AgentKind::Planner,
            overlay: None,
            character_cursor: 0,
            location_cursor: 0,
            scene_field: SceneField::Content,
            editor_scroll: 0,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            edit_target: None,
            plan_idea: String::new(),
            edit_instructions: String::new(),
            pending: VecDeque::new(),
            narrator: Narrator::new(),
            status_message: None,
            notice: None,
            should_quit: false,
            data_dir: config.data_dir.clone(),
            export_dir: config.export_dir(),
        };
        app.collect_notices();
        if !app.studio.has_agents() {
            app.set_status("No API key found. Set GEMINI_API_KEY to enable the agents.");
        } else {
            app.set_status("Press '?' for help, Tab to switch panels, 'i' to edit");
        }
        app
    }

    // =========================================================================
    // Focus and tabs
    // =========================================================================

    /// Cycle to next focused panel
    pub fn cycle_focus(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Bible => FocusedPanel::Editor,
            FocusedPanel::Editor => FocusedPanel::Agents,
            FocusedPanel::Agents => FocusedPanel::Bible,
        };
    }

    /// Cycle to previous focused panel
    pub fn cycle_focus_reverse(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Bible => FocusedPanel::Agents,
            FocusedPanel::Agents => FocusedPanel::Editor,
            FocusedPanel::Editor => FocusedPanel::Bible,
        };
    }

    /// Next tab in the focused panel. In the editor this moves between scenes.
    pub fn next_tab(&mut self) {
        self.shift_tab(1);
    }

    pub fn prev_tab(&mut self) {
        self.shift_tab(-1);
    }

    fn shift_tab(&mut self, offset: isize) {
        match self.focused_panel {
            FocusedPanel::Bible => self.bible_tab = step(&BibleTab::ALL, self.bible_tab, offset),
            FocusedPanel::Editor => self.select_scene_offset(offset),
            FocusedPanel::Agents => self.agent_tab = step(&AgentKind::ALL, self.agent_tab, offset),
        }
    }

    pub fn select_scene_offset(&mut self, offset: isize) {
        self.studio.select_relative(offset);
        self.editor_scroll = 0;
    }

    /// Move the selection down within the focused panel
    pub fn move_down(&mut self) {
        self.move_selection(1);
    }

    /// Move the selection up within the focused panel
    pub fn move_up(&mut self) {
        self.move_selection(-1);
    }

    fn move_selection(&mut self, offset: isize) {
        match (self.focused_panel, self.bible_tab) {
            (FocusedPanel::Bible, BibleTab::Characters) => {
                let rows = self.studio.bible().characters.len() * CharacterField::ALL.len();
                self.character_cursor = offset_within(self.character_cursor, offset, rows);
            }
            (FocusedPanel::Bible, BibleTab::Locations) => {
                let rows = self.studio.bible().locations.len() * LocationField::ALL.len();
                self.location_cursor = offset_within(self.location_cursor, offset, rows);
            }
            (FocusedPanel::Editor, _) => {
                const FIELDS: [SceneField; 3] =
                    [SceneField::Title, SceneField::BeatSheet, SceneField::Content];
                let index = FIELDS.iter().position(|f| *f == self.scene_field).unwrap_or(2);
                self.scene_field = FIELDS[offset_within(index, offset, FIELDS.len())];
            }
            _ => {}
        }
    }

    /// Scroll the editor text
    pub fn scroll_editor(&mut self, lines: i32) {
        self.editor_scroll = (self.editor_scroll as i32 + lines).max(0) as u16;
    }

    /// The character and field under the cursor
    pub fn selected_character(&self) -> Option<(&Character, CharacterField)> {
        let per = CharacterField::ALL.len();
        let character = self.studio.bible().characters.get(self.character_cursor / per)?;
        Some((character, CharacterField::ALL[self.character_cursor % per]))
    }

    /// The location and field under the cursor
    pub fn selected_location(&self) -> Option<(&Location, LocationField)> {
        let per = LocationField::ALL.len();
        let location = self.studio.bible().locations.get(self.location_cursor / per)?;
        Some((location, LocationField::ALL[self.location_cursor % per]))
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Enter insert mode on whatever is selected in the focused panel
    pub fn begin_edit(&mut self) {
        let target = match self.focused_panel {
            FocusedPanel::Bible => match self.bible_tab {
                BibleTab::Summary => Some(EditTarget::Summary),
                BibleTab::Characters => match self.selected_character() {
                    Some((c, field)) => Some(EditTarget::Character {
                        id: c.id.clone(),
                        field,
                    }),
                    None => {
                        self.set_status("No characters yet. Press 'a' to add one.");
                        None
                    }
                },
                BibleTab::Locations => match self.selected_location() {
                    Some((l, field)) => Some(EditTarget::Location {
                        id: l.id.clone(),
                        field,
                    }),
                    None => {
                        self.set_status("No locations yet. Press 'a' to add one.");
                        None
                    }
                },
                BibleTab::Settings => {
                    self.set_status("Nothing to edit here. Press 'R' to reset all data.");
                    None
                }
            },
            FocusedPanel::Editor => Some(EditTarget::Scene(self.scene_field)),
            FocusedPanel::Agents => match self.agent_tab {
                AgentKind::Planner => Some(EditTarget::PlanIdea),
                AgentKind::Editor => Some(EditTarget::EditInstructions),
                kind => {
                    self.set_status(format!("Press Enter to run the {} agent", kind.label()));
                    None
                }
            },
        };

        if let Some(target) = target {
            self.start_editing(target);
        }
    }

    /// Start editing a specific target, prefilled with its current value
    pub fn start_editing(&mut self, target: EditTarget) {
        let current = self.current_value(&target);
        self.set_input(current);
        self.input_mode = InputMode::Insert;
        let hint = if target.is_multiline() {
            "Esc to save"
        } else {
            "Enter to save"
        };
        self.set_status(format!("Editing {} ({hint})", target.label().to_lowercase()));
        self.edit_target = Some(target);
    }

    fn current_value(&self, target: &EditTarget) -> String {
        let bible = self.studio.bible();
        match target {
            EditTarget::Summary => bible.summary.clone(),
            EditTarget::Character { id, field } => bible
                .character(id)
                .map(|c| c.get(*field))
                .unwrap_or_default(),
            EditTarget::Location { id, field } => bible
                .location(id)
                .map(|l| l.get(*field))
                .unwrap_or_default(),
            EditTarget::Scene(field) => self.studio.active_scene().get(*field).to_string(),
            EditTarget::PlanIdea => self.plan_idea.clone(),
            EditTarget::EditInstructions => self.edit_instructions.clone(),
        }
    }

    /// Leave insert mode, keeping the text. Agent inputs are stored, not run.
    pub fn finish_edit(&mut self) {
        self.commit_edit(false);
    }

    /// Enter in insert mode: newline for multi-line targets, otherwise commit.
    /// Agent inputs run their agent.
    pub fn submit_edit(&mut self) {
        match &self.edit_target {
            Some(target) if target.is_multiline() => self.type_char('\n'),
            _ => self.commit_edit(true),
        }
    }

    fn commit_edit(&mut self, run: bool) {
        let text = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;
        self.input_mode = InputMode::Normal;
        self.clear_status();

        let Some(target) = self.edit_target.take() else {
            return;
        };

        match target {
            EditTarget::Summary => self.queue(PendingOp::Apply(Edit::SetSummary(text))),
            EditTarget::Character { id, field } => self.queue(PendingOp::Apply(
                Edit::UpdateCharacter {
                    id,
                    field,
                    value: text,
                },
            )),
            EditTarget::Location { id, field } => self.queue(PendingOp::Apply(
                Edit::UpdateLocation {
                    id,
                    field,
                    value: text,
                },
            )),
            EditTarget::Scene(field) => {
                self.queue(PendingOp::Apply(Edit::UpdateScene { field, value: text }))
            }
            EditTarget::PlanIdea => {
                self.plan_idea = text;
                if run {
                    self.run_agent(AgentKind::Planner);
                }
            }
            EditTarget::EditInstructions => {
                self.edit_instructions = text;
                if run {
                    self.run_agent(AgentKind::Editor);
                }
            }
        }
    }

    pub fn edit_target(&self) -> Option<&EditTarget> {
        self.edit_target.as_ref()
    }

    /// Add an item in the focused context
    pub fn add_item(&mut self) {
        match (self.focused_panel, self.bible_tab) {
            (FocusedPanel::Bible, BibleTab::Characters) => {
                self.queue(PendingOp::Apply(Edit::AddCharacter))
            }
            (FocusedPanel::Bible, BibleTab::Locations) => {
                self.queue(PendingOp::Apply(Edit::AddLocation))
            }
            (FocusedPanel::Bible, _) => {
                self.set_status("Switch to the Cast or Places tab to add entries")
            }
            _ => self.queue(PendingOp::Apply(Edit::AddScene)),
        }
    }

    /// Ask to delete the selected item in the focused context
    pub fn request_delete(&mut self) {
        let confirm = match (self.focused_panel, self.bible_tab) {
            (FocusedPanel::Bible, BibleTab::Characters) => {
                self.selected_character()
                    .map(|(c, _)| Confirm::DeleteCharacter {
                        id: c.id.clone(),
                        name: c.name.clone(),
                    })
            }
            (FocusedPanel::Bible, BibleTab::Locations) => {
                self.selected_location()
                    .map(|(l, _)| Confirm::DeleteLocation {
                        id: l.id.clone(),
                        name: l.name.clone(),
                    })
            }
            (FocusedPanel::Bible, _) => None,
            _ => self.scene_deletion(),
        };

        if let Some(confirm) = confirm {
            self.overlay = Some(Overlay::Confirm(confirm));
        }
    }

    fn scene_deletion(&mut self) -> Option<Confirm> {
        if self.studio.scenes().len() <= 1 {
            self.set_status("Cannot delete the last scene");
            return None;
        }
        let scene = self.studio.active_scene();
        Some(Confirm::DeleteScene {
            id: scene.id.clone(),
            title: scene.title.clone(),
        })
    }

    pub fn request_reset(&mut self) {
        self.overlay = Some(Overlay::Confirm(Confirm::Reset));
    }

    /// Answer the open confirmation dialog
    pub fn confirm(&mut self, yes: bool) {
        if let Some(Overlay::Confirm(confirm)) = self.overlay.take() {
            if yes {
                self.queue(confirm.into_op());
            } else {
                self.set_status("Cancelled");
            }
        }
    }

    // =========================================================================
    // Agents
    // =========================================================================

    /// Run the agent on the current agent tab
    pub fn run_selected_agent(&mut self) {
        self.run_agent(self.agent_tab);
    }

    /// Queue an agent run. Agents that need input open it first.
    pub fn run_agent(&mut self, kind: AgentKind) {
        self.agent_tab = kind;
        let request = match kind {
            AgentKind::Planner => {
                if self.plan_idea.trim().is_empty() {
                    self.focused_panel = FocusedPanel::Agents;
                    self.start_editing(EditTarget::PlanIdea);
                    return;
                }
                AgentRequest::Plan {
                    idea: self.plan_idea.clone(),
                }
            }
            AgentKind::Writer => AgentRequest::Write,
            AgentKind::Continuity => AgentRequest::CheckContinuity,
            AgentKind::Editor => {
                if self.edit_instructions.trim().is_empty() {
                    self.focused_panel = FocusedPanel::Agents;
                    self.start_editing(EditTarget::EditInstructions);
                    return;
                }
                AgentRequest::Edit {
                    instructions: self.edit_instructions.clone(),
                }
            }
            AgentKind::Visualizer => AgentRequest::Visualize,
        };
        self.queue(PendingOp::Agent(request));
    }

    // =========================================================================
    // Pending work
    // =========================================================================

    pub fn queue(&mut self, op: PendingOp) {
        self.pending.push_back(op);
    }

    pub fn take_pending(&mut self) -> Option<PendingOp> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Await one operation against the studio and pick up its notices
    pub async fn perform(&mut self, op: PendingOp) {
        match op {
            PendingOp::Apply(edit) => self.apply(edit).await,
            PendingOp::Agent(request) => {
                let kind = request.kind();
                match self.studio.run_agent(request).await {
                    Ok(()) => {
                        self.clear_status();
                        if kind == AgentKind::Writer {
                            // The writer runs a continuity check on its draft.
                            self.agent_tab = AgentKind::Continuity;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(agent = %kind, error = %e, "agent run did not complete");
                        self.set_status(format!("{} stopped: {e}", kind.label()));
                    }
                }
            }
            PendingOp::ReadAloud => self.read_aloud().await,
            PendingOp::ExportImage(path) => self.export_image(path).await,
            PendingOp::Reset => {
                match self.studio.reset().await {
                    Ok(()) => {
                        self.character_cursor = 0;
                        self.location_cursor = 0;
                        self.editor_scroll = 0;
                        self.plan_idea.clear();
                        self.edit_instructions.clear();
                        self.clear_status();
                    }
                    Err(e) => self.set_status(format!("Reset failed: {e}")),
                }
            }
        }
        self.collect_notices();
    }

    async fn apply(&mut self, edit: Edit) {
        let select_new = match &edit {
            Edit::AddCharacter => Some(BibleTab::Characters),
            Edit::AddLocation => Some(BibleTab::Locations),
            _ => None,
        };
        let scene_change = matches!(edit, Edit::AddScene | Edit::DeleteScene(_));

        if !self.studio.apply(edit).await {
            return;
        }

        let bible = self.studio.bible();
        match select_new {
            Some(BibleTab::Characters) => {
                self.character_cursor =
                    bible.characters.len().saturating_sub(1) * CharacterField::ALL.len();
            }
            Some(BibleTab::Locations) => {
                self.location_cursor =
                    bible.locations.len().saturating_sub(1) * LocationField::ALL.len();
            }
            _ => {}
        }
        if scene_change {
            self.editor_scroll = 0;
        }
        self.clamp_cursors();
    }

    async fn read_aloud(&mut self) {
        match self.studio.read_aloud().await {
            Ok(Some(pcm)) => match self.narrator.play(&pcm) {
                Ok(()) => self.set_status(format!(
                    "Playing narration ({:.1}s). :stop to silence it",
                    pcm.duration().as_secs_f32()
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "audio playback failed");
                    self.set_status(format!("Playback failed: {e}"));
                }
            },
            Ok(None) => self.clear_status(),
            Err(e) => {
                tracing::debug!(error = %e, "read aloud did not complete");
                self.clear_status();
            }
        }
    }

    /// Silence the narration, if any.
    pub fn stop_narration(&mut self) {
        if self.narrator.stop() {
            self.set_status("Narration stopped");
        } else {
            self.set_status("Nothing is playing");
        }
    }

    async fn export_image(&mut self, path: Option<PathBuf>) {
        let path = path.unwrap_or_else(|| self.default_export_path());
        match self.studio.export_image(&path).await {
            Ok(_) => self.clear_status(),
            Err(StudioError::NoImage) => {
                self.set_status("This scene has no image yet. Run the visualizer first.")
            }
            Err(e) => self.set_status(format!("Export failed: {e}")),
        }
    }

    /// `<data dir>/exports/<scene id>.<ext>`
    pub fn default_export_path(&self) -> PathBuf {
        let scene = self.studio.active_scene();
        let ext = scene
            .image_url
            .as_deref()
            .map(image_extension)
            .unwrap_or("png");
        let stem: String = scene
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.export_dir.join(format!("{stem}.{ext}"))
    }

    fn clamp_cursors(&mut self) {
        let bible = self.studio.bible();
        let char_rows = bible.characters.len() * CharacterField::ALL.len();
        let loc_rows = bible.locations.len() * LocationField::ALL.len();
        self.character_cursor = self.character_cursor.min(char_rows.saturating_sub(1));
        self.location_cursor = self.location_cursor.min(loc_rows.saturating_sub(1));
    }

    fn collect_notices(&mut self) {
        if let Some(latest) = self.studio.drain_notices().pop() {
            self.notice = Some(latest);
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Process a colon command. Returns whether it was recognized.
    pub fn process_command(&mut self, command: &str) -> bool {
        let cmd = command.trim().trim_start_matches(':');
        let (name, rest) = match cmd.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (cmd, ""),
        };

        match name {
            "" => return false,
            "q" | "quit" | "exit" => self.should_quit = true,
            "help" | "h" => self.toggle_help(),
            "w" => self.set_status("Changes are saved automatically"),
            "plan" => {
                if !rest.is_empty() {
                    self.plan_idea = rest.to_string();
                }
                self.run_agent(AgentKind::Planner);
            }
            "write" | "draft" => self.run_agent(AgentKind::Writer),
            "check" => self.run_agent(AgentKind::Continuity),
            "edit" => {
                if !rest.is_empty() {
                    self.edit_instructions = rest.to_string();
                }
                self.run_agent(AgentKind::Editor);
            }
            "paint" | "visualize" => self.run_agent(AgentKind::Visualizer),
            "read" | "speak" => self.queue(PendingOp::ReadAloud),
            "stop" | "hush" => self.stop_narration(),
            "export" => {
                let path = (!rest.is_empty()).then(|| PathBuf::from(rest));
                self.queue(PendingOp::ExportImage(path));
            }
            "new" => self.queue(PendingOp::Apply(Edit::AddScene)),
            "del" | "delete" => {
                if let Some(confirm) = self.scene_deletion() {
                    self.overlay = Some(Overlay::Confirm(confirm));
                }
            }
            "next" | "bn" => self.select_scene_offset(1),
            "prev" | "bp" => self.select_scene_offset(-1),
            "scene" => match rest.parse::<usize>() {
                Ok(n) if n >= 1 && n <= self.studio.scenes().len() => {
                    let id = self.studio.scenes()[n - 1].id.clone();
                    self.queue(PendingOp::Apply(Edit::SelectScene(id)));
                    self.editor_scroll = 0;
                }
                _ => self.set_status(format!(
                    "Usage: :scene <1-{}>",
                    self.studio.scenes().len()
                )),
            },
            "title" => {
                if rest.is_empty() {
                    self.set_status("Usage: :title <text>");
                } else {
                    self.queue(PendingOp::Apply(Edit::UpdateScene {
                        field: SceneField::Title,
                        value: rest.to_string(),
                    }));
                }
            }
            "reset" => self.request_reset(),
            other => {
                self.set_status(format!("Unknown command: {other}"));
                return false;
            }
        }
        true
    }

    // =========================================================================
    // Input buffer
    // =========================================================================

    /// Enter command mode (starts with :)
    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer.clear();
        self.input_buffer.push(':');
        self.cursor_position = 1;
    }

    /// Exit command mode without running anything
    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.input_buffer.starts_with(':') {
            self.clear_input();
        }
    }

    /// Take the command line and return to normal mode
    pub fn submit_command(&mut self) -> String {
        let command = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;
        self.input_mode = InputMode::Normal;
        command
    }

    /// Handle a typed character (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self.byte_index(self.cursor_position);
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Handle delete (unicode-safe)
    pub fn delete(&mut self) {
        if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position) {
            self.input_buffer
                .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
        }
    }

    /// Move cursor left
    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right
    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    /// Move cursor to the start of the current line
    pub fn cursor_home(&mut self) {
        let (line_start, _) = self.line_bounds(self.cursor_position);
        self.cursor_position = line_start;
    }

    /// Move cursor to the end of the current line
    pub fn cursor_end(&mut self) {
        let (_, line_end) = self.line_bounds(self.cursor_position);
        self.cursor_position = line_end;
    }

    /// Move cursor to the same column on the previous line
    pub fn cursor_up(&mut self) {
        let (start, _) = self.line_bounds(self.cursor_position);
        if start == 0 {
            self.cursor_position = 0;
            return;
        }
        let column = self.cursor_position - start;
        let (prev_start, prev_end) = self.line_bounds(start - 1);
        self.cursor_position = (prev_start + column).min(prev_end);
    }

    /// Move cursor to the same column on the next line
    pub fn cursor_down(&mut self) {
        let (start, end) = self.line_bounds(self.cursor_position);
        let char_count = self.input_buffer.chars().count();
        if end >= char_count {
            self.cursor_position = char_count;
            return;
        }
        let column = self.cursor_position - start;
        let (next_start, next_end) = self.line_bounds(end + 1);
        self.cursor_position = (next_start + column).min(next_end);
    }

    /// Character range `[start, end)` of the line containing `pos`.
    fn line_bounds(&self, pos: usize) -> (usize, usize) {
        let chars: Vec<char> = self.input_buffer.chars().collect();
        let pos = pos.min(chars.len());
        let start = chars[..pos]
            .iter()
            .rposition(|c| *c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let end = chars[pos..]
            .iter()
            .position(|c| *c == '\n')
            .map(|i| pos + i)
            .unwrap_or(chars.len());
        (start, end)
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input_buffer
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len())
    }

    /// Set input buffer content and move cursor to end (unicode-safe)
    pub fn set_input(&mut self, content: impl Into<String>) {
        self.input_buffer = content.into();
        self.cursor_position = self.input_buffer.chars().count();
    }

    /// Clear the input buffer
    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    /// Get the current input buffer
    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    /// Get the current cursor position
    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    // =========================================================================
    // Overlays and status
    // =========================================================================

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        if matches!(self.overlay, Some(Overlay::Help)) {
            self.overlay = None;
        } else {
            self.overlay = Some(Overlay::Help);
        }
    }

    /// Close any open overlay
    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    /// Get the current overlay
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Check if an overlay is currently open
    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Set status message (always overwrites)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Get the current status message
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// The most recent studio notice
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }
}

/// Move `index` by `offset` within `0..len`, clamped.
fn offset_within(index: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as isize + offset).clamp(0, len as isize - 1) as usize
}
