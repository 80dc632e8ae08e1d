//! Headless mode for the writing studio.
//!
//! This module provides a simple text-based interface for running the studio
//! without a TUI. It's designed for scripted use and automated testing.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use quill_core::{
    AgentRequest, CharacterField, ContinuityReport, Edit, Generator, LocationField, SceneField,
    Studio, StudioError,
};

/// Default narration file, inside the export directory.
pub const NARRATION_FILE: &str = "narration.wav";

const HELP: &[&str] = &[
    "  #plan <idea>                 - Plan the active scene",
    "  #write                       - Draft the active scene (checks continuity after)",
    "  #check                       - Check the draft against the bible",
    "  #edit <instructions>         - Rewrite the draft",
    "  #paint                       - Illustrate the active scene",
    "  #read [path]                 - Narrate the draft into a WAV file",
    "  #export [path]               - Save the scene image",
    "  #scenes                      - List scenes",
    "  #show                        - Show the active scene",
    "  #new                         - Add a scene",
    "  #del [n]                     - Delete a scene (default: active)",
    "  #select <n>                  - Make scene n active",
    "  #set <title|plan|draft> <text> - Set a scene field (\\n for newlines)",
    "  #summary <text>              - Set the story summary",
    "  #char add | set <id> <field> <value> | del <id>",
    "  #loc add | set <id> <field> <value> | del <id>",
    "  #bible                       - Show the story bible",
    "  #status                      - Show agent service and scene status",
    "  #reset                       - Erase all data",
    "  #help                        - Show this help",
    "  #quit                        - Exit",
    "  (anything else is appended to the draft)",
];

/// Whether the session should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A headless session over a loaded studio.
pub struct HeadlessSession<G: Generator> {
    studio: Studio<G>,
    export_dir: PathBuf,
}

impl<G: Generator> HeadlessSession<G> {
    pub fn new(studio: Studio<G>, export_dir: PathBuf) -> Self {
        Self { studio, export_dir }
    }

    pub fn studio(&self) -> &Studio<G> {
        &self.studio
    }

    /// Print the banner shown on startup.
    pub fn print_banner(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "=== Quill Headless Mode ===")?;
        self.print_status(out)?;
        writeln!(out)?;
        writeln!(out, "Commands:")?;
        for line in HELP {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        Ok(())
    }

    /// Handle one line of input, writing results to `out`.
    pub async fn handle_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let flow = match line.strip_prefix('#') {
            Some(command) => self.handle_command(command, out).await?,
            None => {
                self.append_paragraph(line).await;
                writeln!(
                    out,
                    "[DRAFT] {} words",
                    self.studio.active_scene().word_count()
                )?;
                Flow::Continue
            }
        };

        for notice in self.studio.drain_notices() {
            writeln!(out, "{notice}")?;
        }
        out.flush()?;
        Ok(flow)
    }

    async fn handle_command(&mut self, command: &str, out: &mut impl Write) -> io::Result<Flow> {
        let (name, rest) = match command.trim().split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command.trim(), ""),
        };

        match name {
            "quit" | "exit" => {
                writeln!(out, "Goodbye!")?;
                return Ok(Flow::Quit);
            }
            "help" => {
                writeln!(out, "[HELP]")?;
                for line in HELP {
                    writeln!(out, "{line}")?;
                }
            }
            "status" => self.print_status(out)?,
            "bible" => self.print_bible(out)?,
            "scenes" => self.print_scenes(out)?,
            "show" => self.print_scene(out)?,

            // Agents
            "plan" => {
                if rest.is_empty() {
                    writeln!(out, "[ERROR] Usage: #plan <idea>")?;
                } else {
                    let request = AgentRequest::Plan {
                        idea: rest.to_string(),
                    };
                    if self.run(request, out).await? {
                        writeln!(out, "[PLAN]")?;
                        writeln!(out, "{}", self.studio.active_scene().beat_sheet)?;
                    }
                }
            }
            "write" => {
                if self.run(AgentRequest::Write, out).await? {
                    writeln!(out, "[DRAFT]")?;
                    writeln!(out, "{}", self.studio.active_scene().content)?;
                    self.print_report(out)?;
                }
            }
            "check" => {
                if self.run(AgentRequest::CheckContinuity, out).await? {
                    self.print_report(out)?;
                }
            }
            "edit" => {
                if rest.is_empty() {
                    writeln!(out, "[ERROR] Usage: #edit <instructions>")?;
                } else {
                    let request = AgentRequest::Edit {
                        instructions: rest.to_string(),
                    };
                    if self.run(request, out).await? {
                        writeln!(out, "[DRAFT]")?;
                        writeln!(out, "{}", self.studio.active_scene().content)?;
                    }
                }
            }
            "paint" => {
                if self.run(AgentRequest::Visualize, out).await? {
                    match &self.studio.active_scene().image_url {
                        Some(uri) => writeln!(
                            out,
                            "[IMAGE] {} image attached",
                            quill_core::studio::image_extension(uri)
                        )?,
                        None => writeln!(out, "[IMAGE] none")?,
                    }
                }
            }
            "read" => {
                let path = if rest.is_empty() {
                    self.export_dir.join(NARRATION_FILE)
                } else {
                    PathBuf::from(rest)
                };
                match self.studio.read_aloud().await {
                    Ok(Some(pcm)) => match pcm.write_wav(&path).await {
                        Ok(()) => writeln!(
                            out,
                            "[AUDIO] {} ({:.1}s)",
                            path.display(),
                            pcm.duration().as_secs_f32()
                        )?,
                        Err(e) => writeln!(out, "[ERROR] Could not write audio: {e}")?,
                    },
                    Ok(None) => {}
                    Err(e) => writeln!(out, "[ERROR] {e}")?,
                }
            }
            "export" => {
                let path = if rest.is_empty() {
                    let scene = self.studio.active_scene();
                    let ext = scene
                        .image_url
                        .as_deref()
                        .map(quill_core::studio::image_extension)
                        .unwrap_or("png");
                    self.export_dir.join(format!("{}.{ext}", scene.id))
                } else {
                    PathBuf::from(rest)
                };
                if let Err(e) = self.studio.export_image(&path).await {
                    writeln!(out, "[ERROR] {e}")?;
                }
            }

            // Scenes
            "new" => {
                self.studio.apply(Edit::AddScene).await;
                writeln!(out, "[SCENE] {}", self.studio.active_scene().title)?;
            }
            "del" | "delete" => {
                let id = if rest.is_empty() {
                    Some(self.studio.active_scene().id.clone())
                } else {
                    self.scene_id(rest)
                };
                match id {
                    Some(id) => {
                        if self.studio.apply(Edit::DeleteScene(id)).await {
                            writeln!(out, "[SCENE] deleted")?;
                        } else {
                            writeln!(out, "[ERROR] Cannot delete the last scene")?;
                        }
                    }
                    None => writeln!(out, "[ERROR] No such scene: {rest}")?,
                }
            }
            "select" => match self.scene_id(rest) {
                Some(id) => {
                    self.studio.apply(Edit::SelectScene(id)).await;
                    writeln!(out, "[SCENE] {}", self.studio.active_scene().title)?;
                }
                None => writeln!(out, "[ERROR] Usage: #select <n>")?,
            },
            "next" => {
                self.studio.select_relative(1);
                writeln!(out, "[SCENE] {}", self.studio.active_scene().title)?;
            }
            "prev" => {
                self.studio.select_relative(-1);
                writeln!(out, "[SCENE] {}", self.studio.active_scene().title)?;
            }
            "set" => {
                let (field, value) = split_first(rest);
                match field.parse::<SceneField>() {
                    Ok(field) => {
                        self.studio
                            .apply(Edit::UpdateScene {
                                field,
                                value: unescape(value),
                            })
                            .await;
                        writeln!(out, "[SAVED] scene {field}")?;
                    }
                    _ => writeln!(out, "[ERROR] Usage: #set <title|plan|draft> <text>")?,
                }
            }

            // Bible
            "summary" => {
                self.studio
                    .apply(Edit::SetSummary(unescape(rest)))
                    .await;
                writeln!(out, "[SAVED] summary")?;
            }
            "char" => self.character_command(rest, out).await?,
            "loc" => self.location_command(rest, out).await?,

            "reset" => match self.studio.reset().await {
                Ok(()) => {}
                Err(e) => writeln!(out, "[ERROR] Reset failed: {e}")?,
            },
            _ => {
                writeln!(out, "[ERROR] Unknown command. Type #help for help.")?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Run an agent; notices explain failures. Returns whether it succeeded.
    async fn run(&mut self, request: AgentRequest, out: &mut impl Write) -> io::Result<bool> {
        write!(out, "[PROCESSING]")?;
        out.flush()?;
        let result = self.studio.run_agent(request).await;
        writeln!(out)?;
        match result {
            Ok(()) => Ok(true),
            Err(StudioError::Agent(e)) => {
                tracing::debug!(error = %e, "agent failed in headless mode");
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }

    async fn character_command(&mut self, rest: &str, out: &mut impl Write) -> io::Result<()> {
        let (action, args) = split_first(rest);
        match action {
            "add" => {
                self.studio.apply(Edit::AddCharacter).await;
                if let Some(c) = self.studio.bible().characters.last() {
                    writeln!(out, "[CHARACTER] {} {}", c.id, c.name)?;
                }
            }
            "set" => {
                let (id, args) = split_first(args);
                let (field, value) = split_first(args);
                match field.parse::<CharacterField>() {
                    Ok(field) => {
                        let edit = Edit::UpdateCharacter {
                            id: id.to_string(),
                            field,
                            value: unescape(value),
                        };
                        if self.studio.apply(edit).await {
                            writeln!(out, "[SAVED] character {id} {field}")?;
                        } else {
                            writeln!(out, "[ERROR] No character with id {id}")?;
                        }
                    }
                    Err(e) => writeln!(out, "[ERROR] {e}")?,
                }
            }
            "del" | "delete" => {
                if self.studio.apply(Edit::DeleteCharacter(args.to_string())).await {
                    writeln!(out, "[SAVED] character deleted")?;
                } else {
                    writeln!(out, "[ERROR] No character with id {args}")?;
                }
            }
            _ => writeln!(
                out,
                "[ERROR] Usage: #char add | set <id> <name|traits|arc|description> <value> | del <id>"
            )?,
        }
        Ok(())
    }

    async fn location_command(&mut self, rest: &str, out: &mut impl Write) -> io::Result<()> {
        let (action, args) = split_first(rest);
        match action {
            "add" => {
                self.studio.apply(Edit::AddLocation).await;
                if let Some(l) = self.studio.bible().locations.last() {
                    writeln!(out, "[LOCATION] {} {}", l.id, l.name)?;
                }
            }
            "set" => {
                let (id, args) = split_first(args);
                let (field, value) = split_first(args);
                match field.parse::<LocationField>() {
                    Ok(field) => {
                        let edit = Edit::UpdateLocation {
                            id: id.to_string(),
                            field,
                            value: unescape(value),
                        };
                        if self.studio.apply(edit).await {
                            writeln!(out, "[SAVED] location {id} {field}")?;
                        } else {
                            writeln!(out, "[ERROR] No location with id {id}")?;
                        }
                    }
                    Err(e) => writeln!(out, "[ERROR] {e}")?,
                }
            }
            "del" | "delete" => {
                if self.studio.apply(Edit::DeleteLocation(args.to_string())).await {
                    writeln!(out, "[SAVED] location deleted")?;
                } else {
                    writeln!(out, "[ERROR] No location with id {args}")?;
                }
            }
            _ => writeln!(
                out,
                "[ERROR] Usage: #loc add | set <id> <name|description> <value> | del <id>"
            )?,
        }
        Ok(())
    }

    async fn append_paragraph(&mut self, text: &str) {
        let content = &self.studio.active_scene().content;
        let value = if content.trim().is_empty() {
            text.to_string()
        } else {
            format!("{content}\n\n{text}")
        };
        self.studio
            .apply(Edit::UpdateScene {
                field: SceneField::Content,
                value,
            })
            .await;
    }

    /// Scene id from a 1-based index or a literal id.
    fn scene_id(&self, arg: &str) -> Option<String> {
        let scenes = self.studio.scenes();
        match arg.parse::<usize>() {
            Ok(n) if n >= 1 => scenes.get(n - 1).map(|s| s.id.clone()),
            _ => scenes.iter().find(|s| s.id == arg).map(|s| s.id.clone()),
        }
    }

    fn print_status(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "[STATUS]")?;
        match self.studio.service().models() {
            Some(models) => writeln!(
                out,
                "  Agents: available (text {}, image {}, speech {})",
                models.text, models.image, models.speech
            )?,
            None => writeln!(out, "  Agents: unavailable (set GEMINI_API_KEY)")?,
        }
        let scene = self.studio.active_scene();
        writeln!(
            out,
            "  Scene: {}/{} {}",
            self.studio.manuscript().active_position() + 1,
            self.studio.scenes().len(),
            scene.title
        )?;
        writeln!(out, "  Words: {}", scene.word_count())?;
        writeln!(
            out,
            "  Plan: {}",
            if scene.beat_sheet.trim().is_empty() { "none" } else { "ready" }
        )?;
        if let Some(agent) = scene.last_agent {
            writeln!(out, "  Last agent: {agent}")?;
        }
        Ok(())
    }

    fn print_bible(&self, out: &mut impl Write) -> io::Result<()> {
        let bible = self.studio.bible();
        writeln!(out, "[BIBLE]")?;
        writeln!(out, "Summary: {}", bible.summary)?;
        writeln!(out, "Characters:")?;
        for c in &bible.characters {
            writeln!(
                out,
                "  {} | {} | {} | traits: {} | {}",
                c.id,
                c.name,
                c.arc_status,
                c.traits.join(", "),
                c.description
            )?;
        }
        writeln!(out, "Locations:")?;
        for l in &bible.locations {
            writeln!(out, "  {} | {} | {}", l.id, l.name, l.description)?;
        }
        Ok(())
    }

    fn print_scenes(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "[SCENES]")?;
        let active = self.studio.manuscript().active_position();
        for (i, scene) in self.studio.scenes().iter().enumerate() {
            let marker = if i == active { "*" } else { " " };
            writeln!(
                out,
                "{marker} {}. {} ({} words)",
                i + 1,
                scene.title,
                scene.word_count()
            )?;
        }
        Ok(())
    }

    fn print_scene(&self, out: &mut impl Write) -> io::Result<()> {
        let scene = self.studio.active_scene();
        writeln!(out, "[SCENE] {}", scene.title)?;
        writeln!(out, "[PLAN]")?;
        writeln!(out, "{}", scene.beat_sheet)?;
        writeln!(out, "[DRAFT]")?;
        writeln!(out, "{}", scene.content)?;
        if let Some(uri) = &scene.image_url {
            writeln!(
                out,
                "[IMAGE] {} image attached",
                quill_core::studio::image_extension(uri)
            )?;
        }
        Ok(())
    }

    fn print_report(&self, out: &mut impl Write) -> io::Result<()> {
        let Some(report) = self.studio.continuity() else {
            return Ok(());
        };
        write_report(report, out)
    }
}

fn write_report(report: &ContinuityReport, out: &mut impl Write) -> io::Result<()> {
    if report.unparsed {
        writeln!(out, "[ISSUES] unreadable reply")?;
        return Ok(());
    }
    writeln!(out, "[ISSUES] {}", report.len())?;
    for issue in &report.issues {
        writeln!(out, "  ({}) {}: {}", issue.severity, issue.kind, issue.message)?;
        if let Some(quote) = &issue.quote {
            writeln!(out, "    \"{quote}\"")?;
        }
    }
    Ok(())
}

/// Split off the first whitespace-delimited word.
fn split_first(s: &str) -> (&str, &str) {
    match s.trim().split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (s.trim(), ""),
    }
}

/// Turn literal `\n` sequences into newlines.
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// Run the studio in headless mode, reading commands from stdin.
pub async fn run_headless<G: Generator>(
    studio: Studio<G>,
    export_dir: PathBuf,
) -> io::Result<()> {
    let mut session = HeadlessSession::new(studio, export_dir);
    let mut stdout = io::stdout();
    session.print_banner(&mut stdout)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        if session.handle_line(&line, &mut stdout).await? == Flow::Quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{AgentService, Agents, ScriptedModel, StoryStore};
    use tempfile::TempDir;

    async fn session(model: ScriptedModel, dir: &TempDir) -> HeadlessSession<ScriptedModel> {
        let mut studio = Studio::new(
            StoryStore::in_memory(),
            AgentService::Available(Agents::new(model)),
        );
        studio.load().await.unwrap();
        HeadlessSession::new(studio, dir.path().join("exports"))
    }

    async fn send(session: &mut HeadlessSession<ScriptedModel>, line: &str) -> (Flow, String) {
        let mut out = Vec::new();
        let flow = session.handle_line(line, &mut out).await.unwrap();
        (flow, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_quit() {
        let dir = TempDir::new().unwrap();
        let mut s = session(ScriptedModel::new(), &dir).await;
        let (flow, out) = send(&mut s, "#quit").await;
        assert_eq!(flow, Flow::Quit);
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let dir = TempDir::new().unwrap();
        let mut s = session(ScriptedModel::new(), &dir).await;
        let (_, out) = send(&mut s, "#dance").await;
        assert!(out.contains("[ERROR] Unknown command. Type #help for help."));
    }

    #[tokio::test]
    async fn test_plan_then_write_reports_issues() {
        let model = ScriptedModel::new()
            .with_text("1. Kaito enters the bazaar")
            .with_text("Kaito pushed through the crowd.")
            .with_text(
                r#"{"errors": [{"type": "Character Inconsistency", "description": "Kaito is dead", "severity": "critical"}]}"#,
            );
        let dir = TempDir::new().unwrap();
        let mut s = session(model, &dir).await;

        let (_, out) = send(&mut s, "#plan Kaito goes shopping").await;
        assert!(out.contains("[PLAN]\n1. Kaito enters the bazaar"));

        let (_, out) = send(&mut s, "#write").await;
        assert!(out.contains("[DRAFT]\nKaito pushed through the crowd."));
        assert!(out.contains("[ISSUES] 1"));
        assert!(out.contains("(critical) Character Inconsistency: Kaito is dead"));
        assert!(out.contains("[ERROR] Found 1 continuity issues."));
    }

    #[tokio::test]
    async fn test_write_without_plan() {
        let dir = TempDir::new().unwrap();
        let mut s = session(ScriptedModel::new(), &dir).await;
        let (_, out) = send(&mut s, "#write").await;
        assert!(out.contains("[ERROR] Create a plan first."));
        assert!(!out.contains("[DRAFT]"));
    }

    #[tokio::test]
    async fn test_plain_lines_append_paragraphs() {
        let dir = TempDir::new().unwrap();
        let mut s = session(ScriptedModel::new(), &dir).await;
        send(&mut s, "Rain fell on Neo-Tokyo.").await;
        let (_, out) = send(&mut s, "Kaito lit a cigarette.").await;
        assert!(out.contains("[DRAFT] 8 words"));
        assert_eq!(
            s.studio().active_scene().content,
            "Rain fell on Neo-Tokyo.\n\nKaito lit a cigarette."
        );
    }

    #[tokio::test]
    async fn test_scene_commands() {
        let dir = TempDir::new().unwrap();
        let mut s = session(ScriptedModel::new(), &dir).await;
        let (_, out) = send(&mut s, "#new").await;
        assert!(out.contains("[SCENE] Scene 2"));

        send(&mut s, "#set title The Market\\nAt Night").await;
        assert_eq!(s.studio().active_scene().title, "The Market\nAt Night");

        let (_, out) = send(&mut s, "#scenes").await;
        assert!(out.contains("  1. Chapter 1: The Glitch"));
        assert!(out.contains("* 2. The Market"));

        send(&mut s, "#select 1").await;
        assert_eq!(s.studio().active_scene().id, "scene-1");

        send(&mut s, "#del 2").await;
        assert_eq!(s.studio().scenes().len(), 1);
        let (_, out) = send(&mut s, "#del").await;
        assert!(out.contains("[ERROR] Cannot delete the last scene"));
    }

    #[tokio::test]
    async fn test_character_commands() {
        let dir = TempDir::new().unwrap();
        let mut s = session(ScriptedModel::new(), &dir).await;
        send(&mut s, "#char set 1 arc Deceased").await;
        send(&mut s, "#char set 1 traits Cynical, tired").await;
        let kaito = &s.studio().bible().characters[0];
        assert_eq!(kaito.arc_status, "Deceased");
        assert_eq!(kaito.traits, vec!["Cynical", "tired"]);

        let (_, out) = send(&mut s, "#char set 99 name Ghost").await;
        assert!(out.contains("[ERROR] No character with id 99"));

        let (_, out) = send(&mut s, "#char set 1 height tall").await;
        assert!(out.contains("[ERROR] unknown character field 'height'"));

        send(&mut s, "#char del 2").await;
        assert_eq!(s.studio().bible().characters.len(), 1);
    }

    #[tokio::test]
    async fn test_agents_unavailable() {
        let studio: Studio<ScriptedModel> =
            Studio::new(StoryStore::in_memory(), AgentService::unavailable("no key"));
        let dir = TempDir::new().unwrap();
        let mut s = HeadlessSession::new(studio, dir.path().to_path_buf());
        let (_, out) = send(&mut s, "#plan anything").await;
        assert!(out.contains("[ERROR] API Service is unavailable."));
        assert!(!out.contains("[PLAN]"));

        let (_, out) = send(&mut s, "#status").await;
        assert!(out.contains("Agents: unavailable"));
    }

    #[tokio::test]
    async fn test_read_writes_narration_wav() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new()
            .with_inline("audio/L16;codec=pcm;rate=24000", "AQD//w==");
        let mut s = session(model, &dir).await;
        send(&mut s, "Rain fell.").await;

        let (_, out) = send(&mut s, "#read").await;

        let path = dir.path().join("exports").join(NARRATION_FILE);
        assert!(out.contains(&format!("[AUDIO] {}", path.display())));
        let wav = std::fs::read(&path).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[44..], &[1, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_split_first() {
        assert_eq!(split_first("set 1 name Kaito Mori"), ("set", "1 name Kaito Mori"));
        assert_eq!(split_first("add"), ("add", ""));
        assert_eq!(split_first(""), ("", ""));
    }
}
