//! Agent panel: one tab per writing agent

use quill_core::{AgentKind, AgentModels, AgentStatus, ContinuityReport, Scene, Severity};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::StudioTheme;

const PREVIEW_LINES: usize = 12;

/// Agent panel for the right column
pub struct AgentPanelWidget<'a> {
    tab: AgentKind,
    scene: &'a Scene,
    theme: &'a StudioTheme,
    focused: bool,
    status: Option<&'a AgentStatus>,
    continuity: Option<&'a ContinuityReport>,
    models: Option<&'a AgentModels>,
    plan_idea: &'a str,
    instructions: &'a str,
}

impl<'a> AgentPanelWidget<'a> {
    pub fn new(tab: AgentKind, scene: &'a Scene, theme: &'a StudioTheme) -> Self {
        Self {
            tab,
            scene,
            theme,
            focused: false,
            status: None,
            continuity: None,
            models: None,
            plan_idea: "",
            instructions: "",
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn status(mut self, status: &'a AgentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn continuity(mut self, report: Option<&'a ContinuityReport>) -> Self {
        self.continuity = report;
        self
    }

    pub fn models(mut self, models: Option<&'a AgentModels>) -> Self {
        self.models = models;
        self
    }

    pub fn plan_idea(mut self, idea: &'a str) -> Self {
        self.plan_idea = idea;
        self
    }

    pub fn instructions(mut self, instructions: &'a str) -> Self {
        self.instructions = instructions;
        self
    }

    fn tab_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, kind) in AgentKind::ALL.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            let label = match kind {
                AgentKind::Planner => "Plan",
                AgentKind::Writer => "Write",
                AgentKind::Continuity => "Check",
                AgentKind::Editor => "Edit",
                AgentKind::Visualizer => "Paint",
            };
            spans.push(Span::styled(label, self.theme.tab_style(*kind == self.tab)));
        }
        Line::from(spans)
    }

    fn hint(&self, text: impl Into<String>) -> Line<'static> {
        Line::from(Span::styled(text.into(), self.theme.muted_style()))
    }

    fn preview(&self, text: &str, style: ratatui::style::Style) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = text
            .lines()
            .take(PREVIEW_LINES)
            .map(|l| Line::from(Span::styled(l.to_string(), style)))
            .collect();
        if text.lines().count() > PREVIEW_LINES {
            lines.push(self.hint("..."));
        }
        lines
    }

    fn planner_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled("Idea", self.theme.label_style()))];
        if self.plan_idea.trim().is_empty() {
            lines.push(self.hint("Press 'i' to describe the scene"));
        } else {
            lines.push(Line::from(self.plan_idea.to_string()));
            lines.push(self.hint("Enter to plan"));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Beat sheet", self.theme.label_style())));
        if self.scene.beat_sheet.trim().is_empty() {
            lines.push(self.hint("No plan yet"));
        } else {
            lines.extend(self.preview(&self.scene.beat_sheet, self.theme.plan_style()));
        }
        lines
    }

    fn writer_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Drafting from",
            self.theme.label_style(),
        ))];
        if self.scene.beat_sheet.trim().is_empty() {
            lines.push(self.hint("Create a plan first"));
            return lines;
        }
        lines.extend(self.preview(&self.scene.beat_sheet, self.theme.plan_style()));
        lines.push(Line::from(""));
        if self.scene.content.trim().is_empty() {
            lines.push(self.hint("Enter to write the first draft"));
        } else {
            lines.push(self.hint(format!(
                "Enter to redraft ({} words now)",
                self.scene.word_count()
            )));
        }
        lines.push(self.hint("A continuity check follows every draft"));
        lines
    }

    fn continuity_lines(&self) -> Vec<Line<'static>> {
        let Some(report) = self.continuity else {
            return vec![self.hint("No check run yet. Enter to check the draft.")];
        };

        if report.unparsed {
            return vec![
                Line::from(Span::styled(
                    "The reply could not be read",
                    self.theme.notice_style(quill_core::NoticeLevel::Error),
                )),
                self.hint("Enter to try again"),
            ];
        }

        if report.is_clean() {
            return vec![Line::from(Span::styled(
                "No continuity issues",
                self.theme.notice_style(quill_core::NoticeLevel::Success),
            ))];
        }

        let mut lines = vec![Line::from(Span::styled(
            format!("{} issue(s)", report.len()),
            self.theme.label_style(),
        ))];
        for issue in &report.issues {
            let badge = match issue.severity {
                Severity::Critical => "[CRITICAL] ",
                Severity::Warning => "[WARNING] ",
            };
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(badge, self.theme.severity_style(issue.severity)),
                Span::styled(
                    issue.kind.clone(),
                    self.theme.text_style().add_modifier(Modifier::BOLD),
                ),
            ]));
            lines.push(Line::from(issue.message.clone()));
            if let Some(quote) = &issue.quote {
                lines.push(Line::from(Span::styled(
                    format!("\"{quote}\""),
                    self.theme.muted_style().add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines
    }

    fn editor_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Instructions",
            self.theme.label_style(),
        ))];
        if self.instructions.trim().is_empty() {
            lines.push(self.hint("Press 'i' to tell the editor what to change"));
        } else {
            lines.push(Line::from(self.instructions.to_string()));
            lines.push(self.hint("Enter to apply to the draft"));
        }
        lines
    }

    fn visualizer_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Illustration",
            self.theme.label_style(),
        ))];
        match &self.scene.image_url {
            Some(uri) => {
                let kind = quill_core::studio::image_extension(uri);
                let kb = uri.len() * 3 / 4 / 1024;
                lines.push(Line::from(format!("{kind} image, about {kb} KB")));
                lines.push(self.hint("'X' or :export to save it"));
            }
            None => lines.push(self.hint("No image yet")),
        }
        lines.push(Line::from(""));
        let source = if self.scene.content.is_empty() {
            "beat sheet"
        } else {
            "draft"
        };
        lines.push(self.hint(format!("Enter to paint from the {source}")));
        lines
    }

    fn status_line(&self) -> Line<'static> {
        match self.status {
            Some(status) if status.is_working => Line::from(Span::styled(
                format!(
                    "{} working on {}",
                    status.agent_name.as_deref().unwrap_or("AGENT"),
                    status.current_task.as_deref().unwrap_or("a task")
                ),
                self.theme.working_style(),
            )),
            _ => match self.models {
                Some(models) => self.hint(format!("model: {}", models.for_agent(self.tab))),
                None => Line::from(Span::styled(
                    "Agents unavailable",
                    self.theme.notice_style(quill_core::NoticeLevel::Error),
                )),
            },
        }
    }
}

impl Widget for AgentPanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.focused {
            " Agents [h/l tabs, Enter run] "
        } else {
            " Agents "
        };

        let block = Block::default()
            .title(title)
            .title_style(self.theme.title_style(self.focused))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(inner);

        Paragraph::new(self.tab_line()).render(chunks[0], buf);

        let lines = match self.tab {
            AgentKind::Planner => self.planner_lines(),
            AgentKind::Writer => self.writer_lines(),
            AgentKind::Continuity => self.continuity_lines(),
            AgentKind::Editor => self.editor_lines(),
            AgentKind::Visualizer => self.visualizer_lines(),
        };
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(chunks[1], buf);

        Paragraph::new(self.status_line()).render(chunks[2], buf);
    }
}
