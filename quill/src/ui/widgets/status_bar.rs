//! Status bar widget

use quill_core::{AgentStatus, Notice};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::app::InputMode;
use crate::ui::theme::StudioTheme;

/// One-line status bar: mode, agent activity, then the latest message
pub struct StatusBarWidget<'a> {
    input_mode: InputMode,
    theme: &'a StudioTheme,
    status: Option<&'a AgentStatus>,
    notice: Option<&'a Notice>,
    message: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(input_mode: InputMode, theme: &'a StudioTheme) -> Self {
        Self {
            input_mode,
            theme,
            status: None,
            notice: None,
            message: None,
        }
    }

    pub fn status(mut self, status: &'a AgentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn notice(mut self, notice: Option<&'a Notice>) -> Self {
        self.notice = notice;
        self
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (mode, color) = match self.input_mode {
            InputMode::Normal => ("NORMAL", Color::Blue),
            InputMode::Insert => ("INSERT", Color::Green),
            InputMode::Command => ("COMMAND", Color::Magenta),
        };

        let mut spans = vec![
            Span::styled(
                format!(" {mode} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(color)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
        ];

        if let Some(status) = self.status.filter(|s| s.is_working) {
            spans.push(Span::styled(
                format!(
                    "{} ({}) ",
                    status.agent_name.as_deref().unwrap_or("AGENT"),
                    status.model_name.as_deref().unwrap_or("model")
                ),
                self.theme.working_style(),
            ));
        }

        // A local message wins over the last studio notice
        if let Some(message) = self.message {
            spans.push(Span::styled(message.to_string(), self.theme.text_style()));
        } else if let Some(notice) = self.notice {
            spans.push(Span::styled(
                notice.message.clone(),
                self.theme.notice_style(notice.level),
            ));
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}
