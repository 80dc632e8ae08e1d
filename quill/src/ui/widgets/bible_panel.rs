//! Story bible panel: summary, cast, places and settings

use std::path::Path;

use quill_core::{AgentModels, Bible, CharacterField, LocationField};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::app::BibleTab;
use crate::ui::theme::StudioTheme;

/// What the settings tab reports about the agent service
pub struct ServiceInfo<'a> {
    pub models: Option<&'a AgentModels>,
    pub unavailable_reason: Option<&'a str>,
    pub data_dir: &'a Path,
}

/// Bible panel for the left column
pub struct BiblePanelWidget<'a> {
    bible: &'a Bible,
    tab: BibleTab,
    theme: &'a StudioTheme,
    focused: bool,
    character_cursor: usize,
    location_cursor: usize,
    service: Option<ServiceInfo<'a>>,
}

impl<'a> BiblePanelWidget<'a> {
    pub fn new(bible: &'a Bible, tab: BibleTab, theme: &'a StudioTheme) -> Self {
        Self {
            bible,
            tab,
            theme,
            focused: false,
            character_cursor: 0,
            location_cursor: 0,
            service: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn cursors(mut self, character: usize, location: usize) -> Self {
        self.character_cursor = character;
        self.location_cursor = location;
        self
    }

    pub fn service(mut self, service: ServiceInfo<'a>) -> Self {
        self.service = Some(service);
        self
    }

    fn tab_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, tab) in BibleTab::ALL.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", self.theme.muted_style()));
            }
            spans.push(Span::styled(
                tab.title().to_string(),
                self.theme.tab_style(*tab == self.tab),
            ));
        }
        Line::from(spans)
    }

    fn summary_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Story summary",
            self.theme.label_style(),
        ))];
        if self.bible.summary.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                "(empty) press 'i' to write one",
                self.theme.muted_style(),
            )));
        } else {
            lines.extend(
                self.bible
                    .summary
                    .lines()
                    .map(|l| Line::from(Span::styled(l.to_string(), self.theme.text_style()))),
            );
        }
        lines
    }

    /// One row per field; the cursor indexes these rows.
    fn character_lines(&self) -> Vec<Line<'static>> {
        if self.bible.characters.is_empty() {
            return vec![Line::from(Span::styled(
                "No characters. Press 'a' to add one.",
                self.theme.muted_style(),
            ))];
        }

        let mut lines = Vec::new();
        let mut row = 0;
        for character in &self.bible.characters {
            for field in CharacterField::ALL {
                let value = character.get(field);
                let line = if field == CharacterField::Name {
                    Span::styled(value, self.theme.label_style())
                } else {
                    Span::styled(format!("  {field}: {value}"), self.theme.text_style())
                };
                lines.push(self.select(line, row == self.character_cursor));
                row += 1;
            }
            lines.push(Line::from(""));
        }
        lines
    }

    fn location_lines(&self) -> Vec<Line<'static>> {
        if self.bible.locations.is_empty() {
            return vec![Line::from(Span::styled(
                "No locations. Press 'a' to add one.",
                self.theme.muted_style(),
            ))];
        }

        let mut lines = Vec::new();
        let mut row = 0;
        for location in &self.bible.locations {
            for field in LocationField::ALL {
                let value = location.get(field);
                let line = if field == LocationField::Name {
                    Span::styled(value, self.theme.label_style())
                } else {
                    Span::styled(format!("  {value}"), self.theme.text_style())
                };
                lines.push(self.select(line, row == self.location_cursor));
                row += 1;
            }
            lines.push(Line::from(""));
        }
        lines
    }

    fn settings_lines(&self) -> Vec<Line<'static>> {
        let Some(service) = &self.service else {
            return Vec::new();
        };

        let mut lines = vec![Line::from(Span::styled(
            "Agent service",
            self.theme.label_style(),
        ))];
        match (service.models, service.unavailable_reason) {
            (Some(models), _) => {
                lines.push(Line::from(Span::styled(
                    "Connected",
                    self.theme.notice_style(quill_core::NoticeLevel::Success),
                )));
                lines.push(Line::from(format!("  text:   {}", models.text)));
                lines.push(Line::from(format!("  image:  {}", models.image)));
                lines.push(Line::from(format!("  speech: {}", models.speech)));
                lines.push(Line::from(format!("  voice:  {}", models.voice)));
            }
            (None, reason) => {
                lines.push(Line::from(Span::styled(
                    format!("Unavailable: {}", reason.unwrap_or("unknown")),
                    self.theme.notice_style(quill_core::NoticeLevel::Error),
                )));
                lines.push(Line::from(Span::styled(
                    "Set GEMINI_API_KEY and restart",
                    self.theme.muted_style(),
                )));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Data", self.theme.label_style())));
        lines.push(Line::from(format!("  {}", service.data_dir.display())));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press 'R' to reset all data",
            self.theme.muted_style(),
        )));
        lines
    }

    fn select(&self, span: Span<'static>, selected: bool) -> Line<'static> {
        if selected && self.focused {
            Line::from(span.style(self.theme.selected_style()))
        } else {
            Line::from(span)
        }
    }

    fn selected_row(&self) -> usize {
        match self.tab {
            // Each entry adds a blank separator line after its fields
            BibleTab::Characters => {
                let per = CharacterField::ALL.len();
                self.character_cursor + self.character_cursor / per
            }
            BibleTab::Locations => {
                let per = LocationField::ALL.len();
                self.location_cursor + self.location_cursor / per
            }
            _ => 0,
        }
    }
}

impl Widget for BiblePanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.focused {
            " Bible [h/l tabs] "
        } else {
            " Bible "
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
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        Paragraph::new(self.tab_line()).render(chunks[0], buf);

        let lines = match self.tab {
            BibleTab::Summary => self.summary_lines(),
            BibleTab::Characters => self.character_lines(),
            BibleTab::Locations => self.location_lines(),
            BibleTab::Settings => self.settings_lines(),
        };

        // Keep the selected row on screen
        let height = chunks[1].height as usize;
        let scroll = (self.selected_row() + 1).saturating_sub(height);

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll as u16, 0))
            .render(chunks[1], buf);
    }
}
