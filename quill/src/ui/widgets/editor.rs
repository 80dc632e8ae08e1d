//! Scene editor: title, beat sheet and draft of the active scene

use quill_core::{Scene, SceneField};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::StudioTheme;

/// Widget showing the active scene
pub struct EditorWidget<'a> {
    scene: &'a Scene,
    theme: &'a StudioTheme,
    focused: bool,
    selected: SceneField,
    scroll: u16,
}

impl<'a> EditorWidget<'a> {
    pub fn new(scene: &'a Scene, theme: &'a StudioTheme) -> Self {
        Self {
            scene,
            theme,
            focused: false,
            selected: SceneField::Content,
            scroll: 0,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn selected(mut self, field: SceneField) -> Self {
        self.selected = field;
        self
    }

    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }

    fn heading(&self, text: &'static str, field: SceneField) -> Line<'static> {
        let marker = if self.focused && self.selected == field {
            "▸ "
        } else {
            "  "
        };
        let mut style = self.theme.label_style();
        if self.focused && self.selected == field {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Line::from(vec![
            Span::styled(marker, self.theme.label_style()),
            Span::styled(text, style),
        ])
    }

    fn footer(&self) -> String {
        let mut parts = vec![format!("{} words", self.scene.word_count())];
        if self.scene.image_url.is_some() {
            parts.push("image attached".to_string());
        }
        if let Some(agent) = self.scene.last_agent {
            parts.push(format!("last: {agent}"));
        }
        format!(" {} ", parts.join(" | "))
    }
}

impl Widget for EditorWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.focused {
            " Editor [j/k field, i edit] "
        } else {
            " Editor "
        };

        let block = Block::default()
            .title(title)
            .title_style(self.theme.title_style(self.focused))
            .title_bottom(self.footer())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = vec![
            self.heading("Title", SceneField::Title),
            Line::from(Span::styled(
                self.scene.title.clone(),
                self.theme
                    .text_style()
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            self.heading("Beat sheet", SceneField::BeatSheet),
        ];

        if self.scene.beat_sheet.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                "No plan yet. Run the planner or press 'i' to write one.",
                self.theme.muted_style(),
            )));
        } else {
            lines.extend(
                self.scene
                    .beat_sheet
                    .lines()
                    .map(|l| Line::from(Span::styled(l.to_string(), self.theme.plan_style()))),
            );
        }

        lines.push(Line::from(""));
        lines.push(self.heading("Draft", SceneField::Content));

        if self.scene.content.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                "Start writing or ask the writer agent...",
                self.theme.muted_style(),
            )));
        } else {
            lines.extend(
                self.scene
                    .content
                    .lines()
                    .map(|l| Line::from(Span::styled(l.to_string(), self.theme.prose_style()))),
            );
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(inner, buf);
    }
}
