//! Scene tab strip

use quill_core::Scene;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::StudioTheme;

const MAX_TITLE_CHARS: usize = 18;

/// One tab per scene, the active one highlighted
pub struct SceneTabsWidget<'a> {
    scenes: &'a [Scene],
    active: usize,
    theme: &'a StudioTheme,
    focused: bool,
}

impl<'a> SceneTabsWidget<'a> {
    pub fn new(scenes: &'a [Scene], active: usize, theme: &'a StudioTheme) -> Self {
        Self {
            scenes,
            active,
            theme,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

fn short_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        title.to_string()
    } else {
        let cut: String = title.chars().take(MAX_TITLE_CHARS - 1).collect();
        format!("{cut}…")
    }
}

impl Widget for SceneTabsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" Scenes ({}) ", self.scenes.len()))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut spans = Vec::new();
        for (i, scene) in self.scenes.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", self.theme.muted_style()));
            }
            spans.push(Span::styled(
                format!("{} {}", i + 1, short_title(&scene.title)),
                self.theme.tab_style(i == self.active),
            ));
        }

        // Scroll so the active tab is visible
        let line = Line::from(spans);
        let offset = if line.width() > inner.width as usize {
            let before: usize = self
                .scenes
                .iter()
                .take(self.active)
                .enumerate()
                .map(|(i, s)| format!("{} {}", i + 1, short_title(&s.title)).chars().count() + 3)
                .sum();
            before.saturating_sub(inner.width as usize / 2)
        } else {
            0
        };

        Paragraph::new(line)
            .scroll((0, offset as u16))
            .render(inner, buf);
    }
}
