//! Input field widgets

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::StudioTheme;

/// Single-line input field
pub struct InputWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    theme: &'a StudioTheme,
    placeholder: &'a str,
    title: Option<String>,
    is_active: bool,
    is_command_mode: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(content: &'a str, theme: &'a StudioTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            theme,
            placeholder: "Press 'i' to edit, ':' for commands",
            title: None,
            is_active: true,
            is_command_mode: false,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn command_mode(mut self, is_command: bool) -> Self {
        self.is_command_mode = is_command;
        self
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));
        if let Some(title) = &self.title {
            block = block.title(format!(" {title} "));
        }

        let inner = block.inner(area);
        block.render(area, buf);

        let line = if !self.is_active {
            Line::from(vec![
                Span::styled("> ", self.theme.label_style()),
                Span::styled(self.placeholder, self.theme.muted_style()),
            ])
        } else {
            let prefix = if self.is_command_mode { ":" } else { "> " };
            let display_content = if self.is_command_mode {
                self.content.strip_prefix(':').unwrap_or(self.content)
            } else {
                self.content
            };

            let adjusted_cursor = if self.is_command_mode {
                self.cursor_position.saturating_sub(1)
            } else {
                self.cursor_position
            };

            // Keep the cursor in view on long lines
            let visible_width = (inner.width as usize).saturating_sub(prefix.len() + 1).max(1);
            let skip = adjusted_cursor.saturating_sub(visible_width);

            let before_cursor: String = display_content
                .chars()
                .skip(skip)
                .take(adjusted_cursor - skip)
                .collect();
            let at_cursor = display_content
                .chars()
                .nth(adjusted_cursor)
                .map(|c| c.to_string())
                .unwrap_or_else(|| " ".to_string());
            let after_cursor: String = display_content.chars().skip(adjusted_cursor + 1).collect();

            Line::from(vec![
                Span::styled(prefix, self.theme.label_style()),
                Span::raw(before_cursor),
                Span::styled(
                    at_cursor,
                    Style::default()
                        .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
                        .fg(self.theme.border_focused),
                ),
                Span::raw(after_cursor),
            ])
        };

        Paragraph::new(line).render(inner, buf);
    }
}

/// Multi-line text editor used for prose, plans and descriptions
pub struct TextAreaWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    title: String,
    theme: &'a StudioTheme,
}

impl<'a> TextAreaWidget<'a> {
    pub fn new(content: &'a str, title: impl Into<String>, theme: &'a StudioTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            title: title.into(),
            theme,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }
}

impl Widget for TextAreaWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_bottom(" Esc save | Enter newline | arrows move ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let (rows, (cursor_row, cursor_col)) =
            wrap_with_cursor(self.content, self.cursor_position, inner.width as usize);

        let height = inner.height as usize;
        let first = (cursor_row + 1).saturating_sub(height);

        let cursor_style = Style::default()
            .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
            .fg(self.theme.border_focused);

        let lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .skip(first)
            .take(height)
            .map(|(index, row)| {
                if index != cursor_row {
                    return Line::from(Span::styled(row.clone(), self.theme.prose_style()));
                }
                let before: String = row.chars().take(cursor_col).collect();
                let at = row
                    .chars()
                    .nth(cursor_col)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| " ".to_string());
                let after: String = row.chars().skip(cursor_col + 1).collect();
                Line::from(vec![
                    Span::styled(before, self.theme.prose_style()),
                    Span::styled(at, cursor_style),
                    Span::styled(after, self.theme.prose_style()),
                ])
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

/// Break `text` into rows of at most `width` chars, hard-wrapping long lines.
/// Returns the rows and the (row, column) of the char at `cursor`.
pub fn wrap_with_cursor(text: &str, cursor: usize, width: usize) -> (Vec<String>, (usize, usize)) {
    let width = width.max(1);
    let mut rows = vec![String::new()];
    let mut col = 0;
    let mut cursor_at = None;

    for (index, c) in text.chars().enumerate() {
        if col == width && c != '\n' {
            rows.push(String::new());
            col = 0;
        }
        if index == cursor {
            cursor_at = Some((rows.len() - 1, col));
        }
        if c == '\n' {
            rows.push(String::new());
            col = 0;
        } else if let Some(row) = rows.last_mut() {
            row.push(c);
            col += 1;
        }
    }

    let cursor_at = cursor_at.unwrap_or_else(|| {
        if col == width {
            rows.push(String::new());
            (rows.len() - 1, 0)
        } else {
            (rows.len() - 1, col)
        }
    });

    (rows, cursor_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_plain_lines() {
        let (rows, cursor) = wrap_with_cursor("ab\ncd", 4, 10);
        assert_eq!(rows, vec!["ab", "cd"]);
        assert_eq!(cursor, (1, 1));
    }

    #[test]
    fn test_wrap_long_line() {
        let (rows, cursor) = wrap_with_cursor("abcdefg", 7, 3);
        assert_eq!(rows, vec!["abc", "def", "g"]);
        assert_eq!(cursor, (2, 1));
    }

    #[test]
    fn test_cursor_at_exact_width_moves_to_new_row() {
        let (rows, cursor) = wrap_with_cursor("abc", 3, 3);
        assert_eq!(rows, vec!["abc", ""]);
        assert_eq!(cursor, (1, 0));
    }

    #[test]
    fn test_cursor_on_newline() {
        let (rows, cursor) = wrap_with_cursor("ab\n", 2, 10);
        assert_eq!(rows, vec!["ab", ""]);
        assert_eq!(cursor, (0, 2));
    }

    #[test]
    fn test_empty_text() {
        let (rows, cursor) = wrap_with_cursor("", 0, 10);
        assert_eq!(rows, vec![""]);
        assert_eq!(cursor, (0, 0));
    }
}
