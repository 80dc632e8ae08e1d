//! Color theme and styling for the Quill TUI

use quill_core::{NoticeLevel, Severity};
use ratatui::style::{Color, Modifier, Style};

/// Studio UI color theme
#[derive(Debug, Clone)]
pub struct StudioTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub accent: Color,

    // Notice colors
    pub info: Color,
    pub success: Color,
    pub error: Color,

    // Continuity severity
    pub critical: Color,
    pub warning: Color,

    // Text colors
    pub muted_text: Color,
    pub prose_text: Color,
    pub plan_text: Color,
    pub working_text: Color,
}

impl Default for StudioTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            accent: Color::Magenta,

            info: Color::Cyan,
            success: Color::Green,
            error: Color::Red,

            critical: Color::LightRed,
            warning: Color::Yellow,

            muted_text: Color::DarkGray,
            prose_text: Color::White,
            plan_text: Color::LightBlue,
            working_text: Color::Yellow,
        }
    }
}

impl StudioTheme {
    /// Get style for normal text
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    /// Get style for scene prose
    pub fn prose_style(&self) -> Style {
        Style::default().fg(self.prose_text)
    }

    /// Get style for beat sheets
    pub fn plan_style(&self) -> Style {
        Style::default().fg(self.plan_text)
    }

    /// Get style for hints and placeholders
    pub fn muted_style(&self) -> Style {
        Style::default()
            .fg(self.muted_text)
            .add_modifier(Modifier::DIM)
    }

    /// Get style for a field label
    pub fn label_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for the selected row of a list
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.border_focused)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    /// Get style for the "agent working" indicator
    pub fn working_style(&self) -> Style {
        Style::default()
            .fg(self.working_text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn notice_style(&self, level: NoticeLevel) -> Style {
        let color = match level {
            NoticeLevel::Info => self.info,
            NoticeLevel::Success => self.success,
            NoticeLevel::Error => self.error,
        };
        Style::default().fg(color)
    }

    pub fn severity_style(&self, severity: Severity) -> Style {
        match severity {
            Severity::Critical => Style::default()
                .fg(self.critical)
                .add_modifier(Modifier::BOLD),
            Severity::Warning => Style::default().fg(self.warning),
        }
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Get title style
    pub fn title_style(&self, focused: bool) -> Style {
        let style = Style::default().fg(if focused {
            self.border_focused
        } else {
            self.foreground
        });

        if focused {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// Get style for a tab label
    pub fn tab_style(&self, active: bool) -> Style {
        if active {
            Style::default()
                .fg(self.border_focused)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(self.muted_text)
        }
    }
}
