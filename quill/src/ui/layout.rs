//! Screen layout for the Quill TUI

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Areas of the main screen.
///
/// ```text
/// +----------------------------------------------------+
/// | title                                              |
/// +------------+-------------------------+-------------+
/// | bible      | scene tabs              | agents      |
/// |            | editor                  |             |
/// +------------+-------------------------+-------------+
/// | status bar                                         |
/// | input                                              |
/// +----------------------------------------------------+
/// ```
pub struct AppLayout {
    pub title_area: Rect,
    pub bible_area: Rect,
    pub scene_tabs_area: Rect,
    pub editor_area: Rect,
    pub agent_area: Rect,
    pub status_bar: Rect,
    pub input_area: Rect,
}

impl AppLayout {
    pub fn calculate(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(45),
                Constraint::Percentage(30),
            ])
            .split(rows[1]);

        let center = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(5)])
            .split(columns[1]);

        Self {
            title_area: rows[0],
            bible_area: columns[0],
            scene_tabs_area: center[0],
            editor_area: center[1],
            agent_area: columns[2],
            status_bar: rows[2],
            input_area: rows[3],
        }
    }
}

/// A rectangle of fixed size centered in `area`, clamped to fit.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// A rectangle covering a percentage of `area`, centered.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
