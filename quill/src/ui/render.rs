//! Render orchestration for the Quill TUI

use quill_core::{AgentService, Generator};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Confirm, InputMode};
use crate::ui::layout::{centered_rect, centered_rect_fixed, AppLayout};
use crate::ui::widgets::{
    AgentPanelWidget, BiblePanelWidget, EditorWidget, InputWidget, SceneTabsWidget, ServiceInfo,
    StatusBarWidget, TextAreaWidget,
};

/// Which panel is focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusedPanel {
    #[default]
    Bible,
    Editor,
    Agents,
}

/// Overlay types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Confirm(Confirm),
}

/// Main render function
pub fn render<G: Generator>(frame: &mut Frame, app: &App<G>) {
    let area = frame.area();
    let layout = AppLayout::calculate(area);

    render_title_bar(frame, app, layout.title_area);
    render_bible(frame, app, layout.bible_area);

    let scene_tabs = SceneTabsWidget::new(
        app.studio.scenes(),
        app.studio.manuscript().active_position(),
        &app.theme,
    )
    .focused(app.focused_panel == FocusedPanel::Editor);
    frame.render_widget(scene_tabs, layout.scene_tabs_area);

    let editor = EditorWidget::new(app.studio.active_scene(), &app.theme)
        .focused(app.focused_panel == FocusedPanel::Editor)
        .selected(app.scene_field)
        .scroll(app.editor_scroll);
    frame.render_widget(editor, layout.editor_area);

    let agents = AgentPanelWidget::new(app.agent_tab, app.studio.active_scene(), &app.theme)
        .focused(app.focused_panel == FocusedPanel::Agents)
        .status(app.studio.status())
        .continuity(app.studio.continuity())
        .models(app.studio.service().models())
        .plan_idea(&app.plan_idea)
        .instructions(&app.edit_instructions);
    frame.render_widget(agents, layout.agent_area);

    let status = StatusBarWidget::new(app.input_mode, &app.theme)
        .status(app.studio.status())
        .notice(app.notice())
        .message(app.status_message());
    frame.render_widget(status, layout.status_bar);

    render_input(frame, app, layout.input_area);

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, app, overlay, area);
    }
}

/// Render the title bar
fn render_title_bar<G: Generator>(frame: &mut Frame, app: &App<G>, area: Rect) {
    let scene = app.studio.active_scene();
    let title = format!(
        " Quill | {} | scene {}/{} | {} words ",
        scene.title,
        app.studio.manuscript().active_position() + 1,
        app.studio.scenes().len(),
        scene.word_count()
    );

    let line = Line::from(Span::styled(
        title,
        app.theme.text_style().add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_bible<G: Generator>(frame: &mut Frame, app: &App<G>, area: Rect) {
    let unavailable_reason = match app.studio.service() {
        AgentService::Unavailable { reason } => Some(reason.as_str()),
        AgentService::Available(_) => None,
    };

    let widget = BiblePanelWidget::new(app.studio.bible(), app.bible_tab, &app.theme)
        .focused(app.focused_panel == FocusedPanel::Bible)
        .cursors(app.character_cursor, app.location_cursor)
        .service(ServiceInfo {
            models: app.studio.service().models(),
            unavailable_reason,
            data_dir: app.data_dir(),
        });
    frame.render_widget(widget, area);
}

/// Render the input area, or the text editor popup for multi-line fields
fn render_input<G: Generator>(frame: &mut Frame, app: &App<G>, area: Rect) {
    let editing = app.edit_target().filter(|_| app.input_mode == InputMode::Insert);

    if let Some(target) = editing.filter(|t| t.is_multiline()) {
        let popup = centered_rect(80, 70, frame.area());
        frame.render_widget(Clear, popup);
        let text_area = TextAreaWidget::new(app.input_buffer(), target.label(), &app.theme)
            .cursor_position(app.cursor_position());
        frame.render_widget(text_area, popup);

        frame.render_widget(
            InputWidget::new("", &app.theme)
                .active(false)
                .placeholder("Editing in the popup above"),
            area,
        );
        return;
    }

    let is_command = app.input_mode == InputMode::Command;
    let mut input = InputWidget::new(app.input_buffer(), &app.theme)
        .cursor_position(app.cursor_position())
        .active(editing.is_some() || is_command)
        .command_mode(is_command);

    if let Some(target) = editing {
        input = input.title(target.label());
    } else if app.studio.is_working() {
        input = input.placeholder("Working...");
    }

    frame.render_widget(input, area);
}

/// Render overlay
fn render_overlay<G: Generator>(frame: &mut Frame, app: &App<G>, overlay: &Overlay, area: Rect) {
    match overlay {
        Overlay::Help => render_help_overlay(frame, app, area),
        Overlay::Confirm(confirm) => render_confirm_overlay(frame, app, confirm, area),
    }
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default().add_modifier(Modifier::UNDERLINED),
    ))
}

/// Render help overlay
fn render_help_overlay<G: Generator>(frame: &mut Frame, app: &App<G>, area: Rect) {
    let popup_area = centered_rect_fixed(62, 36, area);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            " Quill - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("Modes:"),
        Line::from("  i / e       Edit the selected field"),
        Line::from("  :           Enter COMMAND mode"),
        Line::from("  Esc         Save the edit and return to NORMAL"),
        Line::from(""),
        section("Navigation (NORMAL mode):"),
        Line::from("  Tab / 1-3   Switch panel (bible, editor, agents)"),
        Line::from("  h/l         Switch tab; in the editor, switch scene"),
        Line::from("  j/k         Move selection"),
        Line::from("  [ / ]       Previous / next scene"),
        Line::from("  Ctrl+d/u    Scroll the draft"),
        Line::from(""),
        section("Actions:"),
        Line::from("  a / d       Add / delete (cast, places, scenes)"),
        Line::from("  n           New scene"),
        Line::from("  Enter       Run the agent on the current tab"),
        Line::from("  P W C E V   Plan, write, check, edit, paint"),
        Line::from("  S           Read the draft aloud"),
        Line::from("  X           Export the scene image"),
        Line::from("  R           Reset all data"),
        Line::from("  q           Quit"),
        Line::from(""),
        section("Commands:"),
        Line::from("  :plan <idea>   :write   :check   :edit <how>"),
        Line::from("  :paint   :read   :stop   :export [path]"),
        Line::from("  :new   :del   :scene <n>   :title <text>"),
        Line::from("  :reset   :q"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or q to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

/// Render a yes/no dialog
fn render_confirm_overlay<G: Generator>(
    frame: &mut Frame,
    app: &App<G>,
    confirm: &Confirm,
    area: Rect,
) {
    let popup_area = centered_rect_fixed(50, 7, area);
    frame.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            confirm.prompt(),
            app.theme.text_style().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y to confirm, n or Esc to cancel",
            app.theme.muted_style(),
        )),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.error));

    frame.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(ratatui::layout::Alignment::Center)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}
