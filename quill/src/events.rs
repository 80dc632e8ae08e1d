//! Event handling for the Quill TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use quill_core::{AgentKind, Generator};

use crate::app::{App, InputMode, PendingOp};
use crate::ui::{FocusedPanel, Overlay};

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event<G: Generator>(app: &mut App<G>, event: Event) -> EventResult {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a mouse event
fn handle_mouse_event<G: Generator>(app: &mut App<G>, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_editor(-3);
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_editor(3);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event<G: Generator>(app: &mut App<G>, key: KeyEvent) -> EventResult {
    // Global shortcuts (always work)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    // Handle overlay keys first
    if app.has_overlay() {
        return handle_overlay_key(app, key);
    }

    // Route based on input mode
    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Insert => handle_insert_mode(app, key),
        InputMode::Command => handle_command_mode(app, key),
    }
}

/// Handle keys while an overlay is open
fn handle_overlay_key<G: Generator>(app: &mut App<G>, key: KeyEvent) -> EventResult {
    let confirming = matches!(app.overlay(), Some(Overlay::Confirm(_)));

    if confirming {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm(false),
            _ => return EventResult::Continue,
        }
    } else {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
                app.close_overlay()
            }
            _ => return EventResult::Continue,
        }
    }
    EventResult::NeedsRedraw
}

/// Handle keys in NORMAL mode (vim-style navigation and hotkeys)
fn handle_normal_mode<G: Generator>(app: &mut App<G>, key: KeyEvent) -> EventResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Mode switching
        KeyCode::Char('i') | KeyCode::Char('e') => app.begin_edit(),
        KeyCode::Char(':') => app.enter_command_mode(),

        // Help
        KeyCode::Char('?') | KeyCode::F(1) => app.toggle_help(),

        // Quit
        KeyCode::Char('q') => return EventResult::Quit,

        // Scrolling the draft
        KeyCode::Char('d') if ctrl => app.scroll_editor(10),
        KeyCode::Char('u') if ctrl => app.scroll_editor(-10),
        KeyCode::PageDown => app.scroll_editor(10),
        KeyCode::PageUp => app.scroll_editor(-10),

        // Selection
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('l') | KeyCode::Right => app.next_tab(),
        KeyCode::Char('h') | KeyCode::Left => app.prev_tab(),
        KeyCode::Char(']') => app.select_scene_offset(1),
        KeyCode::Char('[') => app.select_scene_offset(-1),

        // Panel focus
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::BackTab => app.cycle_focus_reverse(),
        KeyCode::Char('1') => app.focused_panel = FocusedPanel::Bible,
        KeyCode::Char('2') => app.focused_panel = FocusedPanel::Editor,
        KeyCode::Char('3') => app.focused_panel = FocusedPanel::Agents,

        // Items
        KeyCode::Char('a') => app.add_item(),
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('n') => app.queue(PendingOp::Apply(quill_core::Edit::AddScene)),

        // Agents
        KeyCode::Enter => {
            if app.focused_panel == FocusedPanel::Agents {
                app.run_selected_agent();
            } else {
                app.begin_edit();
            }
        }
        KeyCode::Char('P') => app.run_agent(AgentKind::Planner),
        KeyCode::Char('W') => app.run_agent(AgentKind::Writer),
        KeyCode::Char('C') => app.run_agent(AgentKind::Continuity),
        KeyCode::Char('E') => app.run_agent(AgentKind::Editor),
        KeyCode::Char('V') => app.run_agent(AgentKind::Visualizer),
        KeyCode::Char('S') => app.queue(PendingOp::ReadAloud),
        KeyCode::Char('X') => app.queue(PendingOp::ExportImage(None)),
        KeyCode::Char('R') => app.request_reset(),

        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle keys in INSERT mode (editing a field)
fn handle_insert_mode<G: Generator>(app: &mut App<G>, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => app.finish_edit(),
        KeyCode::Enter => app.submit_edit(),
        KeyCode::Char(c) => app.type_char(c),
        KeyCode::Tab => app.type_char('\t'),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Up => app.cursor_up(),
        KeyCode::Down => app.cursor_down(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle keys in COMMAND mode
fn handle_command_mode<G: Generator>(app: &mut App<G>, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),
        KeyCode::Enter => {
            let command = app.submit_command();
            app.process_command(&command);
            if app.should_quit {
                return EventResult::Quit;
            }
        }
        KeyCode::Backspace => {
            app.backspace();
            // Deleting the ':' leaves command mode
            if app.input_buffer().is_empty() {
                app.enter_normal_mode();
            }
        }
        KeyCode::Char(c) => app.type_char(c),
        KeyCode::Left => {
            if app.cursor_position() > 1 {
                app.cursor_left();
            }
        }
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => {
            app.cursor_home();
            app.cursor_right();
        }
        KeyCode::End => app.cursor_end(),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{BibleTab, EditTarget};
    use quill_core::{AgentService, QuillConfig, ScriptedModel, StoryStore, Studio};

    fn app() -> App<ScriptedModel> {
        let studio = Studio::new(StoryStore::in_memory(), AgentService::unavailable("test"));
        App::new(studio, &QuillConfig::default().with_data_dir("/tmp/quill-events"))
    }

    fn press(app: &mut App<ScriptedModel>, code: KeyCode) -> EventResult {
        handle_event(app, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_str(app: &mut App<ScriptedModel>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_q_quits_in_normal_mode() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char('q')), EventResult::Quit);
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let mut app = app();
        press(&mut app, KeyCode::Char('i'));
        let result = handle_event(
            &mut app,
            Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert_eq!(result, EventResult::Quit);
    }

    #[test]
    fn test_typing_q_in_insert_mode_does_not_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.edit_target(), Some(&EditTarget::Summary));
        assert_eq!(press(&mut app, KeyCode::Char('q')), EventResult::NeedsRedraw);
        assert!(app.input_buffer().ends_with('q'));
    }

    #[test]
    fn test_command_mode_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Char(':'));
        assert_eq!(app.input_mode, InputMode::Command);
        type_str(&mut app, "q");
        assert_eq!(press(&mut app, KeyCode::Enter), EventResult::Quit);
    }

    #[test]
    fn test_backspace_past_colon_leaves_command_mode() {
        let mut app = app();
        press(&mut app, KeyCode::Char(':'));
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_tab_and_tabs_navigation() {
        let mut app = app();
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.bible_tab, BibleTab::Characters);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focused_panel, FocusedPanel::Editor);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.focused_panel, FocusedPanel::Agents);
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.has_overlay());
        assert_eq!(press(&mut app, KeyCode::Char('j')), EventResult::Continue);
        press(&mut app, KeyCode::Esc);
        assert!(!app.has_overlay());
    }

    #[test]
    fn test_reset_asks_first() {
        let mut app = app();
        press(&mut app, KeyCode::Char('R'));
        assert!(matches!(app.overlay(), Some(Overlay::Confirm(_))));
        press(&mut app, KeyCode::Char('n'));
        assert!(!app.has_overlay());
        assert!(!app.has_pending());
    }

    #[test]
    fn test_agent_hotkeys_queue_work() {
        let mut app = app();
        press(&mut app, KeyCode::Char('W'));
        assert_eq!(
            app.take_pending(),
            Some(PendingOp::Agent(quill_core::AgentRequest::Write))
        );
        assert_eq!(app.agent_tab, AgentKind::Writer);
    }
}
