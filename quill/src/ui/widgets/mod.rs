//! TUI widgets for the writing studio

pub mod agent_panel;
pub mod bible_panel;
pub mod editor;
pub mod input;
pub mod scene_tabs;
pub mod status_bar;

pub use agent_panel::AgentPanelWidget;
pub use bible_panel::{BiblePanelWidget, ServiceInfo};
pub use editor::EditorWidget;
pub use input::{InputWidget, TextAreaWidget};
pub use scene_tabs::SceneTabsWidget;
pub use status_bar::StatusBarWidget;
