//! Scenes and the ordered scene collection.

use crate::bible::new_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The agent that last wrote into a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorAgent {
    Planner,
    Writer,
    Editor,
    Visualizer,
}

impl fmt::Display for AuthorAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthorAgent::Planner => "planner",
            AuthorAgent::Writer => "writer",
            AuthorAgent::Editor => "editor",
            AuthorAgent::Visualizer => "visualizer",
        })
    }
}

/// One unit of narrative work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub beat_sheet: String,
    #[serde(default)]
    pub content: String,
    /// Illustration as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Informational only; nothing increments it.
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub last_agent: Option<AuthorAgent>,
}

fn first_version() -> u32 {
    1
}

impl Scene {
    /// Create an empty scene with a fresh id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(new_id(), title)
    }

    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            beat_sheet: String::new(),
            content: String::new(),
            image_url: None,
            version: first_version(),
            last_agent: None,
        }
    }

    /// The scene every new project starts with.
    pub fn opening() -> Self {
        Self::with_id("scene-1", "Chapter 1: The Glitch")
    }

    pub fn set(&mut self, field: SceneField, value: &str) {
        match field {
            SceneField::Title => self.title = value.to_string(),
            SceneField::BeatSheet => self.beat_sheet = value.to_string(),
            SceneField::Content => self.content = value.to_string(),
        }
    }

    pub fn get(&self, field: SceneField) -> &str {
        match field {
            SceneField::Title => &self.title,
            SceneField::BeatSheet => &self.beat_sheet,
            SceneField::Content => &self.content,
        }
    }

    /// Word count of the draft.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Editable scene fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneField {
    Title,
    BeatSheet,
    Content,
}

impl fmt::Display for SceneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SceneField::Title => "title",
            SceneField::BeatSheet => "plan",
            SceneField::Content => "draft",
        })
    }
}

impl FromStr for SceneField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SceneField::Title),
            "plan" | "beats" | "beatsheet" => Ok(SceneField::BeatSheet),
            "content" | "draft" | "text" => Ok(SceneField::Content),
            other => Err(format!("unknown scene field '{other}'")),
        }
    }
}

/// Ordered scenes plus the active selection.
///
/// Never empty: the last remaining scene cannot be deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Manuscript {
    scenes: Vec<Scene>,
    active_id: String,
}

impl Default for Manuscript {
    fn default() -> Self {
        let opening = Scene::opening();
        Self {
            active_id: opening.id.clone(),
            scenes: vec![opening],
        }
    }
}

impl Manuscript {
    /// Build from loaded scenes. An empty list yields the default manuscript.
    pub fn from_scenes(scenes: Vec<Scene>) -> Self {
        match scenes.first() {
            Some(first) => Self {
                active_id: first.id.clone(),
                scenes,
            },
            None => Self::default(),
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    fn active_index(&self) -> usize {
        self.scenes
            .iter()
            .position(|s| s.id == self.active_id)
            .unwrap_or(0)
    }

    /// The active scene, or the first one if the selection is stale.
    pub fn active(&self) -> &Scene {
        &self.scenes[self.active_index()]
    }

    pub fn active_mut(&mut self) -> &mut Scene {
        let index = self.active_index();
        &mut self.scenes[index]
    }

    /// Position of the active scene in the list.
    pub fn active_position(&self) -> usize {
        self.active_index()
    }

    pub fn get(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    /// Append a new scene titled "Scene N" and make it active.
    pub fn add_scene(&mut self) -> &Scene {
        let scene = Scene::new(format!("Scene {}", self.scenes.len() + 1));
        self.active_id = scene.id.clone();
        self.scenes.push(scene);
        let last = self.scenes.len() - 1;
        &self.scenes[last]
    }

    /// Remove a scene. A no-op on the last remaining scene or an unknown id.
    pub fn delete_scene(&mut self, id: &str) -> bool {
        if self.scenes.len() <= 1 {
            return false;
        }
        let Some(index) = self.scenes.iter().position(|s| s.id == id) else {
            return false;
        };

        self.scenes.remove(index);
        if self.active_id == id {
            let neighbour = index.min(self.scenes.len() - 1);
            self.active_id = self.scenes[neighbour].id.clone();
        }
        true
    }

    /// Change the active scene. Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if self.scenes.iter().any(|s| s.id == id) {
            self.active_id = id.to_string();
            true
        } else {
            false
        }
    }

    /// Select by position, wrapping around.
    pub fn select_offset(&mut self, offset: isize) {
        let len = self.scenes.len() as isize;
        let next = (self.active_index() as isize + offset).rem_euclid(len) as usize;
        self.active_id = self.scenes[next].id.clone();
    }

    pub fn update_active(&mut self, field: SceneField, value: &str) {
        self.active_mut().set(field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manuscript() {
        let manuscript = Manuscript::default();
        assert_eq!(manuscript.len(), 1);
        assert_eq!(manuscript.active().id, "scene-1");
        assert_eq!(manuscript.active().title, "Chapter 1: The Glitch");
        assert_eq!(manuscript.active().version, 1);
        assert!(manuscript.active().last_agent.is_none());
    }

    #[test]
    fn test_add_scene_becomes_active() {
        let mut manuscript = Manuscript::default();
        let id = manuscript.add_scene().id.clone();

        assert_eq!(manuscript.len(), 2);
        assert_eq!(manuscript.active_id(), id);
        assert_eq!(manuscript.active().title, "Scene 2");
    }

    #[test]
    fn test_cannot_delete_last_scene() {
        let mut manuscript = Manuscript::default();
        assert!(!manuscript.delete_scene("scene-1"));
        assert_eq!(manuscript.len(), 1);
    }

    #[test]
    fn test_delete_active_selects_neighbour() {
        let mut manuscript = Manuscript::default();
        let second = manuscript.add_scene().id.clone();
        let third = manuscript.add_scene().id.clone();

        manuscript.select(&second);
        assert!(manuscript.delete_scene(&second));
        assert_eq!(manuscript.active_id(), third);

        assert!(manuscript.delete_scene(&third));
        assert_eq!(manuscript.active_id(), "scene-1");
    }

    #[test]
    fn test_never_empty_under_churn() {
        let mut manuscript = Manuscript::default();
        for round in 0..20 {
            if round % 3 == 0 {
                manuscript.add_scene();
            }
            let ids: Vec<String> = manuscript.scenes().iter().map(|s| s.id.clone()).collect();
            for id in ids {
                manuscript.delete_scene(&id);
            }
            assert!(!manuscript.is_empty());
            assert!(manuscript.get(manuscript.active_id()).is_some());
        }
    }

    #[test]
    fn test_select_unknown_is_ignored() {
        let mut manuscript = Manuscript::default();
        assert!(!manuscript.select("nope"));
        assert_eq!(manuscript.active_id(), "scene-1");
    }

    #[test]
    fn test_select_offset_wraps() {
        let mut manuscript = Manuscript::default();
        manuscript.add_scene();
        manuscript.select_offset(1);
        assert_eq!(manuscript.active_id(), "scene-1");
        manuscript.select_offset(-1);
        assert_eq!(manuscript.active().title, "Scene 2");
    }

    #[test]
    fn test_scene_serialized_shape() {
        let mut scene = Scene::opening();
        scene.last_agent = Some(AuthorAgent::Writer);
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["beatSheet"], "");
        assert_eq!(json["lastAgent"], "writer");
        assert!(json.get("imageUrl").is_none());

        let plain: Scene =
            serde_json::from_str(r#"{"id":"a","title":"T","beatSheet":"","content":"","version":1,"lastAgent":null}"#)
                .unwrap();
        assert!(plain.last_agent.is_none());
    }
}
