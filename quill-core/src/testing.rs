//! Testing utilities.
//!
//! This module provides tools for testing without API calls:
//! - `ScriptedModel`, a generator that replays canned replies
//! - `TestHarness`, a studio wired to a scripted model and an in-memory store
//! - Assertion helpers for notices and scene state

use crate::agents::{Agents, Generator};
use crate::bible::Bible;
use crate::notice::NoticeLevel;
use crate::persist::{MemoryStore, StoryStore, BIBLE_KEY, SCENES_KEY};
use crate::scene::Scene;
use crate::studio::{AgentRequest, AgentService, Edit, Studio, StudioError};
use async_trait::async_trait;
use gemini::{FinishReason, InlineData, Part, Request, Response, Usage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A canned reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Inline(InlineData),
    Empty,
    Error(String),
}

#[derive(Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<Request>,
}

/// A generator that returns scripted replies in order and records every
/// request it receives. Clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<Script>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.queue(ScriptedReply::Text(text.into()));
        self
    }

    pub fn with_empty(self) -> Self {
        self.queue(ScriptedReply::Empty);
        self
    }

    pub fn with_inline(self, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        self.queue(ScriptedReply::Inline(InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        }));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.queue(ScriptedReply::Error(message.into()));
        self
    }

    /// Add a reply to the end of the script.
    pub fn queue(&self, reply: ScriptedReply) {
        self.lock().replies.push_back(reply);
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.lock().requests.last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().replies.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn response(content: Vec<Part>) -> Response {
    Response {
        model: "scripted".to_string(),
        content,
        finish_reason: FinishReason::Stop,
        usage: Usage::default(),
    }
}

#[async_trait]
impl Generator for ScriptedModel {
    async fn generate(&self, request: Request) -> Result<Response, gemini::Error> {
        let reply = {
            let mut script = self.lock();
            script.requests.push(request);
            script.replies.pop_front()
        };

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(response(vec![Part::Text { text }])),
            Some(ScriptedReply::Inline(data)) => Ok(response(vec![Part::InlineData(data)])),
            Some(ScriptedReply::Empty) => Ok(response(Vec::new())),
            Some(ScriptedReply::Error(message)) => Err(gemini::Error::Network(message)),
            None => Err(gemini::Error::Network(
                "scripted model has no replies left".to_string(),
            )),
        }
    }
}

/// Test harness for studio scenarios.
pub struct TestHarness {
    pub studio: Studio<ScriptedModel>,
    pub model: ScriptedModel,
    pub store: MemoryStore,
}

impl TestHarness {
    /// A studio with agents available, not yet loaded.
    pub fn new() -> Self {
        let model = ScriptedModel::new();
        let store = MemoryStore::new();
        let studio = Studio::new(
            StoryStore::new(store.clone()),
            AgentService::Available(Agents::new(model.clone())),
        );
        Self {
            studio,
            model,
            store,
        }
    }

    /// A studio with no API key configured.
    pub fn without_agents() -> Self {
        let model = ScriptedModel::new();
        let store = MemoryStore::new();
        let studio = Studio::new(
            StoryStore::new(store.clone()),
            AgentService::unavailable("no API key"),
        );
        Self {
            studio,
            model,
            store,
        }
    }

    /// Load the (empty) store so edits start persisting.
    pub async fn loaded(mut self) -> Self {
        if let Err(e) = self.studio.load().await {
            panic!("in-memory load failed: {e}");
        }
        self
    }

    /// Queue a text reply.
    pub fn expect_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.model.queue(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue an empty reply.
    pub fn expect_empty(&mut self) -> &mut Self {
        self.model.queue(ScriptedReply::Empty);
        self
    }

    /// Queue an inline binary reply.
    pub fn expect_inline(
        &mut self,
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> &mut Self {
        self.model.queue(ScriptedReply::Inline(InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        }));
        self
    }

    /// Queue a transport failure.
    pub fn expect_error(&mut self, message: impl Into<String>) -> &mut Self {
        self.model.queue(ScriptedReply::Error(message.into()));
        self
    }

    pub async fn apply(&mut self, edit: Edit) -> bool {
        self.studio.apply(edit).await
    }

    pub async fn run(&mut self, request: AgentRequest) -> Result<(), StudioError> {
        self.studio.run_agent(request).await
    }

    pub fn active(&self) -> &Scene {
        self.studio.active_scene()
    }

    /// Scenes as currently written to the store.
    pub fn stored_scenes(&self) -> Option<Vec<Scene>> {
        serde_json::from_str(&self.store.raw(SCENES_KEY)?).ok()
    }

    /// Bible as currently written to the store.
    pub fn stored_bible(&self) -> Option<Bible> {
        serde_json::from_str(&self.store.raw(BIBLE_KEY)?).ok()
    }

    pub fn request_count(&self) -> usize {
        self.model.request_count()
    }

    /// Message of the most recent notice, or "" when there is none.
    pub fn latest_notice(&self) -> &str {
        self.studio
            .latest_notice()
            .map(|n| n.message.as_str())
            .unwrap_or("")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert that some notice contains `text`.
#[track_caller]
pub fn assert_notice_contains<G: Generator>(studio: &Studio<G>, text: &str) {
    let found = studio.notices().iter().any(|n| n.message.contains(text));
    assert!(
        found,
        "no notice containing {text:?}; notices: {:?}",
        studio.notices().iter().map(|n| &n.message).collect::<Vec<_>>()
    );
}

/// Assert that the most recent notice is an error.
#[track_caller]
pub fn assert_latest_error<G: Generator>(studio: &Studio<G>) {
    let level = studio.latest_notice().map(|n| n.level);
    assert_eq!(level, Some(NoticeLevel::Error), "latest notice is not an error");
}

/// Assert that no agent is marked as working.
#[track_caller]
pub fn assert_idle<G: Generator>(studio: &Studio<G>) {
    assert!(
        !studio.is_working(),
        "agent still working: {:?}",
        studio.status()
    );
}
