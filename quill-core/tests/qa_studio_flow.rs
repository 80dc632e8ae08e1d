//! QA tests for the studio's agent flow using scripted model replies.
//!
//! Run with: `cargo test -p quill-core --test qa_studio_flow`

use quill_core::studio::{
    AUTO_CHECK_FAILED_NOTICE, FAILED_NOTICE, UNAVAILABLE_NOTICE, UNREADABLE_NOTICE,
};
use quill_core::testing::{assert_idle, assert_latest_error, assert_notice_contains};
use quill_core::{
    AgentRequest, AuthorAgent, Bible, Character, Edit, SceneField, Severity, StudioError,
    TestHarness,
};

// =============================================================================
// Scenes
// =============================================================================

#[tokio::test]
async fn test_add_scene_after_chapter_one() {
    let mut harness = TestHarness::new().loaded().await;
    assert_eq!(harness.active().title, "Chapter 1: The Glitch");

    harness.apply(Edit::AddScene).await;

    assert_eq!(harness.studio.scenes().len(), 2);
    assert_eq!(harness.active().title, "Scene 2");
    assert_eq!(harness.active().version, 1);
    assert!(harness.active().last_agent.is_none());
}

#[tokio::test]
async fn test_last_scene_cannot_be_deleted() {
    let mut harness = TestHarness::new().loaded().await;
    let only = harness.active().id.clone();

    assert!(!harness.apply(Edit::DeleteScene(only)).await);
    assert_eq!(harness.studio.scenes().len(), 1);
}

// =============================================================================
// Missing credential
// =============================================================================

#[tokio::test]
async fn test_every_agent_blocked_without_credential() {
    let mut harness = TestHarness::without_agents().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::BeatSheet,
            value: "1. Rain".into(),
        })
        .await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::Content,
            value: "Kaito waited.".into(),
        })
        .await;
    let before = harness.active().clone();

    let requests = [
        AgentRequest::Plan {
            idea: "chase".into(),
        },
        AgentRequest::Write,
        AgentRequest::CheckContinuity,
        AgentRequest::Edit {
            instructions: "tighten".into(),
        },
        AgentRequest::Visualize,
    ];

    for request in requests {
        let result = harness.run(request).await;
        assert!(matches!(result, Err(StudioError::Unavailable(_))));
        assert_eq!(harness.latest_notice(), UNAVAILABLE_NOTICE);
        assert_latest_error(&harness.studio);
        assert_idle(&harness.studio);
        assert_eq!(harness.active(), &before);
    }

    assert!(harness.studio.read_aloud().await.is_err());
    assert_eq!(harness.request_count(), 0);
    assert!(harness.studio.continuity().is_none());
}

// =============================================================================
// Planner and writer
// =============================================================================

#[tokio::test]
async fn test_plan_stamps_scene() {
    let mut harness = TestHarness::new().loaded().await;
    harness.expect_text("1. Kaito enters.\n2. Aria watches.");

    harness
        .run(AgentRequest::Plan {
            idea: "First meeting".into(),
        })
        .await
        .unwrap();

    assert_eq!(harness.active().beat_sheet, "1. Kaito enters.\n2. Aria watches.");
    assert_eq!(harness.active().last_agent, Some(AuthorAgent::Planner));
    assert_eq!(harness.active().version, 1);
    assert_idle(&harness.studio);

    let stored = harness.stored_scenes().unwrap();
    assert_eq!(stored[0].beat_sheet, harness.active().beat_sheet);
}

#[tokio::test]
async fn test_writer_runs_continuity_automatically() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .expect_text("1. Rain")
        .expect_text("Rain fell on the Neon Bazaar.")
        .expect_text(r#"{"errors": []}"#);

    harness
        .run(AgentRequest::Plan {
            idea: "rain".into(),
        })
        .await
        .unwrap();
    harness.run(AgentRequest::Write).await.unwrap();

    assert_eq!(harness.active().content, "Rain fell on the Neon Bazaar.");
    assert_eq!(harness.active().last_agent, Some(AuthorAgent::Writer));
    assert_notice_contains(&harness.studio, "Draft written! Now checking consistency...");
    assert_eq!(harness.latest_notice(), "Perfect! No continuity errors found.");
    assert!(harness.studio.continuity().unwrap().is_clean());

    // Plan, write, then the automatic check on the fresh draft.
    let requests = harness.model.requests();
    assert_eq!(requests.len(), 3);
    match &requests[2].contents[0].parts[0] {
        gemini::Part::Text { text } => assert!(text.contains("Rain fell on the Neon Bazaar.")),
        other => panic!("unexpected part {other:?}"),
    }
    assert_idle(&harness.studio);
}

#[tokio::test]
async fn test_writer_reports_issue_count() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::BeatSheet,
            value: "1. Aria dies".into(),
        })
        .await;
    harness.expect_text("Aria died. Aria smiled.").expect_text(
        r#"{"errors": [{"type": "Character Inconsistency", "description": "Aria smiles after dying."},
                       {"type": "Timeline", "description": "Order unclear."}]}"#,
    );

    harness.run(AgentRequest::Write).await.unwrap();

    assert_eq!(
        harness.latest_notice(),
        "Found 2 continuity issues. Check the continuity tab."
    );
    assert_eq!(harness.studio.continuity().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_writer_reply_is_sentinel() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::BeatSheet,
            value: "1. Rain".into(),
        })
        .await;
    harness.expect_empty().expect_text("{}");

    harness.run(AgentRequest::Write).await.unwrap();
    assert_eq!(harness.active().content, "Failed.");
}

// =============================================================================
// Continuity
// =============================================================================

#[tokio::test]
async fn test_deceased_character_is_flagged() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::SetSummary("Detective investigates androids".into()))
        .await;
    harness.apply(Edit::AddCharacter).await;
    let id = harness.studio.bible().characters.last().unwrap().id.clone();
    for (field, value) in [
        (quill_core::CharacterField::Name, "Mori"),
        (quill_core::CharacterField::ArcStatus, "Deceased"),
    ] {
        harness
            .apply(Edit::UpdateCharacter {
                id: id.clone(),
                field,
                value: value.into(),
            })
            .await;
    }
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::Content,
            value: "Mori poured Kaito a drink and laughed.".into(),
        })
        .await;

    harness.expect_text(
        "```json\n{\"errors\": [{\"severity\": \"critical\", \"type\": \"Character Inconsistency\", \"description\": \"Mori is deceased but appears alive.\"}]}\n```",
    );
    harness.run(AgentRequest::CheckContinuity).await.unwrap();

    let report = harness.studio.continuity().unwrap();
    assert!(!report.unparsed);
    assert!(report.issues.iter().any(|i| i.is_character_issue()));
    assert_eq!(report.issues[0].severity, Severity::Critical);

    let prompt = match &harness.model.last_request().unwrap().contents[0].parts[0] {
        gemini::Part::Text { text } => text.clone(),
        other => panic!("unexpected part {other:?}"),
    };
    assert!(prompt.contains("- Mori: Description... [Status: Deceased]"));
}

#[tokio::test]
async fn test_clean_check_notice() {
    let mut harness = TestHarness::new().loaded().await;
    harness.expect_text(r#"{"result": "fine"}"#);

    harness.run(AgentRequest::CheckContinuity).await.unwrap();

    assert_eq!(harness.latest_notice(), "No errors found.");
    assert!(harness.studio.continuity().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_check_is_not_reported_clean() {
    let mut harness = TestHarness::new().loaded().await;
    harness.expect_text("Everything looks consistent to me!");

    harness.run(AgentRequest::CheckContinuity).await.unwrap();

    let report = harness.studio.continuity().unwrap();
    assert!(report.unparsed);
    assert!(!report.is_clean());
    assert_eq!(harness.latest_notice(), UNREADABLE_NOTICE);
}

// =============================================================================
// Editor and visualizer
// =============================================================================

#[tokio::test]
async fn test_editor_empty_reply_keeps_text() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::Content,
            value: "The rain fell.".into(),
        })
        .await;
    harness.expect_empty();

    harness
        .run(AgentRequest::Edit {
            instructions: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(harness.active().content, "The rain fell.");
    assert_eq!(harness.active().last_agent, Some(AuthorAgent::Editor));
}

#[tokio::test]
async fn test_visualizer_uses_plan_when_no_draft() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::BeatSheet,
            value: "1. Neon rain".into(),
        })
        .await;
    harness.expect_inline("image/jpeg", "/9j/4AAQ");

    harness.run(AgentRequest::Visualize).await.unwrap();

    assert_eq!(
        harness.active().image_url.as_deref(),
        Some("data:image/jpeg;base64,/9j/4AAQ")
    );
    assert_eq!(harness.active().last_agent, Some(AuthorAgent::Visualizer));

    let prompt = match &harness.model.last_request().unwrap().contents[0].parts[0] {
        gemini::Part::Text { text } => text.clone(),
        other => panic!("unexpected part {other:?}"),
    };
    assert!(prompt.ends_with("Content: 1. Neon rain"));
}

#[tokio::test]
async fn test_visualizer_without_image_leaves_scene() {
    let mut harness = TestHarness::new().loaded().await;
    harness.expect_text("No image for you.");

    harness.run(AgentRequest::Visualize).await.unwrap();

    assert!(harness.active().image_url.is_none());
    assert!(harness.active().last_agent.is_none());
}

#[tokio::test]
async fn test_export_image() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let mut harness = TestHarness::new().loaded().await;
    harness.expect_inline("image/png", "aGVsbG8=");
    harness.run(AgentRequest::Visualize).await.unwrap();

    let path = harness
        .studio
        .export_image(temp_dir.path().join("art").join("scene.png"))
        .await
        .unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"hello");
}

// =============================================================================
// Failures and audio
// =============================================================================

#[tokio::test]
async fn test_network_failure_is_generic_notice() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::Content,
            value: "Original".into(),
        })
        .await;
    harness.expect_error("dns failure");

    let result = harness
        .run(AgentRequest::Edit {
            instructions: "shorter".into(),
        })
        .await;

    assert!(result.is_err());
    assert_eq!(harness.latest_notice(), FAILED_NOTICE);
    assert_eq!(harness.active().content, "Original");
    assert_idle(&harness.studio);
}

#[tokio::test]
async fn test_failed_auto_check_keeps_draft_and_drops_old_report() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::BeatSheet,
            value: "1. Kaito visits Mori".into(),
        })
        .await;
    harness
        .expect_text("Kaito spoke with Mori.")
        .expect_text(r#"{"errors": [{"type": "Character", "description": "Mori is dead."}]}"#)
        .expect_text("New draft without Mori.")
        .expect_error("connection reset");

    harness.run(AgentRequest::Write).await.unwrap();
    assert_eq!(harness.studio.continuity().unwrap().len(), 1);

    let result = harness.run(AgentRequest::Write).await;

    assert!(result.is_ok());
    assert_eq!(harness.active().content, "New draft without Mori.");
    assert!(harness.studio.continuity().is_none());
    assert_eq!(harness.latest_notice(), AUTO_CHECK_FAILED_NOTICE);
    assert_eq!(
        harness.stored_scenes().unwrap()[0].content,
        "New draft without Mori."
    );
    assert_idle(&harness.studio);
}

#[tokio::test]
async fn test_read_aloud_decodes_pcm() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::Content,
            value: "Kaito lit a cigarette.".into(),
        })
        .await;
    harness.expect_inline("audio/L16;codec=pcm;rate=24000", "AQD//w==");

    let pcm = harness.studio.read_aloud().await.unwrap().unwrap();
    assert_eq!(pcm.samples(), &[1, -1]);
    assert_eq!(pcm.sample_rate(), 24_000);
    assert_idle(&harness.studio);
}

#[tokio::test]
async fn test_read_aloud_failure_is_none() {
    let mut harness = TestHarness::new().loaded().await;
    harness
        .apply(Edit::UpdateScene {
            field: SceneField::Content,
            value: "Words.".into(),
        })
        .await;
    harness.expect_error("quota");

    assert!(harness.studio.read_aloud().await.unwrap().is_none());
    assert_eq!(harness.latest_notice(), "Audio generation failed.");
}

#[tokio::test]
async fn test_bible_edits_reach_prompts() {
    let mut harness = TestHarness::new().loaded().await;
    harness.apply(Edit::AddLocation).await;
    harness.expect_text("1. Beat");

    harness
        .run(AgentRequest::Plan {
            idea: "idea".into(),
        })
        .await
        .unwrap();

    let bible: &Bible = harness.studio.bible();
    assert_eq!(bible.locations.len(), 2);
    let prompt = match &harness.model.last_request().unwrap().contents[0].parts[0] {
        gemini::Part::Text { text } => text.clone(),
        other => panic!("unexpected part {other:?}"),
    };
    assert!(prompt.contains("- New Location: Description..."));

    let stored: Vec<Character> = harness.stored_bible().unwrap().characters;
    assert_eq!(stored.len(), 2);
}
