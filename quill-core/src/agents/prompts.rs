//! Prompt text and personas for each agent.

use crate::bible::Bible;

pub const PLANNER_PERSONA: &str = "You are the PLANNER agent. Create a detailed Beat Sheet.";
pub const WRITER_PERSONA: &str = "You are the WRITER agent. Write vivid fiction prose.";
pub const EDITOR_PERSONA: &str = "You are the EDITOR agent.";

/// Returned by the planner and writer when the model produced nothing.
pub const FAILED_SENTINEL: &str = "Failed.";

/// Characters of scene content sent to the image model.
pub const VISUAL_CONTENT_CHARS: usize = 500;

/// Characters of scene content sent to the speech model.
pub const SPEECH_CHARS: usize = 3000;

/// Render the bible as a context block shared by the text agents.
pub fn bible_context(bible: &Bible) -> String {
    let summary = if bible.summary.trim().is_empty() {
        "No summary provided."
    } else {
        bible.summary.as_str()
    };

    let characters = if bible.characters.is_empty() {
        "No characters defined.".to_string()
    } else {
        bible
            .characters
            .iter()
            .map(|c| {
                let mut line = format!("- {}: {}", c.name, c.description);
                if !c.arc_status.trim().is_empty() {
                    line.push_str(&format!(" [Status: {}]", c.arc_status));
                }
                if !c.traits.is_empty() {
                    line.push_str(&format!(" [Traits: {}]", c.traits.join(", ")));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let locations = if bible.locations.is_empty() {
        "No locations defined.".to_string()
    } else {
        bible
            .locations
            .iter()
            .map(|l| format!("- {}: {}", l.name, l.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "\nPROJECT BIBLE:\nSUMMARY: {summary}\nCHARACTERS:\n{characters}\nLOCATIONS:\n{locations}\n"
    )
}

pub fn planner_prompt(bible: &Bible, idea: &str) -> String {
    format!(
        "{}\n\nSCENE IDEA: {idea}\n\nTASK: Create a Beat Sheet.",
        bible_context(bible)
    )
}

pub fn writer_prompt(bible: &Bible, beat_sheet: &str, existing: &str) -> String {
    let mut prompt = format!("{}\n\nBEAT SHEET:\n{beat_sheet}", bible_context(bible));
    if !existing.trim().is_empty() {
        prompt.push_str(&format!("\n\nEXISTING DRAFT:\n{existing}"));
    }
    prompt.push_str("\n\nTASK: Write the scene draft.");
    prompt
}

pub fn continuity_prompt(bible: &Bible, scene_text: &str) -> String {
    format!(
        r#"{context}

SCENE TEXT TO ANALYZE:
{scene_text}

TASK:
Identify consistency errors (dead characters appearing, wrong locations, contradictions with the summary).

IMPORTANT: You MUST return valid JSON only. No markdown formatting.
The JSON must follow this exact structure:
{{
  "errors": [
    {{
      "severity": "critical",
      "type": "Character Inconsistency",
      "description": "Character 'Alex' is described as afraid of water, but swims confidently here.",
      "quote": "Alex dove into the harbor without hesitation."
    }}
  ]
}}

Use "critical" for contradictions of established facts and "warning" for anything softer.
If there are no errors, return: {{ "errors": [] }}
"#,
        context = bible_context(bible),
    )
}

pub fn editor_prompt(scene_text: &str, instructions: &str) -> String {
    format!("TEXT: {scene_text}\n\nINSTRUCTIONS: {instructions}")
}

pub fn visualizer_prompt(bible: &Bible, title: &str, content: &str) -> String {
    format!(
        "Story: {}\nScene: {title}\nContent: {}",
        bible.summary,
        truncate_chars(content, VISUAL_CONTENT_CHARS)
    )
}

/// Take at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bible::Character;

    #[test]
    fn test_bible_context_defaults() {
        let context = bible_context(&Bible::default());
        assert!(context.starts_with("\nPROJECT BIBLE:\nSUMMARY: A cyberpunk noir"));
        assert!(context.contains("- Kaito: A detective with a cybernetic eye. [Status: Alive]"));
        assert!(context.contains("LOCATIONS:\n- The Neon Bazaar: A crowded, rain-slicked market.\n"));
    }

    #[test]
    fn test_bible_context_empty() {
        let bible = Bible {
            summary: String::new(),
            characters: Vec::new(),
            locations: Vec::new(),
        };
        let context = bible_context(&bible);
        assert!(context.contains("SUMMARY: No summary provided."));
        assert!(context.contains("CHARACTERS:\nNo characters defined."));
        assert!(context.contains("LOCATIONS:\nNo locations defined."));
    }

    #[test]
    fn test_context_carries_arc_status() {
        let mut bible = Bible::default();
        bible.characters.push(Character {
            id: "3".to_string(),
            name: "Mori".to_string(),
            traits: vec![],
            arc_status: "Deceased".to_string(),
            description: "Kaito's old partner.".to_string(),
        });
        assert!(bible_context(&bible).contains("- Mori: Kaito's old partner. [Status: Deceased]"));
    }

    #[test]
    fn test_planner_prompt_shape() {
        let prompt = planner_prompt(&Bible::default(), "A chase through the bazaar");
        assert!(prompt.contains("\n\nSCENE IDEA: A chase through the bazaar\n\n"));
        assert!(prompt.ends_with("TASK: Create a Beat Sheet."));
    }

    #[test]
    fn test_writer_prompt_existing_draft() {
        let bible = Bible::default();
        assert!(!writer_prompt(&bible, "1. Rain", "").contains("EXISTING DRAFT"));
        let prompt = writer_prompt(&bible, "1. Rain", "It was raining.");
        assert!(prompt.contains("BEAT SHEET:\n1. Rain\n\nEXISTING DRAFT:\nIt was raining."));
        assert!(prompt.ends_with("TASK: Write the scene draft."));
    }

    #[test]
    fn test_continuity_prompt_is_valid_template() {
        let prompt = continuity_prompt(&Bible::default(), "Kaito walked in.");
        assert!(prompt.contains("SCENE TEXT TO ANALYZE:\nKaito walked in."));
        assert!(prompt.contains(r#"return: { "errors": [] }"#));
    }

    #[test]
    fn test_visualizer_prompt_truncates() {
        let content = "é".repeat(600);
        let prompt = visualizer_prompt(&Bible::default(), "The Glitch", &content);
        let tail = prompt.split("Content: ").nth(1).unwrap();
        assert_eq!(tail.chars().count(), 500);
        assert!(prompt.contains("\nScene: The Glitch\n"));
    }

    #[test]
    fn test_editor_prompt() {
        assert_eq!(
            editor_prompt("Rain fell.", "Make it darker"),
            "TEXT: Rain fell.\n\nINSTRUCTIONS: Make it darker"
        );
    }

    #[test]
    fn test_truncate_chars_short() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }
}
