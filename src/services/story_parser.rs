use crate::models::{Choice, StorySegment};
use regex::Regex;
use std::sync::LazyLock;

const GOAL_MARKER: &str = "[GOAL]";
const STORY_MARKER: &str = "[STORY]";
const SUMMARY_MARKER: &str = "[SUMMARY]";
const CHOICES_MARKER: &str = "[CHOICES]";

/// Section markers in the order the model is asked to emit them.
const SECTION_MARKERS: [&str; 4] = [GOAL_MARKER, STORY_MARKER, SUMMARY_MARKER, CHOICES_MARKER];

pub const ENDING_MARKER: &str = "THE END";

static CHOICE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*(.*)$").expect("choice line pattern is valid"));

/// Turns a raw completion into a story segment.
///
/// Never fails: a missing section yields an empty field, and a missing
/// `[CHOICES]` section marks the segment as an ending.
pub fn parse_story_response(response: &str) -> StorySegment {
    let goal = section_text(response, GOAL_MARKER);
    let text = section_text(response, STORY_MARKER);
    let summary = section_text(response, SUMMARY_MARKER);

    let (choices, is_ending) = match section(response, CHOICES_MARKER) {
        Some(block) if !block.contains(ENDING_MARKER) => (parse_choices(block), false),
        _ => (Vec::new(), true),
    };

    StorySegment {
        text,
        goal,
        summary,
        choices,
        is_ending,
    }
}

fn section_text(response: &str, marker: &str) -> String {
    section(response, marker)
        .map(|body| body.trim().to_string())
        .unwrap_or_default()
}

/// Body of the first occurrence of `marker`, running up to the nearest marker
/// of any later section, or to the end of input when none follows.
fn section<'a>(response: &'a str, marker: &str) -> Option<&'a str> {
    let position = SECTION_MARKERS.iter().position(|m| *m == marker)?;
    let start = response.find(marker)? + marker.len();
    let rest = &response[start..];

    let end = SECTION_MARKERS[position + 1..]
        .iter()
        .filter_map(|later| rest.find(later))
        .min()
        .unwrap_or(rest.len());

    Some(&rest[..end])
}

fn parse_choices(block: &str) -> Vec<Choice> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| CHOICE_LINE.is_match(line))
        .enumerate()
        .map(|(index, line)| {
            let text = CHOICE_LINE
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map_or(line, |m| m.as_str());
            Choice {
                id: index as u32 + 1,
                text: text.trim_end().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[GOAL] Find treasure.\n[STORY] คุณ เดิน .\n[SUMMARY] You walk.\n[CHOICES]\n1. Go left\n2. Go right";

    #[test]
    fn parses_complete_response() {
        let segment = parse_story_response(SAMPLE);
        assert_eq!(
            segment,
            StorySegment {
                goal: "Find treasure.".to_string(),
                text: "คุณ เดิน .".to_string(),
                summary: "You walk.".to_string(),
                choices: vec![
                    Choice { id: 1, text: "Go left".to_string() },
                    Choice { id: 2, text: "Go right".to_string() },
                ],
                is_ending: false,
            }
        );
    }

    #[test]
    fn counts_only_numbered_lines() {
        let raw = "[GOAL]g[STORY]s[SUMMARY]m[CHOICES]\nPick one:\n1. A\n- not a choice\n2.B\n3. C\n";
        let segment = parse_story_response(raw);
        assert!(!segment.is_ending);
        let texts: Vec<&str> = segment.choices.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        let ids: Vec<u32> = segment.choices.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn does_not_cap_choice_count() {
        let raw = "[STORY] x\n[CHOICES]\n1. a\n2. b\n3. c\n4. d\n5. e";
        assert_eq!(parse_story_response(raw).choices.len(), 5);
    }

    #[test]
    fn renumbers_choices_sequentially() {
        let raw = "[CHOICES]\n4. first\n9. second";
        let segment = parse_story_response(raw);
        assert_eq!(segment.choices[0], Choice { id: 1, text: "first".to_string() });
        assert_eq!(segment.choices[1], Choice { id: 2, text: "second".to_string() });
    }

    #[test]
    fn missing_choices_marker_is_an_ending() {
        let segment = parse_story_response("[GOAL] g\n[STORY] เรื่อง\n[SUMMARY] s\n1. stray");
        assert!(segment.is_ending);
        assert!(segment.choices.is_empty());
        assert_eq!(segment.text, "เรื่อง");
        assert_eq!(segment.summary, "s\n1. stray");
    }

    #[test]
    fn the_end_anywhere_in_choices_is_an_ending() {
        let raw = "[STORY] จบ\n[CHOICES]\n1. Keep going\n... THE END ...";
        let segment = parse_story_response(raw);
        assert!(segment.is_ending);
        assert!(segment.choices.is_empty());
    }

    #[test]
    fn the_end_outside_choices_is_not_an_ending() {
        let raw = "[STORY] THE END of chapter one\n[CHOICES]\n1. Next";
        let segment = parse_story_response(raw);
        assert!(!segment.is_ending);
        assert_eq!(segment.choices.len(), 1);
    }

    #[test]
    fn choices_marker_without_numbered_lines_is_not_an_ending() {
        let segment = parse_story_response("[STORY] x\n[CHOICES]\nnothing here");
        assert!(!segment.is_ending);
        assert!(segment.choices.is_empty());
    }

    #[test]
    fn missing_sections_degrade_to_empty_strings() {
        let segment = parse_story_response("just some text");
        assert_eq!(segment, StorySegment { is_ending: true, ..Default::default() });

        let segment = parse_story_response("");
        assert!(segment.is_ending);
        assert!(segment.goal.is_empty());
    }

    #[test]
    fn section_ends_at_next_present_marker() {
        let segment = parse_story_response("[GOAL] escape\n[SUMMARY] sum\n[CHOICES]\n1. go");
        assert_eq!(segment.goal, "escape");
        assert_eq!(segment.text, "");
        assert_eq!(segment.summary, "sum");
    }

    #[test]
    fn first_marker_occurrence_wins() {
        let segment = parse_story_response("[GOAL] one [GOAL] two\n[STORY] s");
        assert_eq!(segment.goal, "one [GOAL] two");
    }

    #[test]
    fn trailing_spaces_on_choice_lines_are_dropped() {
        let raw = "[STORY] x\n[CHOICES]  \n1. เดิน ขึ้น ไป.  \r\n2. วิ่ง กลับ.  ";
        let segment = parse_story_response(raw);
        assert_eq!(segment.choices[0].text, "เดิน ขึ้น ไป.");
        assert_eq!(segment.choices[1].text, "วิ่ง กลับ.");
    }

    #[test]
    fn parsing_is_repeatable() {
        assert_eq!(parse_story_response(SAMPLE), parse_story_response(SAMPLE));
    }
}
