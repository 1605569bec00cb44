//! Recommendation extraction from raw language-model output.
//!
//! Structured parsing is attempted first; anything that fails structurally
//! falls back to line-oriented heuristics. The parser never returns an empty
//! list: callers always get at least one usable recommendation.

use serde::Deserialize;

use crate::domain::recommendation::{action_types, Recommendation};

/// Maximum number of recommendations extracted heuristically.
const MAX_HEURISTIC_RECOMMENDATIONS: usize = 5;
/// Lines shorter than this are treated as noise.
const MIN_LINE_LENGTH: usize = 10;

#[derive(Debug, Deserialize)]
struct StructuredPayload {
    #[serde(default)]
    recommendations: Vec<StructuredRecommendation>,
}

#[derive(Debug, Deserialize)]
struct StructuredRecommendation {
    title: String,
    #[serde(default)]
    action_type: Option<String>,
    #[serde(default)]
    priority: Option<u8>,
    #[serde(default)]
    rationale: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RecommendationParser;

impl RecommendationParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str) -> Vec<Recommendation> {
        let mut recommendations = parse_structured(raw);
        if recommendations.is_empty() {
            recommendations = parse_heuristic(raw);
        }
        if recommendations.is_empty() {
            recommendations.push(Recommendation {
                title: "Follow up with the contact".to_string(),
                action_type: action_types::FOLLOW_UP.to_string(),
                priority: 1,
                rationale: Some("default recommendation".to_string()),
            });
        }
        recommendations
    }
}

fn parse_structured(raw: &str) -> Vec<Recommendation> {
    let Ok(payload) = serde_json::from_str::<StructuredPayload>(raw) else {
        return Vec::new();
    };

    payload
        .recommendations
        .into_iter()
        .enumerate()
        .filter(|(_, item)| !item.title.trim().is_empty())
        .map(|(index, item)| Recommendation {
            action_type: item
                .action_type
                .filter(|tag| !tag.trim().is_empty())
                .unwrap_or_else(|| classify_action_type(&item.title).to_string()),
            priority: item.priority.unwrap_or_else(|| priority_for_index(index)),
            rationale: item.rationale,
            title: item.title.trim().to_string(),
        })
        .collect()
}

fn parse_heuristic(raw: &str) -> Vec<Recommendation> {
    raw.lines()
        .map(str::trim)
        .map(strip_bullet)
        .filter(|line| line.len() >= MIN_LINE_LENGTH && line.split_whitespace().count() >= 2)
        .take(MAX_HEURISTIC_RECOMMENDATIONS)
        .enumerate()
        .map(|(index, line)| Recommendation {
            title: line.to_string(),
            action_type: classify_action_type(line).to_string(),
            priority: priority_for_index(index),
            rationale: None,
        })
        .collect()
}

/// Earlier lines are more urgent.
fn priority_for_index(index: usize) -> u8 {
    (index + 1).min(u8::MAX as usize) as u8
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(|c: char| {
        c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')' | ':')
    })
    .trim()
}

/// Keyword classification with a fixed check order; the first match wins.
fn classify_action_type(text: &str) -> &'static str {
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("call") || lowered.contains("phone") {
        action_types::CALL
    } else if lowered.contains("email") || lowered.contains("send") {
        action_types::EMAIL
    } else if lowered.contains("meeting") || lowered.contains("schedule") {
        action_types::SCHEDULE_MEETING
    } else if lowered.contains("follow") || lowered.contains("check") {
        action_types::FOLLOW_UP
    } else if lowered.contains("document") {
        action_types::SEND_DOCUMENT
    } else if lowered.contains("nurture") || lowered.contains("content") {
        action_types::NURTURE
    } else {
        action_types::FOLLOW_UP
    }
}

#[cfg(test)]
mod tests {
    use super::RecommendationParser;
    use crate::domain::recommendation::action_types;

    #[test]
    fn structured_payload_wins_over_heuristics() {
        let parser = RecommendationParser::new();
        let raw = r#"{
            "recommendations": [
                {"title": "Call the buyer about the inspection", "priority": 2},
                {"title": "Send the updated disclosure packet", "action_type": "send_document"}
            ]
        }"#;

        let parsed = parser.parse(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].action_type, action_types::CALL);
        assert_eq!(parsed[0].priority, 2);
        assert_eq!(parsed[1].action_type, action_types::SEND_DOCUMENT);
    }

    #[test]
    fn heuristic_extraction_caps_count_and_orders_priority() {
        let parser = RecommendationParser::new();
        let raw = "\
1. Call them about the open house feedback
2. Email the comparative market analysis
3. Schedule a meeting for next Tuesday
x
4. Check in on their mortgage pre-approval
5. Share nurture content about the neighborhood
6. One more suggestion that exceeds the cap";

        let parsed = parser.parse(raw);
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0].action_type, action_types::CALL);
        assert_eq!(parsed[1].action_type, action_types::EMAIL);
        assert_eq!(parsed[2].action_type, action_types::SCHEDULE_MEETING);
        assert_eq!(parsed[3].action_type, action_types::FOLLOW_UP);
        assert_eq!(parsed[4].action_type, action_types::NURTURE);
        let priorities: Vec<u8> = parsed.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_input_yields_exactly_one_default_follow_up() {
        let parsed = RecommendationParser::new().parse("");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].action_type, action_types::FOLLOW_UP);
    }

    #[test]
    fn garbage_input_yields_exactly_one_default_follow_up() {
        let parsed = RecommendationParser::new().parse("garbage{{{");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].action_type, action_types::FOLLOW_UP);
    }
}
