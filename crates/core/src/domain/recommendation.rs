use serde::{Deserialize, Serialize};

/// Action-type tags the recommendation pipeline classifies into.
pub mod action_types {
    pub const CALL: &str = "call";
    pub const EMAIL: &str = "email";
    pub const SCHEDULE_MEETING: &str = "schedule_meeting";
    pub const FOLLOW_UP: &str = "follow_up";
    pub const SEND_DOCUMENT: &str = "send_document";
    pub const NURTURE: &str = "nurture";
}

/// A single suggested next step for a contact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub action_type: String,
    /// 1 is the most urgent; assigned in order of appearance when extracted
    /// heuristically.
    pub priority: u8,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl Recommendation {
    pub fn follow_up(title: impl Into<String>, priority: u8) -> Self {
        Self {
            title: title.into(),
            action_type: action_types::FOLLOW_UP.to_string(),
            priority,
            rationale: None,
        }
    }
}
