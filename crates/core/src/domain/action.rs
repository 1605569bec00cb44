use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    RelevanceCheckPassed,
    Executing,
    Completed,
    Suppressed,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::RelevanceCheckPassed => "relevance_check_passed",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Suppressed => "suppressed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "relevance_check_passed" => Some(Self::RelevanceCheckPassed),
            "executing" => Some(Self::Executing),
            "completed" => Some(Self::Completed),
            "suppressed" => Some(Self::Suppressed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal statuses are never re-picked by the scheduler.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Suppressed | Self::Failed)
    }
}

/// A single unit of deferred automated work tied to a contact.
///
/// Created by request-side code or as an alternative action emitted by the
/// relevance validator. Mutated exclusively from the scheduler's tick context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub id: ActionId,
    pub contact_id: ContactId,
    pub organization_id: OrganizationId,
    /// Open string tag dispatched to a type-specific handler.
    pub action_type: String,
    /// Lower value means more urgent.
    pub priority: u8,
    pub execute_at: DateTime<Utc>,
    pub status: ActionStatus,
    pub retry_attempts: u32,
    pub max_retry_attempts: u32,
    pub suppression_reason: Option<String>,
    pub last_relevance_check: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledAction {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ActionStatus::Pending && self.execute_at <= now
    }
}
