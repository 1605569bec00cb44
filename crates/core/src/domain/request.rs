use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse classification tag describing what kind of help a request asks for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentIntent {
    NextBestAction,
    InteractionAnalysis,
    IntentClassification,
    ResourceManagement,
    /// Ambiguous on its own; routed by keyword heuristics over the input.
    DataAnalysis,
    #[serde(untagged)]
    Unknown(String),
}

impl AgentIntent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NextBestAction => "next_best_action",
            Self::InteractionAnalysis => "interaction_analysis",
            Self::IntentClassification => "intent_classification",
            Self::ResourceManagement => "resource_management",
            Self::DataAnalysis => "data_analysis",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "next_best_action" => Self::NextBestAction,
            "interaction_analysis" => Self::InteractionAnalysis,
            "intent_classification" => Self::IntentClassification,
            "resource_management" => Self::ResourceManagement,
            "data_analysis" => Self::DataAnalysis,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

/// Request envelope crossing the core boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub request_id: String,
    pub intent: AgentIntent,
    pub original_user_input: Option<String>,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    pub conversation_id: String,
    pub requester_id: String,
}

impl AgentRequest {
    pub fn new(intent: AgentIntent, requester_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            intent,
            original_user_input: None,
            context: BTreeMap::new(),
            conversation_id: Uuid::new_v4().to_string(),
            requester_id: requester_id.into(),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.original_user_input = Some(input.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Response envelope.
///
/// Every response carries `request_id`, `agent_id`, and `timestamp` so it can
/// be correlated with the originating request regardless of outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    /// Action tags suggested to the caller, not yet scheduled.
    #[serde(default)]
    pub actions: Vec<String>,
    pub confidence: Option<f64>,
    pub request_id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    pub fn success_for(
        request: &AgentRequest,
        agent_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: BTreeMap::new(),
            actions: Vec::new(),
            confidence: None,
            request_id: request.request_id.clone(),
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure_for(
        request: &AgentRequest,
        agent_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { success: false, ..Self::success_for(request, agent_id, message) }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
