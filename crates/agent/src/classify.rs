use std::collections::BTreeMap;

use async_trait::async_trait;
use cadence_core::errors::AgentError;
use cadence_core::domain::request::{AgentIntent, AgentRequest, AgentResponse};

use crate::router::SpecializedAgent;

/// Result of classifying free-form text into an intent.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub intent: AgentIntent,
    pub confidence: f64,
}

/// External capability that maps user text to an intent tag.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        context: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Classification, AgentError>;
}

/// Specialized agent behind the `intent_classification` route: exposes the
/// classifier's answer directly to the caller.
pub struct ClassificationAgent<C> {
    classifier: C,
}

impl<C> ClassificationAgent<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl<C> SpecializedAgent for ClassificationAgent<C>
where
    C: IntentClassifier,
{
    fn agent_id(&self) -> &'static str {
        "intent_classification_agent"
    }

    async fn handle(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        let text = request.original_user_input.as_deref().ok_or_else(|| {
            AgentError::Validation("intent classification requires user input text".to_string())
        })?;

        let classification = self.classifier.classify(text, &request.context).await?;

        Ok(AgentResponse::success_for(request, self.agent_id(), "intent classified")
            .with_data(
                "intent",
                serde_json::Value::String(classification.intent.as_str().to_string()),
            )
            .with_confidence(classification.confidence))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use cadence_core::domain::request::{AgentIntent, AgentRequest};
    use cadence_core::errors::AgentError;

    use super::{Classification, ClassificationAgent, IntentClassifier};
    use crate::router::SpecializedAgent;

    struct FixedClassifier;

    #[async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify(
            &self,
            _text: &str,
            _context: &BTreeMap<String, serde_json::Value>,
        ) -> Result<Classification, AgentError> {
            Ok(Classification { intent: AgentIntent::NextBestAction, confidence: 0.92 })
        }
    }

    #[tokio::test]
    async fn exposes_classifier_verdict_with_confidence() {
        let agent = ClassificationAgent::new(FixedClassifier);
        let request = AgentRequest::new(AgentIntent::IntentClassification, "user-1")
            .with_input("what should I do next for the Hendersons?");

        let response = agent.handle(&request).await.unwrap();

        assert!(response.success);
        assert_eq!(
            response.data.get("intent").and_then(|v| v.as_str()),
            Some("next_best_action")
        );
        assert_eq!(response.confidence, Some(0.92));
    }

    #[tokio::test]
    async fn missing_input_is_a_validation_error() {
        let agent = ClassificationAgent::new(FixedClassifier);
        let request = AgentRequest::new(AgentIntent::IntentClassification, "user-1");

        let error = agent.handle(&request).await.unwrap_err();
        assert!(matches!(error, AgentError::Validation(_)));
    }
}
