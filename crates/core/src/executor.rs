//! Type-dispatched execution of validated, relevance-checked actions.
//!
//! Handlers are capability boundaries: the registry only guarantees that a
//! handler is invoked with an action that already passed its relevance check
//! and that the handler reports pass/fail. The actual side effect (sending
//! mail, creating a task) lives behind the trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::action::ScheduledAction;

/// Well-known action-type keys. The set is open; anything unrecognized is
/// routed to the generic fallback handler instead of being rejected.
pub mod handler_types {
    pub const EMAIL: &str = "email";
    pub const SMS: &str = "sms";
    pub const CALENDAR: &str = "calendar";
    pub const LISTING_ALERT: &str = "listing_alert";
    pub const TASK: &str = "task";
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("action handler failed: {0}")]
pub struct HandlerError(pub String);

#[async_trait]
pub trait ActionTypeHandler: Send + Sync {
    async fn run(&self, action: &ScheduledAction) -> Result<(), HandlerError>;
}

/// Registry mapping normalized action-type tags to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionTypeHandler>>,
    fallback: Arc<dyn ActionTypeHandler>,
}

impl HandlerRegistry {
    /// The fallback handler is mandatory so unknown action types never fail
    /// at dispatch time.
    pub fn new(fallback: Arc<dyn ActionTypeHandler>) -> Self {
        Self { handlers: HashMap::new(), fallback }
    }

    pub fn register(
        &mut self,
        action_type: impl AsRef<str>,
        handler: Arc<dyn ActionTypeHandler>,
    ) -> &mut Self {
        self.handlers.insert(normalize_type(action_type.as_ref()), handler);
        self
    }

    pub fn has_handler_for(&self, action_type: &str) -> bool {
        self.handlers.contains_key(&normalize_type(action_type))
    }

    /// Dispatch to the handler registered for the action's type, or the
    /// generic fallback when the type is unrecognized.
    pub async fn execute(&self, action: &ScheduledAction) -> Result<(), HandlerError> {
        let key = normalize_type(&action.action_type);
        let handler = self.handlers.get(&key).unwrap_or(&self.fallback);
        handler.run(action).await
    }
}

fn normalize_type(action_type: &str) -> String {
    action_type.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::{handler_types, ActionTypeHandler, HandlerError, HandlerRegistry};
    use crate::domain::action::{
        ActionId, ActionStatus, ContactId, OrganizationId, ScheduledAction,
    };

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ActionTypeHandler for CountingHandler {
        async fn run(&self, _action: &ScheduledAction) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(HandlerError("simulated outage".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn action_of_type(action_type: &str) -> ScheduledAction {
        let now = Utc::now();
        ScheduledAction {
            id: ActionId("action-1".to_string()),
            contact_id: ContactId("contact-1".to_string()),
            organization_id: OrganizationId("org-1".to_string()),
            action_type: action_type.to_string(),
            priority: 1,
            execute_at: now,
            status: ActionStatus::Executing,
            retry_attempts: 0,
            max_retry_attempts: 3,
            suppression_reason: None,
            last_relevance_check: Some(now),
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn counting(calls: &Arc<AtomicUsize>, fail: bool) -> Arc<dyn ActionTypeHandler> {
        Arc::new(CountingHandler { calls: Arc::clone(calls), fail })
    }

    #[tokio::test]
    async fn dispatch_normalizes_the_action_type_tag() {
        let email_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new(counting(&fallback_calls, false));
        registry.register(handler_types::EMAIL, counting(&email_calls, false));

        registry.execute(&action_of_type("  Email ")).await.unwrap();
        registry.execute(&action_of_type("EMAIL")).await.unwrap();

        assert_eq!(email_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrecognized_type_routes_to_generic_fallback() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let registry = HandlerRegistry::new(counting(&fallback_calls, false));

        let result = registry.execute(&action_of_type("hologram_tour")).await;

        assert!(result.is_ok());
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_failure_surfaces_as_handler_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new(counting(&calls, false));
        registry.register(handler_types::SMS, counting(&calls, true));

        let err = registry.execute(&action_of_type("sms")).await.unwrap_err();
        assert!(err.to_string().contains("simulated outage"));
    }
}
