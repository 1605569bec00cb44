//! Deterministic state machine for scheduled automated actions.
//!
//! `Pending -> RelevanceCheckPassed -> Executing -> Completed`, with
//! `Pending -> Suppressed` when the relevance check fails and
//! `Executing -> Failed -> Pending` for bounded retries. Once
//! `retry_attempts` reaches `max_retry_attempts` the `Failed` status is
//! terminal and the action is never reprocessed.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::action::{
    ActionId, ActionStatus, ContactId, OrganizationId, ScheduledAction,
};
use crate::errors::DomainError;

/// Configuration for the lifecycle state machine.
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Default bound on retries for newly created actions.
    pub default_max_retry_attempts: u32,
    /// Base for the exponential backoff; the delay after the k-th failure is
    /// `backoff_base_minutes * 2^k` minutes.
    pub backoff_base_minutes: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { default_max_retry_attempts: 3, backoff_base_minutes: 1 }
    }
}

/// Outcome of failing an action: either a retry was scheduled or the failure
/// is terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailOutcome {
    pub action: ScheduledAction,
    pub retry_scheduled: bool,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct ActionLifecycle {
    config: LifecycleConfig,
}

impl ActionLifecycle {
    pub fn new() -> Self {
        Self::with_config(LifecycleConfig::default())
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        Self { config }
    }

    /// Entry point for scheduling new automated work.
    pub fn create_action(
        &self,
        contact_id: ContactId,
        organization_id: OrganizationId,
        action_type: impl Into<String>,
        priority: u8,
        execute_at: DateTime<Utc>,
    ) -> ScheduledAction {
        let now = Utc::now();
        ScheduledAction {
            id: ActionId(Uuid::new_v4().to_string()),
            contact_id,
            organization_id,
            action_type: action_type.into(),
            priority,
            execute_at,
            status: ActionStatus::Pending,
            retry_attempts: 0,
            max_retry_attempts: self.config.default_max_retry_attempts,
            suppression_reason: None,
            last_relevance_check: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Relevance check passed: stamp the check time and move toward execution.
    pub fn pass_relevance(
        &self,
        mut action: ScheduledAction,
        now: DateTime<Utc>,
    ) -> Result<ScheduledAction, DomainError> {
        self.validate_transition(&action, &ActionStatus::RelevanceCheckPassed)?;
        action.status = ActionStatus::RelevanceCheckPassed;
        action.last_relevance_check = Some(now);
        action.updated_at = now;
        Ok(action)
    }

    /// Relevance check failed: suppress and record why. Suppressed actions
    /// are terminal and never auto-executed again.
    pub fn suppress(
        &self,
        mut action: ScheduledAction,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledAction, DomainError> {
        self.validate_transition(&action, &ActionStatus::Suppressed)?;
        action.status = ActionStatus::Suppressed;
        action.suppression_reason = Some(reason.into());
        action.updated_at = now;
        Ok(action)
    }

    pub fn begin_execution(
        &self,
        mut action: ScheduledAction,
        now: DateTime<Utc>,
    ) -> Result<ScheduledAction, DomainError> {
        self.validate_transition(&action, &ActionStatus::Executing)?;
        action.status = ActionStatus::Executing;
        action.updated_at = now;
        Ok(action)
    }

    pub fn complete(
        &self,
        mut action: ScheduledAction,
        now: DateTime<Utc>,
    ) -> Result<ScheduledAction, DomainError> {
        self.validate_transition(&action, &ActionStatus::Completed)?;
        action.status = ActionStatus::Completed;
        action.last_error = None;
        action.updated_at = now;
        Ok(action)
    }

    /// Handler failure. Increments `retry_attempts`; while the bound is not
    /// exhausted the action returns to `Pending` with
    /// `execute_at = now + base * 2^retry_attempts` minutes, which keeps
    /// `execute_at` monotonically non-decreasing across retries. Otherwise
    /// the action stays `Failed` terminally.
    pub fn fail(
        &self,
        mut action: ScheduledAction,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<FailOutcome, DomainError> {
        self.validate_transition(&action, &ActionStatus::Failed)?;

        action.last_error = Some(error.into());
        action.updated_at = now;

        if action.retry_attempts < action.max_retry_attempts {
            action.retry_attempts += 1;
            let backoff_minutes = self
                .config
                .backoff_base_minutes
                .saturating_mul(1_i64 << action.retry_attempts.min(30));
            let next_attempt_at = now + Duration::minutes(backoff_minutes);
            action.status = ActionStatus::Pending;
            action.execute_at = next_attempt_at;
            Ok(FailOutcome {
                action,
                retry_scheduled: true,
                next_attempt_at: Some(next_attempt_at),
            })
        } else {
            action.status = ActionStatus::Failed;
            Ok(FailOutcome { action, retry_scheduled: false, next_attempt_at: None })
        }
    }

    fn validate_transition(
        &self,
        action: &ScheduledAction,
        to_status: &ActionStatus,
    ) -> Result<(), DomainError> {
        let valid = match (&action.status, to_status) {
            (ActionStatus::Pending, ActionStatus::RelevanceCheckPassed) => true,
            (ActionStatus::Pending, ActionStatus::Suppressed) => true,
            (ActionStatus::RelevanceCheckPassed, ActionStatus::Executing) => true,
            (ActionStatus::Executing, ActionStatus::Completed) => true,
            (ActionStatus::Executing, ActionStatus::Failed) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(DomainError::InvalidActionTransition {
                from: action.status.clone(),
                to: to_status.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ActionLifecycle, LifecycleConfig};
    use crate::domain::action::{ActionStatus, ContactId, OrganizationId, ScheduledAction};
    use crate::errors::DomainError;

    fn pending_action(lifecycle: &ActionLifecycle) -> ScheduledAction {
        lifecycle.create_action(
            ContactId("contact-1".to_string()),
            OrganizationId("org-1".to_string()),
            "email",
            1,
            Utc::now(),
        )
    }

    #[test]
    fn create_action_starts_pending_with_zero_retries() {
        let lifecycle = ActionLifecycle::new();
        let action = pending_action(&lifecycle);

        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.retry_attempts, 0);
        assert_eq!(action.max_retry_attempts, 3);
    }

    #[test]
    fn happy_path_reaches_completed() {
        let lifecycle = ActionLifecycle::new();
        let now = Utc::now();
        let action = pending_action(&lifecycle);

        let checked = lifecycle.pass_relevance(action, now).unwrap();
        assert_eq!(checked.status, ActionStatus::RelevanceCheckPassed);
        assert_eq!(checked.last_relevance_check, Some(now));

        let executing = lifecycle.begin_execution(checked, now).unwrap();
        let completed = lifecycle.complete(executing, now).unwrap();
        assert_eq!(completed.status, ActionStatus::Completed);
        assert!(completed.status.is_terminal());
    }

    #[test]
    fn suppress_records_reason_and_is_terminal() {
        let lifecycle = ActionLifecycle::new();
        let now = Utc::now();
        let action = pending_action(&lifecycle);

        let suppressed = lifecycle.suppress(action, "listing already sold", now).unwrap();
        assert_eq!(suppressed.status, ActionStatus::Suppressed);
        assert_eq!(suppressed.suppression_reason.as_deref(), Some("listing already sold"));

        // A suppressed action cannot re-enter the pipeline.
        let err = lifecycle.pass_relevance(suppressed, now).unwrap_err();
        assert!(matches!(err, DomainError::InvalidActionTransition { .. }));
    }

    #[test]
    fn backoff_after_kth_failure_is_two_to_the_k_minutes() {
        let lifecycle = ActionLifecycle::new();
        let now = Utc::now();
        let mut action = pending_action(&lifecycle);

        for k in 1..=3_u32 {
            action = lifecycle.pass_relevance(action, now).unwrap();
            action = lifecycle.begin_execution(action, now).unwrap();
            let outcome = lifecycle.fail(action, "smtp timeout", now).unwrap();
            assert!(outcome.retry_scheduled);
            assert_eq!(outcome.action.retry_attempts, k);
            assert_eq!(
                outcome.next_attempt_at,
                Some(now + Duration::minutes(1 << k)),
                "delay after failure {k} should be 2^{k} minutes"
            );
            action = outcome.action;
            assert_eq!(action.status, ActionStatus::Pending);
            // Each retry pushes execute_at forward.
            assert!(action.execute_at >= now);
        }
    }

    #[test]
    fn failure_is_terminal_once_retries_are_exhausted() {
        let config = LifecycleConfig { default_max_retry_attempts: 1, backoff_base_minutes: 1 };
        let lifecycle = ActionLifecycle::with_config(config);
        let now = Utc::now();

        let action = pending_action(&lifecycle);
        let action = lifecycle.pass_relevance(action, now).unwrap();
        let action = lifecycle.begin_execution(action, now).unwrap();
        let first = lifecycle.fail(action, "bounce", now).unwrap();
        assert!(first.retry_scheduled);
        assert_eq!(first.action.retry_attempts, 1);

        let action = lifecycle.pass_relevance(first.action, now).unwrap();
        let action = lifecycle.begin_execution(action, now).unwrap();
        let second = lifecycle.fail(action, "bounce", now).unwrap();
        assert!(!second.retry_scheduled);
        assert_eq!(second.action.status, ActionStatus::Failed);
        // The retry counter never exceeds the bound.
        assert_eq!(second.action.retry_attempts, 1);

        // Terminal failed actions reject further transitions.
        let err = lifecycle.pass_relevance(second.action, now).unwrap_err();
        assert!(matches!(err, DomainError::InvalidActionTransition { .. }));
    }

    #[test]
    fn cannot_complete_without_executing() {
        let lifecycle = ActionLifecycle::new();
        let action = pending_action(&lifecycle);
        let err = lifecycle.complete(action, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidActionTransition { from: ActionStatus::Pending, .. }
        ));
    }
}
