//! Periodic re-validation and execution of due automated actions.
//!
//! The scheduler owns the tick loop: on a fixed interval it selects due
//! actions from the store, re-checks their relevance just in time, executes
//! them through the handler registry, and drives the retry state machine for
//! failures. Ticks are serialized so at most one runs at a time, and the
//! loop shuts down gracefully, letting an in-flight tick finish.

pub mod lifecycle;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::action::{ActionStatus, ScheduledAction};
use crate::errors::AgentError;
use crate::executor::HandlerRegistry;
use crate::scheduler::lifecycle::{ActionLifecycle, LifecycleConfig};
use crate::store::ActionStore;

/// Just-in-time answer on whether an action's premise still holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelevanceDecision {
    pub relevant: bool,
    pub reason: Option<String>,
}

impl RelevanceDecision {
    pub fn relevant() -> Self {
        Self { relevant: true, reason: None }
    }

    pub fn stale(reason: impl Into<String>) -> Self {
        Self { relevant: false, reason: Some(reason.into()) }
    }
}

/// External collaborator that re-validates actions before execution and can
/// propose replacements for stale ones.
#[async_trait]
pub trait RelevanceValidator: Send + Sync {
    async fn is_still_relevant(
        &self,
        action: &ScheduledAction,
    ) -> Result<RelevanceDecision, AgentError>;

    async fn suggest_alternatives(
        &self,
        action: &ScheduledAction,
    ) -> Result<Vec<ScheduledAction>, AgentError>;
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
    pub lifecycle: LifecycleConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_interval_secs: 60, lifecycle: LifecycleConfig::default() }
    }
}

/// Per-tick counters, logged after every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub completed: usize,
    pub suppressed: usize,
    pub retried: usize,
    pub failed_terminal: usize,
    pub skipped: usize,
    pub alternatives_inserted: usize,
}

enum ActionOutcome {
    Completed,
    Suppressed { alternatives_inserted: usize },
    RetryScheduled,
    FailedTerminal,
}

pub struct Scheduler {
    config: SchedulerConfig,
    store: ActionStore,
    registry: Arc<HandlerRegistry>,
    validator: Arc<dyn RelevanceValidator>,
    lifecycle: ActionLifecycle,
    tick_gate: tokio::sync::Mutex<()>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        store: ActionStore,
        registry: Arc<HandlerRegistry>,
        validator: Arc<dyn RelevanceValidator>,
    ) -> Self {
        let lifecycle = ActionLifecycle::with_config(config.lifecycle.clone());
        Self { config, store, registry, validator, lifecycle, tick_gate: tokio::sync::Mutex::new(()) }
    }

    pub fn store(&self) -> &ActionStore {
        &self.store
    }

    pub fn lifecycle(&self) -> &ActionLifecycle {
        &self.lifecycle
    }

    /// One due-action scan. Serialized by the tick gate so an overlapping
    /// invocation waits for the in-flight tick to finish.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickSummary {
        let _gate = self.tick_gate.lock().await;

        let due = self.store.due_actions(now);
        let mut summary = TickSummary { due: due.len(), ..TickSummary::default() };

        for action in due {
            let action_id = action.id.clone();
            // One action's failure must never abort the rest of the tick.
            match self.process_action(action, now).await {
                Ok(ActionOutcome::Completed) => summary.completed += 1,
                Ok(ActionOutcome::Suppressed { alternatives_inserted }) => {
                    summary.suppressed += 1;
                    summary.alternatives_inserted += alternatives_inserted;
                }
                Ok(ActionOutcome::RetryScheduled) => summary.retried += 1,
                Ok(ActionOutcome::FailedTerminal) => summary.failed_terminal += 1,
                Err(error) => {
                    summary.skipped += 1;
                    warn!(
                        event_name = "scheduler.action.skipped",
                        action_id = %action_id.0,
                        error = %error,
                        "action left pending for the next tick"
                    );
                }
            }
        }

        if summary.due > 0 {
            info!(
                event_name = "scheduler.tick.completed",
                due = summary.due,
                completed = summary.completed,
                suppressed = summary.suppressed,
                retried = summary.retried,
                failed_terminal = summary.failed_terminal,
                skipped = summary.skipped,
                alternatives_inserted = summary.alternatives_inserted,
                "processed due actions"
            );
        } else {
            debug!(event_name = "scheduler.tick.idle", "no due actions");
        }

        summary
    }

    async fn process_action(
        &self,
        action: ScheduledAction,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, AgentError> {
        let decision = self.validator.is_still_relevant(&action).await?;

        if !decision.relevant {
            let reason = decision.reason.unwrap_or_else(|| "no longer relevant".to_string());
            let suppressed = self.lifecycle.suppress(action.clone(), reason.clone(), now)?;
            self.store.update(suppressed);
            info!(
                event_name = "scheduler.action.suppressed",
                action_id = %action.id.0,
                reason = %reason,
                "stale action suppressed before execution"
            );
            let alternatives_inserted = self.insert_alternatives(&action).await;
            return Ok(ActionOutcome::Suppressed { alternatives_inserted });
        }

        let action = self.lifecycle.pass_relevance(action, now)?;
        self.store.update(action.clone());
        let action = self.lifecycle.begin_execution(action, now)?;
        self.store.update(action.clone());

        match self.registry.execute(&action).await {
            Ok(()) => {
                let completed = self.lifecycle.complete(action, now)?;
                info!(
                    event_name = "scheduler.action.completed",
                    action_id = %completed.id.0,
                    action_type = %completed.action_type,
                    "action executed"
                );
                self.store.update(completed);
                Ok(ActionOutcome::Completed)
            }
            Err(handler_error) => {
                let outcome = self.lifecycle.fail(action, handler_error.to_string(), now)?;
                let retry_scheduled = outcome.retry_scheduled;
                warn!(
                    event_name = "scheduler.action.failed",
                    action_id = %outcome.action.id.0,
                    retry_attempts = outcome.action.retry_attempts,
                    retry_scheduled,
                    error = %handler_error,
                    "action handler failed"
                );
                self.store.update(outcome.action);
                if retry_scheduled {
                    Ok(ActionOutcome::RetryScheduled)
                } else {
                    Ok(ActionOutcome::FailedTerminal)
                }
            }
        }
    }

    /// Best effort: a failing suggestion call never affects the suppression
    /// that already happened.
    async fn insert_alternatives(&self, original: &ScheduledAction) -> usize {
        match self.validator.suggest_alternatives(original).await {
            Ok(alternatives) => {
                let mut inserted = 0;
                for mut alternative in alternatives {
                    alternative.status = ActionStatus::Pending;
                    if self.store.insert_if_absent(alternative) {
                        inserted += 1;
                    }
                }
                inserted
            }
            Err(error) => {
                warn!(
                    event_name = "scheduler.alternatives.failed",
                    action_id = %original.id.0,
                    error = %error,
                    "could not fetch alternative actions"
                );
                0
            }
        }
    }

    /// Start the periodic tick loop. The returned handle stops the loop
    /// gracefully: no new ticks are accepted and the in-flight tick finishes.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(&self);

        let task = tokio::spawn(async move {
            let period = std::time::Duration::from_secs(scheduler.config.tick_interval_secs.max(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it so the loop
            // starts with a full period like the rest.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        scheduler.run_tick(Utc::now()).await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!(event_name = "scheduler.stopped", "tick loop shut down");
                        break;
                    }
                }
            }
        });

        SchedulerHandle { shutdown: shutdown_tx, task }
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
