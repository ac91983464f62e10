// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: lease, execute, commit.
//!
//! Workers poll with adaptive backoff (poll_min_ms doubling to poll_max_ms
//! on empty polls). External calls happen between the lease and the commit,
//! never under the store lock; the commit rechecks workflow and subscriber
//! state so a pause or archive mid-flight suppresses or defers the
//! transition.

use crate::executor::StepContext;
use crate::plan;
use crate::{Engine, EngineError};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{
    Clock, CurrentStep, Event, ExitReason, HistoryEntry, NextAction, NextStep, Outcome, QueueItem,
    Step, StepError, StepId, StepOutcome, Subscriber, SubscriberStatus, Transition, Workflow,
};
use drip_store::{CommitOutcome, LeaseOptions};
use tokio_util::sync::CancellationToken;

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    /// Lease one batch of due items and process them to completion.
    /// Returns how many items were leased.
    pub async fn run_once(&self, worker_id: &str) -> Result<usize, EngineError> {
        let leased = self.store().lease(&LeaseOptions {
            worker: worker_id.to_string(),
            max_items: self.config().lease_batch,
            lease_duration: self.config().lease_duration(),
        })?;
        let count = leased.len();
        for item in leased {
            self.process_item(item).await?;
        }
        Ok(count)
    }

    /// Spawn the worker pool; tasks run until the token is cancelled
    pub fn spawn_workers(&self, token: &CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config().workers)
            .map(|index| {
                let engine = self.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    let worker_id = format!("worker-{index}");
                    let mut backoff_ms = engine.config().poll_min_ms;
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)) => {}
                        }
                        match engine.run_once(&worker_id).await {
                            Ok(0) => {
                                backoff_ms = (backoff_ms * 2).min(engine.config().poll_max_ms);
                            }
                            Ok(_) => backoff_ms = engine.config().poll_min_ms,
                            Err(error) => {
                                tracing::error!(worker = %worker_id, error = %error, "poll failed");
                                backoff_ms = engine.config().poll_max_ms;
                            }
                        }
                    }
                    tracing::info!(worker = %worker_id, "worker stopped");
                })
            })
            .collect()
    }

    /// Spawn the lease-reclaim sweep
    pub fn spawn_reclaimer(&self, token: &CancellationToken) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        let token = token.clone();
        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(engine.config().reclaim_interval_secs);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match engine.store().reclaim_expired() {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "reclaimed expired leases"),
                    Err(error) => tracing::error!(error = %error, "reclaim sweep failed"),
                }
            }
        })
    }

    /// Spawn the date-based / inactivity trigger sweep
    pub fn spawn_sweeper(&self, token: &CancellationToken) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        let token = token.clone();
        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(engine.config().sweep_interval_secs);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match engine.run_sweeps().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "sweeper enrolled subscribers"),
                    Err(error) => tracing::error!(error = %error, "trigger sweep failed"),
                }
            }
        })
    }

    async fn process_item(&self, item: QueueItem) -> Result<(), EngineError> {
        let now = self.clock().now();
        let Ok(workflow) = self.store().workflow(&item.workflow_id) else {
            self.store().commit(&[Event::QueueCancelled { id: item.id.clone() }])?;
            return Ok(());
        };
        let Ok(subscriber) = self.store().subscriber(&item.subscriber_id) else {
            self.store().commit(&[Event::QueueCancelled { id: item.id.clone() }])?;
            return Ok(());
        };
        if subscriber.status != SubscriberStatus::Active {
            self.store().commit(&[Event::QueueCancelled { id: item.id.clone() }])?;
            return Ok(());
        }

        // Current step must still exist in the (possibly re-edited) workflow
        let Some(step) = workflow.step(&item.step_id).cloned() else {
            return self.terminate_with(&workflow, &subscriber, &item, ExitReason::StepRemoved, vec![]);
        };
        // A step id may not repeat within one enrollment
        if subscriber.has_visited(&step.id) {
            return self.terminate_with(&workflow, &subscriber, &item, ExitReason::Cycle, vec![]);
        }

        let contact = match tokio::time::timeout(
            self.config().step_timeout(),
            self.collaborators().contacts.get(&workflow.tenant, &subscriber.email),
        )
        .await
        {
            Ok(Ok(contact)) => contact,
            Ok(Err(error)) => {
                let error = StepError::transient(error.to_string());
                return self.handle_transient(&workflow, &subscriber, &item, &step, &error);
            }
            Err(_) => {
                let error = StepError::transient("contact store timed out");
                return self.handle_transient(&workflow, &subscriber, &item, &step, &error);
            }
        };

        // Workflow-level exit conditions come before the step executes
        if let Some(contact) = &contact {
            if let Some(goal_tag) = &workflow.exit.goal_tag {
                if contact.has_tag(goal_tag) {
                    let reached = Event::GoalReached {
                        workflow_id: workflow.id.clone(),
                        subscriber_id: subscriber.id.clone(),
                        step_id: None,
                    };
                    return self.terminate_with(
                        &workflow,
                        &subscriber,
                        &item,
                        ExitReason::GoalReached,
                        vec![reached],
                    );
                }
            }
            if workflow.exit.exit_on_unsubscribe && contact.unsubscribed {
                let unsub = Event::SubscriberUnsubscribed {
                    workflow_id: workflow.id.clone(),
                    subscriber_id: Some(subscriber.id.clone()),
                    email: subscriber.email.clone(),
                };
                return self.terminate_with(
                    &workflow,
                    &subscriber,
                    &item,
                    ExitReason::Unsubscribed,
                    vec![unsub],
                );
            }
        }

        let engagement = self.store().engagement(&subscriber.id);
        let ctx = StepContext {
            workflow: &workflow,
            subscriber: &subscriber,
            step: &step,
            contact: contact.as_ref(),
            engagement: &engagement,
            attempt_epoch: item.attempt_epoch,
            now,
        };
        let transition = self.execute_step(&ctx).await;
        self.apply_transition(&workflow, &subscriber, &item, &step, transition)
    }

    /// Exit the subscriber and drop its in-flight item
    fn terminate_with(
        &self,
        workflow: &Workflow,
        subscriber: &Subscriber,
        item: &QueueItem,
        reason: ExitReason,
        extra: Vec<Event>,
    ) -> Result<(), EngineError> {
        tracing::info!(subscriber = %subscriber.id, reason = %reason, "terminating subscriber");
        let mut events = vec![Event::QueueCancelled { id: item.id.clone() }];
        events.extend(extra);
        events.push(Event::SubscriberExited {
            id: subscriber.id.clone(),
            workflow_id: workflow.id.clone(),
            status: reason.terminal_status(),
            reason,
        });
        self.store().commit(&events)?;
        Ok(())
    }

    /// Transient failure: reschedule with backoff, or dead-letter when the
    /// attempts budget is spent
    fn handle_transient(
        &self,
        workflow: &Workflow,
        subscriber: &Subscriber,
        item: &QueueItem,
        step: &Step,
        error: &StepError,
    ) -> Result<(), EngineError> {
        let decision = self.store().fail(&item.id, error, &self.config().retry)?;
        let mut events = vec![Event::StepFailed {
            workflow_id: workflow.id.clone(),
            subscriber_id: subscriber.id.clone(),
            step_id: step.id.clone(),
            kind: step.kind_tag(),
            error: error.to_string(),
        }];
        if decision.dead {
            let entry = HistoryEntry {
                step_id: step.id.clone(),
                kind: step.kind_tag(),
                entered_at: subscriber
                    .current_step
                    .as_ref()
                    .map(|c| c.entered_at)
                    .unwrap_or(item.scheduled_for),
                completed_at: self.clock().now(),
                outcome: StepOutcome::Failed(error.to_string()),
                detail: None,
            };
            events.push(Event::SubscriberAdvanced {
                id: subscriber.id.clone(),
                workflow_id: workflow.id.clone(),
                entries: vec![entry],
                current: None,
                next_action: None,
            });
            events.push(Event::SubscriberExited {
                id: subscriber.id.clone(),
                workflow_id: workflow.id.clone(),
                status: ExitReason::RetriesExhausted.terminal_status(),
                reason: ExitReason::RetriesExhausted,
            });
        }
        self.store().commit(&events)?;
        Ok(())
    }

    /// Fold a completed/failed transition into one committed event batch:
    /// queue terminal state, audit trail, side effects, history append,
    /// successor enqueue (or exit).
    fn apply_transition(
        &self,
        workflow: &Workflow,
        subscriber: &Subscriber,
        item: &QueueItem,
        step: &Step,
        transition: Transition,
    ) -> Result<(), EngineError> {
        if let Outcome::Failed(error) = &transition.outcome {
            if error.is_transient() {
                let error = error.clone();
                return self.handle_transient(workflow, subscriber, item, step, &error);
            }
        }

        let now = self.clock().now();
        let entered_at = subscriber
            .current_step
            .as_ref()
            .map(|c| c.entered_at)
            .unwrap_or(item.scheduled_for);

        let mut events: Vec<Event> = vec![Event::StepStarted {
            workflow_id: workflow.id.clone(),
            subscriber_id: subscriber.id.clone(),
            step_id: step.id.clone(),
            kind: step.kind_tag(),
        }];
        events.extend(transition.side_effects.clone());

        let outcome_record = match &transition.outcome {
            Outcome::Completed => StepOutcome::Completed,
            Outcome::Skipped => StepOutcome::Skipped,
            Outcome::Failed(error) => StepOutcome::Failed(error.to_string()),
        };
        match &transition.outcome {
            Outcome::Failed(error) => {
                events.push(Event::StepFailed {
                    workflow_id: workflow.id.clone(),
                    subscriber_id: subscriber.id.clone(),
                    step_id: step.id.clone(),
                    kind: step.kind_tag(),
                    error: error.to_string(),
                });
                events.push(Event::QueueFailed {
                    id: item.id.clone(),
                    error: error.to_string(),
                    retry_at: None,
                    dead: true,
                });
            }
            _ => {
                events.push(Event::StepCompleted {
                    workflow_id: workflow.id.clone(),
                    subscriber_id: subscriber.id.clone(),
                    step_id: step.id.clone(),
                    kind: step.kind_tag(),
                });
                events.push(Event::QueueCompleted {
                    id: item.id.clone(),
                    result: transition.detail.clone(),
                });
            }
        }

        let entry = HistoryEntry {
            step_id: step.id.clone(),
            kind: step.kind_tag(),
            entered_at,
            completed_at: now,
            outcome: outcome_record,
            detail: transition.detail.clone(),
        };

        // Resolve the successor step id, or the exit reason
        let resolution: Result<Option<StepId>, ExitReason> = match &transition.next {
            NextStep::Terminate(reason) => Err(reason.clone()),
            NextStep::Linear => Ok(workflow.step_after(&step.id).map(|s| s.id.clone())),
            NextStep::GoTo(target) => match workflow.step(target) {
                Some(next) => Ok(Some(next.id.clone())),
                None => {
                    events.push(Event::EngineError {
                        workflow_id: workflow.id.clone(),
                        subscriber_id: Some(subscriber.id.clone()),
                        step_id: Some(step.id.clone()),
                        message: format!("branch target {target} does not exist"),
                    });
                    Err(ExitReason::DanglingBranch)
                }
            },
        };

        match resolution {
            Err(reason) => {
                events.push(Event::SubscriberAdvanced {
                    id: subscriber.id.clone(),
                    workflow_id: workflow.id.clone(),
                    entries: vec![entry],
                    current: None,
                    next_action: None,
                });
                events.push(Event::SubscriberExited {
                    id: subscriber.id.clone(),
                    workflow_id: workflow.id.clone(),
                    status: reason.terminal_status(),
                    reason,
                });
            }
            Ok(None) => {
                // Walked off the end of the graph
                events.push(Event::SubscriberAdvanced {
                    id: subscriber.id.clone(),
                    workflow_id: workflow.id.clone(),
                    entries: vec![entry],
                    current: None,
                    next_action: None,
                });
                events.push(Event::SubscriberExited {
                    id: subscriber.id.clone(),
                    workflow_id: workflow.id.clone(),
                    status: ExitReason::ReachedEnd.terminal_status(),
                    reason: ExitReason::ReachedEnd,
                });
            }
            Ok(Some(next_id)) => {
                let mut visited = plan::visited_steps(subscriber);
                visited.insert(step.id.clone());
                let planned = plan::plan_from_step(workflow, &visited, &next_id, now);
                let mut entries = vec![entry];
                entries.extend(planned.waits);
                match planned.target {
                    Some(target) => {
                        let next_item = QueueItem::new(
                            workflow.id.clone(),
                            subscriber.id.clone(),
                            target.step_id.clone(),
                            target.kind,
                            target.scheduled_for,
                        );
                        events.push(Event::SubscriberAdvanced {
                            id: subscriber.id.clone(),
                            workflow_id: workflow.id.clone(),
                            entries,
                            current: Some(CurrentStep {
                                step_id: target.step_id.clone(),
                                entered_at: now,
                            }),
                            next_action: Some(NextAction {
                                step_id: target.step_id,
                                kind: target.kind,
                                scheduled_for: target.scheduled_for,
                            }),
                        });
                        events.push(Event::QueuePushed { item: Box::new(next_item) });
                    }
                    None => {
                        let reason = planned.exit.unwrap_or(ExitReason::ReachedEnd);
                        events.push(Event::SubscriberAdvanced {
                            id: subscriber.id.clone(),
                            workflow_id: workflow.id.clone(),
                            entries,
                            current: None,
                            next_action: None,
                        });
                        events.push(Event::SubscriberExited {
                            id: subscriber.id.clone(),
                            workflow_id: workflow.id.clone(),
                            status: reason.terminal_status(),
                            reason,
                        });
                    }
                }
            }
        }

        let outcome =
            self.store().commit_transition(&workflow.id, &subscriber.id, &item.id, &events)?;
        if outcome != CommitOutcome::Committed {
            tracing::info!(
                subscriber = %subscriber.id,
                ?outcome,
                "transition not fully committed (workflow left active state)"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
