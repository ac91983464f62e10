// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drip-core: domain model for the drip marketing automation engine

pub mod macros;

pub mod clock;
pub mod contact;
pub mod error;
pub mod event;
pub mod id;
pub mod queue;
pub mod schedule;
pub mod step;
pub mod subscriber;
pub mod throttle;
pub mod transition;
pub mod trigger;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use contact::{Contact, FieldValue};
pub use error::{ErrorKind, StepError};
pub use event::Event;
pub use id::{QueueItemId, StepId, SubscriberId, TenantId, WorkflowId};
pub use queue::{QueueItem, QueueItemStatus, RetryDecision, RetryPolicy};
pub use schedule::{
    add_delay, next_send_window, next_time_of_day, next_weekday, parse_zone, DelayUnit,
    ScheduleError, SendWindow,
};
pub use step::{
    ConditionConfig, FieldOp, GoalConfig, NotificationConfig, Predicate, SendEmailConfig,
    SplitConfig, SplitVariant, Step, StepKind, StepKindTag, WaitConfig, WebhookConfig,
};
pub use subscriber::{
    CurrentStep, ExitReason, HistoryEntry, NextAction, StepOutcome, Subscriber, SubscriberStatus,
    TerminalStatus,
};
pub use throttle::{Throttle, ThrottleCounters, ThrottleVerdict};
pub use transition::{NextStep, Outcome, Transition};
pub use trigger::{DeliveryEvent, DeliveryKind, TriggerEvent, TriggerKind, TriggerSpec};
pub use workflow::{EntryConditions, ExitConditions, StepStats, Workflow, WorkflowStats, WorkflowStatus};
