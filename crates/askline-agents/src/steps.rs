//! Step log for a single pipeline run.
//!
//! The Supervisor appends one [`ProcessingStep`] per stage. A step is opened
//! as `processing` with [`StepLog::begin`] and settled exactly once through
//! the [`StepTicket`] it returned. Observers see both transitions.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use askline_core::types::{ProcessingStep, StepStatus};

use crate::error::AgentError;
use crate::workers::Outcome;

/// Receives step transitions as they happen.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, step: &ProcessingStep);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&self, _step: &ProcessingStep) {}
}

impl StepObserver for UnboundedSender<ProcessingStep> {
    fn on_step(&self, step: &ProcessingStep) {
        // The receiver may have gone away with a disconnected client.
        let _ = self.send(step.clone());
    }
}

/// Handle to the open step. Consumed when the step is settled.
#[derive(Debug)]
#[must_use = "an open step must be settled"]
pub struct StepTicket {
    index: usize,
}

/// Ordered record of the steps of one run.
pub struct StepLog<'a> {
    steps: Vec<ProcessingStep>,
    open: Option<usize>,
    observer: &'a dyn StepObserver,
}

impl<'a> StepLog<'a> {
    pub fn new(observer: &'a dyn StepObserver) -> Self {
        Self {
            steps: Vec::new(),
            open: None,
            observer,
        }
    }

    /// Open a new step. Any step still open is settled as an error first.
    pub fn begin(&mut self, description: &str) -> StepTicket {
        self.fail_open("superseded by a later step");

        let index = self.steps.len();
        let step = ProcessingStep {
            ordinal: index as u32 + 1,
            status: StepStatus::Processing,
            description: description.to_string(),
            result: serde_json::Value::Null,
            fallback: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        tracing::debug!(ordinal = step.ordinal, description, "Step started");
        self.observer.on_step(&step);
        self.steps.push(step);
        self.open = Some(index);
        StepTicket { index }
    }

    /// Settle a step as completed with the stage's outcome.
    pub fn complete<T: Serialize>(&mut self, ticket: StepTicket, outcome: &Outcome<T>) {
        let result = outcome.to_json();
        let fallback = outcome.fallback_reason().map(str::to_string);
        self.settle(ticket.index, StepStatus::Completed, result, fallback);
    }

    /// Settle a step as failed.
    pub fn fail(&mut self, ticket: StepTicket, error: &AgentError) {
        self.settle(
            ticket.index,
            StepStatus::Error,
            serde_json::json!({ "error": error.to_string() }),
            None,
        );
    }

    /// Settle whatever step is still open as failed.
    pub fn fail_open(&mut self, reason: &str) {
        if let Some(index) = self.open {
            self.settle(
                index,
                StepStatus::Error,
                serde_json::json!({ "error": reason }),
                None,
            );
        }
    }

    fn settle(
        &mut self,
        index: usize,
        status: StepStatus,
        result: serde_json::Value,
        fallback: Option<String>,
    ) {
        let Some(step) = self.steps.get_mut(index) else {
            return;
        };
        if step.status != StepStatus::Processing {
            return;
        }

        step.status = status;
        step.result = result;
        step.fallback = fallback;
        step.finished_at = Some(Utc::now());
        if self.open == Some(index) {
            self.open = None;
        }

        tracing::debug!(ordinal = step.ordinal, status = ?step.status, "Step settled");
        self.observer.on_step(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Finish the log. An open step is settled as failed.
    pub fn into_steps(mut self) -> Vec<ProcessingStep> {
        self.fail_open("step was not settled");
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(u32, StepStatus)>>,
    }

    impl StepObserver for Recorder {
        fn on_step(&self, step: &ProcessingStep) {
            self.events.lock().unwrap().push((step.ordinal, step.status));
        }
    }

    #[test]
    fn test_steps_are_numbered_and_settled() {
        let observer = NoopObserver;
        let mut log = StepLog::new(&observer);

        let first = log.begin("first");
        log.complete(first, &Outcome::Produced(1));
        let second = log.begin("second");
        log.complete(
            second,
            &Outcome::Fallback {
                value: "x",
                reason: "backend down".to_string(),
            },
        );

        let steps = log.into_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].ordinal, 1);
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[0].result, serde_json::json!(1));
        assert!(steps[0].finished_at.is_some());
        assert_eq!(steps[1].ordinal, 2);
        assert_eq!(steps[1].fallback.as_deref(), Some("backend down"));
    }

    #[test]
    fn test_fail_records_error() {
        let observer = NoopObserver;
        let mut log = StepLog::new(&observer);
        let ticket = log.begin("doomed");
        log.fail(ticket, &AgentError::Worker("boom".to_string()));

        let steps = log.into_steps();
        assert_eq!(steps[0].status, StepStatus::Error);
        assert_eq!(steps[0].result["error"], "worker failed: boom");
    }

    #[test]
    fn test_open_step_is_failed_on_finish() {
        let observer = NoopObserver;
        let mut log = StepLog::new(&observer);
        let _ticket = log.begin("left open");

        let steps = log.into_steps();
        assert_eq!(steps[0].status, StepStatus::Error);
    }

    #[test]
    fn test_observer_sees_each_transition_once() {
        let recorder = Recorder::default();
        let mut log = StepLog::new(&recorder);

        let ticket = log.begin("a");
        log.fail_open("interrupted");
        // Already settled; completing again is ignored.
        log.complete(ticket, &Outcome::Produced(()));

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![(1, StepStatus::Processing), (1, StepStatus::Error)]
        );
    }

    #[test]
    fn test_channel_observer_forwards_steps() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut log = StepLog::new(&tx);
        let ticket = log.begin("a");
        log.complete(ticket, &Outcome::Produced(true));

        assert_eq!(rx.try_recv().unwrap().status, StepStatus::Processing);
        assert_eq!(rx.try_recv().unwrap().status, StepStatus::Completed);
        assert!(rx.try_recv().is_err());
    }
}
