//! Workout writers with scripted outcomes

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use liftlog_session::session::{QueuedMutation, WorkoutWriter};
use liftlog_session::shared::DeliveryError;

/// Records every delivered mutation; fails on the scripted call numbers
#[derive(Default)]
pub struct RecordingWriter {
    delivered: Mutex<Vec<QueuedMutation>>,
    calls: Mutex<usize>,
    /// 1-based call numbers that fail
    failing_calls: Mutex<VecDeque<usize>>,
    offline: Mutex<bool>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th call (counting from 1 across the writer's lifetime)
    pub fn fail_call(&self, n: usize) {
        self.failing_calls.lock().unwrap().push_back(n);
    }

    /// Fail every call until switched back
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.offline.lock().unwrap() = unreachable;
    }

    pub fn delivered(&self) -> Vec<QueuedMutation> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_titles(&self) -> Vec<String> {
        self.delivered().into_iter().map(|m| m.payload.title).collect()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl WorkoutWriter for RecordingWriter {
    async fn save_workout(&self, mutation: &QueuedMutation) -> Result<(), DeliveryError> {
        // Behave like a real request: give other tasks a chance to run.
        tokio::task::yield_now().await;
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if *self.offline.lock().unwrap() {
            return Err(DeliveryError::transport("network unreachable"));
        }
        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(DeliveryError::rejected(503, "try later"));
        }
        self.delivered.lock().unwrap().push(mutation.clone());
        Ok(())
    }
}
