//! Workout Record Data Structure
//!
//! Defines the finished-workout payload handed to the remote writer, either
//! directly or through the offline queue. Fields serialize in camelCase so the
//! payload can be flattened into queue entries next to `id` and `queuedAt`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::SessionError;

/// A single set of an exercise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetLog {
    /// Repetitions performed
    pub reps: u32,
    /// Load in kilograms; `None` for bodyweight work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f32>,
    /// Whether the set was ticked off
    #[serde(default)]
    pub completed: bool,
}

impl SetLog {
    /// Create a completed set
    pub fn new(reps: u32, weight_kg: Option<f32>) -> Self {
        Self {
            reps,
            weight_kg,
            completed: true,
        }
    }
}

/// One exercise within a workout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
    /// Exercise name as shown in the plan
    pub name: String,
    /// Sets in the order they were performed
    #[serde(default)]
    pub sets: Vec<SetLog>,
}

impl ExerciseLog {
    pub fn new(name: impl Into<String>, sets: Vec<SetLog>) -> Self {
        Self {
            name: name.into(),
            sets,
        }
    }
}

/// A finished workout, ready to be persisted remotely
///
/// # Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use liftlog_session::shared::workout::{ExerciseLog, SetLog, WorkoutRecord};
///
/// let started = Utc::now() - Duration::minutes(45);
/// let record = WorkoutRecord::new("Push day", started, Utc::now(), 2700)
///     .with_exercises(vec![ExerciseLog::new("Bench press", vec![SetLog::new(5, Some(80.0))])]);
///
/// assert!(record.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    /// Owner of the workout, filled in by the auth layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Plan the workout was taken from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Display title ("Push day", "Week 3 / Day 2")
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Elapsed time reported by the session timer
    pub duration_seconds: u64,
    #[serde(default)]
    pub exercises: Vec<ExerciseLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutRecord {
    /// Create a record with no exercises attached
    pub fn new(
        title: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_seconds: u64,
    ) -> Self {
        Self {
            user_id: None,
            plan_id: None,
            title: title.into(),
            started_at,
            completed_at,
            duration_seconds,
            exercises: Vec::new(),
            notes: None,
        }
    }

    pub fn with_exercises(mut self, exercises: Vec<ExerciseLog>) -> Self {
        self.exercises = exercises;
        self
    }

    pub fn with_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check the record before it leaves the device
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.title.trim().is_empty() {
            return Err(SessionError::validation("title", "Workout title cannot be empty"));
        }
        if self.completed_at < self.started_at {
            return Err(SessionError::validation(
                "completedAt",
                "Workout cannot finish before it started",
            ));
        }
        for (index, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                return Err(SessionError::validation(
                    format!("exercises[{index}].name"),
                    "Exercise name cannot be empty",
                ));
            }
        }
        Ok(())
    }
}
