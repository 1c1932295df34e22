//! # Remote Workout Writer
//!
//! The `save_workout` boundary between the session core and the remote store.
//! The core only needs to know whether a write was confirmed; any error means
//! "not delivered" and the workout stays queued.
//!
//! [`HttpWorkoutWriter`] posts the workout JSON to `{server_url}/api/workouts`
//! and sends the mutation id as an `Idempotency-Key` header so the server can
//! ignore a replay of a write it already accepted.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::session::offline::queue::QueuedMutation;
use crate::shared::config::SessionConfig;
use crate::shared::error::DeliveryError;

/// Header carrying the mutation id
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Path the HTTP writer posts to
pub const WORKOUTS_PATH: &str = "/api/workouts";

/// Remote write function consumed by the queue and the controller
///
/// Implementations should treat a repeated `mutation.id` as the same logical
/// write: delivery is at-least-once.
#[async_trait]
pub trait WorkoutWriter: Send + Sync {
    async fn save_workout(&self, mutation: &QueuedMutation) -> Result<(), DeliveryError>;
}

/// Writer backed by the workout REST API
#[derive(Debug, Clone)]
pub struct HttpWorkoutWriter {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpWorkoutWriter {
    /// Build a writer from the session configuration
    pub fn new(config: &SessionConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DeliveryError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.api_url(WORKOUTS_PATH),
            token: config.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl WorkoutWriter for HttpWorkoutWriter {
    async fn save_workout(&self, mutation: &QueuedMutation) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, mutation.idempotency_key())
            .json(&mutation.payload);

        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| DeliveryError::transport(format!("invalid token: {e}")))?;
            request = request.header(AUTHORIZATION, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(id = %mutation.id, status = status.as_u16(), "Workout saved remotely");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(id = %mutation.id, status = status.as_u16(), "Remote rejected workout");
        Err(DeliveryError::rejected(status.as_u16(), body))
    }
}
