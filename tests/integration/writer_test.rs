//! HTTP writer against a mock workout API

use assert_matches::assert_matches;
use chrono::Utc;
use liftlog_session::session::writer::{IDEMPOTENCY_HEADER, WORKOUTS_PATH};
use liftlog_session::session::{HttpWorkoutWriter, QueuedMutation, WorkoutWriter};
use liftlog_session::shared::{DeliveryError, SessionConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::sample_record;

fn writer_for(server: &MockServer, token: Option<&str>) -> HttpWorkoutWriter {
    let mut builder = SessionConfig::builder().server_url(server.uri());
    if let Some(token) = token {
        builder = builder.token(token);
    }
    HttpWorkoutWriter::new(&builder.build().unwrap()).unwrap()
}

#[tokio::test]
async fn test_posts_payload_with_idempotency_key() {
    let server = MockServer::start().await;
    let mutation = QueuedMutation::new(sample_record("Pull day"), Utc::now());

    Mock::given(method("POST"))
        .and(path(WORKOUTS_PATH))
        .and(header(IDEMPOTENCY_HEADER, mutation.idempotency_key().as_str()))
        .and(header("Authorization", "Bearer secret-token"))
        .and(body_partial_json(serde_json::json!({
            "title": "Pull day",
            "durationSeconds": 2700
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let writer = writer_for(&server, Some("secret-token"));
    assert_eq!(writer.endpoint(), format!("{}{}", server.uri(), WORKOUTS_PATH));
    writer.save_workout(&mutation).await.unwrap();
}

#[tokio::test]
async fn test_replay_sends_same_key() {
    let server = MockServer::start().await;
    let mutation = QueuedMutation::new(sample_record("Leg day"), Utc::now());

    Mock::given(method("POST"))
        .and(path(WORKOUTS_PATH))
        .and(header(IDEMPOTENCY_HEADER, mutation.idempotency_key().as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let writer = writer_for(&server, None);
    writer.save_workout(&mutation).await.unwrap();
    writer.save_workout(&mutation).await.unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WORKOUTS_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_string("title required"))
        .mount(&server)
        .await;

    let writer = writer_for(&server, None);
    let mutation = QueuedMutation::new(sample_record("Arms"), Utc::now());
    let err = writer.save_workout(&mutation).await.unwrap_err();
    assert_eq!(err, DeliveryError::rejected(422, "title required"));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Nothing listens on port 1.
    let config = SessionConfig::builder()
        .server_url("http://127.0.0.1:1")
        .request_timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();
    let writer = HttpWorkoutWriter::new(&config).unwrap();

    let mutation = QueuedMutation::new(sample_record("Arms"), Utc::now());
    let err = writer.save_workout(&mutation).await.unwrap_err();
    assert_matches!(err, DeliveryError::Transport(_));
}
