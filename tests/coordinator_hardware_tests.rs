//! Voting coordinator driving a real OMBEA client against a mocked hardware API

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use caces_vote::session::{NO_ACTIVE_DEVICE, SESSION_NOT_ACTIVE};
use caces_vote::{Answer, SessionSettings, VotingCoordinator};
use fixtures::{link_json, load_test_questions, OmbeaApiMock, ACCESS_TOKEN, LINKS_PATH};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn coordinator_for(mock: &OmbeaApiMock) -> (VotingCoordinator, Arc<caces_vote::OmbeaClient>) {
    let client = Arc::new(mock.client());
    let coordinator = VotingCoordinator::new(client.clone(), SessionSettings::default());
    (coordinator, client)
}

#[tokio::test]
async fn test_connect_with_one_connected_link_is_ready() {
    let mock = OmbeaApiMock::new().await;
    mock.mock_token(1).await;
    mock.mock_response_links(vec![
        link_json("RL-0", "disconnected"),
        link_json("RL-1", "connected"),
    ])
    .await;

    let (coordinator, _) = coordinator_for(&mock).await;
    assert!(coordinator.connect().await);

    let snapshot = coordinator.snapshot().await;
    assert!(snapshot.connection.is_authenticated);
    assert!(snapshot.connection.is_ready);
    assert!(!snapshot.connection.is_connecting);
    assert_eq!(snapshot.connection.active_response_link_id.as_deref(), Some("RL-1"));
    assert_eq!(snapshot.devices.len(), 2);
}

#[tokio::test]
async fn test_connect_with_zero_connected_links_is_not_ready() {
    let mock = OmbeaApiMock::new().await;
    mock.mock_token(1).await;
    mock.mock_response_links(vec![]).await;

    let (coordinator, _) = coordinator_for(&mock).await;
    assert!(!coordinator.connect().await);

    let connection = coordinator.connection().await;
    assert!(connection.is_authenticated);
    assert!(!connection.is_ready);
    assert_eq!(connection.connection_error.as_deref(), Some(NO_ACTIVE_DEVICE));
}

#[tokio::test]
async fn test_connect_surfaces_token_error() {
    let mock = OmbeaApiMock::new().await;
    mock.mock_token_failure(401, None).await;

    let (coordinator, _) = coordinator_for(&mock).await;
    assert!(!coordinator.connect().await);

    let connection = coordinator.connection().await;
    assert!(!connection.is_authenticated);
    assert_eq!(
        connection.connection_error.as_deref(),
        Some("Échec de l'obtention du token: Unauthorized")
    );
}

#[tokio::test]
async fn test_unauthorized_start_poll_reauthenticates_once() {
    let mock = OmbeaApiMock::new().await;
    mock.mock_token(2).await;
    mock.mock_response_links(vec![link_json("RL-1", "connected")])
        .await;
    mock.mock_unauthorized_once("POST", &format!("{LINKS_PATH}/RL-1/polls"))
        .await;
    mock.mock_start_poll("RL-1", "P-1", 1).await;

    let (coordinator, client) = coordinator_for(&mock).await;
    coordinator.connect().await;
    let question = load_test_questions().remove(0);
    assert!(coordinator.start_exam_session(question).await);

    assert!(coordinator.open_poll_for_current_question().await);

    let session = coordinator.voting_session().await;
    assert!(session.is_polling_active_for_question);
    assert_eq!(session.current_poll_id.as_deref(), Some("P-1"));
    assert_eq!(session.poll_error, None);
    assert_eq!(client.metrics().get_stats().reauthentications, 1);
}

#[tokio::test]
async fn test_exam_session_over_live_hardware() {
    let mock = OmbeaApiMock::new().await;
    mock.mock_token(1).await;
    mock.mock_response_links(vec![link_json("RL-1", "connected")])
        .await;
    mock.mock_start_poll("RL-1", "P-1", 2).await;
    mock.mock_stop_poll("RL-1", "P-1", 2).await;

    let (coordinator, _) = coordinator_for(&mock).await;
    coordinator.connect().await;

    let mut questions = load_test_questions().into_iter();
    let first = questions.next().unwrap();
    let second = questions.next().unwrap();

    coordinator.start_exam_session(first).await;
    coordinator.open_poll_for_current_question().await;
    coordinator.handle_response("101", "A").await;
    coordinator.handle_response("102", "B").await;
    coordinator.handle_response("101", "B").await;
    assert!(coordinator.close_poll_for_current_question().await);

    let results = coordinator.poll_results().await.unwrap();
    assert_eq!(results.total_votes, 2);
    assert_eq!(results.votes_for(Answer::OptionIndex(1)), 2);
    assert_eq!(results.correct_votes, Some(2));

    coordinator.set_current_exam_question(second).await;
    assert!(coordinator.responses().await.is_empty());
    coordinator.open_poll_for_current_question().await;
    assert!(coordinator.handle_response("101", "vrai").await);
    assert!(!coordinator.handle_response("102", "C").await);

    // Ending the session closes the open poll on the hardware
    coordinator.end_exam_session().await;
    let session = coordinator.voting_session().await;
    assert!(!session.is_active);
    assert!(session.current_question.is_none());
}

#[tokio::test]
async fn test_open_poll_without_session_makes_no_request() {
    let mock = OmbeaApiMock::new().await;
    let (coordinator, client) = coordinator_for(&mock).await;

    assert!(!coordinator.open_poll_for_current_question().await);
    assert_eq!(
        coordinator.voting_session().await.poll_error.as_deref(),
        Some(SESSION_NOT_ACTIVE)
    );
    assert_eq!(client.metrics().get_stats().total_requests, 0);
    assert!(mock.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disconnect_forces_new_token_on_reconnect() {
    let mock = OmbeaApiMock::new().await;
    mock.mock_token(2).await;
    mock.mock_response_links(vec![link_json("RL-1", "connected")])
        .await;

    let (coordinator, _) = coordinator_for(&mock).await;
    assert!(coordinator.connect().await);
    coordinator.disconnect().await;

    let connection = coordinator.connection().await;
    assert!(!connection.is_ready);
    assert!(coordinator.devices().await.is_empty());

    assert!(coordinator.connect().await);
}

#[tokio::test]
async fn test_concurrent_connect_exchanges_token_once() {
    let mock = OmbeaApiMock::new().await;
    Mock::given(method("POST"))
        .and(path("/token/v1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": ACCESS_TOKEN,
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&mock.server)
        .await;
    mock.mock_response_links(vec![link_json("RL-1", "connected")])
        .await;

    let (coordinator, _) = coordinator_for(&mock).await;
    let (first, second) = tokio::join!(coordinator.connect(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let in_flight = coordinator.connection().await;
        assert!(in_flight.is_connecting);
        assert!(!in_flight.is_ready);
        coordinator.connect().await
    });

    assert!(first);
    // The overlapping call reports the readiness at the time it was made
    assert!(!second);

    let connection = coordinator.connection().await;
    assert!(connection.is_ready);
    assert!(!connection.is_connecting);
}
