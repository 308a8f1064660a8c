//! Integration tests for the tutor client against a mock endpoint.

use std::sync::Arc;

use mockito::Matcher;
use serde_json::json;

use socratic_tutor::storage::config::TutorSettings;
use socratic_tutor::storage::MemoryStore;
use socratic_tutor::tutor::client::{TutorClient, TutorError};
use socratic_tutor::tutor::sessions::{SessionError, SessionStore, FALLBACK_REPLY};
use socratic_tutor::tutor::types::{Agent, Message, Role, TutorState};

const PATH: &str = "/functions/v1/multiagent-chat";

fn client_for(server: &mockito::ServerGuard) -> TutorClient {
    let settings = TutorSettings {
        endpoint_url: format!("{}{}", server.url(), PATH),
        api_key: "test-key".to_string(),
        timeout_secs: 5,
        ..TutorSettings::default()
    };
    TutorClient::new(&settings).unwrap()
}

fn reply_body(agent: &str, text: &str, hint_level: u32) -> String {
    json!({
        "active_agent": agent,
        "combinedMessage": text,
        "next_state": {
            "attempt_number": 1,
            "hint_level": hint_level,
            "misconception": "none"
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_send_message_shape_and_reply() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "messages": [{"role": "user", "content": "Why are leaves green?"}],
            "topic": "Photosynthesis",
            "state": {"attempt_number": 0, "hint_level": 0, "misconception": "none"},
            "model": "gpt-4o-mini"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body("socratic", "What colour does chlorophyll reflect?", 0))
        .create_async()
        .await;

    let client = client_for(&server);
    let reply = client
        .send_message(
            &[Message::user("Why are leaves green?")],
            "Photosynthesis",
            &TutorState::default(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.active_agent, Agent::Socratic);
    assert_eq!(reply.combined_message, "What colour does chlorophyll reflect?");
    assert_eq!(reply.next_state.attempt_number, 1);
}

#[tokio::test]
async fn test_non_success_status_is_http_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .send_message(&[Message::user("hi")], "Closures", &TutorState::default())
        .await
        .unwrap_err();

    match &err {
        TutorError::Http { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "HTTP error! status: 500, message: upstream exploded"
    );
}

#[tokio::test]
async fn test_malformed_reply_is_serialization_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"unexpected": true}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .send_message(&[Message::user("hi")], "Closures", &TutorState::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::Serialization(_)));
}

#[tokio::test]
async fn test_exchange_records_reply_and_state() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body("conversationalist", "Good thinking! Try once more.", 1))
        .create_async()
        .await;

    let client = client_for(&server);
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    let mut session = sessions.create("ada", "Quadratics").unwrap();

    let exchange = sessions
        .exchange(&client, &mut session, "  is it x = 2?  ")
        .await
        .unwrap();

    assert_eq!(exchange.question.content, "is it x = 2?");
    assert_eq!(exchange.reply.agent, Some(Agent::Conversationalist));
    assert!(exchange.hint_used);
    assert_eq!(session.state.hint_level, 1);

    let stored = sessions.get("ada", session.id).unwrap().unwrap();
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(stored.messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_exchange_failure_saves_fallback() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(503)
        .create_async()
        .await;

    let client = client_for(&server);
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    let mut session = sessions.create("ada", "Sonnets").unwrap();

    let result = sessions
        .exchange(&client, &mut session, "What is a volta?")
        .await;
    assert!(matches!(result, Err(SessionError::Tutor(TutorError::Http { status: 503, .. }))));

    let stored = sessions.get("ada", session.id).unwrap().unwrap();
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(stored.messages[1].content, FALLBACK_REPLY);
    assert_eq!(stored.messages[1].agent, Some(Agent::Explainer));
    assert_eq!(stored.state, TutorState::default());
}

#[tokio::test]
async fn test_exchange_rejects_blank_message() {
    let server = mockito::Server::new_async().await;
    let client = client_for(&server);
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    let mut session = sessions.create("ada", "Sonnets").unwrap();

    let result = sessions.exchange(&client, &mut session, "   ").await;
    assert!(matches!(result, Err(SessionError::Invalid(_))));
    assert!(session.messages.is_empty());
}
