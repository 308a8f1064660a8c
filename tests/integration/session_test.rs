//! Integration tests for chat session persistence.

use std::sync::Arc;

use socratic_tutor::storage::{MemoryStore, SqliteStore, Store};
use socratic_tutor::tutor::sessions::SessionStore;
use socratic_tutor::tutor::types::{Agent, Message};

fn backends() -> Vec<(&'static str, Arc<dyn Store>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new()) as Arc<dyn Store>),
        (
            "sqlite",
            Arc::new(SqliteStore::open_in_memory().unwrap()) as Arc<dyn Store>,
        ),
    ]
}

#[test]
fn test_create_and_reload() {
    for (name, store) in backends() {
        let sessions = SessionStore::new(store);
        let mut session = sessions.create("ada", "  Climate change ").unwrap();
        assert_eq!(session.topic, "Climate change", "{}", name);

        session.push(Message::user("Why is CO2 a greenhouse gas?"));
        session.push(Message::assistant(
            "What happens when infrared light meets a CO2 molecule?",
            Agent::Socratic,
        ));
        sessions.save(&mut session).unwrap();

        let loaded = sessions.get("ada", session.id).unwrap().unwrap();
        assert_eq!(loaded.messages, session.messages, "{}", name);
        assert_eq!(loaded.state, session.state, "{}", name);
    }
}

#[test]
fn test_sessions_are_private() {
    for (name, store) in backends() {
        let sessions = SessionStore::new(store);
        let session = sessions.create("ada", "Sonnets").unwrap();

        assert!(sessions.get("grace", session.id).unwrap().is_none(), "{}", name);
        assert!(!sessions.delete("grace", session.id).unwrap(), "{}", name);
        assert!(sessions.load_sessions("grace").unwrap().is_empty(), "{}", name);
        assert!(sessions.get("ada", session.id).unwrap().is_some(), "{}", name);
    }
}

#[test]
fn test_load_sessions_most_recent_first() {
    for (name, store) in backends() {
        let sessions = SessionStore::new(store);
        let older = sessions.create("ada", "Photosynthesis").unwrap();
        let mut newer = sessions.create("ada", "Closures").unwrap();
        newer.push(Message::user("What does a closure capture?"));
        sessions.save(&mut newer).unwrap();

        let loaded = sessions.load_sessions("ada").unwrap();
        let ids: Vec<_> = loaded.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id], "{}", name);
    }
}

#[test]
fn test_delete() {
    for (name, store) in backends() {
        let sessions = SessionStore::new(store);
        let session = sessions.create("ada", "World War II").unwrap();

        assert!(sessions.delete("ada", session.id).unwrap(), "{}", name);
        assert!(sessions.get("ada", session.id).unwrap().is_none(), "{}", name);
        assert!(!sessions.delete("ada", session.id).unwrap(), "{}", name);
    }
}

#[test]
fn test_blank_topic_rejected() {
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    assert!(sessions.create("ada", "   ").is_err());
}
