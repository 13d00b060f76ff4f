//! Dispatch and persistence through the SQLite history store

use std::sync::Arc;

use thansin::agent::{SendOutcome, TurnDispatcher};
use thansin::error::CompanionError;
use thansin::persona::PersonaConfig;
use thansin::providers::ProviderHandle;
use thansin::session::{ErrorKind, Speaker};
use thansin::storage::HistoryStore;

mod common;

use common::{create_temp_storage, session_over, FakeProvider, GREETING, STORAGE_KEY};

fn dispatcher_for(
    session: Arc<thansin::SessionManager>,
    provider: FakeProvider,
) -> TurnDispatcher {
    TurnDispatcher::new(
        session,
        Arc::new(ProviderHandle::from_provider(Arc::new(provider))),
        Arc::new(PersonaConfig::default()),
        "gemini-3-flash-preview",
    )
}

#[tokio::test]
async fn test_conversation_survives_restart() {
    let (storage, _dir) = create_temp_storage();

    let session = session_over(storage.clone());
    assert!(!session.load_or_init());
    let dispatcher = dispatcher_for(
        session.clone(),
        FakeProvider::new(vec![
            Ok("ဟုတ်ကဲ့ မောင် [MOOD: loving]"),
            Err(CompanionError::Api {
                status: 429,
                code: Some("RESOURCE_EXHAUSTED".to_string()),
                message: "Quota exceeded".to_string(),
            }),
        ]),
    );

    dispatcher.send("ချစ်လား").await;
    dispatcher.send("again").await;
    let before = session.turns();
    assert_eq!(before.len(), 5);

    let reloaded = session_over(storage.clone());
    assert!(reloaded.load_or_init());
    let after = reloaded.turns();
    assert_eq!(after, before);

    assert_eq!(after[2].text(), "ဟုတ်ကဲ့ မောင်");
    assert_eq!(after[4].speaker(), Speaker::Companion);
    assert_eq!(after[4].error_kind(), Some(ErrorKind::Quota));
}

#[tokio::test]
async fn test_clear_then_reload_yields_single_greeting() {
    let (storage, _dir) = create_temp_storage();

    let session = session_over(storage.clone());
    session.load_or_init();
    let dispatcher = dispatcher_for(session.clone(), FakeProvider::new(vec![Ok("hi")]));
    dispatcher.send("hello").await;
    assert!(storage.get(STORAGE_KEY).unwrap().is_some());

    session.clear();
    assert!(storage.get(STORAGE_KEY).unwrap().is_none());

    let reloaded = session_over(storage.clone());
    assert!(!reloaded.load_or_init());
    let turns = reloaded.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text(), GREETING);
    assert!(storage.get(STORAGE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_entry_resets_to_greeting() {
    let (storage, _dir) = create_temp_storage();
    storage.set(STORAGE_KEY, "[{\"truncated\": ").unwrap();

    let session = session_over(storage.clone());
    assert!(!session.load_or_init());
    assert_eq!(session.len(), 1);

    // The next mutation overwrites the corrupt value.
    session.append(thansin::Turn::user("fresh start"));
    let reloaded = session_over(storage);
    assert!(reloaded.load_or_init());
    assert_eq!(reloaded.len(), 2);
}

#[tokio::test]
async fn test_request_window_and_error_exclusion() {
    let (storage, _dir) = create_temp_storage();
    let session = session_over(storage);
    session.load_or_init();

    let provider = Arc::new(FakeProvider::new(vec![
        Err(CompanionError::Provider("connection reset".to_string())),
        Ok("one"),
        Ok("two"),
    ]));
    let dispatcher = TurnDispatcher::new(
        session.clone(),
        Arc::new(ProviderHandle::from_provider(provider.clone())),
        Arc::new(PersonaConfig::default()),
        "gemini-3-flash-preview",
    )
    .with_history_window(3);

    for input in ["a", "b", "c"] {
        let outcome = dispatcher.send(input).await;
        assert!(matches!(outcome, SendOutcome::Completed { .. }));
    }
    assert_eq!(session.len(), 7);

    let seen = provider.seen.lock().unwrap();
    let last: Vec<&str> = seen[2].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(last, vec!["b", "one", "c"]);
}
