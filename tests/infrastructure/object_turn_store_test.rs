use chatdesk::application::ports::TurnStore;
use chatdesk::infrastructure::storage::ObjectTurnStore;

fn create_test_store() -> (tempfile::TempDir, ObjectTurnStore) {
    let dir = tempfile::TempDir::new().unwrap();
    let store = ObjectTurnStore::local(dir.path().join("widget")).unwrap();
    (dir, store)
}

#[tokio::test]
async fn given_saved_value_when_loading_then_returns_it() {
    let (_dir, store) = create_test_store();

    store.save("AIChatMessages", "[1,2,3]").await.unwrap();

    assert_eq!(
        store.load("AIChatMessages").await.unwrap(),
        Some("[1,2,3]".to_string())
    );
}

#[tokio::test]
async fn given_saved_value_when_reopening_directory_then_value_survives() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("widget");
    ObjectTurnStore::local(path.clone())
        .unwrap()
        .save("AIChatMessages", "persisted")
        .await
        .unwrap();

    let reopened = ObjectTurnStore::local(path).unwrap();

    assert_eq!(
        reopened.load("AIChatMessages").await.unwrap().as_deref(),
        Some("persisted")
    );
}

#[tokio::test]
async fn given_missing_key_when_loading_then_returns_none() {
    let (_dir, store) = create_test_store();

    assert_eq!(store.load("nothing_here").await.unwrap(), None);
}

#[tokio::test]
async fn given_saved_value_when_overwriting_then_latest_wins() {
    let store = ObjectTurnStore::in_memory();

    store.save("k", "old").await.unwrap();
    store.save("k", "new").await.unwrap();

    assert_eq!(store.load("k").await.unwrap().as_deref(), Some("new"));
}

#[tokio::test]
async fn given_saved_value_when_removing_then_load_returns_none() {
    let (_dir, store) = create_test_store();
    store.save("AIChatMessages", "data").await.unwrap();

    store.remove("AIChatMessages").await.unwrap();

    assert_eq!(store.load("AIChatMessages").await.unwrap(), None);
}

#[tokio::test]
async fn given_missing_key_when_removing_then_succeeds() {
    let (_dir, store) = create_test_store();

    assert!(store.remove("never_saved").await.is_ok());
}
