use grocer_repo::guest::FileGuestStore;
use grocer_types::ports::guest_cart_store::GuestCartStore;
use uuid::Uuid;

#[tokio::test]
async fn file_store_round_trip_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileGuestStore::new(dir.path().join("guests"));
    let session = Uuid::new_v4();

    assert!(store.read(session).await.unwrap().is_none());
    store.write(session, "[]".into()).await.unwrap();
    assert_eq!(store.read(session).await.unwrap().as_deref(), Some("[]"));

    store.remove(session).await.unwrap();
    assert!(store.read(session).await.unwrap().is_none());
    // Removing twice is fine.
    store.remove(session).await.unwrap();
}

#[cfg(feature = "memory")]
#[tokio::test]
async fn memory_store_is_keyed_by_session() {
    let store = grocer_repo::guest::InMemoryGuestStore::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    store.write(a, "a".into()).await.unwrap();
    assert!(store.read(b).await.unwrap().is_none());
    assert_eq!(store.read(a).await.unwrap().as_deref(), Some("a"));
}
