use super::*;

#[tokio::test]
async fn test_file_pointer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CURRENT_CONTEXT");
    let pointer = CurrentContext::file(&path);

    assert_eq!(pointer.get().await.unwrap(), None);

    pointer.set(ContextId::new(12)).await.unwrap();
    assert_eq!(pointer.get().await.unwrap(), Some(ContextId::new(12)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "12");

    pointer.set(ContextId::new(3)).await.unwrap();
    assert_eq!(pointer.get().await.unwrap(), Some(ContextId::new(3)));

    pointer.clear().await.unwrap();
    assert!(!path.exists());
    assert_eq!(pointer.get().await.unwrap(), None);

    // clearing twice is fine
    pointer.clear().await.unwrap();
}

#[tokio::test]
async fn test_file_pointer_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CURRENT_CONTEXT");
    std::fs::write(&path, "not a number").unwrap();

    let pointer = CurrentContext::file(&path);
    assert_eq!(pointer.get().await.unwrap(), None);

    std::fs::write(&path, "42\n").unwrap();
    assert_eq!(pointer.get().await.unwrap(), Some(ContextId::new(42)));
}

#[tokio::test]
async fn test_memory_pointer() {
    let pointer = CurrentContext::memory();
    assert_eq!(pointer.get().await.unwrap(), None);

    pointer.set(ContextId::new(1)).await.unwrap();
    assert_eq!(pointer.get().await.unwrap(), Some(ContextId::new(1)));

    pointer.clear().await.unwrap();
    assert_eq!(pointer.get().await.unwrap(), None);
}
