use std::sync::Arc;

use crate::{
    backend::MockBackend,
    config::Profile,
    models::{BackendResponse, Pagination, PromptEntry, RangeError},
    storage::{ArcStorage, Storage, sqlite::Sqlite},
};

use super::*;

fn parse(args: &[&str]) -> Command {
    Command::try_parse_from(std::iter::once("hey").chain(args.iter().copied()))
        .expect("Failed to parse arguments")
}

async fn setup(backend: MockBackend) -> (ArcStorage, App) {
    let storage: ArcStorage = Arc::new(Sqlite::new(None).await.unwrap());
    let app = App::new(storage.clone(), Arc::new(backend), Profile::default());
    (storage, app)
}

#[test]
fn test_parse_defaults() {
    let cmd = parse(&[]);
    assert!(cmd.inputs.is_empty());
    assert_eq!(cmd.list, None);
    assert_eq!(cmd.new, None);
    assert_eq!(cmd.delete, None);
    assert_eq!(cmd.profile(), "default");
    assert_eq!(cmd.target(), Target::Current);
}

#[test]
fn test_parse_optional_values() {
    let cmd = parse(&["--list"]);
    assert_eq!(cmd.list.as_deref(), Some(":"));

    let cmd = parse(&["--list", "-2:"]);
    assert_eq!(cmd.list.as_deref(), Some("-2:"));

    let cmd = parse(&["--new"]);
    assert_eq!(cmd.target(), Target::New(String::new()));

    let cmd = parse(&["--new", "work", "--context", "3"]);
    assert_eq!(cmd.target(), Target::New("work".to_string()));

    let cmd = parse(&["--context", "3"]);
    assert_eq!(cmd.target(), Target::Id(ContextId::new(3)));

    let cmd = parse(&["--delete"]);
    assert_eq!(cmd.delete, Some(vec![]));

    let cmd = parse(&["--delete", "1", "2"]);
    assert_eq!(cmd.delete, Some(vec![ContextId::new(1), ContextId::new(2)]));

    let cmd = parse(&["how", "are", "you", "--model", "gpt-4o", "--temperature", "0.3"]);
    assert_eq!(cmd.inputs, vec!["how", "are", "you"]);
    assert_eq!(cmd.model.as_deref(), Some("gpt-4o"));
    assert_eq!(cmd.temperature, Some(0.3));
}

#[test]
fn test_parse_invalid_context_id() {
    assert!(Command::try_parse_from(["hey", "--context", "abc"]).is_err());
}

#[tokio::test]
async fn test_run_list_rejects_malformed_range() {
    let (_, app) = setup(MockBackend::new()).await;

    let err = parse(&["--list", "1"])
        .run(&app, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<RangeError>().is_some());
}

#[tokio::test]
async fn test_run_empty_search_is_ignored() {
    let (storage, app) = setup(MockBackend::new()).await;
    storage
        .create_context("T1", &[PromptEntry::user("hello")])
        .await
        .unwrap();

    let mut out = Vec::new();
    parse(&["--search", ""]).run(&app, &mut out).await.unwrap();
    assert!(out.is_empty());

    let mut out = Vec::new();
    parse(&["--search", "hello"]).run(&app, &mut out).await.unwrap();
    assert!(String::from_utf8(out).unwrap().contains("- user: hello"));
}

#[tokio::test]
async fn test_run_switch_then_ask() {
    let mut backend = MockBackend::new();
    backend
        .expect_get_completion()
        .withf(|prompt, _| {
            prompt.model() == "gpt-3.5-turbo"
                && prompt.messages() == [PromptEntry::user("hello world")]
        })
        .times(1)
        .returning(|_, tx| {
            tx.send(BackendResponse {
                model: "gpt-3.5-turbo".to_string(),
                id: "1".to_string(),
                text: "hi".to_string(),
                done: true,
                usage: None,
            })
            .unwrap();
            Ok(())
        });

    let (storage, app) = setup(backend).await;
    let first = storage.create_context("first", &[]).await.unwrap();
    let second = storage.create_context("second", &[]).await.unwrap();

    parse(&["--switch", &first.id().to_string()])
        .run(&app, &mut Vec::new())
        .await
        .unwrap();

    let mut out = Vec::new();
    parse(&["hello", "world"]).run(&app, &mut out).await.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "hi\n");

    let messages = storage
        .get_messages(first.id(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert!(
        storage
            .get_messages(second.id(), Pagination::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_run_delete_ids() {
    let (storage, app) = setup(MockBackend::new()).await;
    let context = storage.create_context("T1", &[]).await.unwrap();

    let err = parse(&["--delete", &context.id().to_string(), "77"])
        .run(&app, &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Context 77 not found.");
    assert!(storage.get_context(context.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_delete_selected_context() {
    let (storage, app) = setup(MockBackend::new()).await;
    let keep = storage.create_context("keep", &[]).await.unwrap();
    let drop = storage.create_context("drop", &[]).await.unwrap();

    parse(&["--delete", "--context", &drop.id().to_string()])
        .run(&app, &mut Vec::new())
        .await
        .unwrap();

    assert!(storage.get_context(drop.id()).await.unwrap().is_none());
    assert!(storage.get_context(keep.id()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_run_missing_context() {
    let (_, app) = setup(MockBackend::new()).await;

    let err = parse(&["--context", "5", "--history"])
        .run(&app, &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Context 5 not found.");
}

#[tokio::test]
async fn test_run_rename_and_undo() {
    let (storage, app) = setup(MockBackend::new()).await;
    let context = storage
        .create_context(
            "T1",
            &[PromptEntry::user("q"), PromptEntry::assistant("a")],
        )
        .await
        .unwrap();

    parse(&["--rename", "renamed"])
        .run(&app, &mut Vec::new())
        .await
        .unwrap();
    let renamed = storage.get_context(context.id()).await.unwrap().unwrap();
    assert_eq!(renamed.title(), "renamed");

    parse(&["--undo"]).run(&app, &mut Vec::new()).await.unwrap();
    assert!(
        storage
            .get_messages(context.id(), Pagination::default())
            .await
            .unwrap()
            .is_empty()
    );
}
