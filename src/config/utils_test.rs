use crate::{
    config::{
        StorageConfig,
        constants::{DEFAULT_PROFILE, LOG_LEVEL, STATE_DIR},
    },
    models::Role,
};

use super::*;

#[test]
fn test_load_configuration() {
    let config = load_configuration("./testdata/config.toml").expect("failed to load config");

    assert_eq!(config.general.state_dir, "/var/lib/hey");

    let log = &config.log;
    assert_eq!(log.level.as_deref(), Some("info"));
    let log_filters = log.filters.as_deref().unwrap_or_default();
    assert_eq!(log_filters.len(), 1);
    assert_eq!(log_filters[0].module.as_deref(), Some("hey::backend"));
    assert_eq!(log_filters[0].level.as_deref(), Some("debug"));

    let log_file = log.file.as_ref().unwrap();
    assert_eq!(log_file.path, "/var/log/hey.log");
    assert_eq!(log_file.append, true);

    match &config.storage {
        StorageConfig::Sqlite(sqlite) => {
            assert_eq!(sqlite.path(), Some("/var/lib/hey/chat.db"));
        }
    }

    assert_eq!(config.profiles.len(), 2);

    let default = config.profile("default").unwrap();
    assert_eq!(default.base_url.as_deref(), Some("https://api.openai.com"));
    assert_eq!(default.api_key.as_deref(), Some("sk-test"));
    assert_eq!(default.model.as_deref(), Some("gpt-4"));
    assert_eq!(default.temperature, Some(0.5));
    assert_eq!(default.timeout_secs, Some(60));
    assert_eq!(default.prompt.len(), 1);
    assert_eq!(default.prompt[0].role, Role::System);
    assert_eq!(default.prompt[0].content, "You are a helpful assistant.");

    let deepseek = config.profile("deepseek").unwrap();
    assert_eq!(deepseek.model.as_deref(), Some("deepseek-chat"));
    assert_eq!(deepseek.temperature, None);
    assert!(deepseek.prompt.is_empty());
}

#[test]
fn test_load_configuration_with_some_default_fields() {
    let config =
        load_configuration("./testdata/config_with_default.toml").expect("failed to load config");

    assert_eq!(config.general.state_dir, STATE_DIR);
    assert_eq!(config.log.level.as_deref(), Some(LOG_LEVEL));
    assert!(config.log.file.is_none());

    match &config.storage {
        StorageConfig::Sqlite(sqlite) => assert_eq!(sqlite.path(), None),
    }

    // the default profile is added next to the configured one
    assert_eq!(config.profiles.len(), 2);
    assert!(config.profile(DEFAULT_PROFILE).is_some());
    assert_eq!(
        config.profile("work").unwrap().model.as_deref(),
        Some("gpt-4o-mini")
    );
}

#[test]
fn test_default_configuration() {
    let config = Configuration::default();
    assert!(config.profile(DEFAULT_PROFILE).is_some());
    assert!(config.profile("missing").is_none());
}

#[test]
fn test_state_paths() {
    let mut config = Configuration::default();
    config.general.state_dir = "/tmp/hey-state".to_string();

    assert_eq!(
        database_path(&config).unwrap(),
        "/tmp/hey-state/context.db"
    );
    assert_eq!(
        current_context_path(&config).unwrap(),
        "/tmp/hey-state/CURRENT_CONTEXT"
    );

    config.storage = StorageConfig::Sqlite(crate::config::SqliteStorage {
        path: Some("/tmp/other/chat.db".to_string()),
    });
    assert_eq!(database_path(&config).unwrap(), "/tmp/other/chat.db");
    assert_eq!(
        current_context_path(&config).unwrap(),
        "/tmp/hey-state/CURRENT_CONTEXT"
    );
}

#[test]
fn test_resolve_path() {
    let ret = resolve_path("$HEY_TEST_PATH/${HEY_USER_PATH}/config.toml")
        .expect("failed to resolve path");
    assert_eq!(ret, "//config.toml");

    let dir = "/tmp/test";
    let user_path = "user_path";
    unsafe {
        std::env::set_var("HEY_TEST_PATH", dir);
        std::env::set_var("HEY_USER_PATH", user_path);
    }
    let ret = resolve_path("$HEY_TEST_PATH/${HEY_USER_PATH}/config.toml")
        .expect("failed to resolve path");
    assert_eq!(ret, format!("{dir}/{user_path}/config.toml"));
}

#[test]
fn test_basename() {
    assert_eq!(basename("src/storage/sqlite/sqlite.rs"), "sqlite.rs");
    assert_eq!(basename("main.rs"), "main.rs");
}
