/// Directory holding the database, the current context pointer and the
/// optional config file.
pub const STATE_DIR: &str = "$HOME/.hey";

pub const DATABASE_FILE_NAME: &str = "context.db";

pub const CURRENT_CONTEXT_FILE_NAME: &str = "CURRENT_CONTEXT";

pub const DEFAULT_PROFILE: &str = "default";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

pub const LOG_LEVEL: &str = "warn";
