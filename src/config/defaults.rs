use std::collections::HashMap;

use super::{Profile, constants::*};

pub(crate) fn state_dir() -> String {
    STATE_DIR.to_string()
}

pub(crate) fn log_level() -> Option<String> {
    Some(LOG_LEVEL.to_string())
}

pub(crate) fn profiles() -> HashMap<String, Profile> {
    HashMap::from([(DEFAULT_PROFILE.to_string(), Profile::default())])
}
