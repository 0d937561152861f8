#[cfg(test)]
#[path = "pointer_test.rs"]
mod tests;

use std::{path::PathBuf, sync::Mutex};

use eyre::{Context, Result, eyre};

use crate::models::ContextId;

/// The "current context" selection kept next to the database.
///
/// The file variant holds the decimal id and is absent when nothing is
/// selected. Writes go through a temporary sibling that is renamed over the
/// pointer, so a reader never sees a partially written id. There is no lock.
pub enum CurrentContext {
    File(PathBuf),
    Memory(Mutex<Option<ContextId>>),
}

impl CurrentContext {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn memory() -> Self {
        Self::Memory(Mutex::new(None))
    }

    pub async fn get(&self) -> Result<Option<ContextId>> {
        match self {
            Self::File(path) => {
                let raw = match tokio::fs::read_to_string(path).await {
                    Ok(raw) => raw,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(err) => {
                        return Err(err)
                            .wrap_err(format!("reading current context {}", path.display()));
                    }
                };
                if raw.trim().is_empty() {
                    return Ok(None);
                }
                match raw.parse::<ContextId>() {
                    Ok(id) => Ok(Some(id)),
                    Err(err) => {
                        log::warn!(
                            "Ignoring malformed current context pointer {}: {}",
                            path.display(),
                            err
                        );
                        Ok(None)
                    }
                }
            }
            Self::Memory(current) => Ok(*current
                .lock()
                .map_err(|_| eyre!("current context lock poisoned"))?),
        }
    }

    pub async fn set(&self, id: ContextId) -> Result<()> {
        match self {
            Self::File(path) => {
                let mut tmp = path.clone().into_os_string();
                tmp.push(".tmp");
                let tmp = PathBuf::from(tmp);
                tokio::fs::write(&tmp, id.to_string())
                    .await
                    .wrap_err(format!("writing {}", tmp.display()))?;
                tokio::fs::rename(&tmp, path)
                    .await
                    .wrap_err(format!("replacing current context {}", path.display()))?;
            }
            Self::Memory(current) => {
                *current
                    .lock()
                    .map_err(|_| eyre!("current context lock poisoned"))? = Some(id);
            }
        }
        log::debug!("Current context set to {}", id);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match self {
            Self::File(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err)
                        .wrap_err(format!("removing current context {}", path.display()));
                }
            },
            Self::Memory(current) => {
                *current
                    .lock()
                    .map_err(|_| eyre!("current context lock poisoned"))? = None;
            }
        }
        log::debug!("Current context cleared");
        Ok(())
    }
}

impl Default for CurrentContext {
    fn default() -> Self {
        Self::memory()
    }
}
