use std::fmt::Display;

/// Identifier of a stored context. Assigned by the store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(i64);

impl ContextId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ContextId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<&Context> for ContextId {
    fn from(value: &Context) -> Self {
        value.id
    }
}

impl std::str::FromStr for ContextId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    id: ContextId,
    title: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Context {
    pub fn new(id: impl Into<ContextId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_created_at(mut self, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        self.created_at = timestamp;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }
}

/// Title used when a context is created without one, e.g. `20240131235959`.
pub fn default_title() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}
