use thiserror::Error;

/// Errors raised by the data-access, export and clipboard layers.
#[derive(Debug, Error)]
pub enum Error {
    /// A field failed validation before reaching the database.
    #[error("{0}")]
    Validation(String),

    /// A lookup or post-write read-back found nothing.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Attempt to delete one of the seeded technology tags.
    #[error("tag '{0}' is a system tag and cannot be deleted")]
    SystemTag(String),

    /// A name that must be unique is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = Error::not_found("item", "abc");
        assert_eq!(err.to_string(), "item 'abc' not found");
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = Error::Validation("name must not be empty".into());
        assert_eq!(err.to_string(), "name must not be empty");
    }

    #[test]
    fn sqlite_errors_convert() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Sqlite(_)));
    }
}
