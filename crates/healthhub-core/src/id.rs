use thiserror::Error;

/// Longest id accepted from callers. Store-generated ids are UUIDs.
pub const MAX_ID_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("id is empty")]
    Empty,
    #[error("id is longer than 64 characters")]
    TooLong,
    #[error("id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Ids end up in store keys (`table/id`) and REST filter values, so
/// separators and whitespace are rejected.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    if let Some(c) = id
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | ',' | '(' | ')'))
    {
        return Err(IdError::InvalidCharacter(c));
    }
    Ok(())
}
