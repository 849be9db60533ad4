use thiserror::Error;

/// Error taxonomy for the report store. The HTTP layer maps these onto
/// status codes (400 / 404 / 500) without inspecting message text.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The submitted wallet address is not a Base58 string of 32-44 chars.
    #[error("invalid wallet address: {0:?} (expected Base58, 32-44 chars)")]
    InvalidAddress(String),

    /// No report exists for the given id or address.
    #[error("wallet report not found: {0}")]
    NotFound(String),

    /// Underlying storage failure. Reported once, never retried.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_key() {
        let err = RegistryError::InvalidAddress("nope".to_string());
        assert!(err.to_string().contains("nope"));

        let err = RegistryError::NotFound("id 42".to_string());
        assert!(err.to_string().contains("id 42"));
    }
}
