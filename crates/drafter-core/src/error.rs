use thiserror::Error;

/// Failure talking to the Drafter backend.
///
/// The `Display` text is what ends up after `Error: ` in the conversation log,
/// so variants render the bare reason.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn rejected(reason: Option<String>, fallback: &str) -> Self {
        ApiError::Rejected(
            reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        )
    }
}
