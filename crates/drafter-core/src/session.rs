use std::fmt;

use anyhow::{anyhow, Result};
use rand::Rng;

const ID_LEN: usize = 9;
const MAX_EXTERNAL_LEN: usize = 64;
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Token scoping every backend request to one conversation/document pair.
///
/// Created once per client lifetime and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..ID_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Re-attach to a session id handed in from outside (e.g. `--session`).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("Session id cannot be empty"));
        }
        if raw.len() > MAX_EXTERNAL_LEN {
            return Err(anyhow!("Session id is longer than {} characters", MAX_EXTERNAL_LEN));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!("Session id must be alphanumeric: {}", raw));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
