//! Backend access: the [`DrafterApi`] seam and its HTTP implementation.

pub mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::SessionId;

pub use http::DrafterClient;

/// Successful answer from the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub tools_used: Vec<String>,
    /// Present when the backend attached the document it now holds.
    pub document_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub active_sessions: usize,
}

/// Operations the client needs from the backend.
///
/// The driver only talks to this trait, so tests can swap in an in-memory backend.
pub trait DrafterApi: Clone + Send + Sync + 'static {
    fn fetch_document(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    fn send_chat(
        &self,
        message: &str,
        session: &SessionId,
    ) -> impl Future<Output = Result<ChatReply, ApiError>> + Send;

    fn health(&self) -> impl Future<Output = Result<Health, ApiError>> + Send;

    fn clear_session(&self, session: &SessionId)
        -> impl Future<Output = Result<(), ApiError>> + Send;
}
