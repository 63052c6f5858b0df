use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ChatReply, DrafterApi, Health};
use crate::error::ApiError;
use crate::session::SessionId;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    tools_used: Option<Vec<String>>,
    #[serde(default)]
    document_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct DocumentResponse {
    success: bool,
    #[serde(default)]
    document_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    active_sessions: usize,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct DrafterClient {
    client: Client,
    base_url: String,
}

impl DrafterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_document(&self, session: &SessionId) -> Result<String, ApiError> {
        let url = format!("{}/api/document/{}", self.base_url, session);

        let response = self.client.get(&url).send().await?;
        let document: DocumentResponse = decode(response).await?;

        if !document.success {
            return Err(ApiError::rejected(document.error, "Failed to fetch document"));
        }
        Ok(document.document_content.unwrap_or_default())
    }

    pub async fn send_chat(&self, message: &str, session: &SessionId) -> Result<ChatReply, ApiError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            message,
            session_id: session.as_str(),
        };

        // The backend reports failures as `success: false` with a 500, so the
        // body is decoded whatever the status is.
        let response = self.client.post(&url).json(&request).send().await?;
        let chat: ChatResponse = decode(response).await?;

        if !chat.success {
            return Err(ApiError::rejected(chat.error, "Failed to send message"));
        }

        Ok(ChatReply {
            response: chat.response.unwrap_or_default(),
            tools_used: chat.tools_used.unwrap_or_default(),
            document_content: chat.document_content,
        })
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;
        let health: HealthResponse = decode(response).await?;

        if !health.success {
            return Err(ApiError::rejected(health.error, "Backend reported unhealthy"));
        }
        Ok(Health {
            status: health.status.unwrap_or_else(|| "healthy".to_string()),
            active_sessions: health.active_sessions,
        })
    }

    pub async fn clear_session(&self, session: &SessionId) -> Result<(), ApiError> {
        let url = format!("{}/api/sessions/{}/clear", self.base_url, session);

        let response = self.client.post(&url).send().await?;
        let status: StatusResponse = decode(response).await?;

        if !status.success {
            return Err(ApiError::rejected(status.error, "Failed to clear session"));
        }
        Ok(())
    }
}

impl DrafterApi for DrafterClient {
    async fn fetch_document(&self, session: &SessionId) -> Result<String, ApiError> {
        DrafterClient::fetch_document(self, session).await
    }

    async fn send_chat(&self, message: &str, session: &SessionId) -> Result<ChatReply, ApiError> {
        DrafterClient::send_chat(self, message, session).await
    }

    async fn health(&self) -> Result<Health, ApiError> {
        DrafterClient::health(self).await
    }

    async fn clear_session(&self, session: &SessionId) -> Result<(), ApiError> {
        DrafterClient::clear_session(self, session).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| ApiError::Decode { status, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_format() {
        let session = SessionId::parse("abc123xyz").unwrap();
        let body = serde_json::to_value(ChatRequest {
            message: "Create a to-do list for today",
            session_id: session.as_str(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "message": "Create a to-do list for today",
                "session_id": "abc123xyz"
            })
        );
    }

    #[test]
    fn test_chat_response_tolerates_missing_fields() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"success": true, "response": "ok", "tools_used": null}"#).unwrap();
        assert!(chat.success);
        assert!(chat.tools_used.is_none());
        assert!(chat.document_content.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = DrafterClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
