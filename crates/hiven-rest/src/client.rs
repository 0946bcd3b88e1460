//! HTTP implementation of [`RestApi`].

use crate::{validate_content, validate_id, RestApi, RestError, Result};
use async_trait::async_trait;
use hiven_core::{BotToken, Message, User};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the Hiven REST API.
pub struct RestClient {
    /// HTTP client.
    client: Client,

    /// Bot token, sent verbatim as `Authorization`.
    token: BotToken,

    /// API base URL without trailing slash.
    api_base: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Standard `{success, data}` response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default = "default_success")]
    success: bool,
    data: Option<T>,
    error: Option<Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

impl RestClient {
    /// Create a client for `api_base` (e.g. `https://api.hiven.io`).
    pub fn new(token: BotToken, api_base: impl Into<String>) -> Result<Self> {
        Self::with_timeout(token, api_base, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client with a per-request timeout.
    pub fn with_timeout(token: BotToken, api_base: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        if token.is_empty() {
            return Err(RestError::config("Bot token is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RestError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn messages_url(&self, room_id: &str) -> String {
        format!("{}/v1/rooms/{}/messages", self.api_base, room_id)
    }

    /// Turn a non-2xx response into an error.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RestError::api(status.as_u16(), body))
    }

    /// Unwrap the `{success, data}` envelope.
    fn unwrap_envelope<T>(envelope: ApiResponse<T>) -> Result<Option<T>> {
        if !envelope.success {
            let reason = envelope
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(RestError::Unsuccessful(reason));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl RestApi for RestClient {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        validate_id("user", id)?;

        debug!("Fetching user {}", id);

        let response = self
            .client
            .get(format!("{}/v1/users/{}", self.api_base, id))
            .header("Authorization", self.token.expose())
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let envelope: ApiResponse<User> = response.json().await?;
        let mut user = match Self::unwrap_envelope(envelope) {
            Ok(Some(user)) => user,
            Ok(None) | Err(RestError::Unsuccessful(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        user.touch();

        Ok(Some(user))
    }

    async fn send_message(&self, room_id: &str, content: &str) -> Result<Message> {
        validate_id("room", room_id)?;
        validate_content(content)?;

        debug!("Sending message to room {}", room_id);

        let response = self
            .client
            .post(self.messages_url(room_id))
            .header("Authorization", self.token.expose())
            .json(&ContentBody { content })
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let envelope: ApiResponse<Value> = response.json().await?;
        let mut data = Self::unwrap_envelope(envelope)?
            .ok_or_else(|| RestError::Unsuccessful("response carried no message".to_string()))?;

        // The created message may omit the room it was posted in
        if let Value::Object(map) = &mut data {
            map.entry("room_id")
                .or_insert_with(|| Value::String(room_id.to_string()));
        }

        Ok(serde_json::from_value(data)?)
    }

    async fn edit_message(&self, room_id: &str, message_id: &str, content: &str) -> Result<()> {
        validate_id("room", room_id)?;
        validate_id("message", message_id)?;
        validate_content(content)?;

        debug!("Editing message {} in room {}", message_id, room_id);

        let response = self
            .client
            .patch(format!("{}/{}", self.messages_url(room_id), message_id))
            .header("Authorization", self.token.expose())
            .json(&ContentBody { content })
            .send()
            .await?;
        Self::check_status(response).await?;

        Ok(())
    }

    async fn delete_message(&self, room_id: &str, message_id: &str) -> Result<()> {
        validate_id("room", room_id)?;
        validate_id("message", message_id)?;

        debug!("Deleting message {} in room {}", message_id, room_id);

        let response = self
            .client
            .delete(format!("{}/{}", self.messages_url(room_id), message_id))
            .header("Authorization", self.token.expose())
            .send()
            .await?;
        Self::check_status(response).await?;

        Ok(())
    }
}
