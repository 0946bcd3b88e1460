//! Capabilities bound to a message the client created.

use crate::{RestApi, RestError, Result};
use hiven_core::Message;
use std::sync::Arc;

/// A message created through the REST API, with `edit`/`delete` bound to it.
#[derive(Clone)]
pub struct SentMessage {
    /// The created message.
    pub message: Message,

    api: Arc<dyn RestApi>,
}

impl std::fmt::Debug for SentMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentMessage")
            .field("message", &self.message)
            .finish()
    }
}

impl SentMessage {
    /// Bind a created message to the API that created it.
    pub fn new(message: Message, api: Arc<dyn RestApi>) -> Self {
        Self { message, api }
    }

    /// Post `content` into `room_id` and bind the result.
    pub async fn send(api: Arc<dyn RestApi>, room_id: &str, content: &str) -> Result<Self> {
        let message = api.send_message(room_id, content).await?;
        Ok(Self::new(message, api))
    }

    fn message_id(&self) -> Result<&str> {
        self.message
            .id
            .as_deref()
            .ok_or_else(|| RestError::validation("The created message has no ID"))
    }

    /// Replace this message's content.
    pub async fn edit(&self, content: &str) -> Result<()> {
        let id = self.message_id()?;
        self.api.edit_message(&self.message.room_id, id, content).await
    }

    /// Delete this message.
    pub async fn delete(&self) -> Result<()> {
        let id = self.message_id()?;
        self.api.delete_message(&self.message.room_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hiven_core::User;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RestApi for Recorder {
        async fn get_user(&self, _id: &str) -> Result<Option<User>> {
            Ok(None)
        }

        async fn send_message(&self, room_id: &str, content: &str) -> Result<Message> {
            self.calls.lock().unwrap().push(format!("send {} {}", room_id, content));
            Ok(serde_json::from_value(serde_json::json!({
                "id": "m1",
                "room_id": room_id,
                "content": content,
            }))?)
        }

        async fn edit_message(&self, room_id: &str, message_id: &str, content: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("edit {} {} {}", room_id, message_id, content));
            Ok(())
        }

        async fn delete_message(&self, room_id: &str, message_id: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete {} {}", room_id, message_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_edit_and_delete_bound_to_ids() {
        let recorder = Arc::new(Recorder::default());
        let sent = SentMessage::send(recorder.clone(), "r1", "hi").await.unwrap();

        sent.edit("bye").await.unwrap();
        sent.delete().await.unwrap();

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["send r1 hi", "edit r1 m1 bye", "delete r1 m1"]);
    }

    #[tokio::test]
    async fn test_edit_without_id_fails() {
        let recorder = Arc::new(Recorder::default());
        let message: Message =
            serde_json::from_value(serde_json::json!({ "room_id": "r1" })).unwrap();
        let sent = SentMessage::new(message, recorder.clone());

        assert!(sent.edit("x").await.unwrap_err().is_validation());
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
