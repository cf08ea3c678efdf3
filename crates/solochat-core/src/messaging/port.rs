use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MediaStream,
    Result,
};

/// Outbound chat-API port.
///
/// Every call is a single attempt; callers decide what to do with a failure.
/// Media calls take ownership of the stream so the handle is released as soon
/// as the call returns.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    async fn send_location(
        &self,
        chat_id: ChatId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageRef>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file: MediaStream,
        caption: Option<&str>,
    ) -> Result<MessageRef>;

    async fn send_photo(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef>;
    async fn send_video(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef>;
    async fn send_audio(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef>;
}
