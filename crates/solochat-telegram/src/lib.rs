//! Telegram adapter (teloxide).
//!
//! Implements the `solochat-core` ChatTransport over the Telegram Bot API and
//! drives the inbound update stream into the core receiver.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};
use tokio::io::AsyncReadExt;

pub mod inbound;
pub mod router;

use solochat_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::ChatTransport, types::MediaStream},
    Result,
};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    fn sent(chat_id: ChatId, msg: Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    /// Read the whole stream, then let it drop so the file handle closes before the upload.
    async fn input_file(file: MediaStream) -> Result<InputFile> {
        let MediaStream {
            file_name,
            mut reader,
        } = file;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        Ok(InputFile::memory(bytes).file_name(file_name))
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, msg))
    }

    async fn send_location(
        &self,
        chat_id: ChatId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_location(Self::tg_chat(chat_id), latitude, longitude)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, msg))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file: MediaStream,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        let input = Self::input_file(file).await?;
        let mut req = self.bot.send_document(Self::tg_chat(chat_id), input);
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        let msg = req.await.map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, msg))
    }

    async fn send_photo(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef> {
        let input = Self::input_file(file).await?;
        let msg = self
            .bot
            .send_photo(Self::tg_chat(chat_id), input)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, msg))
    }

    async fn send_video(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef> {
        let input = Self::input_file(file).await?;
        let msg = self
            .bot
            .send_video(Self::tg_chat(chat_id), input)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, msg))
    }

    async fn send_audio(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef> {
        let input = Self::input_file(file).await?;
        let msg = self
            .bot
            .send_audio(Self::tg_chat(chat_id), input)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, msg))
    }
}
