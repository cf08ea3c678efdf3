use std::{fmt, path::Path};

use tokio::io::AsyncRead;

use crate::domain::{ChatId, MessageId};

/// Transport-agnostic inbound update.
///
/// Telegram-specific fields are mapped away in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub update_id: i64,
    pub message: Option<InboundMessage>,
}

#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub sender: Option<Sender>,
    pub kind: MessageKind,
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Sender {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_bot: bool,
}

impl Sender {
    /// First and last name joined by a space; `"Empty"` when neither is present.
    pub fn display_name(&self) -> String {
        let parts = [self.first_name.as_deref(), self.last_name.as_deref()];
        let name = parts
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            EMPTY_PLACEHOLDER.to_string()
        } else {
            name
        }
    }
}

/// Placeholder used when a sender name or a message body is missing.
pub const EMPTY_PLACEHOLDER: &str = "Empty";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Photo,
    Document,
    Video,
    Audio,
    Voice,
    Location,
    Other,
}

/// An owned, readable byte stream handed to the transport.
///
/// The handle is released when the stream is dropped, i.e. after the transport
/// call finishes or the owning work item is discarded.
pub struct MediaStream {
    pub file_name: String,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl MediaStream {
    pub fn new(file_name: impl Into<String>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            file_name: file_name.into(),
            reader: Box::new(reader),
        }
    }

    /// Wrap an already opened file, naming the stream after the path's file name.
    pub fn from_file(path: &Path, file: std::fs::File) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        Self::new(file_name, tokio::fs::File::from_std(file))
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}
