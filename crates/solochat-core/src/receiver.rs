use std::sync::Arc;

pub use crate::audit::InboundRecord;
use crate::{
    audit::{AuditEvent, AuditLog},
    callbacks::HostCallbacks,
    errors::Error,
    messaging::types::{InboundEvent, MessageKind, EMPTY_PLACEHOLDER},
    session::{Latch, SessionContext},
};

/// What the receiver did with one inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The update carried no message.
    NoMessage,
    /// Sent by a bot while bot messages are not accepted.
    BotDropped,
    /// Latched (if first) but not a text message, so no callback.
    NotText,
    /// Audited and handed to `on_received`.
    Delivered,
}

/// Normalizes inbound events and forwards text messages to the host.
///
/// Cheap to clone; the Telegram router holds one per dispatcher.
#[derive(Clone)]
pub struct UpdateReceiver {
    session: Arc<SessionContext>,
    audit: Arc<AuditLog>,
    callbacks: Arc<dyn HostCallbacks>,
    accept_bot_messages: bool,
}

impl UpdateReceiver {
    pub fn new(
        session: Arc<SessionContext>,
        audit: Arc<AuditLog>,
        callbacks: Arc<dyn HostCallbacks>,
        accept_bot_messages: bool,
    ) -> Self {
        Self {
            session,
            audit,
            callbacks,
            accept_bot_messages,
        }
    }

    pub fn handle(&self, event: InboundEvent) -> Disposition {
        let Some(msg) = event.message else {
            tracing::debug!(update_id = event.update_id, "update without message ignored");
            return Disposition::NoMessage;
        };

        let is_bot = msg.sender.as_ref().is_some_and(|s| s.is_bot);
        if is_bot && !self.accept_bot_messages {
            let username = msg
                .sender
                .as_ref()
                .map(|s| s.display_name())
                .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string());
            tracing::info!(chat_id = msg.chat_id.0, "dropping message from bot {username}");
            self.audit.record(AuditEvent::BotDropped {
                chat_id: msg.chat_id,
                username: &username,
            });
            return Disposition::BotDropped;
        }

        // Single-chat design: only the first chat becomes the outbound target.
        match self.session.latch_chat(msg.chat_id) {
            Latch::Latched(chat) => tracing::info!(chat_id = chat.0, "target chat latched"),
            Latch::AlreadySet(chat) if chat != msg.chat_id => tracing::debug!(
                chat_id = msg.chat_id.0,
                target = chat.0,
                "message from another chat; outbound target unchanged"
            ),
            Latch::AlreadySet(_) => {}
        }

        if msg.kind != MessageKind::Text {
            return Disposition::NotText;
        }

        let username = msg
            .sender
            .as_ref()
            .map(|s| s.display_name())
            .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string());
        let text = msg
            .text
            .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string());

        let record = InboundRecord {
            chat_id: msg.chat_id,
            username,
            text,
        };
        self.audit.record(AuditEvent::Inbound(&record));
        self.callbacks.on_received(&record.username, &record.text);
        Disposition::Delivered
    }

    /// Errors from the inbound stream are reported and swallowed; polling continues.
    pub fn handle_stream_error(&self, error: Error) {
        tracing::warn!("inbound stream error: {error}");
        self.callbacks.on_error(&error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, MessageId},
        messaging::types::{InboundMessage, Sender},
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        received: Mutex<Vec<(String, String)>>,
        errors: Mutex<Vec<String>>,
    }

    impl HostCallbacks for Recorder {
        fn on_received(&self, username: &str, message: &str) {
            self.received
                .lock()
                .unwrap()
                .push((username.to_string(), message.to_string()));
        }

        fn on_error(&self, error: &Error) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    fn text_event(chat: i64, first: Option<&str>, text: Option<&str>, is_bot: bool) -> InboundEvent {
        InboundEvent {
            update_id: 1,
            message: Some(InboundMessage {
                message_id: MessageId(10),
                chat_id: ChatId(chat),
                sender: Some(Sender {
                    first_name: first.map(str::to_string),
                    last_name: None,
                    is_bot,
                }),
                kind: MessageKind::Text,
                text: text.map(str::to_string),
            }),
        }
    }

    fn receiver(accept_bots: bool) -> (UpdateReceiver, Arc<Recorder>, Arc<SessionContext>) {
        let rec = Arc::new(Recorder::default());
        let session = Arc::new(SessionContext::new());
        let rx = UpdateReceiver::new(
            session.clone(),
            Arc::new(AuditLog::disabled()),
            rec.clone(),
            accept_bots,
        );
        (rx, rec, session)
    }

    #[test]
    fn empty_update_is_dropped() {
        let (rx, rec, session) = receiver(false);
        let d = rx.handle(InboundEvent {
            update_id: 5,
            message: None,
        });
        assert_eq!(d, Disposition::NoMessage);
        assert!(rec.received.lock().unwrap().is_empty());
        assert_eq!(session.chat_id(), None);
    }

    #[test]
    fn bot_messages_dropped_unless_accepted() {
        let (rx, rec, session) = receiver(false);
        assert_eq!(
            rx.handle(text_event(1, Some("Robo"), Some("beep"), true)),
            Disposition::BotDropped
        );
        assert!(rec.received.lock().unwrap().is_empty());
        assert_eq!(session.chat_id(), None, "dropped bot messages must not latch");

        let (rx, rec, session) = receiver(true);
        assert_eq!(
            rx.handle(text_event(1, Some("Robo"), Some("beep"), true)),
            Disposition::Delivered
        );
        assert_eq!(rec.received.lock().unwrap().len(), 1);
        assert_eq!(session.chat_id(), Some(ChatId(1)));
    }

    #[test]
    fn first_chat_is_latched_and_later_chats_do_not_redirect() {
        let (rx, rec, session) = receiver(false);
        rx.handle(text_event(100, Some("A"), Some("one"), false));
        rx.handle(text_event(200, Some("B"), Some("two"), false));

        assert_eq!(session.chat_id(), Some(ChatId(100)));
        // Both still reach the host.
        assert_eq!(
            *rec.received.lock().unwrap(),
            vec![
                ("A".to_string(), "one".to_string()),
                ("B".to_string(), "two".to_string())
            ]
        );
    }

    #[test]
    fn missing_name_and_body_fall_back_to_placeholder() {
        let (rx, rec, _) = receiver(false);
        rx.handle(text_event(1, None, None, false));

        let mut ev = text_event(1, Some("x"), Some("y"), false);
        if let Some(m) = ev.message.as_mut() {
            m.sender = None;
        }
        rx.handle(ev);

        assert_eq!(
            *rec.received.lock().unwrap(),
            vec![
                ("Empty".to_string(), "Empty".to_string()),
                ("Empty".to_string(), "y".to_string())
            ]
        );
    }

    #[test]
    fn non_text_messages_latch_without_callback() {
        let (rx, rec, session) = receiver(false);
        let mut ev = text_event(7, Some("A"), None, false);
        if let Some(m) = ev.message.as_mut() {
            m.kind = MessageKind::Photo;
        }
        assert_eq!(rx.handle(ev), Disposition::NotText);
        assert!(rec.received.lock().unwrap().is_empty());
        assert_eq!(session.chat_id(), Some(ChatId(7)));
    }

    #[test]
    fn stream_errors_reach_error_callback() {
        let (rx, rec, _) = receiver(false);
        rx.handle_stream_error(Error::Transport("timed out".to_string()));
        rx.handle_stream_error(Error::Transport("again".to_string()));
        assert_eq!(rec.errors.lock().unwrap().len(), 2);
    }

    #[test]
    fn delivered_messages_are_audited() {
        let path = std::path::PathBuf::from(format!(
            "/tmp/solochat-receiver-audit-{}-{}.log",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        let rec = Arc::new(Recorder::default());
        let rx = UpdateReceiver::new(
            Arc::new(SessionContext::new()),
            Arc::new(AuditLog::new(Some(path.clone()))),
            rec,
            false,
        );
        rx.handle(text_event(3, Some("Ada"), Some("hello"), false));
        rx.handle(text_event(3, Some("Bot"), Some("beep"), true));

        let written = std::fs::read_to_string(&path).unwrap();
        let lines = written.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#"{"chat_id":3,"username":"Ada","text":"hello"}"#));
        assert!(lines[1].contains("Dropped message from bot Bot"));
        let _ = std::fs::remove_file(path);
    }
}
