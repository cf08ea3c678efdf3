use teloxide::types::{AllowedUpdate, Message, Update, UpdateKind as TgUpdateKind};

use solochat_core::{
    config::UpdateKind,
    domain::{ChatId, MessageId},
    messaging::types::{InboundEvent, InboundMessage, MessageKind, Sender},
};

/// Telegram `allowed_updates` for the configured subscription list.
pub fn allowed_updates(subscribed: &[UpdateKind]) -> Vec<AllowedUpdate> {
    subscribed
        .iter()
        .map(|kind| match kind {
            UpdateKind::Message => AllowedUpdate::Message,
            UpdateKind::EditedMessage => AllowedUpdate::EditedMessage,
        })
        .collect()
}

/// Map a Telegram update; anything that is not a subscribed message kind carries no message.
pub fn to_inbound_event(update: &Update, subscribed: &[UpdateKind]) -> InboundEvent {
    let message = match &update.kind {
        TgUpdateKind::Message(m) if subscribed.contains(&UpdateKind::Message) => Some(m),
        TgUpdateKind::EditedMessage(m) if subscribed.contains(&UpdateKind::EditedMessage) => {
            Some(m)
        }
        _ => None,
    };

    InboundEvent {
        update_id: i64::from(update.id),
        message: message.map(to_inbound_message),
    }
}

fn to_inbound_message(msg: &Message) -> InboundMessage {
    let sender = msg.from().map(|u| Sender {
        first_name: Some(u.first_name.clone()),
        last_name: u.last_name.clone(),
        is_bot: u.is_bot,
    });

    InboundMessage {
        message_id: MessageId(msg.id.0),
        chat_id: ChatId(msg.chat.id.0),
        sender,
        kind: message_kind(msg),
        text: msg.text().map(str::to_string),
    }
}

fn message_kind(msg: &Message) -> MessageKind {
    if msg.text().is_some() {
        MessageKind::Text
    } else if msg.photo().is_some() {
        MessageKind::Photo
    } else if msg.document().is_some() {
        MessageKind::Document
    } else if msg.video().is_some() {
        MessageKind::Video
    } else if msg.audio().is_some() {
        MessageKind::Audio
    } else if msg.voice().is_some() {
        MessageKind::Voice
    } else if msg.location().is_some() {
        MessageKind::Location
    } else {
        MessageKind::Other
    }
}
