use std::sync::{
    atomic::{AtomicBool, Ordering},
    OnceLock,
};

use crate::domain::ChatId;

/// Outcome of offering a chat id to the latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Latch {
    /// This call fixed the target chat.
    Latched(ChatId),
    /// A chat was already latched; the offered one was ignored.
    AlreadySet(ChatId),
}

/// Dispatcher-owned session state shared by the receiver and the send builders.
///
/// The target chat is set exactly once, from the first accepted inbound
/// message, and never changes afterwards.
#[derive(Debug, Default)]
pub struct SessionContext {
    chat: OnceLock<ChatId>,
    in_flight: AtomicBool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.chat.get().copied()
    }

    pub fn latch_chat(&self, candidate: ChatId) -> Latch {
        match self.chat.set(candidate) {
            Ok(()) => Latch::Latched(candidate),
            Err(_) => Latch::AlreadySet(self.chat.get().copied().unwrap_or(candidate)),
        }
    }

    /// Status only: the dispatch loop is the single consumer, so this never gates execution.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn set_in_flight(&self, value: bool) {
        self.in_flight.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    impl Latch {
        fn chat_id(&self) -> ChatId {
            match *self {
                Latch::Latched(c) | Latch::AlreadySet(c) => c,
            }
        }
    }

    #[test]
    fn first_chat_wins() {
        let s = SessionContext::new();
        assert_eq!(s.chat_id(), None);
        assert_eq!(s.latch_chat(ChatId(1)), Latch::Latched(ChatId(1)));
        assert_eq!(s.latch_chat(ChatId(2)), Latch::AlreadySet(ChatId(1)));
        assert_eq!(s.chat_id(), Some(ChatId(1)));
    }

    #[test]
    fn concurrent_latch_has_exactly_one_winner() {
        let s = Arc::new(SessionContext::new());
        let handles = (0..8)
            .map(|i| {
                let s = s.clone();
                std::thread::spawn(move || s.latch_chat(ChatId(i)))
            })
            .collect::<Vec<_>>();

        let results = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();
        let winners = results
            .iter()
            .filter(|r| matches!(r, Latch::Latched(_)))
            .count();
        assert_eq!(winners, 1);

        let chat = s.chat_id().unwrap();
        assert!(results.iter().all(|r| r.chat_id() == chat));
    }
}
