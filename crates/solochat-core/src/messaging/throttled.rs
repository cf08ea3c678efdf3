use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::ChatTransport, types::MediaStream},
    Result,
};

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// ChatTransport decorator that spaces outbound calls at least `min_interval` apart.
///
/// With a single target chat one limiter is enough. A zero interval never waits.
pub struct ThrottledTransport {
    inner: Arc<dyn ChatTransport>,
    limiter: Mutex<IntervalLimiter>,
}

impl ThrottledTransport {
    pub fn new(inner: Arc<dyn ChatTransport>, min_interval: Duration) -> Self {
        Self {
            inner,
            limiter: Mutex::new(IntervalLimiter::new(min_interval)),
        }
    }

    async fn throttle(&self) {
        let wait = { self.limiter.lock().await.reserve() };
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl ChatTransport for ThrottledTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_location(
        &self,
        chat_id: ChatId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_location(chat_id, latitude, longitude).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file: MediaStream,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_document(chat_id, file, caption).await
    }

    async fn send_photo(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_photo(chat_id, file).await
    }

    async fn send_video(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_video(chat_id, file).await
    }

    async fn send_audio(&self, chat_id: ChatId, file: MediaStream) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_audio(chat_id, file).await
    }
}
