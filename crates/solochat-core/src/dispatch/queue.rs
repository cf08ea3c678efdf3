use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use tokio::sync::mpsc;

use crate::{domain::ChatId, messaging::types::MediaStream};

/// One outbound action, complete and ready to hand to the transport.
#[derive(Debug)]
pub enum OutboundCommand {
    Text(String),
    Location { latitude: f64, longitude: f64 },
    Document {
        file: MediaStream,
        caption: Option<String>,
    },
    Photo(MediaStream),
    Video(MediaStream),
    Audio(MediaStream),
}

impl OutboundCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundCommand::Text(_) => "text",
            OutboundCommand::Location { .. } => "location",
            OutboundCommand::Document { .. } => "document",
            OutboundCommand::Photo(_) => "photo",
            OutboundCommand::Video(_) => "video",
            OutboundCommand::Audio(_) => "audio",
        }
    }

    /// Short human-readable payload description for logs.
    pub fn summary(&self) -> String {
        match self {
            OutboundCommand::Text(text) => text.clone(),
            OutboundCommand::Location {
                latitude,
                longitude,
            } => format!("{latitude}, {longitude}"),
            OutboundCommand::Document { file, caption } => match caption {
                Some(c) => format!("{} ({c})", file.file_name),
                None => file.file_name.clone(),
            },
            OutboundCommand::Photo(file)
            | OutboundCommand::Video(file)
            | OutboundCommand::Audio(file) => file.file_name.clone(),
        }
    }
}

/// A queued outbound action bound to its target chat.
#[derive(Debug)]
pub struct QueuedWork {
    /// Monotonic per-dispatcher sequence number; equals dispatch order.
    pub seq: u64,
    pub chat_id: ChatId,
    pub command: OutboundCommand,
}

/// Producer half of the FIFO work queue.
///
/// Unbounded: `enqueue` never waits, so it is safe to call from any thread,
/// including ones outside the runtime. A slow transport lets the queue grow.
#[derive(Clone, Debug)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<QueuedWork>,
    depth: Arc<AtomicUsize>,
    // Held across the send so sequence numbers follow channel order.
    next_seq: Arc<Mutex<u64>>,
}

/// Consumer half; owned by the dispatch loop.
#[derive(Debug)]
pub struct WorkReceiver {
    rx: mpsc::UnboundedReceiver<QueuedWork>,
    depth: Arc<AtomicUsize>,
}

pub fn work_queue() -> (WorkQueue, WorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        WorkQueue {
            tx,
            depth: depth.clone(),
            next_seq: Arc::new(Mutex::new(1)),
        },
        WorkReceiver { rx, depth },
    )
}

impl WorkQueue {
    /// Append to the tail. Returns the sequence number, or `None` once the
    /// consumer is gone (the command, and any file handle in it, is dropped).
    pub fn enqueue(&self, chat_id: ChatId, command: OutboundCommand) -> Option<u64> {
        let mut next = self
            .next_seq
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let seq = *next;

        self.depth.fetch_add(1, Ordering::AcqRel);
        let work = QueuedWork {
            seq,
            chat_id,
            command,
        };
        if self.tx.send(work).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return None;
        }

        *next += 1;
        Some(seq)
    }

    /// Number of works accepted but not yet taken by the dispatch loop.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WorkReceiver {
    pub async fn recv(&mut self) -> Option<QueuedWork> {
        let work = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Some(work)
    }

    /// Close the queue and drop everything still in it. Returns how many works were discarded.
    pub fn close_and_drain(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0usize;
        while let Ok(work) = self.rx.try_recv() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(seq = work.seq, kind = work.command.kind(), "discarding queued work");
            discarded += 1;
        }
        discarded
    }
}
