use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    audit::{AuditEvent, AuditLog},
    callbacks::HostCallbacks,
    dispatch::queue::{OutboundCommand, QueuedWork, WorkReceiver},
    domain::{ChatId, MessageRef},
    errors::Error,
    messaging::port::ChatTransport,
    session::SessionContext,
    Result,
};

/// The single consumer of the work queue.
///
/// Each work is awaited to completion before the next one is received, which
/// is what makes outbound calls strictly sequential and FIFO.
pub(crate) struct DispatchWorker {
    pub(crate) transport: Arc<dyn ChatTransport>,
    pub(crate) session: Arc<SessionContext>,
    pub(crate) audit: Arc<AuditLog>,
    pub(crate) callbacks: Arc<dyn HostCallbacks>,
}

impl DispatchWorker {
    /// Run until `cancel` fires (or every producer is gone), then discard what is
    /// left in the queue. Returns the number of discarded works.
    ///
    /// A work that is already executing when `cancel` fires is not interrupted.
    pub(crate) async fn run(self, mut rx: WorkReceiver, cancel: CancellationToken) -> usize {
        loop {
            let work = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                work = rx.recv() => match work {
                    Some(w) => w,
                    None => break,
                },
            };
            self.execute(work).await;
        }

        let discarded = rx.close_and_drain();
        if discarded > 0 {
            tracing::info!("dispatch loop stopped, {discarded} queued work item(s) discarded");
        } else {
            tracing::info!("dispatch loop stopped");
        }
        discarded
    }

    async fn execute(&self, work: QueuedWork) {
        let QueuedWork {
            seq,
            chat_id,
            command,
        } = work;
        let kind = command.kind();
        let summary = command.summary();

        self.session.set_in_flight(true);

        // Own task per work: a panic in the transport ends that work only.
        let transport = self.transport.clone();
        let outcome = match tokio::spawn(async move {
            deliver(transport.as_ref(), chat_id, command).await
        })
        .await
        {
            Ok(res) => res,
            Err(e) => Err(Error::Transport(format!("{kind} #{seq} panicked: {e}"))),
        };

        self.session.set_in_flight(false);

        match outcome {
            Ok(sent) => {
                tracing::debug!(seq, kind, message_id = sent.message_id.0, "outbound delivered");
                self.audit.record(AuditEvent::Sent {
                    seq,
                    kind,
                    chat_id,
                    summary: &summary,
                });
            }
            Err(e) => {
                tracing::error!(seq, kind, "outbound failed: {e}");
                self.audit.record(AuditEvent::Failed {
                    seq,
                    kind,
                    chat_id,
                    error: &e.to_string(),
                });
                self.callbacks.on_error(&e);
            }
        }
    }
}

async fn deliver(
    transport: &dyn ChatTransport,
    chat_id: ChatId,
    command: OutboundCommand,
) -> Result<MessageRef> {
    match command {
        OutboundCommand::Text(text) => transport.send_text(chat_id, &text).await,
        OutboundCommand::Location {
            latitude,
            longitude,
        } => transport.send_location(chat_id, latitude, longitude).await,
        OutboundCommand::Document { file, caption } => {
            transport
                .send_document(chat_id, file, caption.as_deref())
                .await
        }
        OutboundCommand::Photo(file) => transport.send_photo(chat_id, file).await,
        OutboundCommand::Video(file) => transport.send_video(chat_id, file).await,
        OutboundCommand::Audio(file) => transport.send_audio(chat_id, file).await,
    }
}
