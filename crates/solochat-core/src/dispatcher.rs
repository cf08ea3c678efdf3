use std::{path::Path, sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    audit::{AuditEvent, AuditLog},
    callbacks::HostCallbacks,
    config::Config,
    dispatch::{work_queue, worker::DispatchWorker, OutboundCommand, WorkQueue},
    domain::ChatId,
    messaging::{port::ChatTransport, types::MediaStream},
    outbound::{self, MediaKind, Rejection},
    receiver::UpdateReceiver,
    session::SessionContext,
};

/// Single-chat outbound dispatcher.
///
/// `send_*` methods validate synchronously, enqueue, and return immediately;
/// the returned `bool` only says whether the work was accepted into the queue.
/// Delivery failures surface through [`HostCallbacks::on_error`] and the audit log.
pub struct ChatDispatcher {
    session: Arc<SessionContext>,
    queue: WorkQueue,
    audit: Arc<AuditLog>,
    receiver: UpdateReceiver,
    shutdown_settle: Duration,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<usize>>>,
}

impl ChatDispatcher {
    /// Spawn the dispatch loop on the current tokio runtime.
    pub fn start(
        cfg: &Config,
        transport: Arc<dyn ChatTransport>,
        callbacks: Arc<dyn HostCallbacks>,
    ) -> Arc<Self> {
        let session = Arc::new(SessionContext::new());
        let audit = Arc::new(AuditLog::new(cfg.log_path.clone()));
        let cancel = CancellationToken::new();
        let (queue, rx) = work_queue();

        let worker = DispatchWorker {
            transport,
            session: session.clone(),
            audit: audit.clone(),
            callbacks: callbacks.clone(),
        };
        let handle = tokio::spawn(worker.run(rx, cancel.clone()));

        audit.record(AuditEvent::Started);
        tracing::info!("dispatcher started");

        let receiver = UpdateReceiver::new(
            session.clone(),
            audit.clone(),
            callbacks,
            cfg.accept_bot_messages,
        );

        Arc::new(Self {
            session,
            queue,
            audit,
            receiver,
            shutdown_settle: cfg.shutdown_settle,
            cancel,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Inbound side, for whatever drives the transport's update stream.
    pub fn receiver(&self) -> UpdateReceiver {
        self.receiver.clone()
    }

    /// Fires once `stop` raises the shutdown signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.session.chat_id()
    }

    /// Works accepted but not yet picked up by the dispatch loop.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_in_flight()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn send_text(&self, text: &str) -> bool {
        self.submit("text", || {
            outbound::check_text(text)?;
            Ok(OutboundCommand::Text(text.to_string()))
        })
    }

    pub fn send_location(&self, latitude: f64, longitude: f64) -> bool {
        self.submit("location", || {
            outbound::check_coordinates(latitude, longitude)?;
            Ok(OutboundCommand::Location {
                latitude,
                longitude,
            })
        })
    }

    pub fn send_document(&self, path: impl AsRef<Path>, caption: Option<&str>) -> bool {
        let caption = caption.map(str::to_string);
        self.submit_file(MediaKind::Document, path.as_ref(), caption)
    }

    pub fn send_photo(&self, path: impl AsRef<Path>) -> bool {
        self.submit_file(MediaKind::Photo, path.as_ref(), None)
    }

    pub fn send_video(&self, path: impl AsRef<Path>) -> bool {
        self.submit_file(MediaKind::Video, path.as_ref(), None)
    }

    pub fn send_audio(&self, path: impl AsRef<Path>) -> bool {
        self.submit_file(MediaKind::Audio, path.as_ref(), None)
    }

    /// Pre-opened streams skip the extension and existence checks.
    pub fn send_photo_stream(&self, file: MediaStream) -> bool {
        self.submit_stream(MediaKind::Photo, file)
    }

    pub fn send_video_stream(&self, file: MediaStream) -> bool {
        self.submit_stream(MediaKind::Video, file)
    }

    pub fn send_audio_stream(&self, file: MediaStream) -> bool {
        self.submit_stream(MediaKind::Audio, file)
    }

    fn submit_file(&self, kind: MediaKind, path: &Path, caption: Option<String>) -> bool {
        self.submit(kind.as_str(), || {
            let file = outbound::open_media(kind, path)?;
            Ok(kind.into_command(file, caption))
        })
    }

    fn submit_stream(&self, kind: MediaKind, file: MediaStream) -> bool {
        self.submit(kind.as_str(), || Ok(kind.into_command(file, None)))
    }

    /// Shared precondition checks, then `build`, then enqueue.
    ///
    /// `build` only runs once the chat is known, so no file is opened for a call
    /// that is going to be rejected anyway.
    fn submit(
        &self,
        kind: &'static str,
        build: impl FnOnce() -> Result<OutboundCommand, Rejection>,
    ) -> bool {
        let result = self.chat_for_send().and_then(|chat_id| {
            let command = build()?;
            self.queue
                .enqueue(chat_id, command)
                .ok_or(Rejection::Closed)
        });

        match result {
            Ok(seq) => {
                tracing::debug!(seq, kind, "outbound queued");
                true
            }
            Err(reason) => {
                tracing::debug!(kind, "outbound rejected: {reason}");
                false
            }
        }
    }

    fn chat_for_send(&self) -> Result<ChatId, Rejection> {
        if self.cancel.is_cancelled() {
            return Err(Rejection::Closed);
        }
        self.session.chat_id().ok_or(Rejection::NoChat)
    }

    /// Stop dispatching.
    ///
    /// Waits the settle delay first so a last inbound event can land, then
    /// raises the shutdown signal. A work already executing finishes; works
    /// still queued are discarded. Later calls return immediately.
    pub async fn stop(&self) {
        let Some(handle) = self.worker.lock().await.take() else {
            return;
        };

        tokio::time::sleep(self.shutdown_settle).await;
        self.cancel.cancel();

        let discarded = match handle.await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!("dispatch loop ended abnormally: {e}");
                0
            }
        };

        self.audit.record(AuditEvent::Stopped { discarded });
        tracing::info!("dispatcher stopped");
    }
}
