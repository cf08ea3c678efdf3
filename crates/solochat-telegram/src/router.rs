use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, update_listeners::Polling};

use solochat_core::{
    config::{Config, UpdateKind},
    errors::Error,
    receiver::UpdateReceiver,
    ChatDispatcher,
};

use crate::inbound;

const SHUTDOWN_ATTEMPTS: usize = 50;
const SHUTDOWN_RETRY: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct InboundState {
    pub receiver: UpdateReceiver,
    pub subscribed: Vec<UpdateKind>,
}

/// Long-poll Telegram and feed every update to the dispatcher's receiver.
///
/// Returns once the dispatcher's shutdown signal fires (or polling ends on its own).
pub async fn run_polling(
    bot: Bot,
    cfg: Arc<Config>,
    dispatcher: Arc<ChatDispatcher>,
) -> anyhow::Result<()> {
    if let Ok(me) = bot.get_me().await {
        tracing::info!("polling as @{}", me.username());
    }

    let receiver = dispatcher.receiver();
    let state = Arc::new(InboundState {
        receiver: receiver.clone(),
        subscribed: cfg.subscribed_updates.clone(),
    });

    let handler = dptree::entry().endpoint(handle_update);

    let mut tg = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .build();

    // Tie teloxide's own shutdown to ours.
    let tg_shutdown = tg.shutdown_token();
    let stop = dispatcher.shutdown_token();
    tokio::spawn(async move {
        stop.cancelled().await;
        // Shutdown is refused while teloxide is idle, e.g. when stop races startup.
        for _ in 0..SHUTDOWN_ATTEMPTS {
            match tg_shutdown.shutdown() {
                Ok(done) => {
                    done.await;
                    return;
                }
                Err(_) => tokio::time::sleep(SHUTDOWN_RETRY).await,
            }
        }
        tracing::debug!("inbound polling was not running at shutdown");
    });

    let listener = Polling::builder(bot)
        .allowed_updates(inbound::allowed_updates(&cfg.subscribed_updates))
        .build();

    let error_handler = Arc::new(move |e: teloxide::RequestError| {
        let receiver = receiver.clone();
        async move {
            receiver.handle_stream_error(Error::Transport(format!("telegram polling: {e}")));
        }
    });

    tg.dispatch_with_listener(listener, error_handler).await;
    tracing::info!("inbound polling stopped");

    Ok(())
}

async fn handle_update(update: Update, state: Arc<InboundState>) -> ResponseResult<()> {
    let event = inbound::to_inbound_event(&update, &state.subscribed);
    let disposition = state.receiver.handle(event);
    tracing::trace!(update_id = update.id, ?disposition, "update handled");
    Ok(())
}
