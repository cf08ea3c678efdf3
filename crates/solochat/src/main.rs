use std::sync::Arc;

use solochat_core::{
    config::Config, messaging::port::ChatTransport, messaging::throttled::ThrottledTransport,
    ChatDispatcher,
};
use solochat_telegram::{router::run_polling, TelegramTransport};

mod console;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    solochat_core::logging::init("solochat")?;

    let cfg = Arc::new(Config::load()?);

    let telegram = TelegramTransport::from_token(&cfg.telegram_bot_token);
    let transport: Arc<dyn ChatTransport> = Arc::new(ThrottledTransport::new(
        Arc::new(telegram.clone()),
        cfg.outbound_min_interval,
    ));

    let dispatcher = ChatDispatcher::start(&cfg, transport, Arc::new(console::ConsoleHost));

    if let Some(path) = &cfg.log_path {
        println!("Audit log: {}", path.display());
    }
    println!("{}", console::HELP);

    // Console input ends the session; stopping the dispatcher also ends polling.
    let session = async {
        if let Err(e) = console::run(dispatcher.clone()).await {
            eprintln!("console error: {e}");
        }
        println!("Stopping...");
        dispatcher.stop().await;
    };
    let (polling, ()) = tokio::join!(
        run_polling(telegram.bot(), cfg.clone(), dispatcher.clone()),
        session
    );

    if let Err(e) = polling {
        eprintln!("telegram polling failed: {e}");
    }

    Ok(())
}
