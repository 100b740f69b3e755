use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use bb_core::{
    chat::ChatService, config::Config, messaging::port::MessagingPort, session::Sessions,
    transcript::Transcript,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    sessions: Arc<Sessions>,
    transcript: Arc<Transcript>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!("bb started: @{}", me.username()),
        Err(e) => tracing::warn!("get_me failed: {e}"),
    }
    tracing::info!(
        path = %transcript.path().display(),
        strategy = ?cfg.match_strategy,
        "transcript and matching configured"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let chat = Arc::new(ChatService::new(
        sessions,
        messenger,
        transcript,
        cfg.relay_policy(),
    ));

    let state = Arc::new(AppState { chat });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
