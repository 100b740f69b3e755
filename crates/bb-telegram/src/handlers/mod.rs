//! Telegram update handlers.
//!
//! Each update is reduced to a core `IncomingEvent` and handed to the
//! `ChatService`; nothing here touches session state directly.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use bb_core::{domain::UserId, messaging::types::IncomingEvent};

use crate::router::AppState;

mod commands;
mod media;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Relaying only makes sense in a one-to-one chat with the bot.
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(user_id) = core_user_id(user.id.0) else {
        tracing::warn!(user = user.id.0, "user id out of range, update ignored");
        return Ok(());
    };

    let event = match msg.text() {
        Some(text) if text.starts_with('/') => commands::command_event(user_id, text),
        _ => IncomingEvent::Message {
            user_id,
            payload: media::payload_from_message(&msg),
        },
    };

    state.chat.handle(event).await;
    Ok(())
}

fn core_user_id(raw: u64) -> Option<UserId> {
    i64::try_from(raw).ok().map(UserId)
}
