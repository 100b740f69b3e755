//! Telegram adapter (teloxide).
//!
//! This crate implements the `bb-core` MessagingPort over the Telegram Bot API
//! and feeds inbound updates into the core `ChatService`.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use bb_core::{
    domain::{MediaRef, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Private chats share their id with the user.
    fn tg_chat(user_id: UserId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(user_id.0)
    }

    fn tg_file(media: &MediaRef) -> InputFile {
        InputFile::file_id(media.0.clone())
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!("telegram flood control, retrying in {d:?}");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, to: UserId, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(Self::tg_chat(to), text.to_string()))
            .await?;
        Ok(())
    }

    async fn send_photo(&self, to: UserId, media: &MediaRef, caption: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.send_photo(Self::tg_chat(to), Self::tg_file(media));
            if let Some(c) = caption {
                req = req.caption(c.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        to: UserId,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<()> {
        self.with_retry(|| {
            let mut req = self
                .bot
                .send_document(Self::tg_chat(to), Self::tg_file(media));
            if let Some(c) = caption {
                req = req.caption(c.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_sticker(&self, to: UserId, media: &MediaRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_sticker(Self::tg_chat(to), Self::tg_file(media))
        })
        .await?;
        Ok(())
    }

    async fn send_video(&self, to: UserId, media: &MediaRef, caption: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.send_video(Self::tg_chat(to), Self::tg_file(media));
            if let Some(c) = caption {
                req = req.caption(c.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}
