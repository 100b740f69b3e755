use async_trait::async_trait;

use crate::{domain::MediaRef, domain::UserId, Result};

/// Outbound half of the transport.
///
/// Every media send reuses the reference the transport handed us on the way
/// in, so nothing is downloaded or re-uploaded by the core.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, to: UserId, text: &str) -> Result<()>;

    async fn send_photo(&self, to: UserId, media: &MediaRef, caption: Option<&str>)
        -> Result<()>;

    async fn send_document(
        &self,
        to: UserId,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<()>;

    async fn send_sticker(&self, to: UserId, media: &MediaRef) -> Result<()>;

    async fn send_video(&self, to: UserId, media: &MediaRef, caption: Option<&str>)
        -> Result<()>;
}
