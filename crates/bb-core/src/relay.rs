use std::sync::Arc;

use crate::{
    domain::UserId,
    errors::Error,
    messaging::{port::MessagingPort, types::Payload},
    session::Sessions,
    transcript::{Transcript, TranscriptEntry},
    Result,
};

/// What the relay is willing to forward.
#[derive(Clone, Debug, Default)]
pub struct RelayPolicy {
    /// Allowed document MIME types; `None` forwards every document.
    pub document_mime_types: Option<Vec<String>>,
}

impl RelayPolicy {
    pub fn allows_document(&self, mime_type: Option<&str>) -> bool {
        let Some(allowed) = &self.document_mime_types else {
            return true;
        };
        let Some(mime) = mime_type else {
            return false;
        };
        allowed.iter().any(|a| a.eq_ignore_ascii_case(mime.trim()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    UnsupportedKind(String),
    DocumentType(Option<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Sent to `to` and recorded in the transcript.
    Delivered { to: UserId },
    /// Not forwardable; nothing was sent or recorded.
    Dropped(DropReason),
    /// The transport refused the send; nothing was recorded.
    SendFailed { to: UserId },
}

/// Forwards payloads between paired users and records each delivery.
pub struct Relay {
    sessions: Arc<Sessions>,
    messenger: Arc<dyn MessagingPort>,
    transcript: Arc<Transcript>,
    policy: RelayPolicy,
}

impl Relay {
    pub fn new(
        sessions: Arc<Sessions>,
        messenger: Arc<dyn MessagingPort>,
        transcript: Arc<Transcript>,
        policy: RelayPolicy,
    ) -> Self {
        Self {
            sessions,
            messenger,
            transcript,
            policy,
        }
    }

    /// Deliver `payload` from `sender` to their partner.
    ///
    /// Fails only with `NoActivePairing`; transport and transcript problems are
    /// logged and reported through the outcome. The pair stays leased until the
    /// transcript entry is written, so the partner cannot leave mid-delivery.
    pub async fn relay(&self, sender: UserId, payload: &Payload) -> Result<RelayOutcome> {
        let lease = self.sessions.lease_partner(sender).await?;
        let partner = lease.partner();

        if let Some(reason) = self.drop_reason(payload) {
            tracing::warn!(user = %sender, kind = payload.kind(), ?reason, "payload dropped");
            return Ok(RelayOutcome::Dropped(reason));
        }

        if let Err(e) = self.dispatch(partner, payload).await {
            tracing::error!(
                user = %sender,
                partner = %partner,
                kind = payload.kind(),
                "relay failed: {e}"
            );
            return Ok(RelayOutcome::SendFailed { to: partner });
        }

        let entry = TranscriptEntry::now(sender, partner, payload.summary());
        if let Err(e) = self.transcript.append(&entry).await {
            tracing::error!(
                path = %self.transcript.path().display(),
                "failed to write transcript entry: {e}"
            );
        }
        drop(lease);

        Ok(RelayOutcome::Delivered { to: partner })
    }

    fn drop_reason(&self, payload: &Payload) -> Option<DropReason> {
        match payload {
            Payload::Unsupported { kind } => Some(DropReason::UnsupportedKind(kind.clone())),
            Payload::Document { mime_type, .. }
                if !self.policy.allows_document(mime_type.as_deref()) =>
            {
                Some(DropReason::DocumentType(mime_type.clone()))
            }
            _ => None,
        }
    }

    async fn dispatch(&self, to: UserId, payload: &Payload) -> Result<()> {
        let m = &self.messenger;
        match payload {
            Payload::Text(text) => m.send_text(to, text).await,
            Payload::Photo { media, caption } => {
                m.send_photo(to, media, caption.as_deref()).await
            }
            Payload::Document { media, caption, .. } => {
                m.send_document(to, media, caption.as_deref()).await
            }
            Payload::Sticker { media } => m.send_sticker(to, media).await,
            Payload::Video { media, caption } => {
                m.send_video(to, media, caption.as_deref()).await
            }
            Payload::Unsupported { kind } => {
                Err(Error::Transport(format!("cannot send {kind} payload")))
            }
        }
    }
}
