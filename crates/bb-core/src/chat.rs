//! Inbound event controller: turns transport events into session transitions
//! and user-facing replies.

use std::sync::Arc;

use crate::{
    domain::UserId,
    errors::Error,
    lifecycle::{NextOutcome, StopOutcome},
    matcher::PairOutcome,
    messaging::{
        port::MessagingPort,
        types::{IncomingEvent, Payload},
    },
    relay::{Relay, RelayOutcome, RelayPolicy},
    session::Sessions,
    transcript::Transcript,
};

pub const WELCOME: &str = "Welcome! Type /pair to start chatting with a stranger.";
pub const HELP: &str = "Commands:\n\
/pair - chat with a random stranger\n\
/next - leave the current chat and find someone new\n\
/stop - leave the current chat\n\
/help - show this message";
pub const WAITING: &str = "Waiting for a stranger to join...";
pub const PAIRED: &str = "You've been paired! Start chatting.";
pub const ALREADY_PAIRED: &str =
    "You are already in a chat. Type /next for a new stranger or /stop to leave.";
pub const PAIR_FAILED: &str = "An error occurred while pairing. Please try again.";
pub const NOT_PAIRED: &str = "Type /pair to start chatting with a stranger.";
pub const NOT_IN_SESSION: &str = "You are not currently in a chat.";
pub const PARTNER_LEFT: &str = "Your partner has left the chat. Type /pair to find a new stranger.";
pub const YOU_LEFT: &str = "You left the chat. Type /pair to find a new stranger.";
pub const WAIT_CANCELLED: &str = "You are no longer waiting for a stranger.";
pub const CANNOT_RELAY: &str = "This kind of message can't be sent to your partner.";
pub const NOT_DELIVERED: &str = "Your message could not be delivered.";

/// Entry point for every inbound event.
///
/// Nothing here returns an error: each failure becomes a reply to the user or a
/// log line, and never affects other users.
pub struct ChatService {
    sessions: Arc<Sessions>,
    messenger: Arc<dyn MessagingPort>,
    relay: Relay,
}

impl ChatService {
    pub fn new(
        sessions: Arc<Sessions>,
        messenger: Arc<dyn MessagingPort>,
        transcript: Arc<Transcript>,
        policy: RelayPolicy,
    ) -> Self {
        let relay = Relay::new(sessions.clone(), messenger.clone(), transcript, policy);
        Self {
            sessions,
            messenger,
            relay,
        }
    }

    pub fn sessions(&self) -> &Arc<Sessions> {
        &self.sessions
    }

    pub async fn handle(&self, event: IncomingEvent) {
        match event {
            IncomingEvent::Start(user) => self.on_start(user).await,
            IncomingEvent::Help(user) => self.on_help(user).await,
            IncomingEvent::Pair(user) => self.on_pair(user).await,
            IncomingEvent::Next(user) => self.on_next(user).await,
            IncomingEvent::Stop(user) => self.on_stop(user).await,
            IncomingEvent::UnknownCommand { user_id, name } => {
                tracing::debug!(user = %user_id, command = %name, "unknown command");
                self.notify(user_id, HELP).await;
            }
            IncomingEvent::Message { user_id, payload } => {
                self.on_message(user_id, payload).await
            }
        }
    }

    pub async fn on_start(&self, user: UserId) {
        self.notify(user, WELCOME).await;
    }

    pub async fn on_help(&self, user: UserId) {
        self.notify(user, HELP).await;
    }

    pub async fn on_pair(&self, user: UserId) {
        match self.sessions.request_pairing(user).await {
            Ok(out) => self.announce_pairing(user, out).await,
            Err(e) => {
                tracing::error!(user = %user, "error during pairing: {e}");
                self.notify(user, PAIR_FAILED).await;
            }
        }
    }

    pub async fn on_next(&self, user: UserId) {
        match self.sessions.next(user).await {
            Ok(NextOutcome { left, pairing }) => {
                self.notify(left, PARTNER_LEFT).await;
                self.announce_pairing(user, pairing).await;
            }
            Err(Error::NotInSession) => {
                self.notify(user, NOT_IN_SESSION).await;
            }
            Err(e) => {
                tracing::error!(user = %user, "error during /next: {e}");
                self.notify(user, PAIR_FAILED).await;
            }
        }
    }

    pub async fn on_stop(&self, user: UserId) {
        match self.sessions.stop(user).await {
            Ok(StopOutcome::Ended { partner }) => {
                self.notify(user, YOU_LEFT).await;
                self.notify(partner, PARTNER_LEFT).await;
            }
            Ok(StopOutcome::CancelledWait) => {
                self.notify(user, WAIT_CANCELLED).await;
            }
            Err(Error::NotInSession) => {
                self.notify(user, NOT_IN_SESSION).await;
            }
            Err(e) => {
                tracing::error!(user = %user, "error during /stop: {e}");
            }
        }
    }

    pub async fn on_message(&self, user: UserId, payload: Payload) {
        match self.relay.relay(user, &payload).await {
            Ok(RelayOutcome::Delivered { .. }) => {}
            Ok(RelayOutcome::Dropped(_)) => {
                self.notify(user, CANNOT_RELAY).await;
            }
            Ok(RelayOutcome::SendFailed { .. }) => {
                self.notify(user, NOT_DELIVERED).await;
            }
            Err(Error::NoActivePairing) => {
                self.notify(user, NOT_PAIRED).await;
            }
            Err(e) => {
                tracing::error!(user = %user, "relay error: {e}");
            }
        }
    }

    async fn announce_pairing(&self, user: UserId, out: PairOutcome) {
        match out {
            PairOutcome::Waiting => {
                self.notify(user, WAITING).await;
            }
            PairOutcome::Paired { partner } => {
                // A failed notification does not undo the pairing.
                self.notify(user, PAIRED).await;
                self.notify(partner, PAIRED).await;
            }
            PairOutcome::AlreadyPaired { .. } => {
                self.notify(user, ALREADY_PAIRED).await;
            }
        }
    }

    async fn notify(&self, to: UserId, text: &str) {
        if let Err(e) = self.messenger.send_text(to, text).await {
            tracing::warn!(user = %to, "failed to send notice: {e}");
        }
    }
}
