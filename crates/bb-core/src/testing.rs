//! In-memory transport used by the unit tests.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::{
    domain::{MediaRef, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

/// Unique scratch file path under `/tmp`.
pub fn tmp_file(prefix: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    PathBuf::from(format!("/tmp/{prefix}-{}-{ts}.log", std::process::id()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Text(UserId, String),
    Photo(UserId, String, Option<String>),
    Document(UserId, String, Option<String>),
    Sticker(UserId, String),
    Video(UserId, String, Option<String>),
}

/// Holds sends to one user until released.
pub struct Gate {
    entered: Notify,
    open: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            open: Semaphore::new(0),
        }
    }

    /// Resolves once a send has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.open.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        let _ = self.open.acquire().await;
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    sent: Mutex<Vec<Sent>>,
    fail_for: Mutex<Vec<UserId>>,
    gates: Mutex<HashMap<UserId, Arc<Gate>>>,
    fail_all: bool,
}

impl FakeMessenger {
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn fail_for(&self, user_id: UserId) {
        self.fail_for.lock().unwrap().push(user_id);
    }

    pub fn hold_for(&self, user_id: UserId) -> Arc<Gate> {
        let gate = Arc::new(Gate::new());
        self.gates.lock().unwrap().insert(user_id, gate.clone());
        gate
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, user_id: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(to, text) if to == user_id => Some(text),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, to: UserId, sent: Sent) -> Result<()> {
        let gate = self.gates.lock().unwrap().get(&to).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.fail_all || self.fail_for.lock().unwrap().contains(&to) {
            return Err(Error::Transport(format!("chat {to} unreachable")));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, to: UserId, text: &str) -> Result<()> {
        self.record(to, Sent::Text(to, text.to_string())).await
    }

    async fn send_photo(&self, to: UserId, media: &MediaRef, caption: Option<&str>) -> Result<()> {
        self.record(
            to,
            Sent::Photo(to, media.0.clone(), caption.map(str::to_string)),
        )
        .await
    }

    async fn send_document(
        &self,
        to: UserId,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<()> {
        self.record(
            to,
            Sent::Document(to, media.0.clone(), caption.map(str::to_string)),
        )
        .await
    }

    async fn send_sticker(&self, to: UserId, media: &MediaRef) -> Result<()> {
        self.record(to, Sent::Sticker(to, media.0.clone())).await
    }

    async fn send_video(&self, to: UserId, media: &MediaRef, caption: Option<&str>) -> Result<()> {
        self.record(
            to,
            Sent::Video(to, media.0.clone(), caption.map(str::to_string)),
        )
        .await
    }
}
