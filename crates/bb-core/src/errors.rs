use crate::domain::UserId;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the chat core can
/// turn every failure into either a user-facing reply or a log line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),

    /// Relay attempted by a user who is `Idle` or `Waiting`.
    #[error("user has no active pairing")]
    NoActivePairing,

    /// `/stop` or `/next` issued by a user without a partner.
    #[error("user is not currently in a chat")]
    NotInSession,

    #[error("transport dispatch failed: {0}")]
    Transport(String),

    /// A waiting candidate was claimed by someone else between selection and
    /// pairing. Cannot happen while the store lock is held; logged loudly if seen.
    #[error("pairing race lost for candidate {0}")]
    PairingRaceLost(UserId),

    #[error("pairing symmetry violated: {user} -> {partner}")]
    SymmetryViolation { user: UserId, partner: UserId },
}

pub type Result<T> = std::result::Result<T, Error>;
