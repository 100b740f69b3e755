//! Pairing protocol for `/pair` requests.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    domain::UserId,
    errors::Error,
    store::{SessionState, SessionStore},
    Result,
};

/// Chooses one partner among the waiting candidates.
pub trait PartnerPicker: Send + Sync {
    /// `candidates` is never empty and is sorted by id.
    fn pick(&mut self, candidates: &[UserId]) -> Option<UserId>;
}

/// Uniform random choice. Seed it to make matching reproducible.
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl PartnerPicker for RandomPicker {
    fn pick(&mut self, candidates: &[UserId]) -> Option<UserId> {
        candidates.choose(&mut self.rng).copied()
    }
}

/// Deterministic choice: the waiting user with the lowest id.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowestIdPicker;

impl PartnerPicker for LowestIdPicker {
    fn pick(&mut self, candidates: &[UserId]) -> Option<UserId> {
        candidates.first().copied()
    }
}

/// Result of a pairing request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairOutcome {
    /// Nobody else is waiting; the requester now waits.
    Waiting,
    /// Requester and `partner` are now paired with each other.
    Paired { partner: UserId },
    /// Requester was already chatting; nothing changed.
    AlreadyPaired { partner: UserId },
}

/// Run the pairing protocol for `user_id`.
///
/// Caller must hold exclusive access to `store` for the whole call so that no
/// other request can claim the same candidate.
pub fn request_pairing(
    store: &mut SessionStore,
    picker: &mut dyn PartnerPicker,
    user_id: UserId,
) -> Result<PairOutcome> {
    if let SessionState::Paired(partner) = store.get(user_id) {
        return Ok(PairOutcome::AlreadyPaired { partner });
    }

    store.set(user_id, SessionState::Waiting);

    let candidates = store.waiting_users(user_id);
    if candidates.is_empty() {
        return Ok(PairOutcome::Waiting);
    }

    let Some(partner) = picker.pick(&candidates) else {
        return Ok(PairOutcome::Waiting);
    };

    if partner == user_id || store.get(partner) != SessionState::Waiting {
        tracing::error!(user = %user_id, candidate = %partner, "pairing race lost");
        return Err(Error::PairingRaceLost(partner));
    }

    store.set(user_id, SessionState::Paired(partner));
    store.set(partner, SessionState::Paired(user_id));

    Ok(PairOutcome::Paired { partner })
}
