use std::collections::HashMap;

use crate::{domain::UserId, errors::Error};

/// Pairing status of one user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No pairing and no pending request. Never stored; absence means idle.
    #[default]
    Idle,
    Waiting,
    Paired(UserId),
}

impl SessionState {
    pub fn partner(self) -> Option<UserId> {
        match self {
            Self::Paired(p) => Some(p),
            _ => None,
        }
    }
}

/// A store entry that breaks the pairing invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anomaly {
    SelfPaired(UserId),
    /// `user` points at `partner`, but `partner` does not point back.
    Asymmetric {
        user: UserId,
        partner: UserId,
        partner_state: SessionState,
    },
}

impl From<Anomaly> for Error {
    fn from(a: Anomaly) -> Self {
        match a {
            Anomaly::SelfPaired(user) => Error::SymmetryViolation {
                user,
                partner: user,
            },
            Anomaly::Asymmetric { user, partner, .. } => {
                Error::SymmetryViolation { user, partner }
            }
        }
    }
}

/// Authoritative mapping from user id to pairing status.
///
/// Plain data structure with no locking of its own; [`crate::session::Sessions`]
/// decides who may touch it and when.
#[derive(Debug, Default)]
pub struct SessionStore {
    states: HashMap<UserId, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId) -> SessionState {
        self.states.get(&user_id).copied().unwrap_or_default()
    }

    /// Overwrite a user's state. Setting `Idle` removes the entry.
    pub fn set(&mut self, user_id: UserId, state: SessionState) {
        if state == SessionState::Idle {
            self.states.remove(&user_id);
        } else {
            self.states.insert(user_id, state);
        }
    }

    pub fn remove(&mut self, user_id: UserId) -> SessionState {
        self.states.remove(&user_id).unwrap_or_default()
    }

    /// Every waiting user except `excluding`, sorted by id so that a seeded
    /// picker makes the same choice on every run.
    pub fn waiting_users(&self, excluding: UserId) -> Vec<UserId> {
        let mut out: Vec<UserId> = self
            .states
            .iter()
            .filter(|(id, st)| **id != excluding && **st == SessionState::Waiting)
            .map(|(id, _)| *id)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Check the invariants for a single user.
    pub fn check(&self, user_id: UserId) -> Option<Anomaly> {
        let SessionState::Paired(partner) = self.get(user_id) else {
            return None;
        };
        if partner == user_id {
            return Some(Anomaly::SelfPaired(user_id));
        }
        let partner_state = self.get(partner);
        if partner_state != SessionState::Paired(user_id) {
            return Some(Anomaly::Asymmetric {
                user: user_id,
                partner,
                partner_state,
            });
        }
        None
    }

    /// Full scan for invariant violations.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut ids: Vec<UserId> = self.states.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.check(id)).collect()
    }

    /// `(waiting users, active pairs)`.
    pub fn counts(&self) -> (usize, usize) {
        let mut waiting = 0usize;
        let mut paired = 0usize;
        for st in self.states.values() {
            match st {
                SessionState::Waiting => waiting += 1,
                SessionState::Paired(_) => paired += 1,
                SessionState::Idle => {}
            }
        }
        (waiting, paired / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_user_is_idle() {
        let store = SessionStore::new();
        assert_eq!(store.get(UserId(7)), SessionState::Idle);
        assert!(store.is_empty());
    }

    #[test]
    fn setting_idle_removes_entry() {
        let mut store = SessionStore::new();
        store.set(UserId(1), SessionState::Waiting);
        assert_eq!(store.len(), 1);
        store.set(UserId(1), SessionState::Idle);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_returns_previous_state() {
        let mut store = SessionStore::new();
        store.set(UserId(1), SessionState::Paired(UserId(2)));
        assert_eq!(store.remove(UserId(1)), SessionState::Paired(UserId(2)));
        assert_eq!(store.remove(UserId(1)), SessionState::Idle);
    }

    #[test]
    fn waiting_users_excludes_requester_and_paired() {
        let mut store = SessionStore::new();
        store.set(UserId(3), SessionState::Waiting);
        store.set(UserId(1), SessionState::Waiting);
        store.set(UserId(2), SessionState::Waiting);
        store.set(UserId(4), SessionState::Paired(UserId(5)));
        store.set(UserId(5), SessionState::Paired(UserId(4)));

        assert_eq!(store.waiting_users(UserId(2)), vec![UserId(1), UserId(3)]);
    }

    #[test]
    fn detects_asymmetric_and_self_pairing() {
        let mut store = SessionStore::new();
        store.set(UserId(1), SessionState::Paired(UserId(2)));
        store.set(UserId(2), SessionState::Waiting);
        store.set(UserId(3), SessionState::Paired(UserId(3)));

        assert_eq!(
            store.anomalies(),
            vec![
                Anomaly::Asymmetric {
                    user: UserId(1),
                    partner: UserId(2),
                    partner_state: SessionState::Waiting,
                },
                Anomaly::SelfPaired(UserId(3)),
            ]
        );
    }

    #[test]
    fn counts_pairs_once() {
        let mut store = SessionStore::new();
        store.set(UserId(1), SessionState::Paired(UserId(2)));
        store.set(UserId(2), SessionState::Paired(UserId(1)));
        store.set(UserId(3), SessionState::Waiting);
        assert_eq!(store.counts(), (1, 1));
        assert!(store.anomalies().is_empty());
    }
}
