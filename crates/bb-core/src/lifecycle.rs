//! Explicit session teardown: `/stop` and `/next`.

use crate::{
    domain::UserId,
    errors::Error,
    matcher::{request_pairing, PairOutcome, PartnerPicker},
    store::{SessionState, SessionStore},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// The chat with `partner` ended; both users are idle.
    Ended { partner: UserId },
    /// The user was waiting and no longer is.
    CancelledWait,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NextOutcome {
    /// Former partner, now idle and owed a "partner left" notice.
    pub left: UserId,
    /// Result of the immediate re-pairing request.
    pub pairing: PairOutcome,
}

/// End the user's chat (or pending wait).
///
/// Idle users get `NotInSession` and the store is left untouched.
pub fn stop(store: &mut SessionStore, user_id: UserId) -> Result<StopOutcome> {
    match store.get(user_id) {
        SessionState::Paired(partner) => {
            store.remove(user_id);
            store.remove(partner);
            Ok(StopOutcome::Ended { partner })
        }
        SessionState::Waiting => {
            store.remove(user_id);
            Ok(StopOutcome::CancelledWait)
        }
        SessionState::Idle => Err(Error::NotInSession),
    }
}

/// Leave the current partner and immediately look for a new one.
///
/// Both sides are fully reset before re-pairing, so the former partner can
/// never be picked again by this request.
pub fn next(
    store: &mut SessionStore,
    picker: &mut dyn PartnerPicker,
    user_id: UserId,
) -> Result<NextOutcome> {
    let SessionState::Paired(partner) = store.get(user_id) else {
        return Err(Error::NotInSession);
    };

    store.remove(partner);
    store.remove(user_id);

    let pairing = match request_pairing(store, picker, user_id) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(user = %user_id, "re-pairing after /next failed: {e}");
            PairOutcome::Waiting
        }
    };

    Ok(NextOutcome {
        left: partner,
        pairing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::LowestIdPicker;

    fn paired(a: i64, b: i64) -> SessionStore {
        let mut store = SessionStore::new();
        store.set(UserId(a), SessionState::Paired(UserId(b)));
        store.set(UserId(b), SessionState::Paired(UserId(a)));
        store
    }

    #[test]
    fn stop_clears_both_sides() {
        let mut store = paired(1, 2);
        let out = stop(&mut store, UserId(1)).unwrap();
        assert_eq!(out, StopOutcome::Ended { partner: UserId(2) });
        assert!(store.is_empty());
    }

    #[test]
    fn stop_on_idle_is_not_in_session_and_mutates_nothing() {
        let mut store = paired(1, 2);
        store.set(UserId(5), SessionState::Waiting);

        let err = stop(&mut store, UserId(9)).unwrap_err();
        assert!(matches!(err, Error::NotInSession));
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(UserId(1)), SessionState::Paired(UserId(2)));
    }

    #[test]
    fn stop_while_waiting_cancels_wait() {
        let mut store = SessionStore::new();
        store.set(UserId(1), SessionState::Waiting);
        assert_eq!(stop(&mut store, UserId(1)).unwrap(), StopOutcome::CancelledWait);
        assert_eq!(store.get(UserId(1)), SessionState::Idle);
    }

    #[test]
    fn next_without_third_user_leaves_requester_waiting() {
        let mut store = paired(1, 2);
        let out = next(&mut store, &mut LowestIdPicker, UserId(1)).unwrap();

        assert_eq!(
            out,
            NextOutcome {
                left: UserId(2),
                pairing: PairOutcome::Waiting,
            }
        );
        assert_eq!(store.get(UserId(1)), SessionState::Waiting);
        assert_eq!(store.get(UserId(2)), SessionState::Idle);
    }

    #[test]
    fn next_pairs_with_waiting_third_user() {
        let mut store = paired(1, 2);
        store.set(UserId(3), SessionState::Waiting);

        let out = next(&mut store, &mut LowestIdPicker, UserId(1)).unwrap();
        assert_eq!(out.left, UserId(2));
        assert_eq!(out.pairing, PairOutcome::Paired { partner: UserId(3) });
        assert_eq!(store.get(UserId(2)), SessionState::Idle);
        assert_eq!(store.get(UserId(3)), SessionState::Paired(UserId(1)));
        assert!(store.anomalies().is_empty());
    }

    #[test]
    fn next_while_waiting_is_not_in_session() {
        let mut store = SessionStore::new();
        store.set(UserId(1), SessionState::Waiting);
        let err = next(&mut store, &mut LowestIdPicker, UserId(1)).unwrap_err();
        assert!(matches!(err, Error::NotInSession));
        assert_eq!(store.get(UserId(1)), SessionState::Waiting);
    }
}
