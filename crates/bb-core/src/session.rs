use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockWriteGuard};

use crate::{
    domain::UserId,
    errors::Error,
    lifecycle::{self, NextOutcome, StopOutcome},
    matcher::{self, PairOutcome, PartnerPicker, RandomPicker},
    store::{Anomaly, SessionState, SessionStore},
    Result,
};

struct Inner {
    store: SessionStore,
    picker: Box<dyn PartnerPicker>,
}

/// One async mutex per user, created on first use.
#[derive(Default)]
struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Locks `user_id` and `partner` in id order.
    async fn lock_pair(
        &self,
        user_id: UserId,
        partner: Option<UserId>,
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = vec![user_id];
        ids.extend(partner.filter(|p| *p != user_id));
        ids.sort_unstable();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock_user(id).await);
        }
        guards
    }
}

/// Hold on a live pairing. Ending that pairing waits until the lease is dropped.
pub struct PairLease {
    partner: UserId,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl PairLease {
    pub fn partner(&self) -> UserId {
        self.partner
    }
}

/// Shared session store.
///
/// The store lock is only ever held for a read-then-write sequence, never
/// across a send. A `Paired` state changes only while both users' locks are
/// held, so a relay holding a [`PairLease`] cannot race a `/stop` or `/next`
/// of its own pair and never blocks any other pair.
pub struct Sessions {
    inner: RwLock<Inner>,
    locks: UserLocks,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new(Box::new(RandomPicker::new()))
    }
}

impl Sessions {
    pub fn new(picker: Box<dyn PartnerPicker>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                store: SessionStore::new(),
                picker,
            }),
            locks: UserLocks::default(),
        }
    }

    pub async fn state(&self, user_id: UserId) -> SessionState {
        self.inner.read().await.store.get(user_id)
    }

    /// Only `Waiting` users can be picked, and nobody relays from or to them,
    /// so pairing needs no user locks.
    pub async fn request_pairing(&self, user_id: UserId) -> Result<PairOutcome> {
        let mut guard = self.inner.write().await;
        let Inner { store, picker } = &mut *guard;

        let out = matcher::request_pairing(store, &mut **picker, user_id)?;
        if let PairOutcome::Paired { partner } = out {
            tracing::info!(user = %user_id, partner = %partner, "users paired");
            report_anomalies(store, &[user_id, partner]);
        }
        Ok(out)
    }

    pub async fn stop(&self, user_id: UserId) -> Result<StopOutcome> {
        let (_locks, mut guard) = self.lock_for_teardown(user_id).await;
        let out = lifecycle::stop(&mut guard.store, user_id)?;
        if let StopOutcome::Ended { partner } = out {
            tracing::info!(user = %user_id, partner = %partner, "chat ended");
            report_anomalies(&guard.store, &[user_id, partner]);
        }
        Ok(out)
    }

    pub async fn next(&self, user_id: UserId) -> Result<NextOutcome> {
        let (_locks, mut guard) = self.lock_for_teardown(user_id).await;
        let Inner { store, picker } = &mut *guard;

        let out = lifecycle::next(store, &mut **picker, user_id)?;
        tracing::info!(user = %user_id, partner = %out.left, "chat ended by /next");

        let mut touched = vec![user_id, out.left];
        if let PairOutcome::Paired { partner } = out.pairing {
            tracing::info!(user = %user_id, partner = %partner, "users paired");
            touched.push(partner);
        }
        report_anomalies(store, &touched);
        Ok(out)
    }

    /// Lease on `user_id`'s current pairing; `NoActivePairing` when there is none.
    ///
    /// Relays from both sides of one pair are serialized by the lease.
    pub async fn lease_partner(&self, user_id: UserId) -> Result<PairLease> {
        loop {
            let Some(partner) = self.state(user_id).await.partner() else {
                return Err(Error::NoActivePairing);
            };
            let guards = self.locks.lock_pair(user_id, Some(partner)).await;
            if self.state(user_id).await.partner() == Some(partner) {
                return Ok(PairLease {
                    partner,
                    _guards: guards,
                });
            }
            // Re-paired while we waited for the locks.
        }
    }

    /// User locks for `user_id` and its partner, then the store write lock.
    async fn lock_for_teardown(
        &self,
        user_id: UserId,
    ) -> (Vec<OwnedMutexGuard<()>>, RwLockWriteGuard<'_, Inner>) {
        loop {
            let partner = self.state(user_id).await.partner();
            let locks = self.locks.lock_pair(user_id, partner).await;
            let guard = self.inner.write().await;
            if guard.store.get(user_id).partner() == partner {
                return (locks, guard);
            }
        }
    }

    pub async fn anomalies(&self) -> Vec<Anomaly> {
        self.inner.read().await.store.anomalies()
    }

    /// Full consistency check; the first violation found is returned as an error.
    pub async fn verify(&self) -> Result<()> {
        match self.anomalies().await.into_iter().next() {
            Some(anomaly) => Err(anomaly.into()),
            None => Ok(()),
        }
    }

    /// `(waiting users, active pairs)`.
    pub async fn counts(&self) -> (usize, usize) {
        self.inner.read().await.store.counts()
    }
}

fn report_anomalies(store: &SessionStore, users: &[UserId]) {
    for &user in users {
        if let Some(anomaly) = store.check(user) {
            tracing::error!(?anomaly, "session store corrupted: {}", Error::from(anomaly));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::matcher::LowestIdPicker;

    #[tokio::test]
    async fn two_users_pair_in_either_order() {
        for order in [[1, 2], [2, 1]] {
            let sessions = Sessions::new(Box::new(LowestIdPicker));
            sessions.request_pairing(UserId(order[0])).await.unwrap();
            sessions.request_pairing(UserId(order[1])).await.unwrap();

            assert_eq!(
                sessions.state(UserId(1)).await,
                SessionState::Paired(UserId(2))
            );
            assert_eq!(
                sessions.state(UserId(2)).await,
                SessionState::Paired(UserId(1))
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_never_share_a_candidate() {
        let sessions = Arc::new(Sessions::new(Box::new(RandomPicker::seeded(3))));

        let mut handles = Vec::new();
        for id in 1..=50 {
            let sessions = sessions.clone();
            handles.push(tokio::spawn(async move {
                sessions.request_pairing(UserId(id)).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        sessions.verify().await.unwrap();
        assert_eq!(sessions.counts().await, (0, 25));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pair_and_stop_keep_symmetry() {
        let sessions = Arc::new(Sessions::new(Box::new(RandomPicker::seeded(11))));

        let mut handles = Vec::new();
        for round in 0..5 {
            for id in 1..=20 {
                let sessions = sessions.clone();
                handles.push(tokio::spawn(async move {
                    let user = UserId(id);
                    match (id + round) % 3 {
                        0 => {
                            let _ = sessions.stop(user).await;
                        }
                        1 => {
                            let _ = sessions.next(user).await;
                        }
                        _ => {
                            let _ = sessions.request_pairing(user).await;
                        }
                    }
                }));
            }
        }
        for h in handles {
            h.await.unwrap();
        }

        assert!(sessions.anomalies().await.is_empty());
    }

    #[tokio::test]
    async fn idle_stop_is_not_in_session() {
        let sessions = Sessions::default();
        let err = sessions.stop(UserId(1)).await.unwrap_err();
        assert!(matches!(err, Error::NotInSession));
        assert_eq!(sessions.counts().await, (0, 0));
    }

    #[tokio::test]
    async fn lease_names_current_partner() {
        let sessions = Sessions::new(Box::new(LowestIdPicker));
        assert!(matches!(
            sessions.lease_partner(UserId(1)).await,
            Err(Error::NoActivePairing)
        ));

        sessions.request_pairing(UserId(1)).await.unwrap();
        assert!(matches!(
            sessions.lease_partner(UserId(1)).await,
            Err(Error::NoActivePairing)
        ));

        sessions.request_pairing(UserId(2)).await.unwrap();
        let lease = sessions.lease_partner(UserId(2)).await.unwrap();
        assert_eq!(lease.partner(), UserId(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lease_holds_off_teardown_but_not_other_pairs() {
        let sessions = Arc::new(Sessions::new(Box::new(LowestIdPicker)));
        for id in 1..=4 {
            sessions.request_pairing(UserId(id)).await.unwrap();
        }

        let lease = sessions.lease_partner(UserId(1)).await.unwrap();

        let stop = {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.stop(UserId(2)).await })
        };

        let others = async {
            sessions.request_pairing(UserId(10)).await.unwrap();
            sessions.stop(UserId(3)).await.unwrap();
        };
        tokio::time::timeout(Duration::from_secs(5), others)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stop.is_finished());
        assert_eq!(
            sessions.state(UserId(1)).await,
            SessionState::Paired(UserId(2))
        );

        drop(lease);
        assert_eq!(
            stop.await.unwrap().unwrap(),
            StopOutcome::Ended { partner: UserId(1) }
        );
        assert_eq!(sessions.state(UserId(1)).await, SessionState::Idle);
    }
}
