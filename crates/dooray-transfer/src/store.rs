//! In-process session table.
//!
//! Sole owner of session lifetime. Insertion and removal are the only
//! mutating operations and are atomic per session id: a session is either
//! absent or fully formed, never visible half-written. Reads of different
//! sessions do not contend beyond the table's read lock, and sessions are
//! immutable after creation, so no session-level locking exists.
//!
//! The clock is injected so idle eviction is testable without sleeping.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use tracing::{debug, info, instrument, warn};

use crate::{error::TransferError, session::DownloadSession};

/// Time source for idle tracking.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock backed [`Clock`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct SessionEntry {
    session: Arc<DownloadSession>,
    last_access: RwLock<Instant>,
}

/// Map from session id to download session state.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Create an empty store driven by the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a fully-formed session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session table lock is poisoned.
    #[instrument(skip(self, session), fields(session_id = %session.session_id))]
    pub fn insert(&self, session: DownloadSession) -> Result<(), TransferError> {
        let mut map = self
            .sessions
            .write()
            .map_err(|_| TransferError::LockPoisoned)?;
        debug!(total_chunks = session.total_chunks, "registering session");
        map.insert(
            session.session_id.clone(),
            Arc::new(SessionEntry {
                session: Arc::new(session),
                last_access: RwLock::new(self.clock.now()),
            }),
        );
        Ok(())
    }

    /// Look up a session, refreshing its idle timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the id never existed or was already
    /// cleaned up, or `LockPoisoned` if the table lock is poisoned.
    pub fn get(&self, session_id: &str) -> Result<Arc<DownloadSession>, TransferError> {
        let entry = {
            let map = self
                .sessions
                .read()
                .map_err(|_| TransferError::LockPoisoned)?;
            map.get(session_id)
                .cloned()
                .ok_or_else(|| TransferError::SessionNotFound(session_id.to_string()))?
        };
        if let Ok(mut last) = entry.last_access.write() {
            *last = self.clock.now();
        }
        Ok(Arc::clone(&entry.session))
    }

    /// Remove a session, releasing its backing storage.
    ///
    /// Idempotent: removing an unknown id is a no-op. Returns whether a
    /// session was actually dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session table lock is poisoned.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn remove(&self, session_id: &str) -> Result<bool, TransferError> {
        let mut map = self
            .sessions
            .write()
            .map_err(|_| TransferError::LockPoisoned)?;
        let removed = map.remove(session_id).is_some();
        if removed {
            debug!("session removed");
        }
        Ok(removed)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().map_or(0, |map| map.len())
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle longer than `max_idle`, returning the reaped ids.
    ///
    /// Abandoned sessions are otherwise a resource leak; the hosting process
    /// runs this on an interval.
    #[instrument(skip(self))]
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let now = self.clock.now();
        let expired: Vec<String> = match self.sessions.read() {
            Ok(map) => map
                .iter()
                .filter(|(_, entry)| {
                    entry
                        .last_access
                        .read()
                        .is_ok_and(|last| now.duration_since(*last) > max_idle)
                })
                .map(|(id, _)| id.clone())
                .collect(),
            Err(_) => {
                warn!("session table lock poisoned during eviction scan");
                return Vec::new();
            }
        };
        if expired.is_empty() {
            return expired;
        }
        let Ok(mut map) = self.sessions.write() else {
            warn!("session table lock poisoned during eviction");
            return Vec::new();
        };
        let mut reaped = Vec::with_capacity(expired.len());
        for id in expired {
            // Re-check under the write lock: a chunk read may have touched
            // the session between the scan and now.
            let still_idle = map.get(&id).is_some_and(|entry| {
                entry
                    .last_access
                    .read()
                    .is_ok_and(|last| now.duration_since(*last) > max_idle)
            });
            if still_idle {
                map.remove(&id);
                reaped.push(id);
            }
        }
        if !reaped.is_empty() {
            info!(count = reaped.len(), "evicted idle download sessions");
        }
        reaped
    }

    /// Drop every session, releasing all spill files.
    #[instrument(skip(self))]
    pub fn teardown(&self) {
        if let Ok(mut map) = self.sessions.write() {
            let count = map.len();
            map.clear();
            if count > 0 {
                info!(count, "session store torn down");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use std::{
        sync::Mutex,
        time::{Duration, Instant},
    };

    use super::Clock;

    /// Manually advanced clock for eviction tests.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::{test_clock::ManualClock, *};
    use crate::{
        session::{DownloadSession, SessionContent},
        source::FileLocator,
    };

    fn session(id: &str) -> DownloadSession {
        DownloadSession {
            session_id: id.to_string(),
            locator: FileLocator {
                drive_id: "drive-1".into(),
                file_id: "file-1".into(),
            },
            file_name: "report.pdf".into(),
            content: SessionContent::Buffered(Bytes::from_static(b"abc")),
            size_bytes: 3,
            chunk_unit_size: 1024,
            total_chunks: 1,
            content_sha256: String::new(),
        }
    }

    #[test]
    fn insert_then_get_returns_the_session() {
        let store = SessionStore::new(Arc::new(SystemClock));
        store.insert(session("s-1")).unwrap();
        let found = store.get("s-1").unwrap();
        assert_eq!(found.file_name, "report.pdf");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_unknown_session_is_not_found() {
        let store = SessionStore::new(Arc::new(SystemClock));
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, TransferError::SessionNotFound(_)));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = SessionStore::new(Arc::new(SystemClock));
        store.insert(session("s-1")).unwrap();
        assert!(store.remove("s-1").unwrap());
        assert!(!store.remove("s-1").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn evict_idle_reaps_only_stale_sessions() {
        let clock = Arc::new(ManualClock::new());
        let store = SessionStore::new(clock.clone());
        store.insert(session("stale")).unwrap();
        clock.advance(Duration::from_secs(30));
        store.insert(session("fresh")).unwrap();
        clock.advance(Duration::from_secs(45));

        let reaped = store.evict_idle(Duration::from_secs(60));
        assert_eq!(reaped, vec!["stale".to_string()]);
        assert!(store.get("fresh").is_ok());
        assert!(matches!(
            store.get("stale"),
            Err(TransferError::SessionNotFound(_))
        ));
    }

    #[test]
    fn get_refreshes_the_idle_timer() {
        let clock = Arc::new(ManualClock::new());
        let store = SessionStore::new(clock.clone());
        store.insert(session("s-1")).unwrap();
        clock.advance(Duration::from_secs(50));
        store.get("s-1").unwrap();
        clock.advance(Duration::from_secs(50));
        // 100s since insert but only 50s since the last read.
        assert!(store.evict_idle(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn teardown_drops_everything() {
        let store = SessionStore::new(Arc::new(SystemClock));
        store.insert(session("a")).unwrap();
        store.insert(session("b")).unwrap();
        store.teardown();
        assert!(store.is_empty());
    }
}
