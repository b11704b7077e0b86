/*!
 * Device session manager.
 *
 * Serializes access to physical devices: at most one active session exists
 * per device at any instant. The whole session table sits behind a single
 * mutex so the busy check and the insertion are one atomic critical
 * section; two concurrent `acquire` calls on the same device can never
 * both win.
 *
 * Sessions are released explicitly. An optional lease bounds how long an
 * abandoned session can block a device; without a lease, legacy behaviour
 * applies and a crashed holder keeps the device locked until someone
 * releases it.
 */
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use vlift_core::config::HardwareDefaults;
use vlift_core::types::Id;
use vlift_core::utils::duration_from_millis;

use crate::error::{HardwareError, Result};

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// An exclusive claim on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The device being held
    pub device_id: Id,
    /// The operation/line holding the device
    pub holder_id: Id,
    /// When the claim was granted
    pub acquired_at: DateTime<Utc>,
}

/// Event emitted when the session table changes
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was granted on a device
    Acquired {
        /// The device being held
        device_id: Id,
        /// The new holder
        holder_id: Id,
    },
    /// A device was released
    Released {
        /// The device that was freed
        device_id: Id,
    },
}

/// Process-wide table of device sessions
#[derive(Debug)]
pub struct SessionManager {
    sessions: Mutex<HashMap<Id, Session>>,
    lease: Option<Duration>,
    event_sender: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Create a session manager without a lease; sessions only end on
    /// explicit release
    pub fn new() -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sessions: Mutex::new(HashMap::new()),
            lease: None,
            event_sender,
        }
    }

    /// Create a session manager whose sessions expire after `lease`
    ///
    /// An expired session no longer blocks `acquire` and reads as not
    /// busy, bounding the damage of a holder that never released.
    pub fn with_lease(lease: Duration) -> Self {
        let mut manager = Self::new();
        manager.lease = Some(lease);
        manager
    }

    /// Create a session manager from the configured hardware defaults
    ///
    /// A zero lease keeps the explicit-release behaviour.
    pub fn from_defaults(defaults: &HardwareDefaults) -> Self {
        match duration_from_millis(defaults.session_lease_ms) {
            Some(lease) => Self::with_lease(lease),
            None => Self::new(),
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<Id, Session>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        match self.lease {
            Some(lease) => Utc::now()
                .signed_duration_since(session.acquired_at)
                .to_std()
                .map_or(false, |age| age > lease),
            None => false,
        }
    }

    /// Claim exclusive use of a device
    ///
    /// Fails with [`HardwareError::AlreadyLocked`] when a live session
    /// exists for the device. The check and the claim happen under one
    /// lock: of any number of concurrent callers, exactly one wins.
    pub fn acquire(&self, device_id: &Id, holder_id: &Id) -> Result<Session> {
        let mut sessions = self.lock_sessions();
        if let Some(existing) = sessions.get(device_id) {
            if !self.is_expired(existing) {
                return Err(HardwareError::AlreadyLocked(device_id.clone()));
            }
            warn!(device = %device_id, holder = %existing.holder_id, "evicting expired session");
        }
        let session = Session {
            device_id: device_id.clone(),
            holder_id: holder_id.clone(),
            acquired_at: Utc::now(),
        };
        sessions.insert(device_id.clone(), session.clone());
        drop(sessions);

        debug!(device = %device_id, holder = %holder_id, "session acquired");
        let _ = self.event_sender.send(SessionEvent::Acquired {
            device_id: device_id.clone(),
            holder_id: holder_id.clone(),
        });
        Ok(session)
    }

    /// Whether a live session exists for the device
    pub fn is_busy(&self, device_id: &Id) -> bool {
        let sessions = self.lock_sessions();
        sessions
            .get(device_id)
            .map_or(false, |session| !self.is_expired(session))
    }

    /// The holder currently associated with the device, if any
    ///
    /// This is the reference collaborators read to discover which pending
    /// request owns a device; it is set on acquire and cleared on release.
    pub fn active_holder(&self, device_id: &Id) -> Option<Id> {
        let sessions = self.lock_sessions();
        sessions
            .get(device_id)
            .filter(|session| !self.is_expired(session))
            .map(|session| session.holder_id.clone())
    }

    /// Release the device
    ///
    /// Idempotent: releasing a free (or never-acquired) device does
    /// nothing. Any caller may release, regardless of holder.
    pub fn release(&self, device_id: &Id) {
        let removed = {
            let mut sessions = self.lock_sessions();
            sessions.remove(device_id)
        };
        if removed.is_some() {
            debug!(device = %device_id, "session released");
            let _ = self.event_sender.send(SessionEvent::Released {
                device_id: device_id.clone(),
            });
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped session that releases its device on drop
///
/// For single-command use; multi-step workflows (e.g. a measurement scan)
/// hold the raw [`Session`] and release explicitly when the workflow ends.
#[derive(Debug)]
pub struct SessionGuard {
    manager: Arc<SessionManager>,
    device_id: Id,
}

impl SessionGuard {
    /// Wrap an acquired session so the device is released on drop
    pub fn new(manager: Arc<SessionManager>, session: Session) -> Self {
        Self {
            manager,
            device_id: session.device_id,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.release(&self.device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_concurrent_acquire_has_exactly_one_winner() {
        const CONTENDERS: usize = 16;

        let manager = Arc::new(SessionManager::new());
        let device: Id = "zippcube-0".into();
        let barrier = Arc::new(Barrier::new(CONTENDERS));

        let mut handles = Vec::with_capacity(CONTENDERS);
        for i in 0..CONTENDERS {
            let manager = manager.clone();
            let device = device.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                manager.acquire(&device, &Id::from(format!("line-{}", i)))
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(HardwareError::AlreadyLocked(id)) => assert_eq!(id, device),
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(winners, 1);
        assert!(manager.is_busy(&device));
    }

    #[test]
    fn test_release_is_idempotent() {
        let manager = SessionManager::new();
        let device: Id = "SH1".into();

        // releasing a never-acquired device must not raise
        manager.release(&device);
        assert!(!manager.is_busy(&device));

        manager.acquire(&device, &"line-1".into()).unwrap();
        manager.release(&device);
        manager.release(&device);
        assert!(!manager.is_busy(&device));
    }

    #[test]
    fn test_active_holder_follows_session_lifecycle() {
        let manager = SessionManager::new();
        let device: Id = "SH1".into();

        assert_eq!(manager.active_holder(&device), None);
        manager.acquire(&device, &"line-7".into()).unwrap();
        assert_eq!(manager.active_holder(&device), Some("line-7".into()));
        manager.release(&device);
        assert_eq!(manager.active_holder(&device), None);
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let manager = SessionManager::new();
        let device: Id = "SH1".into();

        manager.acquire(&device, &"line-1".into()).unwrap();
        let second = manager.acquire(&device, &"line-2".into());
        assert!(matches!(second, Err(HardwareError::AlreadyLocked(_))));
        // the loser did not disturb the winner
        assert_eq!(manager.active_holder(&device), Some("line-1".into()));
    }

    #[tokio::test]
    async fn test_lease_expiry_frees_a_leaked_session() {
        let manager = SessionManager::with_lease(Duration::from_millis(30));
        let device: Id = "SH1".into();

        manager.acquire(&device, &"line-1".into()).unwrap();
        assert!(manager.is_busy(&device));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!manager.is_busy(&device));
        assert_eq!(manager.active_holder(&device), None);

        // a new holder can claim the device without an explicit release
        manager.acquire(&device, &"line-2".into()).unwrap();
        assert_eq!(manager.active_holder(&device), Some("line-2".into()));
    }

    #[test]
    fn test_from_defaults_lease_mapping() {
        let manager = SessionManager::from_defaults(&HardwareDefaults::default());
        assert_eq!(manager.lease, None);

        let defaults = HardwareDefaults {
            session_lease_ms: 5_000,
            ..HardwareDefaults::default()
        };
        let manager = SessionManager::from_defaults(&defaults);
        assert_eq!(manager.lease, Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn test_session_events() {
        let manager = SessionManager::new();
        let mut events = manager.subscribe();
        let device: Id = "SH1".into();

        manager.acquire(&device, &"line-1".into()).unwrap();
        manager.release(&device);

        match events.try_recv().unwrap() {
            SessionEvent::Acquired { device_id, holder_id } => {
                assert_eq!(device_id, device);
                assert_eq!(holder_id, "line-1".into());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(events.try_recv().unwrap(), SessionEvent::Released { .. }));
    }

    #[test]
    fn test_session_guard_releases_on_drop() {
        let manager = Arc::new(SessionManager::new());
        let device: Id = "SH1".into();

        {
            let session = manager.acquire(&device, &"line-1".into()).unwrap();
            let _guard = SessionGuard::new(manager.clone(), session);
            assert!(manager.is_busy(&device));
        }
        assert!(!manager.is_busy(&device));
    }
}
