//! Process-wide exclusivity for export sessions.
//!
//! Only one burn-in export may drive the capture canvas at a time, and the
//! live preview overlay stays suppressed while one is running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag guarding the single active export session.
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    active: Arc<AtomicBool>,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the lock. Returns `None` when another session already holds it.
    pub fn try_acquire(&self) -> Option<SessionGuard> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SessionGuard {
                active: self.active.clone(),
            })
    }

    /// Whether an export session currently holds the lock.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Releases the [`SessionLock`] when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    active: Arc<AtomicBool>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let lock = SessionLock::new();
        let guard = lock.try_acquire();
        assert!(guard.is_some());
        assert!(lock.is_active());
        assert!(lock.clone().try_acquire().is_none());

        drop(guard);
        assert!(!lock.is_active());
        assert!(lock.try_acquire().is_some());
    }
}
