// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Lock used by single-threaded tests in place of a real mutex.
//!
//! [`crate::Expectation`] is generic over a [`RawMutex`]; it uses
//! `parking_lot::RawMutex` unless told otherwise.

use std::cell::Cell;

use parking_lot::lock_api::{GuardNoSend, RawMutex};

/// Mutex for values that never leave their thread.
///
/// Locking is a flag flip. The type is `!Sync`, so anything guarded by it
/// cannot be shared across threads; re-entrant locking panics instead of
/// deadlocking.
#[derive(Debug)]
pub struct LocalRawMutex {
    locked: Cell<bool>,
}

unsafe impl RawMutex for LocalRawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = LocalRawMutex {
        locked: Cell::new(false),
    };

    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        if self.locked.replace(true) {
            panic!("LocalRawMutex is already locked by this thread");
        }
    }

    fn try_lock(&self) -> bool {
        !self.locked.replace(true)
    }

    unsafe fn unlock(&self) {
        self.locked.set(false);
    }

    fn is_locked(&self) -> bool {
        self.locked.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::lock_api::Mutex;

    #[test]
    fn test_lock_unlock() {
        let mutex: Mutex<LocalRawMutex, u32> = Mutex::new(0);

        {
            let mut guard = mutex.lock();
            *guard += 1;
            assert!(mutex.is_locked());
            assert!(mutex.try_lock().is_none());
        }

        assert!(!mutex.is_locked());
        assert_eq!(*mutex.lock(), 1);
    }

    #[test]
    #[should_panic(expected = "already locked")]
    fn test_reentrant_lock_panics() {
        let mutex: Mutex<LocalRawMutex, ()> = Mutex::new(());

        let _first = mutex.lock();
        let _second = mutex.lock();
    }
}
