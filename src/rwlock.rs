//! A reader-writer lock with writer preference.
//!
//! Many concurrent readers XOR one writer. A waiting writer blocks new
//! readers, so a steady stream of readers cannot starve writers. Guards
//! release on drop. Two liveness provisions beyond the textbook version:
//!
//! - [`RwLock::try_write_for`] bounds a writer's wait; on timeout the
//!   waiter repairs the `writers_waiting` counter and wakes everyone
//!   before giving up, so readers parked behind it are never stranded.
//! - The internal mutex is recovered from poisoning, so a thread that
//!   panics while holding a guard cannot wedge the lock for the process.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct LockState {
    num_readers: usize,
    writer_active: bool,
    writers_waiting: usize,
}

/// Many-readers-or-one-writer lock protecting a value of type `T`.
pub struct RwLock<T> {
    state: Mutex<LockState>,
    /// Signalled when the last reader leaves; writers wait here while
    /// readers hold the lock.
    readers_ok: Condvar,
    /// Signalled on write release; both parked readers and parked writers
    /// wait here while a writer is active.
    writers_ok: Condvar,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is mediated by the reader/writer protocol —
// shared references only while `num_readers > 0`, a unique reference only
// while `writer_active`. The two are mutually exclusive by construction.
unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            readers_ok: Condvar::new(),
            writers_ok: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire a shared read guard, blocking while a writer is active or
    /// any writer is waiting.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.lock_state();
        while state.writer_active || state.writers_waiting > 0 {
            state = self
                .writers_ok
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.num_readers += 1;
        drop(state);
        ReadGuard { lock: self }
    }

    /// Acquire the exclusive write guard, blocking until all readers have
    /// left and no other writer is active.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.lock_state();
        state.writers_waiting += 1;
        while state.num_readers > 0 || state.writer_active {
            state = if state.num_readers > 0 {
                self.readers_ok
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner)
            } else {
                self.writers_ok
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner)
            };
        }
        state.writers_waiting -= 1;
        state.writer_active = true;
        drop(state);
        WriteGuard { lock: self }
    }

    /// Like [`write`](Self::write) but gives up after `timeout`.
    ///
    /// A timed-out waiter decrements `writers_waiting` and broadcasts on
    /// both condition variables before returning `None`: readers were
    /// blocked on this waiter's account and must be released.
    pub fn try_write_for(&self, timeout: Duration) -> Option<WriteGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock_state();
        state.writers_waiting += 1;
        while state.num_readers > 0 || state.writer_active {
            let now = Instant::now();
            if now >= deadline {
                state.writers_waiting -= 1;
                drop(state);
                self.readers_ok.notify_all();
                self.writers_ok.notify_all();
                return None;
            }
            let remaining = deadline - now;
            let (guard, _timed_out) = if state.num_readers > 0 {
                self.readers_ok
                    .wait_timeout(state, remaining)
                    .unwrap_or_else(PoisonError::into_inner)
            } else {
                self.writers_ok
                    .wait_timeout(state, remaining)
                    .unwrap_or_else(PoisonError::into_inner)
            };
            state = guard;
        }
        state.writers_waiting -= 1;
        state.writer_active = true;
        drop(state);
        Some(WriteGuard { lock: self })
    }

    #[cfg(test)]
    fn snapshot(&self) -> (usize, bool, usize) {
        let state = self.lock_state();
        (
            state.num_readers,
            state.writer_active,
            state.writers_waiting,
        )
    }
}

/// Shared access to the protected value. Released on drop.
pub struct ReadGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: num_readers > 0 excludes any writer.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.lock_state();
        state.num_readers -= 1;
        let last_reader = state.num_readers == 0;
        drop(state);
        if last_reader {
            self.lock.readers_ok.notify_all();
        }
    }
}

/// Exclusive access to the protected value. Released on drop.
pub struct WriteGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: writer_active excludes all readers and other writers.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: as above; the guard is unique.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.lock_state();
        state.writer_active = false;
        drop(state);
        self.lock.writers_ok.notify_all();
        self.lock.readers_ok.notify_all();
    }
}
