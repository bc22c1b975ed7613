//! First-in-first-out mutual exclusion.
//!
//! [`FairLock`] grants its guard in the order callers asked for it. Every
//! caller draws a ticket under a short internal mutex and then waits on a
//! condition variable until the "now serving" counter reaches its ticket.
//! The protected value sits behind a second mutex that only the ticket
//! holder ever locks, so it is never contended.
//!
//! A poisoned internal mutex means a holder panicked mid-section. The
//! waiter logs it and carries on with the recovered guard instead of
//! abandoning the operation.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, LockResult, Mutex, MutexGuard};

/// Recover a guard from a possibly poisoned lock result.
///
/// The critical sections guarded in this crate never leave shared state
/// half-updated across a panic point, so the recovered value is usable.
pub(crate) fn recover<G>(result: LockResult<G>, what: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        log::warn!("{what}: wait interrupted by a panicked holder, retrying");
        poisoned.into_inner()
    })
}

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

/// A ticket-ordered mutex.
///
/// Non-reentrant: locking twice from the same thread deadlocks.
#[derive(Debug, Default)]
pub struct FairLock<T> {
    tickets: Mutex<Tickets>,
    turn: Condvar,
    data: Mutex<T>,
}

// Compile-time assertion: FairLock<T> is Send + Sync for Send T.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<FairLock<Vec<u8>>>();
};

impl<T> FairLock<T> {
    /// Wrap `value` in a new, unlocked lock.
    pub fn new(value: T) -> Self {
        Self {
            tickets: Mutex::new(Tickets::default()),
            turn: Condvar::new(),
            data: Mutex::new(value),
        }
    }

    /// Block until every earlier caller has released, then lock.
    pub fn lock(&self) -> FairGuard<'_, T> {
        let mut tickets = recover(self.tickets.lock(), "fair lock ticket queue");
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            tickets = recover(self.turn.wait(tickets), "fair lock turn");
        }
        drop(tickets);

        FairGuard {
            data: recover(self.data.lock(), "fair lock data"),
            _turn: Turn { lock: self },
        }
    }

    /// Number of callers holding or waiting for the lock.
    pub fn queued(&self) -> u64 {
        let tickets = recover(self.tickets.lock(), "fair lock ticket queue");
        tickets.next - tickets.serving
    }

    /// Mutable access without locking; `&mut self` proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        recover(self.data.get_mut(), "fair lock data")
    }

    /// Consume the lock and return the protected value.
    pub fn into_inner(self) -> T {
        recover(self.data.into_inner(), "fair lock data")
    }

    fn advance(&self) {
        let mut tickets = recover(self.tickets.lock(), "fair lock ticket queue");
        tickets.serving += 1;
        drop(tickets);
        self.turn.notify_all();
    }
}

/// Hands the turn to the next ticket when dropped.
struct Turn<'a, T> {
    lock: &'a FairLock<T>,
}

impl<T> Drop for Turn<'_, T> {
    fn drop(&mut self) {
        self.lock.advance();
    }
}

/// Exclusive access to the value inside a [`FairLock`].
pub struct FairGuard<'a, T> {
    // Field order matters: the data guard must drop before the turn advances.
    data: MutexGuard<'a, T>,
    _turn: Turn<'a, T>,
}

impl<T> Deref for FairGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for FairGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}
