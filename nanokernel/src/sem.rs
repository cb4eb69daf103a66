// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Counting semaphore.
//!
//! The semaphore is the handoff object with no payload: giving adds one to the count, or wakes
//! the fiber that has waited longest, and taking removes one.  The count never exceeds the limit
//! set by `init`; a give at the limit with nobody waiting is lost.

use core::fmt;

use crate::error::{Error, Result};
use crate::handoff::{AfterWake, FifoOrder, Handoff, ObjectState};
use crate::object::trace::{self, ObjectKind};
use crate::object::{KobjInit, StaticKernelObject};
use crate::sync::atomic::{AtomicUsize, Ordering};
use crate::sys::context::{current_kind, ContextKind};

/// The largest limit a semaphore can have.  Used for semaphores that only count.
pub const SEM_MAX_LIMIT: usize = isize::MAX as usize;

/// A counting semaphore, with direct handoff to waiting fibers.
pub struct Semaphore {
    tokens: Handoff<(), FifoOrder>,
    limit: AtomicUsize,
}

impl Semaphore {
    /// Create a semaphore with a count of zero and no practical limit.  Usable in a `static`.
    pub const fn new() -> Semaphore {
        Semaphore {
            tokens: Handoff::new(),
            limit: AtomicUsize::new(SEM_MAX_LIMIT),
        }
    }

    /// Create a semaphore with the given count and limit.
    pub fn with_count(initial: usize, limit: usize) -> Result<Semaphore> {
        let sem = Semaphore::new();
        sem.init(initial, limit)?;
        Ok(sem)
    }

    /// Set the count and limit.
    ///
    /// Fails with `EINVAL` if the limit is zero or above [`SEM_MAX_LIMIT`], or the count is above
    /// the limit.  No fiber may be waiting on the semaphore.
    pub fn init(&self, initial: usize, limit: usize) -> Result<()> {
        if limit == 0 || limit > SEM_MAX_LIMIT || initial > limit {
            return Err(Error::EINVAL);
        }
        self.limit.store(limit, Ordering::Relaxed);
        self.tokens.reset_count(initial);
        trace::record_init(ObjectKind::Semaphore, self as *const _ as *const ());
        Ok(())
    }

    fn give_as(&self, after_wake: AfterWake) {
        // At the limit, the give is dropped.
        let _ = self.tokens.put((), self.limit.load(Ordering::Relaxed), after_wake);
    }

    pub fn give_isr(&self) {
        self.give_as(AfterWake::Return);
    }

    pub fn give_fiber(&self) {
        self.give_as(AfterWake::Return);
    }

    /// Give from a task, switching away first if that woke a fiber.
    pub fn give_task(&self) {
        self.give_as(AfterWake::Reschedule);
    }

    pub fn give(&self) {
        match current_kind() {
            ContextKind::Isr => self.give_isr(),
            ContextKind::Fiber => self.give_fiber(),
            ContextKind::Task => self.give_task(),
        }
    }

    /// Take the semaphore if it is available.  Never blocks.
    pub fn take(&self) -> bool {
        self.tokens.get().is_some()
    }

    pub fn take_wait_fiber(&self) {
        self.tokens.get_wait_fiber()
    }

    pub fn take_wait_task(&self) {
        self.tokens.get_wait_task()
    }

    pub fn take_wait(&self) {
        match current_kind() {
            ContextKind::Task => self.take_wait_task(),
            ContextKind::Fiber | ContextKind::Isr => self.take_wait_fiber(),
        }
    }

    /// The current count.  Zero when fibers are waiting.
    pub fn count(&self) -> usize {
        match self.tokens.state() {
            ObjectState::HasData(n) => n,
            _ => 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /// Set the count to zero.  No fiber may be waiting.
    pub fn reset(&self) {
        self.tokens.reset();
    }

    pub fn state(&self) -> ObjectState {
        self.tokens.state()
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Semaphore::new()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Semaphore {:?} limit {}", self.state(), self.limit())
    }
}

/// A statically allocated [`Semaphore`], declared with `kobj_define!`.
pub type StaticSemaphore = StaticKernelObject<Semaphore>;

impl KobjInit for StaticSemaphore {
    const UNINIT: Self = StaticKernelObject::new(Semaphore::new());
}

impl StaticSemaphore {
    pub fn init(&self, initial: usize, limit: usize) -> Result<()> {
        self.init_help(|sem| sem.init(initial, limit))
    }
}
