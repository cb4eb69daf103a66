// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Last in, first out queue.
//!
//! Works like [`Fifo`](crate::sync::Fifo), except that `get` returns the most recently given
//! value.  Waiting fibers are still served in the order they started waiting.

use core::fmt;

use crate::handoff::{AfterWake, Handoff, LifoOrder, ObjectState};
use crate::object::trace::{self, ObjectKind};
use crate::object::{KobjInit, StaticKernelObject};
use crate::sys::context::{current_kind, ContextKind};

/// A last in, first out queue of values, with direct handoff to waiting fibers.
pub struct Lifo<T> {
    queue: Handoff<T, LifoOrder>,
}

impl<T> Lifo<T> {
    pub const fn new() -> Lifo<T> {
        Lifo { queue: Handoff::new() }
    }

    /// Put the LIFO back in the empty state, dropping any queued values.
    pub fn init(&self) {
        self.queue.reset();
        trace::record_init(ObjectKind::Lifo, self as *const _ as *const ());
    }

    pub fn put_isr(&self, value: T) {
        let _ = self.queue.put(value, usize::MAX, AfterWake::Return);
    }

    pub fn put_fiber(&self, value: T) {
        let _ = self.queue.put(value, usize::MAX, AfterWake::Return);
    }

    /// Give a value from a task, switching away first if that woke a fiber.
    pub fn put_task(&self, value: T) {
        let _ = self.queue.put(value, usize::MAX, AfterWake::Reschedule);
    }

    pub fn put(&self, value: T) {
        match current_kind() {
            ContextKind::Isr => self.put_isr(value),
            ContextKind::Fiber => self.put_fiber(value),
            ContextKind::Task => self.put_task(value),
        }
    }

    /// Take the newest value, or `None`.  Never blocks.
    pub fn get(&self) -> Option<T> {
        self.queue.get()
    }

    pub fn get_wait_fiber(&self) -> T {
        self.queue.get_wait_fiber()
    }

    pub fn get_wait_task(&self) -> T {
        self.queue.get_wait_task()
    }

    pub fn get_wait(&self) -> T {
        match current_kind() {
            ContextKind::Task => self.get_wait_task(),
            ContextKind::Fiber | ContextKind::Isr => self.get_wait_fiber(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self.state(), ObjectState::HasData(_))
    }

    pub fn state(&self) -> ObjectState {
        self.queue.state()
    }
}

impl<T> Default for Lifo<T> {
    fn default() -> Self {
        Lifo::new()
    }
}

impl<T> fmt::Debug for Lifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lifo {:?}", self.state())
    }
}

pub type StaticLifo<T> = StaticKernelObject<Lifo<T>>;

impl<T> KobjInit for StaticLifo<T> {
    const UNINIT: Self = StaticKernelObject::new(Lifo::new());
}

impl<T> StaticLifo<T> {
    pub fn init(&self) {
        self.init_help(Lifo::init)
    }
}

#[cfg(all(test, feature = "host"))]
mod tests {
    use super::*;
    use crate::sys::arch::host::run_isr;

    #[test]
    fn newest_first() {
        let lifo = Lifo::new();
        lifo.put(1);
        lifo.put_fiber(2);
        run_isr(|| lifo.put(3));
        assert_eq!(lifo.state(), ObjectState::HasData(3));
        assert_eq!(lifo.get(), Some(3));
        assert_eq!(lifo.get(), Some(2));
        assert_eq!(lifo.get_wait(), 1);
        assert_eq!(lifo.get(), None);
        assert!(lifo.is_empty());
    }
}
