// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! First in, first out queue.
//!
//! A [`Fifo`] passes values from producers to consumers.  Giving never blocks.  When a fiber is
//! already waiting, the value goes directly to the fiber that has waited longest; otherwise it is
//! queued behind any values already there.
//!
//! ```ignore
//! static RX: Fifo<Packet> = Fifo::new();
//!
//! // In the receive interrupt.
//! RX.put_isr(packet);
//!
//! // In the protocol fiber.
//! loop {
//!     let packet = RX.get_wait_fiber();
//!     ...
//! }
//! ```
//!
//! There is no timeout on the blocking forms.  A consumer that needs a bounded wait can arrange
//! for a timer to put a marker value.

use core::fmt;

use crate::handoff::{AfterWake, FifoOrder, Handoff, ObjectState};
use crate::object::trace::{self, ObjectKind};
use crate::object::{KobjInit, StaticKernelObject};
use crate::sys::context::{current_kind, ContextKind};

/// A first in, first out queue of values, with direct handoff to waiting fibers.
pub struct Fifo<T> {
    queue: Handoff<T, FifoOrder>,
}

impl<T> Fifo<T> {
    /// Create an empty FIFO.  Usable in a `static`.
    pub const fn new() -> Fifo<T> {
        Fifo { queue: Handoff::new() }
    }

    /// Put the FIFO back in the empty state.
    ///
    /// Any queued values are dropped.  No fiber may be waiting on the FIFO.
    pub fn init(&self) {
        self.queue.reset();
        trace::record_init(ObjectKind::Fifo, self as *const _ as *const ());
    }

    /// Give a value from an interrupt handler.
    pub fn put_isr(&self, value: T) {
        self.put_as(value, AfterWake::Return);
    }

    /// Give a value from a fiber.
    ///
    /// A fiber woken by this is only made ready; the caller keeps running.
    pub fn put_fiber(&self, value: T) {
        self.put_as(value, AfterWake::Return);
    }

    /// Give a value from a task.
    ///
    /// If this wakes a fiber, the task switches away before returning, so the fiber runs first.
    pub fn put_task(&self, value: T) {
        self.put_as(value, AfterWake::Reschedule);
    }

    /// Give a value from any kind of context.
    pub fn put(&self, value: T) {
        match current_kind() {
            ContextKind::Isr => self.put_isr(value),
            ContextKind::Fiber => self.put_fiber(value),
            ContextKind::Task => self.put_task(value),
        }
    }

    fn put_as(&self, value: T, after_wake: AfterWake) {
        // An unbounded queue never refuses a value.
        let _ = self.queue.put(value, usize::MAX, after_wake);
    }

    /// Give a batch of values in one step, from an interrupt handler.
    ///
    /// Waiting fibers receive the first values; the rest are queued in order.  No other context
    /// can observe the batch partly given.  The iterator is run to completion first, with
    /// interrupts still enabled.
    pub fn put_list_isr<I: IntoIterator<Item = T>>(&self, values: I) {
        self.queue.put_all(values, AfterWake::Return);
    }

    /// Give a batch of values from a fiber.
    pub fn put_list_fiber<I: IntoIterator<Item = T>>(&self, values: I) {
        self.queue.put_all(values, AfterWake::Return);
    }

    /// Give a batch of values from a task, switching away once if any fiber was woken.
    pub fn put_list_task<I: IntoIterator<Item = T>>(&self, values: I) {
        self.queue.put_all(values, AfterWake::Reschedule);
    }

    /// Give a batch of values from any kind of context.
    pub fn put_list<I: IntoIterator<Item = T>>(&self, values: I) {
        self.queue.put_all(values, AfterWake::for_kind(current_kind()));
    }

    /// Take the oldest value, or `None` if nothing is queued.  Never blocks, and may be called
    /// from any context.
    pub fn get(&self) -> Option<T> {
        self.queue.get()
    }

    /// Take the oldest value, blocking the calling fiber until one arrives.
    ///
    /// Must only be called from a fiber.
    pub fn get_wait_fiber(&self) -> T {
        self.queue.get_wait_fiber()
    }

    /// Take the oldest value, polling until one arrives.
    ///
    /// The task idles between checks rather than blocking.  Must not be called from an
    /// interrupt handler.
    pub fn get_wait_task(&self) -> T {
        self.queue.get_wait_task()
    }

    /// Take the oldest value, waiting as appropriate for the current context.
    ///
    /// Calling this from an interrupt handler is a contract violation.
    pub fn get_wait(&self) -> T {
        match current_kind() {
            ContextKind::Task => self.get_wait_task(),
            ContextKind::Fiber | ContextKind::Isr => self.get_wait_fiber(),
        }
    }

    /// Whether no value is queued.  Fibers may still be waiting.
    pub fn is_empty(&self) -> bool {
        !matches!(self.state(), ObjectState::HasData(_))
    }

    /// Snapshot of the FIFO's count.
    pub fn state(&self) -> ObjectState {
        self.queue.state()
    }
}

impl<T: Copy> Fifo<T> {
    /// Copy of the oldest queued value, without removing it.
    pub fn peek_head(&self) -> Option<T> {
        self.queue.peek_front()
    }

    /// Copy of the newest queued value, without removing it.
    pub fn peek_tail(&self) -> Option<T> {
        self.queue.peek_back()
    }
}

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Fifo::new()
    }
}

impl<T> fmt::Debug for Fifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fifo {:?}", self.state())
    }
}

/// A statically allocated [`Fifo`], declared with `kobj_define!`.
pub type StaticFifo<T> = StaticKernelObject<Fifo<T>>;

impl<T> KobjInit for StaticFifo<T> {
    const UNINIT: Self = StaticKernelObject::new(Fifo::new());
}

impl<T> StaticFifo<T> {
    pub fn init(&self) {
        self.init_help(Fifo::init)
    }
}

#[cfg(all(test, feature = "host"))]
mod tests {
    use super::*;
    use crate::sys::arch::host::run_isr;

    #[test]
    fn task_put_then_get() {
        let fifo = Fifo::new();
        fifo.init();
        fifo.put_task('X');
        assert_eq!(fifo.state(), ObjectState::HasData(1));
        assert_eq!(fifo.get(), Some('X'));
        assert_eq!(fifo.state(), ObjectState::Empty);
        assert_eq!(fifo.get(), None);
    }

    #[test]
    fn init_is_empty() {
        let fifo = Fifo::new();
        fifo.put(1);
        fifo.init();
        assert_eq!(fifo.get(), None);
        assert!(fifo.is_empty());
    }

    #[test]
    fn order_across_contexts() {
        let fifo = Fifo::new();
        fifo.put(1);
        run_isr(|| fifo.put(2));
        fifo.put_fiber(3);
        fifo.put_list([4, 5]);
        run_isr(|| fifo.put_list_isr([6]));
        assert_eq!(fifo.peek_head(), Some(1));
        assert_eq!(fifo.peek_tail(), Some(6));
        let got: Vec<_> = core::iter::from_fn(|| fifo.get()).collect();
        assert_eq!(got, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn get_from_isr() {
        let fifo = Fifo::new();
        fifo.put("a");
        assert_eq!(run_isr(|| fifo.get()), Some("a"));
        assert_eq!(run_isr(|| fifo.get()), None);
    }

    #[test]
    fn task_wait_with_data_ready() {
        let fifo = Fifo::new();
        fifo.put(9);
        assert_eq!(fifo.get_wait(), 9);
        assert_eq!(fifo.state(), ObjectState::Empty);
    }

    #[test]
    fn batch_built_from_the_same_fifo() {
        let fifo = Fifo::new();
        fifo.put(100);
        fifo.put_list(core::iter::from_fn(|| fifo.get()).map(|v| v + 1).chain([7]));
        assert_eq!(fifo.state(), ObjectState::HasData(2));
        assert_eq!(fifo.get(), Some(101));
        assert_eq!(fifo.get(), Some(7));
    }

    static PEEKED: Fifo<Tagged> = Fifo::new();

    #[derive(Copy, Debug, PartialEq)]
    struct Tagged(u32);

    impl Clone for Tagged {
        fn clone(&self) -> Self {
            let _ = PEEKED.get();
            *self
        }
    }

    #[test]
    fn peek_never_runs_clone() {
        PEEKED.put(Tagged(1));
        PEEKED.put(Tagged(2));
        assert_eq!(PEEKED.peek_head(), Some(Tagged(1)));
        assert_eq!(PEEKED.peek_tail(), Some(Tagged(2)));
        assert_eq!(PEEKED.state(), ObjectState::HasData(2));
    }

    #[test]
    fn debug_shows_state() {
        let fifo = Fifo::new();
        fifo.put(1u8);
        assert_eq!(format!("{:?}", fifo), "Fifo HasData(1)");
    }
}
