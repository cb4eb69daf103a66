// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! The handoff primitive shared by all of the synchronization objects.
//!
//! A [`Handoff`] holds one signed count, and storage that is used for one of two things:
//!
//! - When the count is positive, it is the number of queued values, and the storage holds them.
//! - When the count is negative, its magnitude is the number of fibers blocked waiting for a value,
//!   and the storage is their wait queue.
//! - When the count is zero, there is nothing in either.
//!
//! Values and waiters never exist at the same time.  A value given while a fiber waits goes
//! straight into that fiber's [`ResumeSlot`], so the fiber returns from its switch already holding
//! the value, with no re-check and no loop.
//!
//! Every change to the count and storage happens with interrupts locked, and every locked region
//! is constant time apart from the batch operations, which are linear in the batch.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::sys::context::{current_kind, reschedule, ContextKind, ResumeSlot};
use crate::sys::irq::{irq_lock, irq_unlock, IrqCell, IrqKey};
use crate::sys::wait_q::WaitQueue;
use crate::sys;

/// A snapshot of a synchronization object's count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectState {
    /// No values are queued, and no fibers wait.
    Empty,
    /// This many values are queued.
    HasData(usize),
    /// This many fibers are blocked waiting for a value.
    HasWaiters(usize),
}

impl ObjectState {
    fn from_count(count: isize) -> ObjectState {
        match count {
            0 => ObjectState::Empty,
            n if n > 0 => ObjectState::HasData(n as usize),
            n => ObjectState::HasWaiters(n.unsigned_abs()),
        }
    }
}

/// Where a new value goes among the values already queued.  Values are always taken from the
/// front.
pub(crate) trait Order {
    fn enqueue<T>(items: &mut VecDeque<T>, value: T);
}

/// Values come out in the order they were given.
pub(crate) enum FifoOrder {}

impl Order for FifoOrder {
    #[inline]
    fn enqueue<T>(items: &mut VecDeque<T>, value: T) {
        items.push_back(value);
    }
}

/// The most recently given value comes out first.
pub(crate) enum LifoOrder {}

impl Order for LifoOrder {
    #[inline]
    fn enqueue<T>(items: &mut VecDeque<T>, value: T) {
        items.push_front(value);
    }
}

/// What a giver does after handing a value to a blocked fiber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AfterWake {
    /// Only make the fiber ready.  Interrupt handlers and fibers give this way.
    Return,
    /// Switch right away, so the fiber runs before the caller continues.  Tasks give this way, as
    /// a task can always afford the switch and it keeps the fiber's wakeup latency low.
    Reschedule,
}

impl AfterWake {
    /// The giving behavior for a kind of context.
    pub(crate) fn for_kind(kind: ContextKind) -> AfterWake {
        match kind {
            ContextKind::Isr | ContextKind::Fiber => AfterWake::Return,
            ContextKind::Task => AfterWake::Reschedule,
        }
    }
}

enum Storage<T> {
    Empty,
    Items(VecDeque<T>),
    Waiters(WaitQueue<T>),
}

struct Inner<T> {
    count: isize,
    storage: Storage<T>,
}

impl<T> Inner<T> {
    const fn new() -> Inner<T> {
        Inner { count: 0, storage: Storage::Empty }
    }

    /// The queued values.  Only reachable while the count is not negative.
    fn items(&mut self) -> &mut VecDeque<T> {
        debug_assert!(self.count >= 0, "value storage used while fibers wait");
        if let Storage::Empty = self.storage {
            self.storage = Storage::Items(VecDeque::new());
        }
        match &mut self.storage {
            Storage::Items(items) => items,
            _ => unreachable!("value storage used while fibers wait"),
        }
    }

    /// The blocked fibers.  Only reachable while the count is not positive.
    fn waiters(&mut self) -> &mut WaitQueue<T> {
        debug_assert!(self.count <= 0, "wait queue used while values are queued");
        if let Storage::Empty = self.storage {
            self.storage = Storage::Waiters(WaitQueue::new());
        }
        match &mut self.storage {
            Storage::Waiters(waiters) => waiters,
            _ => unreachable!("wait queue used while values are queued"),
        }
    }

    /// Go back to the canonical empty storage once the count reaches zero.
    fn settle(&mut self) {
        if self.count == 0 {
            self.storage = Storage::Empty;
        }
    }

    /// Account for one more value: hand it to the oldest waiter if there is one, otherwise queue
    /// it.  Returns whether a fiber was readied.
    fn give<O: Order>(&mut self, value: T) -> bool {
        self.count += 1;
        if self.count <= 0 {
            let slot = match self.waiters().remove_oldest() {
                Some(slot) => slot,
                None => unreachable!("negative count with an empty wait queue"),
            };
            self.settle();
            // SAFETY: Interrupts are locked and the slot is off the queue.
            unsafe { ResumeSlot::resume(slot, value) };
            true
        } else {
            O::enqueue(self.items(), value);
            false
        }
    }

    /// Remove the value at the front.  The caller has already taken it off the count.
    fn take(&mut self) -> T {
        let value = match self.items().pop_front() {
            Some(value) => value,
            None => unreachable!("positive count with no queued value"),
        };
        self.settle();
        value
    }

    /// Check that the count agrees with the storage.
    #[inline]
    fn check(&self) {
        debug_assert!(
            match (&self.storage, self.count) {
                (Storage::Empty, 0) => true,
                (Storage::Items(items), n) => n > 0 && items.len() == n as usize,
                (Storage::Waiters(waiters), n) => n < 0 && waiters.len() == n.unsigned_abs(),
                _ => false,
            },
            "count {} does not match object storage",
            self.count,
        );
    }
}

/// The shared synchronization object: a signed count, and values or waiters.
pub(crate) struct Handoff<T, O> {
    inner: IrqCell<Inner<T>>,
    _order: PhantomData<O>,
}

// The queued values move between contexts, and the wait queue only refers to fibers that are
// suspended inside this object.  All access is with interrupts locked.
unsafe impl<T: Send, O> Send for Handoff<T, O> {}
unsafe impl<T: Send, O> Sync for Handoff<T, O> {}

impl<T, O: Order> Handoff<T, O> {
    pub(crate) const fn new() -> Handoff<T, O> {
        Handoff {
            inner: IrqCell::new(Inner::new()),
            _order: PhantomData,
        }
    }

    /// Return to the empty state.
    ///
    /// No fiber may be waiting.  Values that were queued are dropped after interrupts are
    /// unlocked.
    pub(crate) fn reset(&self) {
        self.replace(0, Storage::Empty);
    }

    /// Swap in storage built outside the lock.
    fn replace(&self, count: isize, storage: Storage<T>) {
        let mut key = irq_lock();
        let inner = self.inner.borrow_mut(&mut key);
        debug_assert!(inner.count >= 0, "kernel object reinitialized while fibers wait on it");
        let old = mem::replace(&mut inner.storage, storage);
        inner.count = count;
        inner.check();
        irq_unlock(key);
        drop(old);
    }

    /// Give a value.
    ///
    /// If `limit` values are already queued, the value is given back as the error.  A value handed
    /// to a waiting fiber never counts against the limit.
    pub(crate) fn put(&self, value: T, limit: usize, after_wake: AfterWake) -> Result<(), T> {
        let mut key = irq_lock();
        let inner = self.inner.borrow_mut(&mut key);
        if inner.count >= 0 && inner.count as usize >= limit {
            irq_unlock(key);
            return Err(value);
        }
        let woke = inner.give::<O>(value);
        inner.check();
        Self::finish(key, woke, after_wake);
        Ok(())
    }

    /// Give a batch of values under a single interrupt lock.
    ///
    /// Waiting fibers get the first values, oldest waiter first.  The rest are queued in batch
    /// order.  The iterator is drained before interrupts are locked, so it may itself use this
    /// object.
    pub(crate) fn put_all<I: IntoIterator<Item = T>>(&self, values: I, after_wake: AfterWake) {
        let values: VecDeque<T> = values.into_iter().collect();
        let mut key = irq_lock();
        let inner = self.inner.borrow_mut(&mut key);
        let mut woke = false;
        for value in values {
            woke |= inner.give::<O>(value);
        }
        inner.check();
        Self::finish(key, woke, after_wake);
    }

    fn finish(key: IrqKey, woke: bool, after_wake: AfterWake) {
        if woke && after_wake == AfterWake::Reschedule {
            // Interrupts are restored by the switch.
            reschedule(key);
        } else {
            irq_unlock(key);
        }
    }

    /// Take the front value if there is one.  Never blocks.
    pub(crate) fn get(&self) -> Option<T> {
        let mut key = irq_lock();
        let inner = self.inner.borrow_mut(&mut key);
        let value = if inner.count > 0 {
            inner.count -= 1;
            Some(inner.take())
        } else {
            None
        };
        inner.check();
        irq_unlock(key);
        value
    }

    /// Take the front value, suspending the calling fiber until one is given if needed.
    pub(crate) fn get_wait_fiber(&self) -> T {
        debug_assert_eq!(current_kind(), ContextKind::Fiber, "fiber wait called outside a fiber");

        let slot = ResumeSlot::new();
        let mut key = irq_lock();
        let inner = self.inner.borrow_mut(&mut key);
        inner.count -= 1;
        if inner.count >= 0 {
            let value = inner.take();
            inner.check();
            irq_unlock(key);
            return value;
        }
        inner.waiters().insert(NonNull::from(&slot));
        inner.check();
        slot.wait(key)
    }

    /// Take the front value, polling with idle backoff until one is available.
    ///
    /// Tasks cannot wait on a wait queue, so this never suspends in the scheduler's sense.
    pub(crate) fn get_wait_task(&self) -> T {
        debug_assert_ne!(current_kind(), ContextKind::Isr, "blocking wait called from an interrupt");

        loop {
            let mut key = irq_lock();
            let inner = self.inner.borrow_mut(&mut key);
            if inner.count > 0 {
                inner.count -= 1;
                let value = inner.take();
                inner.check();
                irq_unlock(key);
                return value;
            }
            irq_unlock(key);
            sys::idle();
        }
    }

    pub(crate) fn state(&self) -> ObjectState {
        let mut key = irq_lock();
        let count = self.inner.borrow_mut(&mut key).count;
        irq_unlock(key);
        ObjectState::from_count(count)
    }

    /// Copy of the value that the next `get` would return.
    ///
    /// Limited to `Copy` values, which are duplicated bit for bit, so that no `Clone` impl runs
    /// with interrupts locked.
    pub(crate) fn peek_front(&self) -> Option<T>
        where T: Copy,
    {
        self.peek(|items| items.front().copied())
    }

    /// Copy of the value at the far end of the queue.
    pub(crate) fn peek_back(&self) -> Option<T>
        where T: Copy,
    {
        self.peek(|items| items.back().copied())
    }

    fn peek<F: FnOnce(&VecDeque<T>) -> Option<T>>(&self, f: F) -> Option<T> {
        let mut key = irq_lock();
        let value = match &self.inner.borrow_mut(&mut key).storage {
            Storage::Items(items) => f(items),
            _ => None,
        };
        irq_unlock(key);
        value
    }
}

impl<O: Order> Handoff<(), O> {
    /// Return to a state holding `count` payload-free values, as a semaphore does.
    ///
    /// The values take no space, so the storage is built in one step outside the lock, whatever
    /// the count.  No fiber may be waiting.
    pub(crate) fn reset_count(&self, count: usize) {
        debug_assert!(count <= isize::MAX as usize);
        if count == 0 {
            self.reset();
            return;
        }
        let mut tokens = Vec::<()>::new();
        // SAFETY: `()` is zero sized with a single value, so every slot is initialized, and a
        // vector of zero sized values has a capacity of `usize::MAX`.
        unsafe { tokens.set_len(count) };
        // The conversion from a `Vec` reuses its buffer and takes constant time.
        self.replace(count as isize, Storage::Items(VecDeque::from(tokens)));
    }
}

#[cfg(all(test, feature = "host"))]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let h = Handoff::<u32, FifoOrder>::new();
        for v in [1, 2, 3] {
            h.put(v, usize::MAX, AfterWake::Return).unwrap();
        }
        assert_eq!(h.state(), ObjectState::HasData(3));
        assert_eq!(h.get(), Some(1));
        assert_eq!(h.get(), Some(2));
        assert_eq!(h.get(), Some(3));
        assert_eq!(h.get(), None);
        assert_eq!(h.state(), ObjectState::Empty);
    }

    #[test]
    fn lifo_order() {
        let h = Handoff::<u32, LifoOrder>::new();
        h.put_all([1, 2, 3], AfterWake::Return);
        assert_eq!(h.peek_front(), Some(3));
        assert_eq!(h.peek_back(), Some(1));
        assert_eq!(h.get(), Some(3));
        assert_eq!(h.get(), Some(2));
        assert_eq!(h.get(), Some(1));
        assert_eq!(h.get(), None);
    }

    #[test]
    fn limit_refuses_without_change() {
        let h = Handoff::<u32, LifoOrder>::new();
        h.put(1, 2, AfterWake::Return).unwrap();
        h.put(2, 2, AfterWake::Return).unwrap();
        assert_eq!(h.put(3, 2, AfterWake::Return), Err(3));
        assert_eq!(h.state(), ObjectState::HasData(2));
        assert_eq!(h.get(), Some(2));
    }

    #[test]
    fn reset_drops_values() {
        let h = Handoff::<u32, FifoOrder>::new();
        h.put_all([1, 2], AfterWake::Return);
        h.reset();
        assert_eq!(h.state(), ObjectState::Empty);
        assert_eq!(h.get(), None);
    }

    #[test]
    fn reset_count_is_exact() {
        let h = Handoff::<(), FifoOrder>::new();
        h.reset_count(3);
        assert_eq!(h.state(), ObjectState::HasData(3));
        assert_eq!(h.get(), Some(()));
        h.reset_count(0);
        assert_eq!(h.state(), ObjectState::Empty);
    }

    #[test]
    fn batch_iterator_can_use_the_object() {
        let h = Handoff::<u32, FifoOrder>::new();
        h.put(1, usize::MAX, AfterWake::Return).unwrap();
        // Each value is taken from the object itself while the batch is being built.
        h.put_all((0..2).map(|_| h.get().map_or(0, |v| v + 10)), AfterWake::Return);
        assert_eq!(h.state(), ObjectState::HasData(2));
        assert_eq!(h.get(), Some(11));
        assert_eq!(h.get(), Some(0));
    }

    #[test]
    fn peek_empty() {
        let h = Handoff::<u32, FifoOrder>::new();
        assert_eq!(h.peek_front(), None);
        assert_eq!(h.peek_back(), None);
    }

    #[test]
    fn state_from_count() {
        assert_eq!(ObjectState::from_count(0), ObjectState::Empty);
        assert_eq!(ObjectState::from_count(4), ObjectState::HasData(4));
        assert_eq!(ObjectState::from_count(-2), ObjectState::HasWaiters(2));
    }

    #[test]
    fn wake_policy() {
        assert_eq!(AfterWake::for_kind(ContextKind::Isr), AfterWake::Return);
        assert_eq!(AfterWake::for_kind(ContextKind::Fiber), AfterWake::Return);
        assert_eq!(AfterWake::for_kind(ContextKind::Task), AfterWake::Reschedule);
    }
}
