// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Execution contexts.
//!
//! The nanokernel knows three kinds of context:
//!
//! - An interrupt handler runs to completion.  It can never block or switch.
//! - A fiber is cooperatively scheduled.  It can suspend itself on a wait queue, and runs until it
//!   does so, apart from being interrupted.
//! - A task is preemptible.  It can not sit on a wait queue the way a fiber can, so the blocking
//!   operations poll instead when called from a task.
//!
//! A fiber that blocks on a kernel object leaves a [`ResumeSlot`] on its own stack.  Whoever makes
//! the fiber ready again stores the handed-off value in the slot first, so the fiber comes back
//! from the switch already holding its result.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use super::arch;
use super::irq::IrqKey;

pub use super::arch::Thread;

/// The kind of context that is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ContextKind {
    Isr = 0,
    Fiber = 1,
    Task = 2,
}

impl ContextKind {
    /// Decode the value reported by a port.  Anything unknown is treated as an interrupt, the
    /// most restrictive kind.
    pub const fn from_raw(raw: u32) -> ContextKind {
        match raw {
            1 => ContextKind::Fiber,
            2 => ContextKind::Task,
            _ => ContextKind::Isr,
        }
    }
}

/// Return the kind of context the caller is running in.
#[inline]
pub fn current_kind() -> ContextKind {
    arch::current_kind()
}

/// Return a handle to the calling context.
#[inline]
pub fn current() -> Thread {
    arch::current()
}

/// Make a suspended context runnable again.
///
/// This never switches.  The readied context runs at the next scheduling point.
#[inline]
pub fn ready(thread: &Thread) {
    arch::ready(thread);
}

/// Restore interrupts and suspend the calling fiber until some other context readies it.
///
/// Restoring interrupts is part of the switch, so no interrupt can see the fiber as blocked while
/// it is still running.
pub(crate) fn swap(key: IrqKey) {
    arch::swap(key);
}

/// Restore interrupts and give any freshly readied fiber a chance to run.
///
/// Tasks call this after waking a fiber so that the fiber does not have to wait for the task's
/// next preemption point.
pub(crate) fn reschedule(key: IrqKey) {
    arch::reschedule(key);
}

/// The place a blocked fiber receives its handed-off value.
///
/// The slot lives on the blocked fiber's stack, and is reachable from a wait queue only while the
/// fiber is suspended on it.
pub(crate) struct ResumeSlot<T> {
    thread: Thread,
    value: UnsafeCell<Option<T>>,
}

impl<T> ResumeSlot<T> {
    /// A slot for the calling context.
    pub(crate) fn new() -> ResumeSlot<T> {
        ResumeSlot {
            thread: current(),
            value: UnsafeCell::new(None),
        }
    }

    /// Hand `value` to the fiber waiting on `slot` and make it ready.
    ///
    /// # Safety
    ///
    /// Interrupts must be locked, and `slot` must have just been removed from the wait queue it
    /// was inserted on, so that nothing else can reach it.  The slot must not be touched again
    /// afterward, as the owner may already have returned.
    pub(crate) unsafe fn resume(slot: NonNull<ResumeSlot<T>>, value: T) {
        let slot = slot.as_ptr();
        // Take our own handle first: once the owner is ready, its stack frame may be gone.
        let thread = (*slot).thread.clone();
        *(*slot).value.get() = Some(value);
        ready(&thread);
    }

    /// Suspend on this slot, returning the value handed off by [`ResumeSlot::resume`].
    ///
    /// The slot must already be on a wait queue.  The key is consumed by the switch.
    pub(crate) fn wait(&self, key: IrqKey) -> T {
        swap(key);
        // SAFETY: The waker stored the value before readying us, and has let go of the slot.
        match unsafe { (*self.value.get()).take() } {
            Some(value) => value,
            None => unreachable!("fiber resumed without a handed-off value"),
        }
    }
}
