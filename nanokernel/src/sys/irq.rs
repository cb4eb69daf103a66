// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Interrupt locking.
//!
//! The nanokernel only runs on a single CPU, so masking interrupts is enough to keep every other
//! context out of a kernel object.  The mask comes from the active backend, which also registers
//! the same lock as the `critical-section` implementation for other crates.
//!
//! State that may only be touched with interrupts locked lives in an [`IrqCell`].  Access to the
//! contents requires a mutable borrow of the [`IrqKey`] returned by [`irq_lock`], so the borrow
//! cannot outlive the locked region.

use core::cell::UnsafeCell;
use core::marker::PhantomData;

use critical_section::RawRestoreState;

use super::arch;

/// The saved interrupt state from [`irq_lock`].
///
/// This must be handed back to [`irq_unlock`], or consumed by a context switch, which restores
/// interrupts as part of suspending the caller.
#[must_use = "interrupts stay locked until the key is released"]
pub(crate) struct IrqKey {
    state: RawRestoreState,
    // The key belongs to the context that locked interrupts.
    _nosend: PhantomData<*const ()>,
}

impl IrqKey {
    /// Give up the key for a backend that restores the state itself, as part of a switch.
    pub(crate) fn into_raw(self) -> RawRestoreState {
        self.state
    }
}

/// Mask interrupts, returning the state to restore.
#[inline]
pub(crate) fn irq_lock() -> IrqKey {
    // SAFETY: The state is restored by `irq_unlock` or a switch, either of which consumes the key.
    let state = unsafe { arch::irq_lock() };
    IrqKey { state, _nosend: PhantomData }
}

/// Restore the interrupt state saved by [`irq_lock`].
#[inline]
pub(crate) fn irq_unlock(key: IrqKey) {
    // SAFETY: Keys are only made by `irq_lock` and cannot be copied, so they are released in
    // reverse order of acquisition, once each.
    unsafe { arch::irq_unlock(key.state) }
}

/// A value that may only be accessed with interrupts locked.
pub(crate) struct IrqCell<T> {
    value: UnsafeCell<T>,
}

impl<T> IrqCell<T> {
    pub(crate) const fn new(value: T) -> IrqCell<T> {
        IrqCell { value: UnsafeCell::new(value) }
    }

    /// Borrow the contents for as long as the key is borrowed.
    ///
    /// While the borrow is live, no code outside this crate may run: no user closures, iterators,
    /// `Clone` or `Drop` impls.  Only such code could lock interrupts again and reach the same
    /// cell, so the borrow is unique.
    #[inline]
    pub(crate) fn borrow_mut<'a>(&'a self, _key: &'a mut IrqKey) -> &'a mut T {
        // SAFETY: Interrupts are locked on a single CPU, the borrow is tied to the key, and the
        // holder runs no foreign code that could lock again.
        unsafe { &mut *self.value.get() }
    }
}
