// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Board port backend.
//!
//! The port supplies interrupt masking and the scheduler through these C hooks.  The interrupt
//! mask is also registered as the `critical-section` implementation, so crates such as
//! `portable-atomic` share the kernel's lock.
//!
//! `nano_arch_swap` and `nano_arch_reschedule` receive the interrupt state saved by
//! `nano_arch_irq_lock`, and must restore it as part of the switch.  Interrupts stay masked until
//! the caller is off the CPU, so an interrupt can never ready a fiber that is still on its way to
//! suspending.

use core::ffi::c_void;

use critical_section::RawRestoreState;

use crate::sys::context::ContextKind;
use crate::sys::irq::IrqKey;

extern "C" {
    fn nano_arch_irq_lock() -> RawRestoreState;
    fn nano_arch_irq_unlock(key: RawRestoreState);
    fn nano_arch_current_kind() -> u32;
    fn nano_arch_current() -> *mut c_void;
    fn nano_arch_ready(thread: *mut c_void);
    fn nano_arch_swap(key: RawRestoreState);
    fn nano_arch_reschedule(key: RawRestoreState);
    fn nano_cpu_idle();
}

struct PortCriticalSection;
critical_section::set_impl!(PortCriticalSection);

unsafe impl critical_section::Impl for PortCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        nano_arch_irq_lock()
    }

    unsafe fn release(token: RawRestoreState) {
        nano_arch_irq_unlock(token);
    }
}

/// Handle to a fiber or task: the port's thread control block.
#[derive(Clone, Debug)]
pub struct Thread {
    pub item: *mut c_void,
}

unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

pub(crate) unsafe fn irq_lock() -> RawRestoreState {
    nano_arch_irq_lock()
}

pub(crate) unsafe fn irq_unlock(key: RawRestoreState) {
    nano_arch_irq_unlock(key)
}

pub(crate) fn current() -> Thread {
    Thread { item: unsafe { nano_arch_current() } }
}

pub(crate) fn current_kind() -> ContextKind {
    ContextKind::from_raw(unsafe { nano_arch_current_kind() })
}

pub(crate) fn ready(thread: &Thread) {
    unsafe { nano_arch_ready(thread.item) }
}

/// Suspend the caller, restoring interrupts atomically with the switch.
pub(crate) fn swap(key: IrqKey) {
    unsafe { nano_arch_swap(key.into_raw()) }
}

pub(crate) fn reschedule(key: IrqKey) {
    unsafe { nano_arch_reschedule(key.into_raw()) }
}

pub(crate) fn idle() {
    unsafe { nano_cpu_idle() }
}
