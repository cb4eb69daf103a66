// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Backend selection.
//!
//! Each backend provides the same small set of items: a cloneable `Thread` handle, the interrupt
//! lock (`irq_lock`, `irq_unlock`, also registered as the `critical-section` implementation), and
//! the functions `current`, `current_kind`, `ready`, `swap`, `reschedule` and `idle`.
//!
//! `swap` and `reschedule` consume the interrupt key.  On a port the switch restores interrupts
//! itself, so releasing the lock and leaving the CPU are one step.  The host backend unlocks first
//! and then parks, and relies on the per-thread readied flag to catch a wakeup in between.

#[cfg(feature = "host")]
pub mod host;
#[cfg(feature = "host")]
pub use host::Thread;
#[cfg(feature = "host")]
pub(crate) use host::{current, current_kind, idle, irq_lock, irq_unlock, ready, reschedule, swap};

#[cfg(not(feature = "host"))]
mod port;
#[cfg(not(feature = "host"))]
pub use port::Thread;
#[cfg(not(feature = "host"))]
pub(crate) use port::{current, current_kind, idle, irq_lock, irq_unlock, ready, reschedule, swap};
