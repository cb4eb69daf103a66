// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! # Nanokernel synchronization objects
//!
//! This crate provides the data-passing objects of a small single-CPU kernel: FIFOs, LIFOs,
//! stacks and semaphores.  They can be used from three kinds of context:
//!
//! - **Interrupt handlers**, which run to completion and can never block.
//! - **Fibers**, which are scheduled cooperatively and can suspend themselves waiting on an
//!   object.
//! - **Tasks**, which are preemptible.  A task can not wait on an object the way a fiber does, so
//!   the waiting operations poll, idling between checks, when called from a task.
//!
//! Every object is built on the same primitive: a single signed count that either says how many
//! values are queued or how many fibers are waiting, together with storage that holds one or the
//! other.  A value given while a fiber waits is handed directly to that fiber, which wakes up
//! already holding it.  The only lock is masking interrupts, which is enough on a single CPU, and
//! every masked region is short and constant time.
//!
//! # Using the objects
//!
//! Objects can be placed directly in statics, as their constructors are `const`:
//!
//! ```ignore
//! use nanokernel::sync::Fifo;
//!
//! static EVENTS: Fifo<u32> = Fifo::new();
//!
//! fn button_isr() {
//!     EVENTS.put_isr(BUTTON);
//! }
//!
//! fn ui_fiber() -> ! {
//!     loop {
//!         handle(EVENTS.get_wait_fiber());
//!     }
//! }
//! ```
//!
//! Or declared with [`kobj_define!`], which tracks initialization.  See [`object`].
//!
//! # Backends
//!
//! The kernel services the objects rely on come from a backend.  With the default `host` feature,
//! fibers and tasks are OS threads (see [`host`]).  Without it, the board port provides them as C
//! functions, including the interrupt mask, which this crate registers as the `critical-section`
//! implementation.
//!
//! # Kconfig settings
//!
//! The build reads a Kconfig `.config` file, named by `DOTCONFIG` or defaulting to the crate's
//! `nanokernel.conf`.  Boolean settings are available as `#[cfg(CONFIG_...)]`, and all settings
//! as constants in the [`kconfig`] module.

#![cfg_attr(not(test), no_std)]
#![allow(unexpected_cfgs)]

extern crate alloc;

#[cfg(all(feature = "host", not(test)))]
extern crate std;

pub mod error;
pub mod fifo;
mod handoff;
pub mod lifo;
pub mod object;
pub mod sem;
pub mod stack;
pub mod sync;
pub mod sys;
pub mod time;

pub use error::{Error, Result};

#[cfg(feature = "host")]
pub use sys::arch::host;

// Bring in the generated kconfig module
include!(concat!(env!("OUT_DIR"), "/kconfig.rs"));

// Ensure that the kernel is configured.
#[cfg(not(CONFIG_NANOKERNEL))]
compile_error!("CONFIG_NANOKERNEL must be set to build the nanokernel");

/// On a port, hand panics to the kernel's fatal error path.
#[cfg(not(any(feature = "host", test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    let _ = info;

    unsafe {
        extern "C" {
            fn nano_panic_wrap() -> !;
        }
        nano_panic_wrap();
    }
}
