// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Synchronization objects.
//!
//! All of the nanokernel's data-passing objects share a single design: a signed count that is
//! either the number of queued values or, when negative, the number of blocked fibers, and a
//! direct handoff of a value into a blocked fiber instead of waking it to poll.
//!
//! - [`Fifo`] delivers values oldest first.
//! - [`Lifo`] delivers values newest first.
//! - [`Stack`] is a bounded [`Lifo`] for plain values.
//! - [`Semaphore`] passes counts instead of values.
//!
//! Each blocking or waking operation comes in a form for each kind of context
//! (`_isr`, `_fiber`, `_task`), and a form without a suffix that checks the current context kind
//! and calls the right one.  Code that always runs in a known kind of context should prefer the
//! specific forms.

pub mod atomic {
    //! Re-export portable atomic.
    //!
    //! Although `core` contains a
    //! [`sync::atomic`](https://doc.rust-lang.org/stable/core/sync/atomic/index.html) module,
    //! these are dependent on the target having atomic instructions, and the types are missing
    //! when the platform cannot support them.  In the Rust-embedded world, this is handled by the
    //! [`portable-atomic`](https://crates.io/crates/portable-atomic) crate, which will either just
    //! re-export the types from core, or provide an implementation built on critical sections
    //! when those aren't available.

    pub use portable_atomic::*;
}

pub use portable_atomic_util::Arc;

pub use crate::fifo::Fifo;
pub use crate::handoff::ObjectState;
pub use crate::lifo::Lifo;
pub use crate::sem::Semaphore;
pub use crate::stack::Stack;
