// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Nanokernel 'sys' module.
//!
//! The kernel objects in this crate are built from a handful of lower level services: a way to
//! lock out interrupts, a way to find out what kind of context is running, a way to suspend a
//! fiber until something readies it, and a queue to keep suspended fibers in.  This module holds
//! thin wrappers around those services, so that the objects themselves never need to know which
//! backend provides them.
//!
//! Two backends exist under [`arch`]:
//!
//! - `host`, enabled by the `host` feature, maps fibers and tasks onto OS threads.  This is what
//!   the tests and samples use.
//! - `port`, used otherwise, forwards to `extern "C"` hooks supplied by the board port.

pub mod arch;
pub mod context;
pub(crate) mod irq;
pub(crate) mod wait_q;

pub use context::{current_kind, ContextKind};

/// Low-power wait.
///
/// Used by the polling task forms of the blocking operations between checks.  On a real port
/// this halts the CPU until the next interrupt; on the host it sleeps for the configured
/// backoff.
#[inline]
pub fn idle() {
    arch::idle();
}
