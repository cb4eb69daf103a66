// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! The queue of fibers blocked on a kernel object.
//!
//! Fibers are woken strictly in the order they arrived.  No priority reordering is done here.

use alloc::collections::VecDeque;
use core::ptr::NonNull;

use super::context::ResumeSlot;

pub(crate) struct WaitQueue<T> {
    waiters: VecDeque<NonNull<ResumeSlot<T>>>,
}

impl<T> WaitQueue<T> {
    pub(crate) const fn new() -> WaitQueue<T> {
        WaitQueue { waiters: VecDeque::new() }
    }

    /// Add a blocked fiber at the back.
    pub(crate) fn insert(&mut self, slot: NonNull<ResumeSlot<T>>) {
        self.waiters.push_back(slot);
    }

    /// Remove the fiber that has waited longest.
    pub(crate) fn remove_oldest(&mut self) -> Option<NonNull<ResumeSlot<T>>> {
        self.waiters.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}
