// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Bounded stack of values.
//!
//! A [`Stack`] holds at most `capacity` values, handed out newest first.  Pushing onto a full
//! stack fails with [`Error::ENOMEM`] and leaves the stack as it was.  A push that goes straight
//! to a waiting fiber always succeeds, since the value is never stored.

use core::fmt;

use crate::error::{Error, Result};
use crate::handoff::{AfterWake, Handoff, LifoOrder, ObjectState};
use crate::object::trace::{self, ObjectKind};
use crate::object::{KobjInit, StaticKernelObject};
use crate::sys::context::{current_kind, ContextKind};

/// A bounded last in, first out stack, with direct handoff to waiting fibers.
pub struct Stack<T> {
    values: Handoff<T, LifoOrder>,
    capacity: usize,
}

impl<T> Stack<T> {
    /// Create an empty stack that can hold `capacity` values.
    pub const fn new(capacity: usize) -> Stack<T> {
        Stack { values: Handoff::new(), capacity }
    }

    /// Put the stack back in the empty state, dropping any stored values.
    pub fn init(&self) {
        self.values.reset();
        trace::record_init(ObjectKind::Stack, self as *const _ as *const ());
    }

    fn push_as(&self, value: T, after_wake: AfterWake) -> Result<()> {
        self.values.put(value, self.capacity, after_wake).map_err(|_| Error::ENOMEM)
    }

    pub fn push_isr(&self, value: T) -> Result<()> {
        self.push_as(value, AfterWake::Return)
    }

    pub fn push_fiber(&self, value: T) -> Result<()> {
        self.push_as(value, AfterWake::Return)
    }

    /// Push from a task, switching away first if that woke a fiber.
    pub fn push_task(&self, value: T) -> Result<()> {
        self.push_as(value, AfterWake::Reschedule)
    }

    pub fn push(&self, value: T) -> Result<()> {
        match current_kind() {
            ContextKind::Isr => self.push_isr(value),
            ContextKind::Fiber => self.push_fiber(value),
            ContextKind::Task => self.push_task(value),
        }
    }

    /// Pop the newest value, or `None` if the stack is empty.  Never blocks.
    pub fn pop(&self) -> Option<T> {
        self.values.get()
    }

    pub fn pop_wait_fiber(&self) -> T {
        self.values.get_wait_fiber()
    }

    pub fn pop_wait_task(&self) -> T {
        self.values.get_wait_task()
    }

    pub fn pop_wait(&self) -> T {
        match current_kind() {
            ContextKind::Task => self.pop_wait_task(),
            ContextKind::Fiber | ContextKind::Isr => self.pop_wait_fiber(),
        }
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        match self.state() {
            ObjectState::HasData(n) => n,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> ObjectState {
        self.values.state()
    }
}

impl<T> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stack {:?} of {}", self.state(), self.capacity)
    }
}

/// A statically allocated [`Stack`] of `N` values, declared with `kobj_define!`.
pub type StaticStack<T, const N: usize> = StaticKernelObject<StackOf<T, N>>;

/// A [`Stack`] whose capacity is fixed by its type, so that it can be built by `kobj_define!`.
pub struct StackOf<T, const N: usize> {
    stack: Stack<T>,
}

impl<T, const N: usize> core::ops::Deref for StackOf<T, N> {
    type Target = Stack<T>;

    fn deref(&self) -> &Stack<T> {
        &self.stack
    }
}

impl<T, const N: usize> KobjInit for StaticStack<T, N> {
    const UNINIT: Self = StaticKernelObject::new(StackOf { stack: Stack::new(N) });
}

impl<T, const N: usize> StaticStack<T, N> {
    pub fn init(&self) {
        self.init_help(|s| s.stack.init())
    }
}
