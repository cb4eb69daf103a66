// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Hosted backend.
//!
//! Fibers and tasks are OS threads, started with [`spawn_fiber`] and [`spawn_task`].  Any other
//! thread, including the one running a test, counts as a task.  An interrupt handler is simulated
//! by [`run_isr`], which marks the calling thread as interrupt context while the handler runs.
//!
//! Interrupt locking is a single global lock, reentrant on the thread that holds it.  A suspended
//! fiber parks its thread until it is readied.  Each thread carries a "readied" flag, so a fiber
//! that is readied before it actually parks does not miss the wakeup.
//!
//! This models what the kernel objects do, not how long it takes: the threads really run in
//! parallel outside of the interrupt lock, and a fiber is not protected from tasks the way it is on
//! a single CPU.

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use std::io;
use std::string::String;
use std::thread::{self, JoinHandle};

use critical_section::RawRestoreState;

use crate::sync::Arc;
use crate::sys::context::ContextKind;
use crate::sys::irq::IrqKey;
use crate::time;

struct HostCriticalSection;
critical_section::set_impl!(HostCriticalSection);

/// Token of the thread holding the interrupt lock, or zero.
static LOCK_OWNER: AtomicUsize = AtomicUsize::new(0);
static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

const RESTORE_UNLOCK: RawRestoreState = 0;
const RESTORE_NESTED: RawRestoreState = 1;

std::thread_local! {
    static TOKEN: usize = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    static KIND: Cell<ContextKind> = const { Cell::new(ContextKind::Task) };
    static CURRENT: Thread = Thread::for_current();
}

unsafe impl critical_section::Impl for HostCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        irq_lock()
    }

    unsafe fn release(token: RawRestoreState) {
        irq_unlock(token)
    }
}

pub(crate) unsafe fn irq_lock() -> RawRestoreState {
    let me = TOKEN.with(|t| *t);
    if LOCK_OWNER.load(Ordering::Acquire) == me {
        return RESTORE_NESTED;
    }
    while LOCK_OWNER
        .compare_exchange_weak(0, me, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        thread::yield_now();
    }
    RESTORE_UNLOCK
}

pub(crate) unsafe fn irq_unlock(token: RawRestoreState) {
    if token == RESTORE_UNLOCK {
        LOCK_OWNER.store(0, Ordering::Release);
    }
}

struct ThreadState {
    readied: AtomicBool,
    handle: thread::Thread,
}

/// Handle to a fiber or task.
#[derive(Clone)]
pub struct Thread {
    state: Arc<ThreadState>,
}

impl Thread {
    fn for_current() -> Thread {
        Thread {
            state: Arc::new(ThreadState {
                readied: AtomicBool::new(false),
                handle: thread::current(),
            }),
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread {:?}", self.state.handle.name().unwrap_or("<unnamed>"))
    }
}

pub(crate) fn current() -> Thread {
    CURRENT.with(Thread::clone)
}

pub(crate) fn current_kind() -> ContextKind {
    KIND.with(Cell::get)
}

pub(crate) fn ready(thread: &Thread) {
    thread.state.readied.store(true, Ordering::Release);
    thread.state.handle.unpark();
}

fn suspend() {
    let me = current();
    while !me.state.readied.swap(false, Ordering::Acquire) {
        thread::park();
    }
}

/// Release the lock, then park until readied.
///
/// The two steps are not atomic here.  A wakeup that lands between them only sets the readied
/// flag, and `suspend` returns straight away.
pub(crate) fn swap(key: IrqKey) {
    let state = key.into_raw();
    debug_assert_eq!(state, RESTORE_UNLOCK, "fiber blocked inside a nested interrupt lock");
    // SAFETY: The key came from `irq_lock` and is consumed here.
    unsafe { irq_unlock(state) };
    suspend();
}

pub(crate) fn reschedule(key: IrqKey) {
    // SAFETY: As for `swap`.
    unsafe { irq_unlock(key.into_raw()) };
    thread::yield_now();
}

pub(crate) fn idle() {
    thread::sleep(std::time::Duration::from_micros(time::idle_backoff().to_micros()));
}

fn spawn<F, R>(name: &str, kind: ContextKind, f: F) -> io::Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    log::debug!("spawning {:?} {:?}", kind, name);
    thread::Builder::new()
        .name(String::from(name))
        .spawn(move || {
            KIND.with(|k| k.set(kind));
            f()
        })
}

/// Start a fiber running `f`.
pub fn spawn_fiber<F, R>(name: &str, f: F) -> io::Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    spawn(name, ContextKind::Fiber, f)
}

/// Start a task running `f`.
pub fn spawn_task<F, R>(name: &str, f: F) -> io::Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    spawn(name, ContextKind::Task, f)
}

/// Run `handler` as if it were an interrupt handler that interrupted the calling context.
pub fn run_isr<F, R>(handler: F) -> R
where
    F: FnOnce() -> R,
{
    struct Restore(ContextKind);

    impl Drop for Restore {
        fn drop(&mut self) {
            KIND.with(|k| k.set(self.0));
        }
    }

    let _restore = Restore(KIND.with(|k| k.replace(ContextKind::Isr)));
    handler()
}
