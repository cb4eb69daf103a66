// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! # Kernel objects
//!
//! Kernel objects are normally allocated statically, and initialized once at startup, before any
//! context uses them.  This module provides the wrapper used for such statics.
//!
//! A static kernel object is declared with [`kobj_define!`](crate::kobj_define), initialized with
//! its `init` method, and then used through the reference returned by `get`:
//!
//! ```ignore
//! kobj_define! {
//!     static RX: StaticFifo<Packet>;
//!     static FORKS: [StaticSemaphore; 5];
//! }
//!
//! RX.init();
//! let rx = RX.get();
//!
//! let forks = FORKS.each_ref().map(|fork| {
//!     fork.init(1, 1).unwrap();
//!     fork.get()
//! });
//! ```
//!
//! Initializing an object twice, or using it before it is initialized, panics.

use core::fmt;

use crate::sync::atomic::{AtomicUsize, Ordering};

/// A kernel object that has not been initialized yet.
pub const KOBJ_UNINITIALIZED: usize = 0;

/// A kernel object whose initialization is in progress.
pub const KOBJ_INITING: usize = 1;

/// A kernel object ready for use.
pub const KOBJ_INITIALIZED: usize = 2;

/// A statically allocated kernel object.
///
/// The object itself is built by a `const` constructor, so this can be placed in a `static`.  The
/// wrapper only tracks whether `init` has been run.
pub struct StaticKernelObject<T> {
    value: T,
    init: AtomicUsize,
}

impl<T> StaticKernelObject<T> {
    /// Wrap an object.  Used by `kobj_define!`.
    pub const fn new(value: T) -> StaticKernelObject<T> {
        StaticKernelObject {
            value,
            init: AtomicUsize::new(KOBJ_UNINITIALIZED),
        }
    }

    /// Run the object's initializer, exactly once.
    pub fn init_help<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
        if let Err(_) = self.init.compare_exchange(
            KOBJ_UNINITIALIZED,
            KOBJ_INITING,
            Ordering::AcqRel,
            Ordering::Acquire)
        {
            panic!("Duplicate kernel object initialization");
        }
        let result = f(&self.value);
        self.init.store(KOBJ_INITIALIZED, Ordering::Release);
        result
    }

    /// Get the initialized object.
    pub fn get(&self) -> &T {
        if self.init.load(Ordering::Acquire) != KOBJ_INITIALIZED {
            panic!("Use of uninitialized kernel object");
        }
        &self.value
    }

    /// Whether `init` has completed.
    pub fn is_initialized(&self) -> bool {
        self.init.load(Ordering::Acquire) == KOBJ_INITIALIZED
    }
}

impl<T: fmt::Debug> fmt::Debug for StaticKernelObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initialized() {
            write!(f, "{:?}", self.value)
        } else {
            write!(f, "<uninitialized>")
        }
    }
}

/// The uninitialized value of a static kernel object type, used by `kobj_define!`.
pub trait KobjInit {
    const UNINIT: Self;
}

/// Declare static kernel objects.
///
/// Each declaration names one of the static object types, or an array of them.  The objects start
/// uninitialized.
#[macro_export]
macro_rules! kobj_define {
    ($v:vis static $name:ident: [$type:ty; $size:expr]; $($rest:tt)*) => {
        $v static $name: [$type; $size] =
            [const { <$type as $crate::object::KobjInit>::UNINIT }; $size];
        $crate::kobj_define!($($rest)*);
    };
    ($v:vis static $name:ident: $type:ty; $($rest:tt)*) => {
        $v static $name: $type = <$type as $crate::object::KobjInit>::UNINIT;
        $crate::kobj_define!($($rest)*);
    };
    () => {};
}

/// Object tracing.
///
/// With `CONFIG_OBJECT_TRACING` enabled, every initialization of a kernel object is counted by
/// kind, and logged at trace level.  Without it, nothing is recorded and the counts stay at zero.
pub mod trace {
    use crate::sync::atomic::{AtomicUsize, Ordering};

    /// The kinds of object that are traced.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ObjectKind {
        Fifo,
        Lifo,
        Stack,
        Semaphore,
    }

    const NUM_KINDS: usize = 4;

    static INITIALIZED: [AtomicUsize; NUM_KINDS] = [const { AtomicUsize::new(0) }; NUM_KINDS];

    #[allow(unused_variables)]
    pub(crate) fn record_init(kind: ObjectKind, addr: *const ()) {
        #[cfg(CONFIG_OBJECT_TRACING)]
        {
            INITIALIZED[kind as usize].fetch_add(1, Ordering::Relaxed);
            log::trace!("{:?} {:p} initialized", kind, addr);
        }
    }

    /// Whether initializations are being counted.
    pub const fn enabled() -> bool {
        cfg!(CONFIG_OBJECT_TRACING)
    }

    /// How many objects of this kind have been initialized.
    pub fn initialized(kind: ObjectKind) -> usize {
        INITIALIZED[kind as usize].load(Ordering::Relaxed)
    }
}
