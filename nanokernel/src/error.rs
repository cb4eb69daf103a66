// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Kernel errors.
//!
//! The kernel reports failures with errno values.  Most kernel object operations cannot fail at
//! all; the ones that can return a [`Result`] carrying one of the values here.

use core::fmt;

/// An errno value reported by a kernel operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Error(pub u32);

impl Error {
    /// Out of space, such as pushing onto a full stack.
    pub const ENOMEM: Error = Error(12);
    /// An argument was out of range.
    pub const EINVAL: Error = Error(22);

    fn name(&self) -> Option<&'static str> {
        match *self {
            Error::ENOMEM => Some("ENOMEM"),
            Error::EINVAL => Some("EINVAL"),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Error({})", name),
            None => write!(f, "Error({})", self.0),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "nanokernel error: {} ({})", name, self.0),
            None => write!(f, "nanokernel error: errno {}", self.0),
        }
    }
}

#[cfg(feature = "host")]
impl std::error::Error for Error {}

/// Wraps a value with a possible kernel error.
pub type Result<T> = core::result::Result<T, Error>;
