// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! # Semaphore implementation of ForkSync
//!
//! Each fork is a binary semaphore.  A philosopher waiting on a fork is blocked in that fork's
//! wait queue, and releasing the fork hands it straight to the philosopher that has waited
//! longest, so there is no need to wake everyone.

use nanokernel::kobj_define;
use nanokernel::sem::StaticSemaphore;
use nanokernel::sync::Semaphore;

use crate::{ForkSync, NUM_PHIL};

#[derive(Debug)]
pub struct SemSync {
    forks: [&'static Semaphore; NUM_PHIL],
}

impl SemSync {
    pub fn new() -> nanokernel::Result<SemSync> {
        for fork in &FORKS {
            fork.init(1, 1)?;
        }
        let forks = core::array::from_fn(|i| FORKS[i].get());
        Ok(SemSync { forks })
    }
}

impl ForkSync for SemSync {
    fn take(&self, index: usize) {
        self.forks[index].take_wait();
    }

    fn release(&self, index: usize) {
        self.forks[index].give();
    }
}

kobj_define! {
    static FORKS: [StaticSemaphore; NUM_PHIL];
}
