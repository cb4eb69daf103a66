// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Spin until `cond` holds, failing the test after a few seconds.
pub fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        thread::sleep(Duration::from_millis(1));
    }
}
