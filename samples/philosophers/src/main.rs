// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Dining philosophers.
//!
//! Each philosopher is a fiber, and each fork a semaphore.  Philosophers report every meal on a
//! FIFO, which a task reads to keep the statistics.  Run with `RUST_LOG=debug` to watch each
//! philosopher.

use std::process::ExitCode;
use std::time::Duration;

use log::{debug, error, info};
use nanokernel::fifo::StaticFifo;
use nanokernel::host::{spawn_fiber, spawn_task};
use nanokernel::kobj_define;

mod semsync;

use semsync::SemSync;

/// How many philosophers.  There will be the same number of forks.
pub const NUM_PHIL: usize = 6;

/// How many meals each philosopher eats before leaving the table.
const MEALS: usize = 20;

/// A way to coordinate the forks between the philosophers.
pub trait ForkSync: core::fmt::Debug + Sync + Send {
    /// Take the given fork, waiting until it is available.
    fn take(&self, index: usize);

    /// Release the given fork.  Must only be called by the philosopher holding it.
    fn release(&self, index: usize);
}

/// One meal, as reported to the statistics task.
#[derive(Debug)]
struct Meal {
    phil: usize,
    /// `None` when the philosopher leaves the table.
    course: Option<usize>,
}

kobj_define! {
    static MEAL_LOG: StaticFifo<Meal>;
}

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting {} philosophers", NUM_PHIL);

    let syncer: &'static SemSync = match SemSync::new() {
        Ok(syncer) => Box::leak(Box::new(syncer)),
        Err(e) => {
            error!("Unable to set up forks: {}", e);
            return ExitCode::FAILURE;
        }
    };
    MEAL_LOG.init();

    let stats = match spawn_task("stats", stats_task) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Unable to start statistics task: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut phils = Vec::new();
    for i in 0..NUM_PHIL {
        let name = format!("phil-{}", i);
        match spawn_fiber(&name, move || phil_fiber(i, syncer)) {
            Ok(handle) => phils.push(handle),
            Err(e) => {
                error!("Unable to start {}: {}", name, e);
                return ExitCode::FAILURE;
            }
        }
    }

    for phil in phils {
        if phil.join().is_err() {
            error!("A philosopher panicked");
            return ExitCode::FAILURE;
        }
    }

    match stats.join() {
        Ok(counts) if counts.iter().all(|&n| n == MEALS) => {
            info!("All philosophers ate {} meals: {:?}", MEALS, counts);
            ExitCode::SUCCESS
        }
        Ok(counts) => {
            error!("Meal counts are wrong: {:?}", counts);
            ExitCode::FAILURE
        }
        Err(_) => {
            error!("The statistics task panicked");
            ExitCode::FAILURE
        }
    }
}

fn phil_fiber(n: usize, forks: &dyn ForkSync) {
    debug!("Child {} started", n);

    // Always pick up the lower numbered fork first, so that the last philosopher reaches across
    // the other way and the table cannot deadlock.
    let (first, second) = if n == NUM_PHIL - 1 { (0, n) } else { (n, n + 1) };

    let meal_log = MEAL_LOG.get();
    for course in 0..MEALS {
        forks.take(first);
        forks.take(second);

        debug!("Child {} eating course {}", n, course);
        meal_log.put(Meal { phil: n, course: Some(course) });
        std::thread::sleep(Duration::from_micros(200 + 50 * n as u64));

        forks.release(second);
        forks.release(first);

        std::thread::sleep(Duration::from_micros(100));
    }

    meal_log.put(Meal { phil: n, course: None });
    debug!("Child {} done", n);
}

/// Count meals until every philosopher has left.
fn stats_task() -> [usize; NUM_PHIL] {
    let meal_log = MEAL_LOG.get();
    let mut counts = [0; NUM_PHIL];
    let mut seated = NUM_PHIL;

    while seated > 0 {
        match meal_log.get_wait() {
            Meal { phil, course: Some(course) } => {
                if course != counts[phil] {
                    error!("Philosopher {} ate course {} out of order", phil, course);
                }
                counts[phil] += 1;
            }
            Meal { phil, course: None } => {
                info!("Philosopher {} left after {} meals", phil, counts[phil]);
                seated -= 1;
            }
        }
    }
    counts
}
