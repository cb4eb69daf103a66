// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! FIFO behavior across fibers, tasks and interrupt handlers.

mod common;

use std::collections::HashSet;

use nanokernel::host::{run_isr, spawn_fiber, spawn_task};
use nanokernel::sync::{Arc, Fifo, ObjectState};

use common::{init_logger, wait_until};

#[test]
fn fiber_waits_for_task_put() {
    init_logger();
    let fifo = Arc::new(Fifo::new());
    fifo.init();

    let consumer = {
        let fifo = fifo.clone();
        spawn_fiber("consumer", move || fifo.get_wait_fiber()).unwrap()
    };
    wait_until("fiber to block", || fifo.state() == ObjectState::HasWaiters(1));

    fifo.put_task('Y');
    assert_eq!(consumer.join().unwrap(), 'Y');
    assert_eq!(fifo.state(), ObjectState::Empty);
}

#[test]
fn handoff_goes_to_the_blocked_fiber() {
    init_logger();
    let fifo = Arc::new(Fifo::new());

    let consumer = {
        let fifo = fifo.clone();
        spawn_fiber("consumer", move || fifo.get_wait()).unwrap()
    };
    wait_until("fiber to block", || fifo.state() == ObjectState::HasWaiters(1));

    // Given back to back, before the fiber has had any chance to run.
    fifo.put_fiber("first");
    fifo.put_fiber("second");

    assert_eq!(consumer.join().unwrap(), "first");
    assert_eq!(fifo.get(), Some("second"));
    assert_eq!(fifo.get(), None);
}

#[test]
fn waiters_wake_in_arrival_order() {
    init_logger();
    let fifo = Arc::new(Fifo::new());

    let mut consumers = Vec::new();
    for i in 0..4 {
        let handle = {
            let fifo = fifo.clone();
            spawn_fiber(&format!("consumer-{}", i), move || fifo.get_wait_fiber()).unwrap()
        };
        wait_until("fiber to block", || fifo.state() == ObjectState::HasWaiters(i + 1));
        consumers.push(handle);
    }

    for value in 0..4 {
        fifo.put(value);
    }

    let got: Vec<usize> = consumers.into_iter().map(|c| c.join().unwrap()).collect();
    assert_eq!(got, [0, 1, 2, 3]);
    assert_eq!(fifo.state(), ObjectState::Empty);
}

#[test]
fn tasks_put_in_order() {
    init_logger();
    let fifo = Arc::new(Fifo::new());

    for i in 1..=3 {
        let fifo = fifo.clone();
        spawn_task(&format!("producer-{}", i), move || fifo.put(i))
            .unwrap()
            .join()
            .unwrap();
    }

    assert_eq!(fifo.state(), ObjectState::HasData(3));
    assert_eq!(fifo.get(), Some(1));
    assert_eq!(fifo.get(), Some(2));
    assert_eq!(fifo.get(), Some(3));
    assert_eq!(fifo.get(), None);
}

#[test]
fn isr_put_wakes_fiber() {
    init_logger();
    let fifo = Arc::new(Fifo::new());

    let consumer = {
        let fifo = fifo.clone();
        spawn_fiber("consumer", move || fifo.get_wait()).unwrap()
    };
    wait_until("fiber to block", || fifo.state() == ObjectState::HasWaiters(1));

    run_isr(|| fifo.put(42u32));
    assert_eq!(consumer.join().unwrap(), 42);
}

#[test]
fn task_polls_until_data() {
    init_logger();
    let fifo = Arc::new(Fifo::new());

    let consumer = {
        let fifo = fifo.clone();
        spawn_task("poller", move || fifo.get_wait()).unwrap()
    };
    // A polling task never shows up as a waiter.
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(fifo.state(), ObjectState::Empty);

    fifo.put(7u8);
    assert_eq!(consumer.join().unwrap(), 7);
    assert_eq!(fifo.state(), ObjectState::Empty);
}

#[test]
fn put_list_serves_waiters_first() {
    init_logger();
    let fifo = Arc::new(Fifo::new());

    let mut consumers = Vec::new();
    for i in 0..2 {
        let handle = {
            let fifo = fifo.clone();
            spawn_fiber(&format!("consumer-{}", i), move || fifo.get_wait_fiber()).unwrap()
        };
        wait_until("fiber to block", || fifo.state() == ObjectState::HasWaiters(i + 1));
        consumers.push(handle);
    }

    fifo.put_list(vec![10, 11, 12, 13]);

    let got: Vec<i32> = consumers.into_iter().map(|c| c.join().unwrap()).collect();
    assert_eq!(got, [10, 11]);
    assert_eq!(fifo.state(), ObjectState::HasData(2));
    assert_eq!(fifo.peek_head(), Some(12));
    assert_eq!(fifo.peek_tail(), Some(13));
    assert_eq!(fifo.get(), Some(12));
    assert_eq!(fifo.get(), Some(13));
}

#[test]
fn nothing_lost_or_duplicated() {
    init_logger();
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 250;
    const CONSUMERS: usize = 5;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER;

    let fifo = Arc::new(Fifo::new());

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|i| {
            let fifo = fifo.clone();
            let take = move || {
                (0..TOTAL / CONSUMERS).map(|_| fifo.get_wait()).collect::<Vec<usize>>()
            };
            // Mix blocking fibers with polling tasks.
            if i % 2 == 0 {
                spawn_fiber(&format!("consumer-{}", i), take).unwrap()
            } else {
                spawn_task(&format!("consumer-{}", i), take).unwrap()
            }
        })
        .collect();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let fifo = fifo.clone();
            let give = move || {
                for n in 0..PER_PRODUCER {
                    let value = p * PER_PRODUCER + n;
                    match n % 3 {
                        0 => fifo.put(value),
                        1 => run_isr(|| fifo.put(value)),
                        _ => fifo.put_list([value]),
                    }
                }
            };
            if p % 2 == 0 {
                spawn_fiber(&format!("producer-{}", p), give).unwrap()
            } else {
                spawn_task(&format!("producer-{}", p), give).unwrap()
            }
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut seen = HashSet::new();
    for consumer in consumers {
        let got = consumer.join().unwrap();
        // Each producer's values reach any one consumer in the order they were given.
        for p in 0..PRODUCERS {
            let mine: Vec<_> = got.iter().filter(|v| **v / PER_PRODUCER == p).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
        for value in got {
            assert!(seen.insert(value), "value {} delivered twice", value);
        }
    }
    assert_eq!(seen.len(), TOTAL);
    assert_eq!(fifo.state(), ObjectState::Empty);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "fiber wait called outside a fiber")]
fn fiber_wait_from_task_is_caught() {
    let fifo: Fifo<u32> = Fifo::new();
    fifo.get_wait_fiber();
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "blocking wait called from an interrupt")]
fn task_wait_from_isr_is_caught() {
    let fifo: Fifo<u32> = Fifo::new();
    run_isr(|| fifo.get_wait_task());
}
