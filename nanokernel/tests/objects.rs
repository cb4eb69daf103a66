// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Statically declared kernel objects.

mod common;

use nanokernel::fifo::StaticFifo;
use nanokernel::host::spawn_fiber;
use nanokernel::kobj_define;
use nanokernel::object::trace::{self, ObjectKind};
use nanokernel::sem::StaticSemaphore;
use nanokernel::stack::StaticStack;
use nanokernel::sync::ObjectState;
use nanokernel::Error;

use common::{init_logger, wait_until};

kobj_define! {
    static EVENTS: StaticFifo<u32>;
    static FORKS: [StaticSemaphore; 3];
    static SCRATCH: StaticStack<u8, 2>;
    static UNUSED: StaticFifo<()>;
}

#[test]
fn static_fifo() {
    init_logger();
    let before = trace::initialized(ObjectKind::Fifo);
    EVENTS.init();
    let events = EVENTS.get();
    if trace::enabled() {
        assert!(trace::initialized(ObjectKind::Fifo) > before);
    }

    let consumer = spawn_fiber("events", move || events.get_wait()).unwrap();
    wait_until("fiber to block", || events.state() == ObjectState::HasWaiters(1));
    events.put(17);
    assert_eq!(consumer.join().unwrap(), 17);
    assert_eq!(format!("{:?}", EVENTS), "Fifo Empty");
}

#[test]
fn static_semaphores() {
    init_logger();
    let before = trace::initialized(ObjectKind::Semaphore);
    for fork in &FORKS {
        fork.init(1, 1).unwrap();
    }
    if trace::enabled() {
        assert!(trace::initialized(ObjectKind::Semaphore) >= before + FORKS.len());
    }

    for fork in &FORKS {
        let fork = fork.get();
        assert!(fork.take());
        assert!(!fork.take());
        fork.give();
        assert_eq!(fork.count(), 1);
    }
}

#[test]
fn static_stack() {
    init_logger();
    SCRATCH.init();
    let scratch = SCRATCH.get();
    assert_eq!(scratch.capacity(), 2);
    scratch.push(1).unwrap();
    scratch.push(2).unwrap();
    assert_eq!(scratch.push(3), Err(Error::ENOMEM));
    assert_eq!(scratch.pop(), Some(2));
}

#[test]
fn uninitialized_object() {
    assert!(!UNUSED.is_initialized());
    assert_eq!(format!("{:?}", UNUSED), "<uninitialized>");
    let result = std::panic::catch_unwind(|| UNUSED.get().get());
    assert!(result.is_err());
}
