//! Payload ownership checked against the real allocator
//!
//! A counting global allocator records, per thread, how many allocations
//! were made and how many bytes are live. Tests run on separate threads, so
//! the counters only see the test's own work.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use lumen_core::factory::{self, GammaTable};
use lumen_core::{
    CommandError, CommandQueue, Completion, Job, Ownership, PanelConfig, Payload, Readback,
    Scheduler,
};

struct Counting;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|n| n.set(n.get() + 1));
        let _ = LIVE_BYTES.try_with(|n| n.set(n.get() + layout.size() as isize));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = LIVE_BYTES.try_with(|n| n.set(n.get() - layout.size() as isize));
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn allocations() -> usize {
    ALLOCATIONS.with(|n| n.get())
}

fn live_bytes() -> isize {
    LIVE_BYTES.with(|n| n.get())
}

/// Run `f`, returning its result and the number of allocations it made
fn counted<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let before = allocations();
    let result = f();
    (result, allocations() - before)
}

#[test]
fn inline_commands_never_allocate() {
    let (commands, allocs) = counted(|| {
        [
            factory::nop(),
            factory::swreset(),
            factory::dispon(),
            factory::caset(0, 239),
            factory::raset(0, 239),
            factory::colmod(Default::default()),
            factory::porctrl(&Default::default()),
            factory::pwctrl1(2, 2, 1),
            factory::vdvvrhen(true),
            factory::rddid(),
        ]
    });
    assert_eq!(allocs, 0);
    assert!(commands.iter().all(|c| c.ownership() == Ownership::Inline));
}

#[test]
fn small_caller_buffer_is_copied_without_allocating() {
    let source = [0x11u8; 8];
    let (command, allocs) = counted(|| factory::ramwr(&source));
    assert_eq!(allocs, 0);
    assert_eq!(command.ownership(), Ownership::Inline);
}

#[test]
fn large_memory_write_borrows_without_allocating() {
    let frame = vec![0x07u8; 4096];
    let (command, allocs) = counted(|| factory::ramwr(&frame));
    assert_eq!(allocs, 0);
    assert_eq!(command.ownership(), Ownership::Caller);
    drop(command);
    assert_eq!(frame.len(), 4096);
}

#[test]
fn gamma_payload_is_allocated_once_and_freed_once() {
    let baseline = live_bytes();
    let (command, allocs) = counted(|| factory::pvgamctrl(&GammaTable::POSITIVE));
    let command = command.unwrap();
    assert_eq!(allocs, 1);
    assert_eq!(command.ownership(), Ownership::System);
    assert_eq!(live_bytes() - baseline, 14);

    drop(command);
    assert_eq!(live_bytes(), baseline);
}

#[test]
fn dropping_a_job_releases_its_payload() {
    let baseline = live_bytes();
    let command = factory::nvgamctrl(&GammaTable::NEGATIVE).unwrap();
    let job = Job::new(command, 0u8, |_| 1u8);
    assert!(live_bytes() > baseline);

    drop(job);
    assert_eq!(live_bytes(), baseline);
}

#[test]
fn failed_allocation_leaves_nothing_behind() {
    let baseline = live_bytes();
    let result = Payload::acquire(usize::MAX);
    assert_eq!(result, Err(CommandError::Allocation { len: usize::MAX }));
    assert_eq!(live_bytes(), baseline);
}

#[test]
fn copied_memory_write_owns_its_bytes() {
    let baseline = live_bytes();
    let pixels = [0xE0u8; 300];
    let command = factory::ramwr_copied(&pixels).unwrap();
    assert_eq!(live_bytes() - baseline, 300);
    drop(command);
    assert_eq!(live_bytes(), baseline);
}

#[test]
fn queued_init_sequence_frees_payloads_after_execution() {
    let queue: CommandQueue<'_, NoopRawMutex, ()> = CommandQueue::new();
    let mut scheduler = queue.scheduler();
    let baseline = live_bytes();

    let (batch, allocs) = counted(|| PanelConfig::default().init_sequence().unwrap());
    // Only the two gamma tables exceed the inline capacity
    assert_eq!(allocs, 2);
    let ticket = scheduler.schedule(batch).unwrap();
    assert_eq!(live_bytes() - baseline, 28);

    // Stand-in transport: take each submission and drop it once "executed"
    let mut last_ticket = None;
    while let Some(submission) = queue.try_receive() {
        if submission.last {
            last_ticket = Some(submission.ticket);
        }
        drop(submission);
    }
    assert_eq!(live_bytes(), baseline);

    let id = last_ticket.unwrap();
    block_on(queue.complete(Completion {
        ticket: id,
        outcome: Ok(Readback::new()),
    }));
    assert!(block_on(scheduler.wait(ticket)).is_ok());
}
