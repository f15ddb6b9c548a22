//! Runner behavior against a recording bus

use std::vec::Vec;

use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use lumen_core::factory;
use lumen_core::{
    Batch, CommandQueue, CompletionError, PanelConfig, Readback, Scheduler, MAX_IN_FLIGHT,
};
use lumen_drivers::BusRunner;
use lumen_hal::{DisplayBus, TransactionNature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fault;

/// Records every transfer; fails the transfer at `fail_at` once
#[derive(Default)]
struct RecordingBus {
    transfers: Vec<(TransactionNature, Vec<u8>)>,
    opened: Vec<(TransactionNature, usize)>,
    fail_at: Option<usize>,
    read_data: Vec<u8>,
}

impl RecordingBus {
    fn opcodes(&self) -> Vec<u8> {
        self.transfers
            .iter()
            .filter(|(nature, _)| *nature == TransactionNature::Command)
            .map(|(_, bytes)| bytes[0])
            .collect()
    }

    fn record(&mut self, nature: TransactionNature, bytes: &[u8]) -> Result<(), Fault> {
        if self.fail_at == Some(self.transfers.len()) {
            self.fail_at = None;
            return Err(Fault);
        }
        self.transfers.push((nature, bytes.to_vec()));
        Ok(())
    }
}

impl DisplayBus for RecordingBus {
    type Transaction = TransactionNature;
    type Error = Fault;

    fn transaction(&mut self, nature: TransactionNature, len: usize) -> TransactionNature {
        self.opened.push((nature, len));
        nature
    }

    async fn write(
        &mut self,
        transaction: &mut TransactionNature,
        data: &[u8],
    ) -> Result<(), Fault> {
        self.record(*transaction, data)
    }

    async fn read(
        &mut self,
        transaction: &mut TransactionNature,
        buf: &mut [u8],
    ) -> Result<(), Fault> {
        buf.copy_from_slice(&self.read_data[..buf.len()]);
        let bytes = buf.to_vec();
        self.record(*transaction, &bytes)
    }
}

type Queue<'a> = CommandQueue<'a, NoopRawMutex, Fault>;

#[test]
fn batch_executes_in_order_with_dc_phases() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    let batch = Batch::try_from_iter([
        factory::caset(0x0010, 0x001F),
        factory::raset(0x0020, 0x002F),
        factory::dispon(),
    ])
    .unwrap();
    let ticket = scheduler.schedule(batch).unwrap();
    assert_eq!(block_on(runner.run_pending(&queue)), 3);
    assert_eq!(block_on(scheduler.wait(ticket)), Ok(Readback::new()));

    let bus = runner.bus();
    assert_eq!(
        bus.transfers,
        vec![
            (TransactionNature::Command, vec![0x2A]),
            (TransactionNature::DataWrite, vec![0x00, 0x10, 0x00, 0x1F]),
            (TransactionNature::Command, vec![0x2B]),
            (TransactionNature::DataWrite, vec![0x00, 0x20, 0x00, 0x2F]),
            (TransactionNature::Command, vec![0x29]),
        ]
    );
    // DISPON opens no data phase
    assert_eq!(bus.opened.len(), 5);
}

#[test]
fn batches_run_in_submission_order() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    let first = scheduler.schedule_one(factory::slpout()).unwrap();
    let second = scheduler
        .schedule(Batch::try_from_iter([factory::noron(), factory::dispon()]).unwrap())
        .unwrap();
    block_on(runner.run_pending(&queue));

    assert!(block_on(scheduler.wait(second)).is_ok());
    assert!(block_on(scheduler.wait(first)).is_ok());
    assert_eq!(runner.bus().opcodes(), vec![0x11, 0x13, 0x29]);
}

#[test]
fn failure_discards_rest_of_batch_only() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let bus = RecordingBus {
        // RASET opcode
        fail_at: Some(2),
        ..Default::default()
    };
    let mut runner = BusRunner::new(bus);

    let failing = scheduler
        .schedule(
            Batch::try_from_iter([
                factory::caset(0, 1),
                factory::raset(0, 1),
                factory::dispon(),
                factory::noron(),
            ])
            .unwrap(),
        )
        .unwrap();
    let following = scheduler.schedule_one(factory::invon()).unwrap();
    block_on(runner.run_pending(&queue));

    assert_eq!(
        block_on(scheduler.wait(failing)),
        Err(CompletionError::Transport(Fault))
    );
    assert!(block_on(scheduler.wait(following)).is_ok());

    let stats = runner.stats();
    assert_eq!(stats.executed, 2);
    assert_eq!(stats.discarded, 2);
    assert_eq!(stats.failed_batches, 1);
    // Nothing after the failure went out, except the next batch
    assert_eq!(runner.bus().opcodes(), vec![0x2A, 0x21]);
}

#[test]
fn read_returns_bytes_to_waiter() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let bus = RecordingBus {
        read_data: vec![0x85, 0x85, 0x52],
        ..Default::default()
    };
    let mut runner = BusRunner::new(bus);

    let ticket = scheduler.schedule_one(factory::rddid()).unwrap();
    block_on(runner.run_pending(&queue));
    let readback = block_on(scheduler.wait(ticket)).unwrap();
    assert_eq!(&readback[..], &[0x85, 0x85, 0x52]);
    assert_eq!(
        runner.bus().opened,
        vec![
            (TransactionNature::Command, 1),
            (TransactionNature::DataRead, 3),
        ]
    );
}

#[test]
fn borrowed_pixels_reach_the_bus_unchanged() {
    let pixels: Vec<u8> = (0..=255u8).cycle().take(480).collect();
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    let mut batch = PanelConfig::default().window(0, 0, 239, 0).unwrap();
    batch.push(factory::ramwr(&pixels)).unwrap();
    let ticket = scheduler.schedule(batch).unwrap();
    block_on(runner.run_pending(&queue));
    assert!(block_on(scheduler.wait(ticket)).is_ok());

    let (nature, bytes) = runner.bus().transfers.last().unwrap();
    assert_eq!(*nature, TransactionNature::DataWrite);
    assert_eq!(bytes, &pixels);
}

#[test]
fn empty_memory_write_sends_opcode_only() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    let ticket = scheduler.schedule_one(factory::ramwr(&[])).unwrap();
    block_on(runner.run_pending(&queue));
    assert!(block_on(scheduler.wait(ticket)).is_ok());
    assert_eq!(
        runner.bus().transfers,
        vec![(TransactionNature::Command, vec![0x2C])]
    );
}

#[test]
fn init_sequence_through_running_transport() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    let batch = PanelConfig::default().init_sequence().unwrap();
    let count = batch.len();
    let ticket = scheduler.schedule(batch).unwrap();

    let (outcome, _) = block_on(join(scheduler.wait(ticket), async {
        for _ in 0..count {
            runner.step(&queue).await;
        }
    }));
    assert!(outcome.is_ok());
    assert_eq!(runner.stats().executed as usize, count);
    assert_eq!(runner.bus().opcodes().first(), Some(&0x01));
    assert_eq!(runner.bus().opcodes().last(), Some(&0x29));
}

#[test]
fn in_flight_limit_frees_up_after_wait() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    let mut tickets = Vec::new();
    for _ in 0..MAX_IN_FLIGHT {
        tickets.push(scheduler.schedule_one(factory::nop()).unwrap());
    }
    assert!(scheduler.schedule_one(factory::nop()).is_err());

    block_on(runner.run_pending(&queue));
    let first = tickets.remove(0);
    assert!(block_on(scheduler.wait(first)).is_ok());
    let extra = scheduler.schedule_one(factory::nop()).unwrap();
    tickets.push(extra);

    block_on(runner.run_pending(&queue));
    for ticket in tickets {
        assert!(block_on(scheduler.wait(ticket)).is_ok());
    }
}

#[test]
fn dropped_tickets_do_not_exhaust_in_flight_slots() {
    let queue = Queue::new();
    let mut scheduler = queue.scheduler();
    let mut runner = BusRunner::new(RecordingBus::default());

    for _ in 0..3 * MAX_IN_FLIGHT {
        let ticket = scheduler.schedule_one(factory::nop()).unwrap();
        drop(ticket);
        block_on(runner.run_pending(&queue));
    }

    let ticket = scheduler.schedule_one(factory::dispon()).unwrap();
    block_on(runner.run_pending(&queue));
    assert!(block_on(scheduler.wait(ticket)).is_ok());
    assert_eq!(runner.stats().executed as usize, 3 * MAX_IN_FLIGHT + 1);
}
