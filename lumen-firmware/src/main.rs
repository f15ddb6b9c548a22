//! Lumen - ST7789 panel demo
//!
//! Brings up an ST7789 panel on an RP2040 over SPI0 and cycles a few solid
//! colors. The panel description comes from panel.toml, validated and
//! encoded by the build script.
//!
//! Wiring:
//!
//! | Signal | GPIO |
//! |--------|------|
//! | SCK    | 18   |
//! | MOSI   | 19   |
//! | MISO   | 16   |
//! | CS     | 17   |
//! | D/C    | 20   |
//! | RESET  | 21   |
//! | BL     | 22   |

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Timer};
use embedded_alloc::LlffHeap as Heap;
use embedded_hal_bus::spi::ExclusiveDevice;
use {defmt_rtt as _, panic_probe as _};

use lumen_core::{CommandQueue, PanelConfig};
use lumen_drivers::{hard_reset, BusRunner, SpiDisplayBus};
use lumen_hal::{DisplayBus, SpiConfig};

mod display;

// Heap for command payloads and the pattern rows
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 32KB
const HEAP_SIZE: usize = 32 * 1024;

/// Panel description encoded by build.rs from panel.toml
static PANEL: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/panel.bin"));

type DisplaySpi = ExclusiveDevice<Spi<'static, SPI0, spi::Async>, Output<'static>, Delay>;
type Bus = SpiDisplayBus<DisplaySpi, Output<'static>>;
type BusError = <Bus as DisplayBus>::Error;

/// Commands on their way to the runner task
static QUEUE: CommandQueue<'static, CriticalSectionRawMutex, BusError> = CommandQueue::new();

/// Colors cycled by the test pattern
const PATTERN: [(u8, u8, u8); 4] = [
    (0xFF, 0x00, 0x00),
    (0x00, 0xFF, 0x00),
    (0x00, 0x00, 0xFF),
    (0xFF, 0xFF, 0xFF),
];

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Lumen starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let panel = load_panel();
    let (columns, rows) = panel.dimensions();
    info!("Panel: {}x{}, {}", columns, rows, panel.pixel_format);

    // SPI0 with DMA, chip select owned by the device
    let spi = Spi::new(
        p.SPI0,
        p.PIN_18,
        p.PIN_19,
        p.PIN_16,
        p.DMA_CH0,
        p.DMA_CH1,
        spi_config(&SpiConfig::ST7789),
    );
    let cs = Output::new(p.PIN_17, Level::High);
    let device = unwrap!(ExclusiveDevice::new(spi, cs, Delay));
    let dc = Output::new(p.PIN_20, Level::High);
    let mut rst = Output::new(p.PIN_21, Level::High);
    let _backlight = Output::new(p.PIN_22, Level::High);

    unwrap!(hard_reset(&mut rst, &mut Delay).await);
    info!("Panel reset");

    let runner = BusRunner::new(SpiDisplayBus::new(device, dc));
    spawner.spawn(display_task(runner)).unwrap();

    let mut scheduler = QUEUE.scheduler();
    if let Err(e) = display::bring_up(&mut scheduler, &panel).await {
        error!("Panel bring-up failed: {}", Debug2Format(&e));
    }

    match display::read_id(&mut scheduler).await {
        Ok(id) => info!("Display ID: {:02x}", id),
        Err(e) => warn!("Display ID read failed: {}", Debug2Format(&e)),
    }

    let rows = PATTERN.map(|rgb| display::solid_row(&panel, rgb));
    info!("Pattern ready, {} bytes per row", rows[0].len());

    loop {
        for row in rows {
            if let Err(e) = display::fill(&mut scheduler, &panel, row).await {
                warn!("Fill failed: {}", Debug2Format(&e));
            }
            Timer::after_secs(1).await;
        }
        trace!("Pattern cycle done");
    }
}

/// Runs queued commands on the panel bus
#[embassy_executor::task]
async fn display_task(mut runner: BusRunner<Bus>) {
    runner.run(&QUEUE).await
}

/// Decode the built-in panel description, falling back to defaults
fn load_panel() -> PanelConfig {
    match PanelConfig::from_postcard(PANEL) {
        Ok(panel) => panel,
        Err(e) => {
            warn!("Stored panel config unusable ({}), using defaults", e);
            PanelConfig::default()
        }
    }
}

/// Translate bus settings into the RP2040 SPI configuration
fn spi_config(config: &SpiConfig) -> spi::Config {
    let mut spi_config = spi::Config::default();
    spi_config.frequency = config.frequency;
    let mode = config.mode;
    spi_config.polarity = if mode.idles_high() {
        spi::Polarity::IdleHigh
    } else {
        spi::Polarity::IdleLow
    };
    spi_config.phase = if mode.samples_on_second_edge() {
        spi::Phase::CaptureOnSecondTransition
    } else {
        spi::Phase::CaptureOnFirstTransition
    };
    spi_config
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
