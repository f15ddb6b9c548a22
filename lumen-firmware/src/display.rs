//! Panel bring-up and the test pattern
//!
//! Everything here talks to the panel through a [`Scheduler`], so it does
//! not care which transport runs the commands.

use alloc::boxed::Box;
use alloc::vec::Vec;

use defmt::*;
use embassy_time::Timer;
use heapless::Deque;
use lumen_core::factory;
use lumen_core::{
    Batch, CompletionError, ConfigError, PanelConfig, PixelFormat, ScheduleError, Scheduler,
    Ticket, QUEUE_DEPTH,
};

/// Rows per memory-write batch
///
/// Two batches in flight never exceed the submission queue.
const ROWS_PER_BATCH: usize = QUEUE_DEPTH / 2;
const BATCHES_IN_FLIGHT: usize = 2;

/// Anything that can go wrong talking to the panel
#[derive(Debug)]
pub enum DisplayError<E> {
    Config(ConfigError),
    Schedule(ScheduleError),
    Completion(CompletionError<E>),
}

impl<E> From<ConfigError> for DisplayError<E> {
    fn from(e: ConfigError) -> Self {
        DisplayError::Config(e)
    }
}

impl<E> From<ScheduleError> for DisplayError<E> {
    fn from(e: ScheduleError) -> Self {
        DisplayError::Schedule(e)
    }
}

impl<E> From<CompletionError<E>> for DisplayError<E> {
    fn from(e: CompletionError<E>) -> Self {
        DisplayError::Completion(e)
    }
}

/// Wake the controller and program the panel
///
/// Reset and wake go out on their own so the controller gets its settle
/// time before the register setup.
pub async fn bring_up<S>(scheduler: &mut S, panel: &PanelConfig) -> Result<(), DisplayError<S::Error>>
where
    S: Scheduler<'static>,
{
    let ticket = scheduler.schedule_one(factory::swreset())?;
    scheduler.wait(ticket).await?;
    Timer::after_millis(PanelConfig::RESET_DELAY_MS).await;

    let ticket = scheduler.schedule_one(factory::slpout())?;
    scheduler.wait(ticket).await?;
    Timer::after_millis(PanelConfig::WAKE_DELAY_MS).await;

    let ticket = scheduler.schedule(panel.configure()?)?;
    scheduler.wait(ticket).await?;
    info!("Panel configured");
    Ok(())
}

/// Read the three RDDID bytes: manufacturer, version, module
pub async fn read_id<S>(scheduler: &mut S) -> Result<[u8; 3], DisplayError<S::Error>>
where
    S: Scheduler<'static>,
{
    let ticket = scheduler.schedule_one(factory::rddid())?;
    let readback = scheduler.wait(ticket).await?;
    let mut id = [0u8; 3];
    let len = readback.len().min(id.len());
    id[..len].copy_from_slice(&readback[..len]);
    Ok(id)
}

/// One visible row of a solid color, kept for the life of the firmware
///
/// Memory writes borrow the row, so every row of the screen is sent from
/// the same buffer without copying.
pub fn solid_row(panel: &PanelConfig, rgb: (u8, u8, u8)) -> &'static [u8] {
    let (columns, _) = panel.dimensions();
    let columns = columns as usize;
    let format = panel.pixel_format;
    let (r, g, b) = rgb;

    let mut row = Vec::with_capacity(format.bytes_for(columns));
    match format {
        PixelFormat::Rgb565 => {
            let pixel = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
            for _ in 0..columns {
                row.extend_from_slice(&pixel.to_be_bytes());
            }
        }
        PixelFormat::Rgb666 => {
            for _ in 0..columns {
                row.extend_from_slice(&[r & 0xFC, g & 0xFC, b & 0xFC]);
            }
        }
        PixelFormat::Rgb444 => {
            let (r, g, b) = (r >> 4, g >> 4, b >> 4);
            let pair = [(r << 4) | g, (b << 4) | r, (g << 4) | b];
            for _ in 0..columns / 2 {
                row.extend_from_slice(&pair);
            }
            if columns % 2 == 1 {
                row.extend_from_slice(&pair[..2]);
            }
        }
    }
    Box::leak(row.into_boxed_slice())
}

/// Fill the visible area with `row`, repeated for every line
///
/// Every batch that was scheduled is waited on before returning, even when
/// a later one fails; the first error wins.
pub async fn fill<S>(
    scheduler: &mut S,
    panel: &PanelConfig,
    row: &'static [u8],
) -> Result<(), DisplayError<S::Error>>
where
    S: Scheduler<'static>,
{
    let mut pending: Deque<Ticket, BATCHES_IN_FLIGHT> = Deque::new();
    let sent = send_rows(scheduler, panel, row, &mut pending).await;

    let mut settled = Ok(());
    while let Some(ticket) = pending.pop_front() {
        if let Err(e) = scheduler.wait(ticket).await {
            if settled.is_ok() {
                settled = Err(DisplayError::from(e));
            }
        }
    }
    sent.and(settled)
}

async fn send_rows<S>(
    scheduler: &mut S,
    panel: &PanelConfig,
    row: &'static [u8],
    pending: &mut Deque<Ticket, BATCHES_IN_FLIGHT>,
) -> Result<(), DisplayError<S::Error>>
where
    S: Scheduler<'static>,
{
    let (_, rows) = panel.dimensions();
    let mut batch = panel.full_window()?;
    batch.push(factory::ramwr(row))?;
    for _ in 1..rows {
        if batch.len() >= ROWS_PER_BATCH {
            submit(scheduler, pending, core::mem::take(&mut batch)).await?;
        }
        batch.push(factory::ramwrc(row))?;
    }
    submit(scheduler, pending, batch).await
}

async fn submit<S>(
    scheduler: &mut S,
    pending: &mut Deque<Ticket, BATCHES_IN_FLIGHT>,
    batch: Batch<'static>,
) -> Result<(), DisplayError<S::Error>>
where
    S: Scheduler<'static>,
{
    if pending.is_full() {
        if let Some(oldest) = pending.pop_front() {
            scheduler.wait(oldest).await?;
        }
    }
    let ticket = scheduler.schedule(batch)?;
    // Room was made above
    let _ = pending.push_back(ticket);
    Ok(())
}
