//! Hardware reset

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

/// RESX low pulse; the controller needs at least 10 µs
const PULSE_US: u32 = 10;

/// Time the controller needs after RESX rises before it accepts SLPOUT
const RECOVERY_MS: u32 = 120;

/// Pulse RESX and wait until the controller is ready for commands
pub async fn hard_reset<RST, D>(rst: &mut RST, delay: &mut D) -> Result<(), RST::Error>
where
    RST: OutputPin,
    D: DelayNs,
{
    rst.set_high()?;
    delay.delay_us(PULSE_US).await;
    rst.set_low()?;
    delay.delay_us(PULSE_US).await;
    rst.set_high()?;
    delay.delay_ms(RECOVERY_MS).await;
    Ok(())
}
