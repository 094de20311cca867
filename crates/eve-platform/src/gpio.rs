//! Chip-select and power-down lines
//!
//! Both co-processor control lines are active-low push-pull outputs driven
//! through `embedded-hal` [`OutputPin`]s.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Logic level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// Active-low SPI chip-select framing one transfer.
///
/// Tracks the last level it drove, so the transfer core can report whether
/// a transaction is still framed.
pub struct ChipSelect<P> {
    pin: P,
    asserted: bool,
}

impl<P: OutputPin> ChipSelect<P> {
    /// Wrap `pin`. The line is assumed deasserted (high); call
    /// [`deassert`](Self::deassert) once during init to make it so.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            asserted: false,
        }
    }

    /// Drive CS low: the co-processor starts listening.
    pub fn assert(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()?;
        self.asserted = true;
        Ok(())
    }

    /// Drive CS high: the transaction ends.
    pub fn deassert(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()?;
        self.asserted = false;
        Ok(())
    }

    /// True while the line is driven low.
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// Current line level.
    pub fn level(&self) -> PinState {
        PinState::from(!self.asserted)
    }

    /// Give back the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

/// PD# low time during a power cycle.
pub const POWER_DOWN_HOLD_MS: u32 = 6;

/// Wait after releasing PD# before the co-processor accepts SPI traffic.
pub const POWER_UP_SETTLE_MS: u32 = 21;

/// Active-low power-down (PD#) line of the co-processor.
pub struct PowerDown<P> {
    pin: P,
}

impl<P: OutputPin> PowerDown<P> {
    /// Wrap `pin`.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Hold the chip in power-down.
    pub fn power_down(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }

    /// Release the chip from power-down.
    pub fn release(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()
    }

    /// Full startup cycle: PD# low for [`POWER_DOWN_HOLD_MS`], high, then
    /// wait [`POWER_UP_SETTLE_MS`] before the chip is accessed.
    pub fn power_cycle<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), P::Error> {
        #[cfg(feature = "defmt")]
        defmt::info!("EVE power cycle: PD# low {=u32}ms", POWER_DOWN_HOLD_MS);

        self.power_down()?;
        delay.delay_ms(POWER_DOWN_HOLD_MS);
        self.release()?;
        delay.delay_ms(POWER_UP_SETTLE_MS);
        Ok(())
    }

    /// Give back the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}
