//! Completion interrupt registration

/// The interrupt vector routed to the transfer-complete handler.
pub trait IrqLine {
    /// Set the line's priority and unmask it.
    fn enable(&mut self, priority: u8);

    /// Mask the line.
    fn disable(&mut self);
}

impl<T: IrqLine + ?Sized> IrqLine for &mut T {
    fn enable(&mut self, priority: u8) {
        (**self).enable(priority);
    }

    fn disable(&mut self) {
        (**self).disable();
    }
}

/// NVIC-backed interrupt line for Cortex-M targets.
///
/// `priority` is the raw 8-bit NVIC value: on parts with two priority bits
/// (Cortex-M0+, SAMC2x) only the top two bits count.
#[cfg(feature = "cortex-m")]
pub struct NvicLine<I> {
    interrupt: I,
}

#[cfg(feature = "cortex-m")]
impl<I: cortex_m::interrupt::InterruptNumber> NvicLine<I> {
    /// Line for `interrupt` (the PAC's `Interrupt::DMAC` or equivalent).
    pub fn new(interrupt: I) -> Self {
        Self { interrupt }
    }
}

#[cfg(feature = "cortex-m")]
impl<I: cortex_m::interrupt::InterruptNumber> IrqLine for NvicLine<I> {
    fn enable(&mut self, priority: u8) {
        // SAFETY: the transfer path owns this interrupt exclusively; its
        // handler only touches state behind a critical section or the
        // atomic busy flag, so unmasking cannot break a mask-based critical
        // section elsewhere. NVIC priority writes are single-register
        // stores and `steal` is only used for that register.
        unsafe {
            let mut core = cortex_m::Peripherals::steal();
            core.NVIC.set_priority(self.interrupt, priority);
            cortex_m::peripheral::NVIC::unmask(self.interrupt);
        }
    }

    fn disable(&mut self) {
        cortex_m::peripheral::NVIC::mask(self.interrupt);
    }
}
