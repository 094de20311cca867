//! SAM SERCOM in SPI master mode, as seen by the DMA transfer path

use eve_platform::regs::RegisterBlock;
use eve_platform::spi::{SpiConfig, SpiTx};

/// `CTRLA` (32 bit).
pub const CTRLA: usize = 0x00;
/// `CTRLA.ENABLE`.
pub const CTRLA_ENABLE: u32 = 1 << 1;
/// `CTRLB` (32 bit).
pub const CTRLB: usize = 0x04;
/// `CTRLB.RXEN`: receiver enable, writable while the SERCOM is enabled.
pub const CTRLB_RXEN: u32 = 1 << 17;
/// `BAUD` (8 bit).
pub const BAUD: usize = 0x0C;
/// `INTFLAG` (8 bit).
pub const INTFLAG: usize = 0x18;
/// `INTFLAG.TXC`: shift register empty, nothing left to send.
pub const INTFLAG_TXC: u8 = 1 << 1;
/// `SYNCBUSY` (32 bit).
pub const SYNCBUSY: usize = 0x1C;
/// `SYNCBUSY.ENABLE`.
pub const SYNCBUSY_ENABLE: u32 = 1 << 1;
/// `SYNCBUSY.CTRLB`.
pub const SYNCBUSY_CTRLB: u32 = 1 << 2;
/// `DATA`: the DMA destination.
pub const DATA: usize = 0x28;

/// Polls of `SYNCBUSY` before giving up on a synchronised write.
const SYNC_POLL_LIMIT: u32 = 1_000;

/// `BAUD` values for the normal and the write-burst clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaudPair {
    /// Outside bursts.
    pub normal: u8,
    /// While a DMA burst is on the wire.
    pub burst: u8,
}

/// SERCOM SPI transmit port.
#[derive(Debug)]
pub struct SercomSpi<R> {
    regs: R,
    clocks: Option<BaudPair>,
    burst: bool,
}

impl<R: RegisterBlock> SercomSpi<R> {
    /// Port on an already enabled SERCOM in SPI master mode. `BAUD` is left
    /// alone until [`set_clocks`](Self::set_clocks) is called.
    pub fn new(regs: R) -> Self {
        Self {
            regs,
            clocks: None,
            burst: false,
        }
    }

    /// Bus address of `DATA`, the DMA destination.
    #[allow(clippy::cast_possible_truncation)] // DATA fits in u32
    pub fn data_register_address(&self) -> u32 {
        self.regs.base_address().wrapping_add(DATA as u32)
    }

    /// `BAUD` value for `config.frequency` from reference clock `ref_hz`
    /// (`f = ref / (2 * (BAUD + 1))`, rounded towards the slower clock).
    /// `None` when the frequency is not reachable.
    pub fn baud_for(ref_hz: u32, config: &SpiConfig) -> Option<u8> {
        let divider = config.frequency.checked_mul(2)?;
        let steps = ref_hz
            .checked_add(divider.checked_sub(1)?)?
            .checked_div(divider)?;
        u8::try_from(steps.checked_sub(1)?).ok()
    }

    /// Clock the port at `normal` and switch to `burst` for the duration of
    /// each DMA burst. Programs the normal rate now.
    ///
    /// `None` (and nothing written) when either rate is unreachable from
    /// `ref_hz`.
    pub fn set_clocks(
        &mut self,
        ref_hz: u32,
        normal: &SpiConfig,
        burst: &SpiConfig,
    ) -> Option<BaudPair> {
        let clocks = BaudPair {
            normal: Self::baud_for(ref_hz, normal)?,
            burst: Self::baud_for(ref_hz, burst)?,
        };
        self.write_baud(clocks.normal);
        self.clocks = Some(clocks);
        self.burst = false;

        #[cfg(feature = "defmt")]
        defmt::debug!("SERCOM clocks: {}", clocks);

        Some(clocks)
    }

    /// Configured clock pair, if any.
    pub fn clocks(&self) -> Option<BaudPair> {
        self.clocks
    }

    /// The register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// `BAUD` is enable-protected: the SERCOM is disabled around the write
    /// and re-enabled if it was running.
    fn write_baud(&self, baud: u8) {
        let enabled = self.regs.read_u32(CTRLA) & CTRLA_ENABLE != 0;
        if enabled {
            self.regs.clear_bits_u32(CTRLA, CTRLA_ENABLE);
            self.wait_sync(SYNCBUSY_ENABLE);
        }
        self.regs.write_u8(BAUD, baud);
        if enabled {
            self.regs.set_bits_u32(CTRLA, CTRLA_ENABLE);
            self.wait_sync(SYNCBUSY_ENABLE);
        }
    }

    fn wait_sync(&self, mask: u32) {
        for _ in 0..SYNC_POLL_LIMIT {
            if self.regs.read_u32(SYNCBUSY) & mask == 0 {
                return;
            }
            core::hint::spin_loop();
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("SERCOM SYNCBUSY {=u32:#x} still set, continuing", mask);
    }
}

impl<R: RegisterBlock> SpiTx for SercomSpi<R> {
    fn set_receiver(&mut self, enabled: bool) {
        if enabled {
            self.regs.set_bits_u32(CTRLB, CTRLB_RXEN);
        } else {
            self.regs.clear_bits_u32(CTRLB, CTRLB_RXEN);
        }
        self.wait_sync(SYNCBUSY_CTRLB);
    }

    fn is_drained(&self) -> bool {
        self.regs.read_u8(INTFLAG) & INTFLAG_TXC != 0
    }

    fn receiver_enabled(&self) -> bool {
        self.regs.read_u32(CTRLB) & CTRLB_RXEN != 0
    }

    fn set_burst_clock(&mut self, burst: bool) {
        let Some(clocks) = self.clocks else {
            return;
        };
        if burst == self.burst {
            return;
        }
        self.write_baud(if burst { clocks.burst } else { clocks.normal });
        self.burst = burst;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use eve_platform::mocks::SimRegisters;

    #[test]
    fn test_receiver_gate_touches_only_rxen() {
        let regs = SimRegisters::new(0x4200_0400, 0x40);
        regs.poke_u32(CTRLB, 0x0000_0007);
        let mut spi = SercomSpi::new(&regs);

        spi.set_receiver(false);
        assert!(!spi.receiver_enabled());
        assert_eq!(regs.peek_u32(CTRLB), 0x0000_0007);

        spi.set_receiver(true);
        assert!(spi.receiver_enabled());
        assert_eq!(regs.peek_u32(CTRLB), 0x0002_0007);
    }

    #[test]
    fn test_drain_follows_txc() {
        let regs = SimRegisters::new(0x4200_0400, 0x40);
        let spi = SercomSpi::new(&regs);
        assert!(!spi.is_drained());
        regs.poke_u8(INTFLAG, INTFLAG_TXC);
        assert!(spi.is_drained());
    }

    #[test]
    fn test_data_register_address() {
        let regs = SimRegisters::new(0x4200_0400, 0x40);
        assert_eq!(SercomSpi::new(&regs).data_register_address(), 0x4200_0428);
    }

    #[test]
    fn test_baud_for_eve_clocks() {
        // 48 MHz / (2 * 3) = 8 MHz
        assert_eq!(
            SercomSpi::<&SimRegisters>::baud_for(48_000_000, &SpiConfig::eve_init()),
            Some(2)
        );
        // 30 MHz is not reachable from 48 MHz; round down to 24 MHz.
        assert_eq!(
            SercomSpi::<&SimRegisters>::baud_for(48_000_000, &SpiConfig::eve_burst()),
            Some(0)
        );
        assert_eq!(
            SercomSpi::<&SimRegisters>::baud_for(
                48_000_000,
                &SpiConfig::eve_init().with_frequency(0)
            ),
            None
        );
    }

    #[test]
    fn test_stuck_syncbusy_is_bounded() {
        let regs = SimRegisters::new(0x4200_0400, 0x40);
        regs.poke_u32(CTRLB, CTRLB_RXEN);
        regs.poke_u32(SYNCBUSY, SYNCBUSY_CTRLB);
        let mut spi = SercomSpi::new(&regs);

        spi.set_receiver(false);

        assert!(!spi.receiver_enabled());
        assert_eq!(regs.peek_u32(SYNCBUSY), SYNCBUSY_CTRLB);
    }

    #[test]
    fn test_burst_clock_switches_baud() {
        let regs = SimRegisters::new(0x4200_0400, 0x40);
        regs.poke_u32(CTRLA, CTRLA_ENABLE);
        let mut spi = SercomSpi::new(&regs);

        // Without a clock pair the port never touches BAUD.
        spi.set_burst_clock(true);
        assert!(regs.writes_to(BAUD).is_empty());

        let clocks = spi
            .set_clocks(48_000_000, &SpiConfig::eve_init(), &SpiConfig::eve_burst())
            .unwrap();
        assert_eq!(clocks, BaudPair { normal: 2, burst: 0 });
        assert_eq!(regs.peek_u8(BAUD), 2);

        spi.set_burst_clock(true);
        assert_eq!(regs.peek_u8(BAUD), 0);
        spi.set_burst_clock(true);
        spi.set_burst_clock(false);
        assert_eq!(regs.peek_u8(BAUD), 2);

        // set_clocks, burst on, burst off: three BAUD writes, each inside a
        // disable/enable pair.
        assert_eq!(regs.writes_to(BAUD).len(), 3);
        let ctrla: Vec<u32> = regs.writes_to(CTRLA).iter().map(|w| w.value).collect();
        assert_eq!(ctrla, vec![0, CTRLA_ENABLE, 0, CTRLA_ENABLE, 0, CTRLA_ENABLE]);
        assert_ne!(regs.peek_u32(CTRLA) & CTRLA_ENABLE, 0);
    }

    #[test]
    fn test_unreachable_clock_leaves_port_alone() {
        let regs = SimRegisters::new(0x4200_0400, 0x40);
        let mut spi = SercomSpi::new(&regs);
        let slow = SpiConfig::eve_init().with_frequency(1_000);
        assert_eq!(
            spi.set_clocks(48_000_000, &slow, &SpiConfig::eve_burst()),
            None
        );
        assert!(spi.clocks().is_none());
        assert!(regs.writes().is_empty());
    }
}
