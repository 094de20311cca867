//! SAM DMAC backend (SAMC20/C21 and SAMD51/E5x)
//!
//! One channel, one descriptor, SERCOM TX trigger, byte beats with source
//! increment into the SERCOM `DATA` register. The two families share the
//! controller registers and the descriptor format; channel registers are
//! reached through `CHID` on SAMC2x and through per-channel banks on SAMx5x.

use eve_platform::config::{DmaConfig, DmacLayout};
use eve_platform::dma::{
    Armed, DescriptorMemory, DmaDescriptor, DmaEngine, BTCTRL_BEATSIZE_BYTE, BTCTRL_SRCINC,
    BTCTRL_VALID,
};
use eve_platform::irq::IrqLine;
use eve_platform::regs::RegisterBlock;

// ── Controller registers ────────────────────────────────────────────────────

/// `CTRL` (16 bit).
pub const CTRL: usize = 0x00;
/// `CTRL.SWRST`.
pub const CTRL_SWRST: u16 = 1 << 0;
/// `CTRL.DMAENABLE`.
pub const CTRL_DMAENABLE: u16 = 1 << 1;
/// `CTRL.LVLEN0`: priority level 0 enabled.
pub const CTRL_LVLEN0: u16 = 1 << 8;
/// `BASEADDR`: descriptor memory section.
pub const BASEADDR: usize = 0x34;
/// `WRBADDR`: write-back memory section.
pub const WRBADDR: usize = 0x38;

// ── SAMC2x channel registers (selected by CHID) ─────────────────────────────

/// `CHID` (8 bit).
pub const C2X_CHID: usize = 0x3F;
/// `CHCTRLA` (8 bit).
pub const C2X_CHCTRLA: usize = 0x40;
/// `CHCTRLB` (32 bit).
pub const C2X_CHCTRLB: usize = 0x44;
/// `CHINTENSET` (8 bit).
pub const C2X_CHINTENSET: usize = 0x4D;
/// `CHINTFLAG` (8 bit).
pub const C2X_CHINTFLAG: usize = 0x4E;

const C2X_TRIGSRC_SHIFT: u32 = 8;
const C2X_TRIGSRC_MASK: u32 = 0x3F;
const C2X_TRIGACT_BEAT: u32 = 2 << 22;

// ── SAMx5x channel register bank (0x40 + 0x10 * n) ──────────────────────────

/// First channel bank.
pub const X5X_CHANNEL_BASE: usize = 0x40;
/// Bank stride.
pub const X5X_CHANNEL_STRIDE: usize = 0x10;
/// `CHCTRLA` (32 bit), bank offset.
pub const X5X_CHCTRLA: usize = 0x00;
/// `CHINTENSET` (8 bit), bank offset.
pub const X5X_CHINTENSET: usize = 0x0D;
/// `CHINTFLAG` (8 bit), bank offset.
pub const X5X_CHINTFLAG: usize = 0x0E;

const X5X_TRIGSRC_SHIFT: u32 = 8;
const X5X_TRIGSRC_MASK: u32 = 0x7F;
const X5X_TRIGACT_BURST: u32 = 2 << 20;
const X5X_BURSTLEN_SINGLE: u32 = 0;

// ── Shared channel bits ─────────────────────────────────────────────────────

/// `CHCTRLA.ENABLE`.
pub const CHCTRLA_ENABLE: u8 = 1 << 1;
/// `CHINTFLAG.TCMPL` / `CHINTENSET.TCMPL`.
pub const CHINT_TCMPL: u8 = 1 << 1;

/// Polls of `CTRL` before a disable or reset counts as stuck.
const SYNC_POLL_LIMIT: u32 = 10_000;

/// SAM DMAC backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamDmacError {
    /// Channel number not present on this layout.
    InvalidChannel(u8),
    /// `CTRL.DMAENABLE` did not clear.
    DisableTimeout,
    /// `CTRL.SWRST` did not clear.
    ResetTimeout,
    /// Zero-length transfer.
    EmptyTransfer,
    /// More bytes than one descriptor can move.
    TooLong(usize),
    /// The channel is still enabled from a previous transfer.
    ChannelBusy,
}

#[cfg(feature = "std")]
impl std::error::Error for SamDmacError {}

impl core::fmt::Display for SamDmacError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "DMA channel {ch} not available"),
            Self::DisableTimeout => write!(f, "DMA controller did not disable"),
            Self::ResetTimeout => write!(f, "DMA controller reset timeout"),
            Self::EmptyTransfer => write!(f, "Zero-length DMA transfer"),
            Self::TooLong(len) => write!(f, "DMA transfer of {len} bytes exceeds descriptor"),
            Self::ChannelBusy => write!(f, "DMA channel still enabled"),
        }
    }
}

/// SAM DMAC channel driving the SERCOM transmitter.
pub struct SamDmac<R, I> {
    regs: R,
    irq: I,
    config: DmaConfig,
    memory: &'static mut DescriptorMemory,
    destination: u32,
}

impl<R: RegisterBlock, I: IrqLine> SamDmac<R, I> {
    /// Channel on `regs` (the DMAC block) writing to bus address
    /// `destination` (the SERCOM `DATA` register, see
    /// [`SercomSpi::data_register_address`](super::sercom::SercomSpi::data_register_address)).
    pub fn new(
        regs: R,
        irq: I,
        config: DmaConfig,
        memory: &'static mut DescriptorMemory,
        destination: u32,
    ) -> Self {
        Self {
            regs,
            irq,
            config,
            memory,
            destination,
        }
    }

    /// Snapshot of the channel descriptor as the controller would read it.
    pub fn descriptor(&self) -> DmaDescriptor {
        // SAFETY: the pointer comes from a live reference to plain data.
        unsafe { core::ptr::read_volatile(core::ptr::addr_of!(self.memory.descriptor)) }
    }

    /// The register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Channel configuration.
    pub fn config(&self) -> &DmaConfig {
        &self.config
    }

    fn bank(&self) -> usize {
        let channel = usize::from(self.config.channel);
        X5X_CHANNEL_STRIDE
            .saturating_mul(channel)
            .saturating_add(X5X_CHANNEL_BASE)
    }

    fn select_channel(&self) {
        if self.config.layout == DmacLayout::SamC2x {
            self.regs.write_u8(C2X_CHID, self.config.channel);
        }
    }

    fn wait_ctrl_clear(&self, mask: u16, err: SamDmacError) -> Result<(), SamDmacError> {
        for _ in 0..SYNC_POLL_LIMIT {
            if self.regs.read_u16(CTRL) & mask == 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(err)
    }

    fn configure_channel(&self) {
        let trigger = u32::from(self.config.trigger_source);
        match self.config.layout {
            DmacLayout::SamC2x => {
                self.select_channel();
                self.regs.write_u32(
                    C2X_CHCTRLB,
                    C2X_TRIGACT_BEAT | ((trigger & C2X_TRIGSRC_MASK) << C2X_TRIGSRC_SHIFT),
                );
                self.regs.write_u8(C2X_CHINTENSET, CHINT_TCMPL);
            }
            DmacLayout::SamX5x => {
                let bank = self.bank();
                self.regs.write_u32(
                    bank.saturating_add(X5X_CHCTRLA),
                    X5X_BURSTLEN_SINGLE
                        | X5X_TRIGACT_BURST
                        | ((trigger & X5X_TRIGSRC_MASK) << X5X_TRIGSRC_SHIFT),
                );
                self.regs
                    .write_u8(bank.saturating_add(X5X_CHINTENSET), CHINT_TCMPL);
            }
        }
    }

    fn install_descriptor(&mut self) {
        let descriptor = DmaDescriptor {
            btctrl: BTCTRL_VALID | BTCTRL_BEATSIZE_BYTE | BTCTRL_SRCINC,
            btcnt: 0,
            srcaddr: 0,
            dstaddr: self.destination,
            descaddr: 0,
        };
        // SAFETY: the controller is disabled and reset; nothing else reads
        // the descriptor memory, which this backend owns exclusively.
        unsafe {
            core::ptr::write_volatile(core::ptr::addr_of_mut!(self.memory.descriptor), descriptor);
            core::ptr::write_volatile(
                core::ptr::addr_of_mut!(self.memory.writeback),
                DmaDescriptor::new(),
            );
        }
        self.regs
            .write_u32(BASEADDR, bus_address(core::ptr::addr_of!(self.memory.descriptor)));
        self.regs
            .write_u32(WRBADDR, bus_address(core::ptr::addr_of!(self.memory.writeback)));
    }

    fn channel_enabled(&self) -> bool {
        match self.config.layout {
            DmacLayout::SamC2x => {
                self.select_channel();
                self.regs.read_u8(C2X_CHCTRLA) & CHCTRLA_ENABLE != 0
            }
            DmacLayout::SamX5x => {
                let ctrla = self.regs.read_u32(self.bank().saturating_add(X5X_CHCTRLA));
                ctrla & u32::from(CHCTRLA_ENABLE) != 0
            }
        }
    }
}

impl<R: RegisterBlock, I: IrqLine> DmaEngine for SamDmac<R, I> {
    type Error = SamDmacError;

    fn init(&mut self) -> Result<(), Self::Error> {
        if !self.config.is_valid() {
            return Err(SamDmacError::InvalidChannel(self.config.channel));
        }

        // Masked until the channel is configured again.
        self.irq.disable();
        self.regs.write_u16(CTRL, 0);
        self.wait_ctrl_clear(CTRL_DMAENABLE, SamDmacError::DisableTimeout)?;
        self.regs.write_u16(CTRL, CTRL_SWRST);
        self.wait_ctrl_clear(CTRL_SWRST, SamDmacError::ResetTimeout)?;

        self.install_descriptor();
        self.configure_channel();
        self.regs.write_u16(CTRL, CTRL_LVLEN0 | CTRL_DMAENABLE);
        self.irq.enable(self.config.irq_priority);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "DMAC ready: channel {=u8}, trigger {=u8}",
            self.config.channel,
            self.config.trigger_source
        );

        Ok(())
    }

    fn prepare(&mut self, source: &[u8]) -> Result<(), Self::Error> {
        if source.is_empty() {
            return Err(SamDmacError::EmptyTransfer);
        }
        let btcnt = u16::try_from(source.len()).map_err(|_| SamDmacError::TooLong(source.len()))?;
        // The controller may still be reading the descriptor.
        if self.channel_enabled() {
            return Err(SamDmacError::ChannelBusy);
        }
        // With SRCINC the DMAC takes the address one past the last byte.
        let end = bus_address(source.as_ptr()).wrapping_add(u32::from(btcnt));

        // SAFETY: the channel is disabled and the caller holds the busy
        // flag, so the controller is not reading the descriptor.
        unsafe {
            core::ptr::write_volatile(core::ptr::addr_of_mut!(self.memory.descriptor.btcnt), btcnt);
            core::ptr::write_volatile(core::ptr::addr_of_mut!(self.memory.descriptor.srcaddr), end);
        }
        Ok(())
    }

    fn start(&mut self, _source: &[u8]) -> Result<Armed, Self::Error> {
        if self.channel_enabled() {
            return Err(SamDmacError::ChannelBusy);
        }
        match self.config.layout {
            DmacLayout::SamC2x => {
                self.select_channel();
                self.regs.set_bits_u8(C2X_CHCTRLA, CHCTRLA_ENABLE);
            }
            DmacLayout::SamX5x => {
                self.regs.set_bits_u32(
                    self.bank().saturating_add(X5X_CHCTRLA),
                    u32::from(CHCTRLA_ENABLE),
                );
            }
        }
        Ok(Armed::Pending)
    }

    fn acknowledge(&mut self) {
        match self.config.layout {
            DmacLayout::SamC2x => {
                self.select_channel();
                self.regs.write_u8(C2X_CHINTFLAG, CHINT_TCMPL);
            }
            DmacLayout::SamX5x => {
                self.regs
                    .write_u8(self.bank().saturating_add(X5X_CHINTFLAG), CHINT_TCMPL);
            }
        }
    }
}

/// 32-bit bus address of `ptr`.
#[allow(clippy::cast_possible_truncation)] // 32-bit address space on target
fn bus_address<T>(ptr: *const T) -> u32 {
    ptr as usize as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use eve_platform::mocks::{Event, EventLog, MockIrq, SimRegisters};

    fn dmac() -> SimRegisters {
        SimRegisters::new(0x4100_6000, 0x300).with_self_clearing(CTRL, u32::from(CTRL_SWRST))
    }

    fn memory() -> &'static mut DescriptorMemory {
        Box::leak(Box::new(DescriptorMemory::new()))
    }

    #[test]
    fn test_invalid_channel_is_rejected() {
        let regs = dmac();
        let config = DmaConfig::sercom0(DmacLayout::SamC2x).with_channel(12);
        let mut engine = SamDmac::new(&regs, MockIrq::new(EventLog::new()), config, memory(), 0);
        assert_eq!(engine.init(), Err(SamDmacError::InvalidChannel(12)));
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn test_stuck_reset_times_out() {
        // No self-clearing SWRST: the reset never completes.
        let regs = SimRegisters::new(0x4100_6000, 0x300);
        let config = DmaConfig::sercom0(DmacLayout::SamC2x);
        let mut engine = SamDmac::new(&regs, MockIrq::new(EventLog::new()), config, memory(), 0);
        assert_eq!(engine.init(), Err(SamDmacError::ResetTimeout));
    }

    #[test]
    fn test_prepare_rejects_empty_and_oversized() {
        let regs = dmac();
        let config = DmaConfig::sercom0(DmacLayout::SamX5x);
        let mut engine = SamDmac::new(&regs, MockIrq::new(EventLog::new()), config, memory(), 0);
        assert_eq!(engine.prepare(&[]), Err(SamDmacError::EmptyTransfer));
        let big = vec![0u8; 70_000];
        assert_eq!(engine.prepare(&big), Err(SamDmacError::TooLong(70_000)));
    }

    #[test]
    fn test_prepare_writes_end_address() {
        let regs = dmac();
        let config = DmaConfig::sercom0(DmacLayout::SamX5x);
        let mut engine = SamDmac::new(&regs, MockIrq::new(EventLog::new()), config, memory(), 0);
        let bytes = [0u8; 7];
        engine.prepare(&bytes).unwrap();

        let descriptor = engine.descriptor();
        assert_eq!(descriptor.btcnt, 7);
        assert_eq!(
            descriptor.srcaddr,
            bus_address(bytes.as_ptr()).wrapping_add(7)
        );
    }

    #[test]
    fn test_prepare_leaves_descriptor_of_enabled_channel() {
        let regs = dmac();
        let config = DmaConfig::sercom0(DmacLayout::SamX5x);
        let mut engine = SamDmac::new(&regs, MockIrq::new(EventLog::new()), config, memory(), 0);
        let first = [0u8; 3];
        engine.prepare(&first).unwrap();
        let before = engine.descriptor();

        regs.poke_u32(X5X_CHANNEL_BASE, u32::from(CHCTRLA_ENABLE));
        let second = [0u8; 11];
        assert_eq!(engine.prepare(&second), Err(SamDmacError::ChannelBusy));

        assert_eq!(engine.descriptor(), before);
        assert_eq!(engine.descriptor().btcnt, 3);
    }

    #[test]
    fn test_irq_masked_during_reset() {
        let regs = dmac();
        let log = EventLog::new();
        let config = DmaConfig {
            irq_priority: 1,
            ..DmaConfig::sercom0(DmacLayout::SamC2x)
        };
        let mut engine = SamDmac::new(&regs, MockIrq::new(log.clone()), config, memory(), 0);
        engine.init().unwrap();
        assert_eq!(log.events(), vec![Event::IrqDisabled, Event::IrqEnabled(1)]);
    }

    #[test]
    fn test_start_refuses_enabled_channel() {
        let regs = dmac();
        let config = DmaConfig::sercom0(DmacLayout::SamC2x);
        let mut engine = SamDmac::new(&regs, MockIrq::new(EventLog::new()), config, memory(), 0);
        regs.poke_u8(C2X_CHCTRLA, CHCTRLA_ENABLE);
        assert_eq!(engine.start(&[0]), Err(SamDmacError::ChannelBusy));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SamDmacError::TooLong(70_000).to_string(),
            "DMA transfer of 70000 bytes exceeds descriptor"
        );
    }
}
