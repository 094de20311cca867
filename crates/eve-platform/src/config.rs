//! Transfer path configuration
//!
//! Central DMA channel / trigger / priority settings. Backends take a
//! [`DmaConfig`] instead of hardcoding channel numbers.

/// SAM DMAC register layout.
///
/// Both families share the descriptor format and the controller registers;
/// they differ in how channel registers are reached and in the trigger map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmacLayout {
    /// SAMC20/C21: channel registers at 0x40, selected through `CHID`.
    SamC2x,
    /// SAMD51/E51/E53/E54: one 16-byte register bank per channel at
    /// `0x40 + 0x10 * channel`.
    SamX5x,
}

impl DmacLayout {
    /// Layout selected by the `samc2x` / `samx5x` build features.
    #[cfg(feature = "samc2x")]
    pub const TARGET: Self = Self::SamC2x;

    /// Layout selected by the `samc2x` / `samx5x` build features.
    #[cfg(all(feature = "samx5x", not(feature = "samc2x")))]
    pub const TARGET: Self = Self::SamX5x;

    /// Number of DMA channels on the part.
    #[must_use]
    pub const fn channel_count(self) -> u8 {
        match self {
            Self::SamC2x => 12,
            Self::SamX5x => 32,
        }
    }

    /// `TRIGSRC` value of the given SERCOM's TX (data register empty) trigger.
    ///
    /// SAMC2x numbers SERCOM0 RX/TX as 2/3, SAMx5x as 4/5; every further
    /// SERCOM adds two.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // sercom <= 7: at most 5 + 14
    pub const fn sercom_tx_trigger(self, sercom: u8) -> Option<u8> {
        let (first_tx, max_sercom) = match self {
            Self::SamC2x => (3, 5),
            Self::SamX5x => (5, 7),
        };
        if sercom > max_sercom {
            return None;
        }
        Some(first_tx + sercom * 2)
    }
}

/// DMA channel configuration for the transfer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    /// Register layout of the target's DMAC.
    pub layout: DmacLayout,
    /// DMA channel bound to the SPI transmitter.
    pub channel: u8,
    /// `TRIGSRC` of the SPI TX trigger.
    pub trigger_source: u8,
    /// NVIC priority of the completion interrupt (0 = highest).
    pub irq_priority: u8,
}

impl DmaConfig {
    /// Channel 0, SERCOM0 TX trigger, highest interrupt priority.
    #[must_use]
    pub const fn sercom0(layout: DmacLayout) -> Self {
        let trigger_source = match layout.sercom_tx_trigger(0) {
            Some(trigger) => trigger,
            None => 0,
        };
        Self {
            layout,
            channel: 0,
            trigger_source,
            irq_priority: 0,
        }
    }

    /// Same settings on another channel.
    #[must_use]
    pub const fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Same settings with another SERCOM's TX trigger, if that SERCOM exists.
    #[must_use]
    pub const fn with_sercom(mut self, sercom: u8) -> Option<Self> {
        match self.layout.sercom_tx_trigger(sercom) {
            Some(trigger) => {
                self.trigger_source = trigger;
                Some(self)
            }
            None => None,
        }
    }

    /// True when the channel exists on the configured layout.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.channel < self.layout.channel_count()
    }
}
