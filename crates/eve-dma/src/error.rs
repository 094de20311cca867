//! Transfer path errors

/// Errors returned by the foreground side of the transfer path.
///
/// Nothing here crosses the interrupt boundary: the completion handler has
/// no failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError<E> {
    /// A transfer is in flight; the buffer belongs to the DMA engine.
    Busy,
    /// `start_transfer` with nothing buffered.
    Empty,
    /// The buffer is at capacity.
    BufferFull,
    /// The chip-select line could not be driven.
    ChipSelect,
    /// The backend refused to arm the transfer. The busy flag stayed idle;
    /// the caller may retry.
    Dma(E),
}

impl<E> TransferError<E> {
    /// True for errors after which the same call may succeed later without
    /// the caller changing anything (busy, or a refused arm).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Dma(_))
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug + core::fmt::Display> std::error::Error for TransferError<E> {}

impl<E: core::fmt::Display> core::fmt::Display for TransferError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "Transfer in flight"),
            Self::Empty => write!(f, "Transfer buffer is empty"),
            Self::BufferFull => write!(f, "Transfer buffer is full"),
            Self::ChipSelect => write!(f, "Chip-select line error"),
            Self::Dma(e) => write!(f, "DMA submission failed: {e}"),
        }
    }
}

/// The buffer has no room for another word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull;

impl<E> From<BufferFull> for TransferError<E> {
    fn from(_: BufferFull) -> Self {
        Self::BufferFull
    }
}

impl core::fmt::Display for BufferFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Transfer buffer is full")
    }
}
