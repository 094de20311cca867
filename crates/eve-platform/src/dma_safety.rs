//! DMA buffer alignment and sizing constants for the transfer buffer.
//!
//! ## Sizing
//!
//! | Constant | Value | Why |
//! |----------|-------|-----|
//! | [`WORD_SIZE_BYTES`] | 4 | co-processor commands are 32-bit words |
//! | [`TRANSFER_BUFFER_WORDS`] | 1025 | 4 KiB command FIFO + one header word |
//! | [`LEADING_PAD_BYTES`] | 1 | byte 0 of word 0 is never sent |
//! | [`MAX_DMA_BEATS`] | 65535 | SAM DMAC `BTCNT` is 16 bits |
//!
//! The wire length of a transfer holding `n` words is
//! `n * WORD_SIZE_BYTES - LEADING_PAD_BYTES`; see [`wire_length`].
//!
//! ## Placement
//!
//! The buffer is read by the DMA controller while the CPU is free to do other
//! work, so it lives in a `static` (never on a task or ISR stack) and must not
//! move while a transfer is in flight:
//!
//! ```rust,ignore
//! static BUFFER: StaticCell<TransferBuffer<TRANSFER_BUFFER_WORDS>> = StaticCell::new();
//! let buffer = BUFFER.init(TransferBuffer::new());
//! ```
//!
//! On Cortex-M7 parts with D-cache the buffer also needs 32-byte alignment
//! ([`Align32`]) and a non-cacheable region. The SAMC2x / SAMx5x parts this
//! path was written for have no data cache.

/// Bytes per buffer word.
pub const WORD_SIZE_BYTES: usize = 4;

/// Default transfer buffer capacity in words.
///
/// 1024 words fill the co-processor's 4 KiB command FIFO; the extra word
/// carries the memory-write address header.
pub const TRANSFER_BUFFER_WORDS: usize = 1025;

/// Padding bytes at the start of word 0 that are skipped on the wire.
pub const LEADING_PAD_BYTES: usize = 1;

/// Largest block a single SAM DMAC descriptor can move (16-bit `BTCNT`).
pub const MAX_DMA_BEATS: usize = u16::MAX as usize;

/// Wire length of the default-sized buffer when full.
pub const MAX_TRANSFER_BYTES: usize = TRANSFER_BUFFER_WORDS * WORD_SIZE_BYTES - LEADING_PAD_BYTES;

/// Wire length in bytes for `words` buffered words, or `None` for an empty
/// buffer or a length the DMA beat counter cannot express.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // len <= u16::MAX checked before the cast
pub const fn wire_length(words: usize) -> Option<u16> {
    let Some(bytes) = words.checked_mul(WORD_SIZE_BYTES) else {
        return None;
    };
    let Some(len) = bytes.checked_sub(LEADING_PAD_BYTES) else {
        return None;
    };
    if len == 0 || len > MAX_DMA_BEATS {
        return None;
    }
    Some(len as u16)
}

/// True when a buffer of `words` capacity can always be sent in one descriptor.
#[must_use]
pub const fn capacity_fits_descriptor(words: usize) -> bool {
    words > 0 && wire_length(words).is_some()
}

/// A `#[repr(align(32))]` wrapper that enforces 32-byte alignment for
/// DMA-accessible buffers.
///
/// Cache-line alignment is only needed on cached cores, but it costs at most
/// 31 bytes and keeps the buffer portable across targets.
#[derive(Clone, Copy)]
#[repr(align(32))]
pub struct Align32<T>(
    /// The inner value. Must be public so callers can construct and destructure the wrapper.
    pub T,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_length_skips_padding_byte() {
        assert_eq!(wire_length(1), Some(3));
        assert_eq!(wire_length(2), Some(7));
    }

    #[test]
    fn test_wire_length_empty_is_none() {
        assert_eq!(wire_length(0), None);
    }

    #[test]
    fn test_wire_length_full_default_buffer() {
        assert_eq!(
            wire_length(TRANSFER_BUFFER_WORDS).map(usize::from),
            Some(MAX_TRANSFER_BYTES)
        );
        assert_eq!(MAX_TRANSFER_BYTES, 4099);
    }

    #[test]
    fn test_wire_length_beyond_beat_counter_is_none() {
        // 16384 words -> 65535 bytes is the largest single descriptor.
        assert_eq!(wire_length(16_384), Some(u16::MAX));
        assert_eq!(wire_length(16_385), None);
        assert_eq!(wire_length(usize::MAX), None);
    }

    #[test]
    fn test_default_capacity_fits_descriptor() {
        assert!(capacity_fits_descriptor(TRANSFER_BUFFER_WORDS));
        assert!(!capacity_fits_descriptor(0));
    }

    #[test]
    fn test_align32_alignment() {
        assert_eq!(core::mem::align_of::<Align32<[u32; 4]>>(), 32);
    }
}
