//! Transfer buffer
//!
//! Fixed-capacity staging area for outbound co-processor words. The encoding
//! layer fills it word by word; the DMA engine reads it as a byte stream that
//! starts one byte into word 0:
//!
//! ```text
//! word:   [      0      ][      1      ] ... [    n-1    ]
//! byte:   [pad a2 a1 a0 ][ b0 b1 b2 b3 ] ... [ .. .. .. ..]
//!              └──────── wire bytes: n * 4 - 1 ────────────┘
//! ```
//!
//! Words are stored little-endian, so the wire order is the same on every
//! host. The buffer never grows; see [`TransferBuffer::remaining_capacity`].

use eve_platform::dma_safety::{
    capacity_fits_descriptor, wire_length, Align32, LEADING_PAD_BYTES, TRANSFER_BUFFER_WORDS,
};

use crate::error::BufferFull;

/// Write bit of a co-processor memory address (top byte).
pub const MEMORY_WRITE_FLAG: u8 = 0x80;

/// Co-processor memory addresses are 22 bits wide.
pub const MEMORY_ADDRESS_MASK: u32 = 0x003F_FFFF;

/// Word-granular DMA source buffer with a fill index.
///
/// Place it in a `static` (via `StaticCell`): at the default capacity it is
/// 4 KiB and the DMA engine reads it after `start_transfer` returns.
pub struct TransferBuffer<const N: usize = TRANSFER_BUFFER_WORDS> {
    words: Align32<[u32; N]>,
    index: usize,
}

impl<const N: usize> TransferBuffer<N> {
    const CAPACITY_FITS: () = assert!(
        capacity_fits_descriptor(N),
        "transfer buffer capacity does not fit one DMA descriptor"
    );

    /// Empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_FITS;
        Self {
            words: Align32([0; N]),
            index: 0,
        }
    }

    /// Capacity in words.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Words currently buffered (the fill index).
    pub const fn len(&self) -> usize {
        self.index
    }

    /// True when nothing is buffered.
    pub const fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Words that can still be appended.
    pub const fn remaining_capacity(&self) -> usize {
        N.saturating_sub(self.index)
    }

    /// Start a new encoding session.
    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    /// Append one word.
    pub fn push(&mut self, word: u32) -> Result<(), BufferFull> {
        let slot = self.words.0.get_mut(self.index).ok_or(BufferFull)?;
        *slot = word.to_le();
        self.index = self.index.saturating_add(1);
        Ok(())
    }

    /// Start a memory-write burst to co-processor `address`.
    ///
    /// Resets the fill index and writes the header word: the skipped pad
    /// byte, then the 22-bit address MSB first with the write bit set. The
    /// fill index is 1 afterwards.
    pub fn begin_write(&mut self, address: u32) -> Result<(), BufferFull> {
        let [_, high, mid, low] = (address & MEMORY_ADDRESS_MASK).to_be_bytes();
        self.reset_index();
        self.push(u32::from_le_bytes([0, high | MEMORY_WRITE_FLAG, mid, low]))
    }

    /// Buffered word `i`, in host order.
    pub fn word(&self, i: usize) -> Option<u32> {
        if i >= self.index {
            return None;
        }
        self.words.0.get(i).map(|w| u32::from_le(*w))
    }

    /// Wire length in bytes of the buffered words, `None` when empty.
    pub fn wire_len(&self) -> Option<u16> {
        wire_length(self.index)
    }

    /// The exact bytes the DMA engine sends: from byte 1 of word 0 to the end
    /// of the last buffered word. Empty when nothing is buffered.
    pub fn wire_bytes(&self) -> &[u8] {
        let Some(len) = self.wire_len() else {
            return &[];
        };
        self.as_bytes()
            .get(LEADING_PAD_BYTES..)
            .and_then(|bytes| bytes.get(..usize::from(len)))
            .unwrap_or_default()
    }

    fn as_bytes(&self) -> &[u8] {
        let words = &self.words.0;
        // SAFETY: `[u32; N]` is plain data without padding; every byte is
        // initialised and valid as `u8`, `u8` has alignment 1, and the slice
        // borrows `self` so the words cannot change while it lives.
        unsafe {
            core::slice::from_raw_parts(words.as_ptr().cast::<u8>(), core::mem::size_of_val(words))
        }
    }
}

impl<const N: usize> Default for TransferBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for TransferBuffer<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("capacity", &N)
            .field("len", &self.index)
            .finish()
    }
}
