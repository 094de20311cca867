//! Raw register access for register-level backends
//!
//! Backends address peripheral registers by byte offset from the block's
//! base, at the access width the datasheet specifies. [`Mmio`] performs
//! volatile accesses on real hardware; `mocks::SimRegisters` backs the same
//! trait with plain memory on the host.

/// A peripheral register block.
pub trait RegisterBlock {
    /// Bus address of the block (used when a register address has to be
    /// handed to another peripheral, e.g. a DMA destination).
    fn base_address(&self) -> u32;

    /// 8-bit read.
    fn read_u8(&self, offset: usize) -> u8;
    /// 8-bit write.
    fn write_u8(&self, offset: usize, value: u8);
    /// 16-bit read.
    fn read_u16(&self, offset: usize) -> u16;
    /// 16-bit write.
    fn write_u16(&self, offset: usize, value: u16);
    /// 32-bit read.
    fn read_u32(&self, offset: usize) -> u32;
    /// 32-bit write.
    fn write_u32(&self, offset: usize, value: u32);

    /// Read-modify-write: set `mask` in a 32-bit register.
    fn set_bits_u32(&self, offset: usize, mask: u32) {
        let value = self.read_u32(offset);
        self.write_u32(offset, value | mask);
    }

    /// Read-modify-write: clear `mask` in a 32-bit register.
    fn clear_bits_u32(&self, offset: usize, mask: u32) {
        let value = self.read_u32(offset);
        self.write_u32(offset, value & !mask);
    }

    /// Read-modify-write: set `mask` in an 8-bit register.
    fn set_bits_u8(&self, offset: usize, mask: u8) {
        let value = self.read_u8(offset);
        self.write_u8(offset, value | mask);
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &T {
    fn base_address(&self) -> u32 {
        (**self).base_address()
    }
    fn read_u8(&self, offset: usize) -> u8 {
        (**self).read_u8(offset)
    }
    fn write_u8(&self, offset: usize, value: u8) {
        (**self).write_u8(offset, value);
    }
    fn read_u16(&self, offset: usize) -> u16 {
        (**self).read_u16(offset)
    }
    fn write_u16(&self, offset: usize, value: u16) {
        (**self).write_u16(offset, value);
    }
    fn read_u32(&self, offset: usize) -> u32 {
        (**self).read_u32(offset)
    }
    fn write_u32(&self, offset: usize, value: u32) {
        (**self).write_u32(offset, value);
    }
}

/// Memory-mapped register block at a fixed bus address.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block that is
    /// large enough for every offset the caller accesses, and the caller
    /// must be the block's only user (no other driver, no PAC singleton in
    /// use for the same peripheral).
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn addr(&self, offset: usize) -> usize {
        self.base.wrapping_add(offset)
    }
}

// SAFETY (all accesses below): `Mmio::new` requires `base + offset` to be a
// valid register of an exclusively owned block; registers are naturally
// aligned and volatile accesses are never elided or merged.
impl RegisterBlock for Mmio {
    #[allow(clippy::cast_possible_truncation)] // 32-bit bus addresses on target
    fn base_address(&self) -> u32 {
        self.base as u32
    }

    fn read_u8(&self, offset: usize) -> u8 {
        // SAFETY: see impl comment.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u8) }
    }

    fn write_u8(&self, offset: usize, value: u8) {
        // SAFETY: see impl comment.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u8, value) }
    }

    fn read_u16(&self, offset: usize) -> u16 {
        // SAFETY: see impl comment.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u16) }
    }

    fn write_u16(&self, offset: usize, value: u16) {
        // SAFETY: see impl comment.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u16, value) }
    }

    fn read_u32(&self, offset: usize) -> u32 {
        // SAFETY: see impl comment.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u32) }
    }

    fn write_u32(&self, offset: usize, value: u32) {
        // SAFETY: see impl comment.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u32, value) }
    }
}
