//! Volatile register backend

#![allow(unsafe_code)]

use super::RegisterAccess;

/// Memory-mapped register block at a fixed base address
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wrap the register block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block and the
    /// returned handle must be the only one accessing it.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the block
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees `base` addresses a register block owned by this handle.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: as in `read`.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}
