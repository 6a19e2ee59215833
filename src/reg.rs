//! Register Access Layer
//!
//! Every driver talks to its peripheral through [`RegisterAccess`]: word
//! reads and writes at a byte offset from the block base, plus bitfield
//! helpers built on top. Two backends exist:
//!
//! - [`Mmio`]: volatile accesses at a physical base address (target only)
//! - [`SimRegisters`]: an in-memory register file used as a test double
//!
//! This layer trusts its callers. A [`Field`] whose position and width do
//! not fit in 32 bits is a contract violation and is not checked.

mod mmio;
mod sim;

pub use mmio::Mmio;
pub use sim::SimRegisters;

/// A named bitfield inside a peripheral register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct Field {
    /// Byte offset of the register from the block base
    pub offset: usize,
    /// Position of the least significant bit
    pub pos: u8,
    /// Width in bits
    pub width: u8,
}

impl Field {
    /// Create a field descriptor
    #[must_use]
    pub const fn new(offset: usize, pos: u8, width: u8) -> Self {
        Self { offset, pos, width }
    }

    /// Single-bit field
    #[must_use]
    pub const fn bit(offset: usize, pos: u8) -> Self {
        Self::new(offset, pos, 1)
    }

    /// Mask of the field's value bits, unshifted
    #[must_use]
    pub const fn value_mask(self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// Mask of the field in register position
    #[must_use]
    pub const fn mask(self) -> u32 {
        self.value_mask() << self.pos
    }

    /// Place `value` into the field's position inside `reg`
    #[must_use]
    pub const fn insert(self, reg: u32, value: u32) -> u32 {
        (reg & !self.mask()) | ((value & self.value_mask()) << self.pos)
    }

    /// Extract the field from a register value
    #[must_use]
    pub const fn extract(self, reg: u32) -> u32 {
        (reg >> self.pos) & self.value_mask()
    }
}

/// Word-level access to one peripheral register block
///
/// Offsets are in bytes from the block base and must be word aligned.
pub trait RegisterAccess {
    /// Read the register at `offset`
    fn read(&self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`
    fn write(&mut self, offset: usize, value: u32);

    /// Read-modify-write
    fn modify<F>(&mut self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(offset);
        self.write(offset, f(value));
    }

    /// Set every bit of `mask`
    fn set_bits(&mut self, offset: usize, mask: u32) {
        self.modify(offset, |r| r | mask);
    }

    /// Clear every bit of `mask`
    fn clear_bits(&mut self, offset: usize, mask: u32) {
        self.modify(offset, |r| r & !mask);
    }

    /// Clear `rc_w0` status flags by writing 0 to `mask` and 1 elsewhere
    ///
    /// No read-modify-write, so flags raised in the meantime survive.
    fn clear_flags(&mut self, offset: usize, mask: u32) {
        self.write(offset, !mask);
    }

    /// Whether every bit of `mask` is set
    fn is_set(&self, offset: usize, mask: u32) -> bool {
        self.read(offset) & mask == mask
    }

    /// Read a bitfield
    fn read_field(&self, field: Field) -> u32 {
        field.extract(self.read(field.offset))
    }

    /// Write a bitfield, preserving the rest of the register
    fn write_field(&mut self, field: Field, value: u32) {
        self.modify(field.offset, |r| field.insert(r, value));
    }

    /// Spin until every bit of `mask` is set
    ///
    /// There is no timeout: callers needing bounded latency check their
    /// own deadline before calling.
    fn wait_set(&self, offset: usize, mask: u32) {
        while !self.is_set(offset, mask) {
            core::hint::spin_loop();
        }
    }

    /// Spin until every bit of `mask` is clear
    fn wait_clear(&self, offset: usize, mask: u32) {
        while self.read(offset) & mask != 0 {
            core::hint::spin_loop();
        }
    }
}

impl<R: RegisterAccess> RegisterAccess for &mut R {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_masks() {
        let f = Field::new(0, 3, 3);
        assert_eq!(f.value_mask(), 0b111);
        assert_eq!(f.mask(), 0b11_1000);
        assert_eq!(Field::new(0, 0, 32).mask(), u32::MAX);
    }

    #[test]
    fn field_insert_preserves_other_bits() {
        let f = Field::new(0, 4, 4);
        assert_eq!(f.insert(0xFFFF_FFFF, 0x5), 0xFFFF_FF5F);
        assert_eq!(f.insert(0, 0x1F), 0xF0);
        assert_eq!(f.extract(0xABCD), 0xC);
    }
}
