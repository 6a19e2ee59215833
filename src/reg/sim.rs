//! In-memory register backend
//!
//! `SimRegisters` stores one word per register. Hardware behaviour that
//! the drivers spin on is modelled with a handful of rules:
//!
//! - status bits are preset with [`SimRegisters::poke`] before a call
//! - bits the silicon clears by itself (`SWRST`, `UG`, ...) are listed with
//!   [`SimRegisters::self_clearing`] and drop back to zero after every write
//! - status fields that follow a control field (`PLLON` → `PLLRDY`,
//!   `SW` → `SWS`) are declared with [`SimRegisters::echo`]
//! - status registers whose flags are cleared by writing 0 (`rc_w0`) are
//!   declared with [`SimRegisters::write_zero_clears`]; writes leave their
//!   other bits untouched
//!
//! A data register that is written and then read returns the written value,
//! which is how a full-duplex bus wired in loopback behaves.

use heapless::Vec;

use super::{Field, RegisterAccess};

/// Maximum number of echo rules per block
const MAX_ECHOES: usize = 8;

/// Copy `from` into `to` after every write to `from`'s register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Echo {
    from: Field,
    to: Field,
}

/// Simulated register block with `N` 32-bit registers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimRegisters<const N: usize> {
    words: [u32; N],
    self_clearing: [u32; N],
    zero_clears: [u32; N],
    echoes: Vec<Echo, MAX_ECHOES>,
    writes: usize,
}

impl<const N: usize> SimRegisters<N> {
    /// All registers zero
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [0; N],
            self_clearing: [0; N],
            zero_clears: [0; N],
            echoes: Vec::new(),
            writes: 0,
        }
    }

    /// Declare `mask` at `offset` as cleared by hardware after each write
    #[must_use]
    pub fn self_clearing(mut self, offset: usize, mask: u32) -> Self {
        self.self_clearing[offset / 4] |= mask;
        self
    }

    /// Declare the register at `offset` a status register: bits of `mask`
    /// clear when written 0 and every other bit ignores writes
    #[must_use]
    pub fn write_zero_clears(mut self, offset: usize, mask: u32) -> Self {
        self.zero_clears[offset / 4] |= mask;
        self
    }

    /// Mirror the field `from` into `to` whenever `from`'s register is written
    ///
    /// # Panics
    ///
    /// More than eight rules on one block.
    #[must_use]
    pub fn echo(mut self, from: Field, to: Field) -> Self {
        assert!(
            self.echoes.push(Echo { from, to }).is_ok(),
            "at most {MAX_ECHOES} echo rules per block"
        );
        self
    }

    /// Preset a register without counting it as a driver write
    pub fn poke(&mut self, offset: usize, value: u32) {
        self.words[offset / 4] = value;
    }

    /// Current value of a register
    #[must_use]
    pub fn peek(&self, offset: usize) -> u32 {
        self.words[offset / 4]
    }

    /// Copy of the whole register file
    #[must_use]
    pub fn snapshot(&self) -> [u32; N] {
        self.words
    }

    /// Number of driver writes since creation
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.writes
    }
}

impl<const N: usize> Default for SimRegisters<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RegisterAccess for SimRegisters<N> {
    fn read(&self, offset: usize) -> u32 {
        self.words[offset / 4]
    }

    fn write(&mut self, offset: usize, value: u32) {
        let idx = offset / 4;
        let zero_clears = self.zero_clears[idx];
        self.words[idx] = if zero_clears == 0 {
            value & !self.self_clearing[idx]
        } else {
            self.words[idx] & (value | !zero_clears)
        };
        self.writes += 1;

        for echo in self.echoes.iter().filter(|e| e.from.offset == offset) {
            let bits = echo.from.extract(value);
            let target = echo.to.offset / 4;
            self.words[target] = echo.to.insert(self.words[target], bits);
        }
    }
}
