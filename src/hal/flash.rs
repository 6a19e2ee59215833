//! Flash interface
//!
//! Only the access control register matters here: wait states must be
//! raised before SYSCLK goes up.

use crate::config::FLASH_MHZ_PER_WAIT_STATE;
use crate::reg::{Field, RegisterAccess};

/// Size of the flash interface register block in words
pub const BLOCK_WORDS: usize = 6;

const ACR: usize = 0x00;
const LATENCY: Field = Field::new(ACR, 0, 4);
const PRFTEN: u32 = 1 << 8;
const ICEN: u32 = 1 << 9;
const DCEN: u32 = 1 << 10;
const ICRST: u32 = 1 << 11;
const DCRST: u32 = 1 << 12;

/// Wait states needed at `sysclk_mhz` (2.7 V to 3.6 V supply)
#[must_use]
pub const fn wait_states_for(sysclk_mhz: u32) -> u32 {
    if sysclk_mhz == 0 {
        0
    } else {
        (sysclk_mhz - 1) / FLASH_MHZ_PER_WAIT_STATE
    }
}

/// Flash interface driver
pub struct Flash<R> {
    regs: R,
}

impl<R: RegisterAccess> Flash<R> {
    /// Wrap the flash interface block
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Set latency for `sysclk_mhz` with prefetch and both caches on
    ///
    /// Returns the number of wait states programmed.
    pub fn configure_wait_states(&mut self, sysclk_mhz: u32) -> u32 {
        let ws = wait_states_for(sysclk_mhz);

        // Caches must be off while being reset
        self.regs.clear_bits(ACR, ICEN | DCEN);
        self.regs.set_bits(ACR, ICRST | DCRST);
        self.regs.clear_bits(ACR, ICRST | DCRST);

        self.regs.modify(ACR, |r| LATENCY.insert(r, ws) | PRFTEN | ICEN | DCEN);
        ws
    }

    /// Currently programmed wait states
    #[must_use]
    pub fn latency(&self) -> u32 {
        self.regs.read_field(LATENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_state_bands() {
        assert_eq!(wait_states_for(16), 0);
        assert_eq!(wait_states_for(30), 0);
        assert_eq!(wait_states_for(31), 1);
        assert_eq!(wait_states_for(84), 2);
        assert_eq!(wait_states_for(100), 3);
        assert_eq!(wait_states_for(180), 5);
    }
}
