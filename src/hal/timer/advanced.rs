//! Advanced-control features of TIM1 and TIM8
//!
//! Repetition counter, complementary outputs with dead time, break input
//! and the main output enable. Every call on another timer fails with the
//! feature's `*NotSupported` error.

use super::channel::{Channel, OutputPolarity};
use super::{regs, Apply, Timer, TimerError, TimerResult};
use crate::reg::RegisterAccess;

config_enum! {
    /// Write protection of the break and dead-time settings (`LOCK`)
    pub enum LockLevel: TimerError::InvalidLockLevel {
        /// No protection
        Off = 0,
        /// `DTG`, `BKE`, `BKP`, `AOE`, `OISx` frozen
        Level1 = 1,
        /// Level 1 plus `CCxP`, `CCxNP`, `OSSR`, `OSSI`
        Level2 = 2,
        /// Level 2 plus `OCxM`, `OCxPE`
        Level3 = 3,
    }
}

config_enum! {
    /// Output level while `MOE` is clear (`OISx`, `OISxN`)
    pub enum IdleState: TimerError::InvalidOutputMode {
        /// Low
        Low = 0,
        /// High
        High = 1,
    }
}

const CCER_NE: u32 = 1 << 2;
const CCER_NP: u32 = 1 << 3;

/// Encode a dead time in `t_DTS` ticks as a `DTG` value
///
/// Ticks above 127 fall in coarser bands and are rounded down to the
/// band's step (2, 8 or 16 ticks).
///
/// # Errors
///
/// `InvalidCounterValue` above 1023 ticks.
#[allow(clippy::cast_possible_truncation)]
pub const fn dead_time_encoding(ticks: u32) -> TimerResult<u8> {
    let dtg = match ticks {
        0..=127 => ticks,
        128..=255 => 0x80 | (ticks / 2 - 64),
        256..=511 => 0xC0 | (ticks / 8 - 32),
        512..=1023 => 0xE0 | (ticks / 16 - 32),
        _ => return Err(TimerError::InvalidCounterValue),
    };
    Ok(dtg as u8)
}

impl<R: RegisterAccess> Timer<R> {
    fn check_bdtr(&self) -> TimerResult<()> {
        self.ensure_configured()?;
        if self.caps.advanced {
            Ok(())
        } else {
            Err(TimerError::BdtrNotSupported)
        }
    }

    fn check_complementary(&self, ch: Channel) -> TimerResult<()> {
        self.check_channel(ch)?;
        if !self.caps.advanced {
            Err(TimerError::CapcompNotSupported)
        } else if ch == Channel::Ch4 {
            Err(TimerError::InvalidTimerChannelAssignment)
        } else {
            Ok(())
        }
    }

    /// Raise the update event every `count + 1` counter periods
    ///
    /// # Errors
    ///
    /// `RepetitionNotSupported` outside TIM1/TIM8; `InvalidCounterValue`
    /// above 255; `NotConfigured`.
    pub fn set_repetition_counter(&mut self, count: u32) -> TimerResult<Apply> {
        self.ensure_configured()?;
        if !self.caps.advanced {
            return Err(TimerError::RepetitionNotSupported);
        }
        if count > 0xFF {
            return Err(TimerError::InvalidCounterValue);
        }
        self.regs.write(regs::RCR, count);
        Ok(self.commit(true))
    }

    /// Dead time inserted between complementary edges, in `t_DTS` ticks
    ///
    /// Returns the ticks actually programmed.
    ///
    /// # Errors
    ///
    /// `BdtrNotSupported`; `InvalidCounterValue` above 1023 ticks;
    /// `NotConfigured`.
    pub fn set_dead_time(&mut self, ticks: u32) -> TimerResult<u32> {
        self.check_bdtr()?;
        let dtg = dead_time_encoding(ticks)?;
        self.regs.write_field(regs::BDTR_DTG, u32::from(dtg));
        Ok(self.dead_time())
    }

    /// Programmed dead time in `t_DTS` ticks
    #[must_use]
    pub fn dead_time(&self) -> u32 {
        let dtg = self.regs.read_field(regs::BDTR_DTG);
        match dtg >> 5 {
            0..=3 => dtg,
            4 | 5 => (64 + (dtg & 0x3F)) * 2,
            6 => (32 + (dtg & 0x1F)) * 8,
            _ => (32 + (dtg & 0x1F)) * 16,
        }
    }

    /// Drive the outputs (`MOE`)
    ///
    /// # Errors
    ///
    /// `BdtrNotSupported`; `NotConfigured`.
    pub fn enable_main_output(&mut self, enabled: bool) -> TimerResult<()> {
        self.write_bdtr_flag(regs::BDTR_MOE, enabled)
    }

    /// Whether `MOE` is set
    #[must_use]
    pub fn is_main_output_enabled(&self) -> bool {
        self.regs.is_set(regs::BDTR, regs::BDTR_MOE)
    }

    /// Set `MOE` again at the next update after a break (`AOE`)
    ///
    /// # Errors
    ///
    /// `BdtrNotSupported`; `NotConfigured`.
    pub fn set_automatic_output(&mut self, enabled: bool) -> TimerResult<()> {
        self.write_bdtr_flag(regs::BDTR_AOE, enabled)
    }

    /// Arm or disarm the break input and set its active level
    ///
    /// # Errors
    ///
    /// `BdtrNotSupported`; `NotConfigured`.
    pub fn set_break(&mut self, enabled: bool, polarity: OutputPolarity) -> TimerResult<()> {
        self.check_bdtr()?;
        self.regs.modify(regs::BDTR, |mut r| {
            r &= !(regs::BDTR_BKE | regs::BDTR_BKP);
            if enabled {
                r |= regs::BDTR_BKE;
            }
            if polarity == OutputPolarity::ActiveHigh {
                r |= regs::BDTR_BKP;
            }
            r
        });
        Ok(())
    }

    /// Freeze break and dead-time settings until the next reset
    ///
    /// `LOCK` is write-once: the hardware ignores later writes.
    ///
    /// # Errors
    ///
    /// `BdtrNotSupported`; `NotConfigured`.
    pub fn set_lock_level(&mut self, level: LockLevel) -> TimerResult<()> {
        self.check_bdtr()?;
        self.regs.write_field(regs::BDTR_LOCK, level.raw());
        Ok(())
    }

    fn write_bdtr_flag(&mut self, mask: u32, on: bool) -> TimerResult<()> {
        self.check_bdtr()?;
        if on {
            self.regs.set_bits(regs::BDTR, mask);
        } else {
            self.regs.clear_bits(regs::BDTR, mask);
        }
        Ok(())
    }

    /// Output levels of a channel and its complement while `MOE` is clear
    ///
    /// # Errors
    ///
    /// `BdtrNotSupported` outside TIM1/TIM8; channel checks as
    /// [`Timer::enable_channel`]; `InvalidTimerChannelAssignment` for a
    /// high complementary idle level on channel 4, which has no
    /// complement.
    pub fn set_idle_states(
        &mut self,
        ch: Channel,
        output: IdleState,
        complementary: IdleState,
    ) -> TimerResult<()> {
        self.check_bdtr()?;
        self.check_channel(ch)?;
        if ch == Channel::Ch4 && complementary == IdleState::High {
            return Err(TimerError::InvalidTimerChannelAssignment);
        }
        let shift = 8 + 2 * (ch.raw() - 1);
        self.regs.modify(regs::CR2, |r| {
            let cleared = r & !(0b11 << shift);
            cleared | (output.raw() << shift) | (complementary.raw() << (shift + 1))
        });
        Ok(())
    }

    /// Enable or disable the complementary output `CHxN`
    ///
    /// # Errors
    ///
    /// `CapcompNotSupported` outside TIM1/TIM8;
    /// `InvalidTimerChannelAssignment` on channel 4; `NotConfigured`.
    pub fn enable_complementary(&mut self, ch: Channel, enabled: bool) -> TimerResult<()> {
        self.check_complementary(ch)?;
        let bit = ch.ccer(CCER_NE);
        if enabled {
            self.regs.set_bits(regs::CCER, bit);
        } else {
            self.regs.clear_bits(regs::CCER, bit);
        }
        Ok(())
    }

    /// Polarity of the complementary output
    ///
    /// # Errors
    ///
    /// As [`Timer::enable_complementary`].
    pub fn set_complementary_polarity(
        &mut self,
        ch: Channel,
        polarity: OutputPolarity,
    ) -> TimerResult<()> {
        self.check_complementary(ch)?;
        let bit = ch.ccer(CCER_NP);
        match polarity {
            OutputPolarity::ActiveHigh => self.regs.clear_bits(regs::CCER, bit),
            OutputPolarity::ActiveLow => self.regs.set_bits(regs::CCER, bit),
        }
        Ok(())
    }

    /// Preload `CCxE`, `CCxNE` and `OCxM` until a COM event (`CCPC`)
    ///
    /// # Errors
    ///
    /// `CapcompNotSupported` outside TIM1/TIM8; `NotConfigured`.
    pub fn set_ccpc(&mut self, enabled: bool) -> TimerResult<()> {
        self.ensure_configured()?;
        if !self.caps.advanced {
            return Err(TimerError::CapcompNotSupported);
        }
        if enabled {
            self.regs.set_bits(regs::CR2, regs::CR2_CCPC);
        } else {
            self.regs.clear_bits(regs::CR2, regs::CR2_CCPC);
        }
        Ok(())
    }
}
