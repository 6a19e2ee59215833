//! Trigger output, slave mode controller and external trigger input

use super::channel::{EventPrescaler, Filter};
use super::{regs, Timer, TimerError, TimerResult};
use crate::reg::RegisterAccess;

config_enum! {
    /// Trigger output source (`MMS`)
    pub enum MasterMode: TimerError::InvalidMasterSlaveModeType {
        /// `UG` bit
        Reset = 0,
        /// Counter enable
        Enable = 1,
        /// Update event
        Update = 2,
        /// Pulse on every capture or compare match
        ComparePulse = 3,
        /// `OC1REF`
        Oc1Ref = 4,
        /// `OC2REF`
        Oc2Ref = 5,
        /// `OC3REF`
        Oc3Ref = 6,
        /// `OC4REF`
        Oc4Ref = 7,
    }
}

impl MasterMode {
    /// Capture/compare channels the mode needs, 0 if none
    const fn channels_needed(self) -> u32 {
        match self {
            Self::Reset | Self::Enable | Self::Update => 0,
            Self::ComparePulse | Self::Oc1Ref => 1,
            Self::Oc2Ref => 2,
            Self::Oc3Ref => 3,
            Self::Oc4Ref => 4,
        }
    }
}

config_enum! {
    /// What the trigger input does to the counter (`SMS`)
    pub enum SlaveMode: TimerError::InvalidTriggerAction {
        /// Slave mode controller off, counter clocked internally
        Disabled = 0,
        /// Encoder, counting on TI2 edges
        Encoder1 = 1,
        /// Encoder, counting on TI1 edges
        Encoder2 = 2,
        /// Encoder, counting on both
        Encoder3 = 3,
        /// Rising trigger edge resets the counter
        Reset = 4,
        /// Counter runs while the trigger is high
        Gated = 5,
        /// Rising trigger edge starts the counter
        Trigger = 6,
        /// Counter clocked by trigger edges
        ExternalClock = 7,
    }
}

impl SlaveMode {
    const fn is_encoder(self) -> bool {
        matches!(self, Self::Encoder1 | Self::Encoder2 | Self::Encoder3)
    }
}

config_enum! {
    /// Trigger input (`TS`)
    pub enum TriggerSource: TimerError::InvalidTrigger {
        /// Internal trigger 0
        Itr0 = 0,
        /// Internal trigger 1
        Itr1 = 1,
        /// Internal trigger 2
        Itr2 = 2,
        /// Internal trigger 3
        Itr3 = 3,
        /// TI1 edge detector
        Ti1FEdge = 4,
        /// Filtered timer input 1
        Ti1Fp1 = 5,
        /// Filtered timer input 2
        Ti2Fp2 = 6,
        /// Filtered external trigger
        Etrf = 7,
    }
}

/// External trigger conditioning (`ETF`, `ETPS`, `ETP`, `ECE`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct ExternalTrigger {
    /// Digital filter
    pub filter: Filter,
    /// Edge divider, applied before the filter
    pub prescaler: EventPrescaler,
    /// Count falling edges / low level instead of rising / high
    pub inverted: bool,
    /// Clock the counter from `ETRF` directly (external clock mode 2)
    pub clock_mode2: bool,
}

impl ExternalTrigger {
    /// Unfiltered, undivided, rising edges, not used as clock
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: Filter::None,
            prescaler: EventPrescaler::Div1,
            inverted: false,
            clock_mode2: false,
        }
    }
}

impl Default for ExternalTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RegisterAccess> Timer<R> {
    /// Select what the timer sends on `TRGO`
    ///
    /// # Errors
    ///
    /// `InvalidMasterSlaveModeType` on timers without `TRGO`;
    /// `InvalidTimerChannelAssignment` for a compare source above the
    /// timer's channel count; `NotConfigured`.
    pub fn set_master_mode(&mut self, mode: MasterMode) -> TimerResult<()> {
        self.ensure_configured()?;
        if !self.caps.master {
            return Err(TimerError::InvalidMasterSlaveModeType);
        }
        if mode.channels_needed() > u32::from(self.caps.channels) {
            return Err(TimerError::InvalidTimerChannelAssignment);
        }
        self.regs.write_field(regs::CR2_MMS, mode.raw());
        Ok(())
    }

    /// Select the slave mode controller action
    ///
    /// # Errors
    ///
    /// `InvalidMasterSlaveModeType` on timers without a slave controller;
    /// `InvalidTriggerAction` for encoder modes on timers without two
    /// channels and up/down counting; `NotConfigured`; `TimerRunning`.
    pub fn set_slave_mode(&mut self, mode: SlaveMode) -> TimerResult<()> {
        if !self.caps.slave {
            return Err(TimerError::InvalidMasterSlaveModeType);
        }
        self.ensure_stopped()?;
        if mode.is_encoder() && (self.caps.channels < 2 || !self.caps.up_down) {
            return Err(TimerError::InvalidTriggerAction);
        }
        self.regs.write_field(regs::SMCR_SMS, mode.raw());
        Ok(())
    }

    /// Current slave mode
    #[must_use]
    pub fn slave_mode(&self) -> SlaveMode {
        match self.regs.read_field(regs::SMCR_SMS) {
            0 => SlaveMode::Disabled,
            1 => SlaveMode::Encoder1,
            2 => SlaveMode::Encoder2,
            3 => SlaveMode::Encoder3,
            4 => SlaveMode::Reset,
            5 => SlaveMode::Gated,
            6 => SlaveMode::Trigger,
            _ => SlaveMode::ExternalClock,
        }
    }

    /// Select the trigger input
    ///
    /// # Errors
    ///
    /// `InvalidMasterSlaveModeType` on timers without a slave controller;
    /// `InvalidTrigger` for `ETRF` or `TI2FP2` on timers lacking that
    /// input; `NotConfigured`; `TimerRunning`.
    pub fn set_trigger(&mut self, source: TriggerSource) -> TimerResult<()> {
        if !self.caps.slave {
            return Err(TimerError::InvalidMasterSlaveModeType);
        }
        self.ensure_stopped()?;
        let missing = match source {
            TriggerSource::Etrf => !self.caps.external_trigger,
            TriggerSource::Ti2Fp2 => self.caps.channels < 2,
            _ => false,
        };
        if missing {
            return Err(TimerError::InvalidTrigger);
        }
        self.regs.write_field(regs::SMCR_TS, source.raw());
        Ok(())
    }

    /// Delay the trigger input so master and slaves start together (`MSM`)
    ///
    /// # Errors
    ///
    /// `InvalidMasterSlaveModeType` unless the timer is both master and
    /// slave; `NotConfigured`.
    pub fn set_master_slave_sync(&mut self, enabled: bool) -> TimerResult<()> {
        self.ensure_configured()?;
        if !(self.caps.master && self.caps.slave) {
            return Err(TimerError::InvalidMasterSlaveModeType);
        }
        if enabled {
            self.regs.set_bits(regs::SMCR, regs::SMCR_MSM);
        } else {
            self.regs.clear_bits(regs::SMCR, regs::SMCR_MSM);
        }
        Ok(())
    }

    /// Condition the `ETR` input
    ///
    /// # Errors
    ///
    /// `InvalidTrigger` on timers without `ETR`; `NotConfigured`.
    pub fn set_external_trigger(&mut self, etr: &ExternalTrigger) -> TimerResult<()> {
        self.ensure_configured()?;
        if !self.caps.external_trigger {
            return Err(TimerError::InvalidTrigger);
        }
        self.regs.modify(regs::SMCR, |r| {
            let mut r = regs::SMCR_ETF.insert(r, etr.filter.raw());
            r = regs::SMCR_ETPS.insert(r, etr.prescaler.raw());
            r &= !(regs::SMCR_ETP | regs::SMCR_ECE);
            if etr.inverted {
                r |= regs::SMCR_ETP;
            }
            if etr.clock_mode2 {
                r |= regs::SMCR_ECE;
            }
            r
        });
        Ok(())
    }
}
