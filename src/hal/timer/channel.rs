//! Capture/compare channels
//!
//! Each channel owns one byte of `CCMR1`/`CCMR2`, one nibble of `CCER` and
//! one `CCRx` register. The byte's meaning depends on `CCxS`: output
//! compare fields when the channel is an output, prescaler and filter when
//! it is an input. Output-only operations on an input channel (and the
//! reverse) fail with [`TimerError::InvalidChannelType`].

use super::{regs, Apply, Timer, TimerError, TimerResult};
use crate::reg::{Field, RegisterAccess};

config_enum! {
    /// Capture/compare channel
    pub enum Channel: TimerError::InvalidChannel {
        /// Channel 1
        Ch1 = 1,
        /// Channel 2
        Ch2 = 2,
        /// Channel 3
        Ch3 = 3,
        /// Channel 4
        Ch4 = 4,
    }
}

impl Channel {
    const fn index(self) -> usize {
        self.raw() as usize - 1
    }

    /// Byte offset of `CCRx`
    const fn ccr(self) -> usize {
        regs::CCR1 + 4 * self.index()
    }

    /// Field of one channel's byte in `CCMRx`
    #[allow(clippy::cast_possible_truncation)]
    pub(super) const fn ccmr(self, pos: u8, width: u8) -> Field {
        let offset = regs::CCMR1 + 4 * (self.index() / 2);
        Field::new(offset, pos + 8 * (self.index() % 2) as u8, width)
    }

    /// `CCER` bits of this channel, given their mask for channel 1
    pub(super) const fn ccer(self, ch1_mask: u32) -> u32 {
        ch1_mask << (4 * self.index())
    }

    /// Overcapture flag in `SR`
    const fn overcapture_mask(self) -> u32 {
        1 << (regs::SR_CCOF_SHIFT + self.raw())
    }
}

config_enum! {
    /// Channel direction and input source (`CCxS`)
    pub enum ChannelMapping: TimerError::InvalidChannelType {
        /// Output compare
        Output = 0,
        /// Input capture from the channel's own pin
        InputDirect = 1,
        /// Input capture from the paired channel's pin
        InputIndirect = 2,
        /// Input capture from the trigger controller
        InputTrc = 3,
    }
}

impl ChannelMapping {
    /// Whether the channel captures
    #[must_use]
    pub const fn is_input(self) -> bool {
        !matches!(self, Self::Output)
    }
}

config_enum! {
    /// Output reference behaviour on compare match (`OCxM`)
    pub enum OutputCompareMode: TimerError::InvalidOutputMode {
        /// Output unaffected; timing only
        Frozen = 0,
        /// Driven active on match
        ActiveOnMatch = 1,
        /// Driven inactive on match
        InactiveOnMatch = 2,
        /// Toggled on match
        Toggle = 3,
        /// Held inactive
        ForceInactive = 4,
        /// Held active
        ForceActive = 5,
        /// Active while counter < compare (upcounting)
        Pwm1 = 6,
        /// Inactive while counter < compare (upcounting)
        Pwm2 = 7,
    }
}

config_enum! {
    /// Output polarity (`CCxP`, or `CCxNP` on complementary outputs)
    pub enum OutputPolarity: TimerError::InvalidOutputMode {
        /// Active high
        ActiveHigh = 0,
        /// Active low
        ActiveLow = 1,
    }
}

config_enum! {
    /// Input capture edge, as the `CCxNP:CCxP` pair
    pub enum InputEdge: TimerError::InvalidChannelType {
        /// Rising edge
        Rising = 0b00,
        /// Falling edge
        Falling = 0b01,
        /// Both edges
        Both = 0b11,
    }
}

config_enum! {
    /// Capture every n-th event (`ICxPSC`, `ETPS`)
    pub enum EventPrescaler: TimerError::InvalidClockDivider {
        /// Every event
        Div1 = 0,
        /// Every second event
        Div2 = 1,
        /// Every fourth event
        Div4 = 2,
        /// Every eighth event
        Div8 = 3,
    }
}

config_enum! {
    /// Digital input filter: sampling clock and samples per valid level
    pub enum Filter: TimerError::InvalidExtTriggerFilter {
        /// No filter, sampled at f_DTS
        None = 0,
        /// f_CK_INT, 2 samples
        CkIntN2 = 1,
        /// f_CK_INT, 4 samples
        CkIntN4 = 2,
        /// f_CK_INT, 8 samples
        CkIntN8 = 3,
        /// f_DTS/2, 6 samples
        DtsDiv2N6 = 4,
        /// f_DTS/2, 8 samples
        DtsDiv2N8 = 5,
        /// f_DTS/4, 6 samples
        DtsDiv4N6 = 6,
        /// f_DTS/4, 8 samples
        DtsDiv4N8 = 7,
        /// f_DTS/8, 6 samples
        DtsDiv8N6 = 8,
        /// f_DTS/8, 8 samples
        DtsDiv8N8 = 9,
        /// f_DTS/16, 5 samples
        DtsDiv16N5 = 10,
        /// f_DTS/16, 6 samples
        DtsDiv16N6 = 11,
        /// f_DTS/16, 8 samples
        DtsDiv16N8 = 12,
        /// f_DTS/32, 5 samples
        DtsDiv32N5 = 13,
        /// f_DTS/32, 6 samples
        DtsDiv32N6 = 14,
        /// f_DTS/32, 8 samples
        DtsDiv32N8 = 15,
    }
}

const CCER_E: u32 = 1 << 0;
const CCER_P: u32 = 1 << 1;
const CCER_NP: u32 = 1 << 3;

impl<R: RegisterAccess> Timer<R> {
    pub(super) fn check_channel(&self, ch: Channel) -> TimerResult<()> {
        self.ensure_configured()?;
        if self.caps.channels == 0 {
            Err(TimerError::CapcompNotSupported)
        } else if ch.raw() > u32::from(self.caps.channels) {
            Err(TimerError::InvalidTimerChannelAssignment)
        } else {
            Ok(())
        }
    }

    fn check_output(&self, ch: Channel) -> TimerResult<()> {
        self.check_channel(ch)?;
        if self.channel_mapping(ch).is_input() {
            Err(TimerError::InvalidChannelType)
        } else {
            Ok(())
        }
    }

    fn check_input(&self, ch: Channel) -> TimerResult<()> {
        self.check_channel(ch)?;
        if self.channel_mapping(ch).is_input() {
            Ok(())
        } else {
            Err(TimerError::InvalidChannelType)
        }
    }

    fn write_ccmr_flag(&mut self, ch: Channel, pos: u8, on: bool) {
        self.regs.write_field(ch.ccmr(pos, 1), u32::from(on));
    }

    // =========================================================================
    // Mapping and enable
    // =========================================================================

    /// Current `CCxS` of a channel
    #[must_use]
    pub fn channel_mapping(&self, ch: Channel) -> ChannelMapping {
        match self.regs.read_field(ch.ccmr(0, 2)) {
            0 => ChannelMapping::Output,
            1 => ChannelMapping::InputDirect,
            2 => ChannelMapping::InputIndirect,
            _ => ChannelMapping::InputTrc,
        }
    }

    /// Make a channel an output or select its capture input
    ///
    /// # Errors
    ///
    /// `NotConfigured`, `CapcompNotSupported` or
    /// `InvalidTimerChannelAssignment`; `ChannelEnabled` while `CCxE` is
    /// set; `InvalidChannelType` for `InputTrc` on timers without a
    /// trigger controller.
    pub fn set_channel_mapping(&mut self, ch: Channel, mapping: ChannelMapping) -> TimerResult<()> {
        self.check_channel(ch)?;
        if self.is_channel_enabled(ch) {
            return Err(TimerError::ChannelEnabled);
        }
        if mapping == ChannelMapping::InputTrc && !self.caps.slave {
            return Err(TimerError::InvalidChannelType);
        }
        self.regs.write_field(ch.ccmr(0, 2), mapping.raw());
        Ok(())
    }

    /// Set `CCxE`: drive the output or arm the capture
    ///
    /// # Errors
    ///
    /// `NotConfigured`, `CapcompNotSupported` or
    /// `InvalidTimerChannelAssignment`.
    pub fn enable_channel(&mut self, ch: Channel) -> TimerResult<()> {
        self.check_channel(ch)?;
        self.regs.set_bits(regs::CCER, ch.ccer(CCER_E));
        Ok(())
    }

    /// Clear `CCxE`
    ///
    /// # Errors
    ///
    /// As [`Timer::enable_channel`].
    pub fn disable_channel(&mut self, ch: Channel) -> TimerResult<()> {
        self.check_channel(ch)?;
        self.regs.clear_bits(regs::CCER, ch.ccer(CCER_E));
        Ok(())
    }

    /// Whether `CCxE` is set
    #[must_use]
    pub fn is_channel_enabled(&self, ch: Channel) -> bool {
        self.regs.is_set(regs::CCER, ch.ccer(CCER_E))
    }

    /// Output polarity of an output channel
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`]; `InvalidChannelType`
    /// on input channels.
    pub fn set_channel_polarity(
        &mut self,
        ch: Channel,
        polarity: OutputPolarity,
    ) -> TimerResult<()> {
        self.check_output(ch)?;
        let bit = ch.ccer(CCER_P);
        match polarity {
            OutputPolarity::ActiveHigh => self.regs.clear_bits(regs::CCER, bit),
            OutputPolarity::ActiveLow => self.regs.set_bits(regs::CCER, bit),
        }
        Ok(())
    }

    /// Capture edge of an input channel
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`]; `InvalidChannelType`
    /// on output channels.
    pub fn set_input_edge(&mut self, ch: Channel, edge: InputEdge) -> TimerResult<()> {
        self.check_input(ch)?;
        let both = ch.ccer(CCER_P | CCER_NP);
        let mut set = 0;
        if edge.raw() & 0b01 != 0 {
            set |= ch.ccer(CCER_P);
        }
        if edge.raw() & 0b10 != 0 {
            set |= ch.ccer(CCER_NP);
        }
        self.regs.modify(regs::CCER, |r| (r & !both) | set);
        Ok(())
    }

    // =========================================================================
    // Compare value
    // =========================================================================

    /// Write the compare value of an output channel
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`]; `InvalidChannelType`
    /// on input channels, whose `CCRx` is read-only; `InvalidCounterValue`
    /// above the counter width.
    pub fn set_capture_compare(&mut self, ch: Channel, value: u32) -> TimerResult<Apply> {
        self.check_output(ch)?;
        if value > self.counter_max() {
            return Err(TimerError::InvalidCounterValue);
        }
        self.regs.write(ch.ccr(), value);
        let preloaded = self.regs.read_field(ch.ccmr(3, 1)) != 0;
        Ok(self.commit(preloaded))
    }

    /// Compare value, or the last captured count on input channels
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`].
    pub fn capture_compare(&self, ch: Channel) -> TimerResult<u32> {
        self.check_channel(ch)?;
        Ok(self.regs.read(ch.ccr()) & self.counter_max())
    }

    /// Buffer `CCRx` until the next update event (`OCxPE`)
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`]; `InvalidChannelType`
    /// on input channels.
    pub fn enable_compare_preload(&mut self, ch: Channel, enabled: bool) -> TimerResult<()> {
        self.check_output(ch)?;
        self.write_ccmr_flag(ch, 3, enabled);
        Ok(())
    }

    // =========================================================================
    // Output compare
    // =========================================================================

    /// Output reference behaviour (`OCxM`)
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`]; `InvalidChannelType`
    /// on input channels.
    pub fn set_output_compare_mode(
        &mut self,
        ch: Channel,
        mode: OutputCompareMode,
    ) -> TimerResult<()> {
        self.check_output(ch)?;
        self.regs.write_field(ch.ccmr(4, 3), mode.raw());
        Ok(())
    }

    /// Output compare mode of a channel
    #[must_use]
    pub fn output_compare_mode(&self, ch: Channel) -> OutputCompareMode {
        match self.regs.read_field(ch.ccmr(4, 3)) {
            0 => OutputCompareMode::Frozen,
            1 => OutputCompareMode::ActiveOnMatch,
            2 => OutputCompareMode::InactiveOnMatch,
            3 => OutputCompareMode::Toggle,
            4 => OutputCompareMode::ForceInactive,
            5 => OutputCompareMode::ForceActive,
            6 => OutputCompareMode::Pwm1,
            _ => OutputCompareMode::Pwm2,
        }
    }

    /// React to a trigger edge without waiting for the compare (`OCxFE`)
    ///
    /// # Errors
    ///
    /// As [`Timer::set_output_compare_mode`].
    pub fn set_output_compare_fast(&mut self, ch: Channel, enabled: bool) -> TimerResult<()> {
        self.check_output(ch)?;
        self.write_ccmr_flag(ch, 2, enabled);
        Ok(())
    }

    /// Clear the output reference on a high `ETRF` level (`OCxCE`)
    ///
    /// # Errors
    ///
    /// As [`Timer::set_output_compare_mode`]; `InvalidTrigger` on timers
    /// without an external trigger input.
    pub fn set_output_compare_clear(&mut self, ch: Channel, enabled: bool) -> TimerResult<()> {
        self.check_output(ch)?;
        if enabled && !self.caps.external_trigger {
            return Err(TimerError::InvalidTrigger);
        }
        self.write_ccmr_flag(ch, 7, enabled);
        Ok(())
    }

    /// Edge-aligned PWM: output mapping, `Pwm1`, compare preload, duty
    /// written, channel enabled
    ///
    /// Every check runs before the first register write.
    ///
    /// # Errors
    ///
    /// As [`Timer::set_channel_mapping`] and [`Timer::set_capture_compare`].
    pub fn set_pwm(&mut self, ch: Channel, duty: u32) -> TimerResult<Apply> {
        self.check_channel(ch)?;
        let remap = self.channel_mapping(ch).is_input();
        if remap && self.is_channel_enabled(ch) {
            return Err(TimerError::ChannelEnabled);
        }
        if duty > self.counter_max() {
            return Err(TimerError::InvalidCounterValue);
        }

        if remap {
            self.regs.write_field(ch.ccmr(0, 2), ChannelMapping::Output.raw());
        }
        self.regs.write_field(ch.ccmr(4, 3), OutputCompareMode::Pwm1.raw());
        self.write_ccmr_flag(ch, 3, true);
        self.regs.write(ch.ccr(), duty);
        let apply = self.commit(true);
        self.regs.set_bits(regs::CCER, ch.ccer(CCER_E));
        debug!("TIM{} CH{} PWM duty {}", self.id.raw(), ch.raw(), duty);
        Ok(apply)
    }

    // =========================================================================
    // Input capture
    // =========================================================================

    /// Capture every n-th edge (`ICxPSC`)
    ///
    /// # Errors
    ///
    /// Channel checks as [`Timer::enable_channel`]; `InvalidChannelType`
    /// on output channels.
    pub fn set_input_prescaler(
        &mut self,
        ch: Channel,
        prescaler: EventPrescaler,
    ) -> TimerResult<()> {
        self.check_input(ch)?;
        self.regs.write_field(ch.ccmr(2, 2), prescaler.raw());
        Ok(())
    }

    /// Digital filter on the capture input (`ICxF`)
    ///
    /// # Errors
    ///
    /// As [`Timer::set_input_prescaler`].
    pub fn set_input_filter(&mut self, ch: Channel, filter: Filter) -> TimerResult<()> {
        self.check_input(ch)?;
        self.regs.write_field(ch.ccmr(4, 4), filter.raw());
        Ok(())
    }

    /// Whether a capture was lost because `CCxIF` was still set
    #[must_use]
    pub fn is_overcaptured(&self, ch: Channel) -> bool {
        self.regs.is_set(regs::SR, ch.overcapture_mask())
    }

    /// Clear the overcapture flag
    pub fn clear_overcapture(&mut self, ch: Channel) {
        self.regs.clear_flags(regs::SR, ch.overcapture_mask());
    }
}
