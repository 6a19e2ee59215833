//! ADC Driver
//!
//! Polled and interrupt-flagged driver for the 12-bit successive
//! approximation converters ADC1 to ADC3. Conversions are started by
//! software (`SWSTART`); results are read from `DR` or moved by DMA through
//! [`Adc::data_register_address`].
//!
//! The prescaler and the internal temperature/VREFINT path live in the
//! block shared by all three converters and are driven through
//! [`AdcCommon`].

use crate::config::{base, MAX_ADCCLK_MHZ};
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::{Field, RegisterAccess};

/// Size of one converter's register block in words
pub const BLOCK_WORDS: usize = 20;

/// Size of the common register block in words
pub const COMMON_BLOCK_WORDS: usize = 3;

/// Longest regular sequence
pub const MAX_SEQUENCE_LEN: usize = 16;

mod regs {
    use crate::reg::Field;

    pub const SR: usize = 0x00;
    pub const CR1: usize = 0x04;
    pub const CR2: usize = 0x08;
    pub const SMPR1: usize = 0x0C;
    pub const SMPR2: usize = 0x10;
    pub const HTR: usize = 0x24;
    pub const LTR: usize = 0x28;
    pub const SQR1: usize = 0x2C;
    pub const SQR2: usize = 0x30;
    pub const SQR3: usize = 0x34;
    pub const DR: usize = 0x4C;

    pub const SR_EOC: u32 = 1 << 1;

    pub const CR1_AWDCH: Field = Field::new(CR1, 0, 5);
    pub const CR1_SCAN: u32 = 1 << 8;
    pub const CR1_AWDSGL: u32 = 1 << 9;
    pub const CR1_JAWDEN: u32 = 1 << 22;
    pub const CR1_AWDEN: u32 = 1 << 23;
    pub const CR1_RES: Field = Field::new(CR1, 24, 2);
    pub const CR1_WATCHDOG: u32 = CR1_AWDSGL | CR1_JAWDEN | CR1_AWDEN;

    pub const CR2_ADON: u32 = 1 << 0;
    pub const CR2_CONT: u32 = 1 << 1;
    pub const CR2_DMA: u32 = 1 << 8;
    pub const CR2_DDS: u32 = 1 << 9;
    pub const CR2_SWSTART: u32 = 1 << 30;

    pub const SQR1_L: Field = Field::new(SQR1, 20, 4);

    pub const THRESHOLD_MAX: u32 = 0xFFF;

    pub const CCR: usize = 0x04;
    pub const CCR_ADCPRE: Field = Field::new(CCR, 16, 2);
    pub const CCR_TSVREFE: u32 = 1 << 23;
}

status_codes! {
    /// ADC status codes
    pub enum AdcError {
        /// Resolution other than 12, 10, 8 or 6 bits
        InvalidResolution = -120 => "invalid resolution",
        /// Unknown interrupt source
        InvalidIrqType = -121 => "invalid IRQ type",
        /// Channel outside 0..=18
        InvalidChannelNum = -122 => "invalid channel number",
        /// Unknown sampling time
        InvalidNumSampleCycles = -123 => "invalid number of sample cycles",
        /// Regular sequence empty or longer than 16
        InvalidSequenceLength = -124 => "invalid sequence length",
        /// Unknown analog watchdog mode
        InvalidWatchdogType = -125 => "invalid watchdog type",
        /// Address is not an ADC block
        InvalidAdc = -126 => "invalid ADC",
        /// Watchdog threshold above 12 bits or low above high
        InvalidThreshold = -127 => "invalid watchdog threshold",
        /// Prescaler leaves ADCCLK above its limit
        InvalidPrescaler = -128 => "invalid prescaler",
        /// Unknown status flag
        InvalidFlag = -129 => "invalid flag",
    }
}

/// ADC operation result
pub type AdcResult<T> = Result<T, AdcError>;

config_enum! {
    /// ADC instance
    pub enum AdcId: AdcError::InvalidAdc {
        /// ADC1
        Adc1 = 1,
        /// ADC2 (STM32F446 only)
        Adc2 = 2,
        /// ADC3 (STM32F446 only)
        Adc3 = 3,
    }
}

impl AdcId {
    /// Base address of the register block
    #[must_use]
    pub const fn base(self) -> usize {
        match self {
            Self::Adc1 => base::ADC1,
            Self::Adc2 => base::ADC1 + 0x100,
            Self::Adc3 => base::ADC1 + 0x200,
        }
    }

    /// Clock gate of the instance
    #[must_use]
    pub const fn bus_clock(self) -> BusClock {
        match self {
            Self::Adc1 => BusClock::new(Bus::Apb2, 8),
            Self::Adc2 => BusClock::new(Bus::Apb2, 9),
            Self::Adc3 => BusClock::new(Bus::Apb2, 10),
        }
    }

    /// Instance whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidAdc` for any other address.
    pub fn from_base(addr: usize) -> AdcResult<Self> {
        [Self::Adc1, Self::Adc2, Self::Adc3]
            .into_iter()
            .find(|id| id.base() == addr)
            .ok_or(AdcError::InvalidAdc)
    }
}

config_enum! {
    /// Conversion resolution (`RES`)
    pub enum Resolution: AdcError::InvalidResolution {
        /// 12 bits, 15 ADCCLK cycles
        Bits12 = 0,
        /// 10 bits, 13 ADCCLK cycles
        Bits10 = 1,
        /// 8 bits, 11 ADCCLK cycles
        Bits8 = 2,
        /// 6 bits, 9 ADCCLK cycles
        Bits6 = 3,
    }
}

impl Resolution {
    /// Largest conversion result
    #[must_use]
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Bits12 => 0xFFF,
            Self::Bits10 => 0x3FF,
            Self::Bits8 => 0xFF,
            Self::Bits6 => 0x3F,
        }
    }
}

config_enum! {
    /// Analog input
    pub enum AdcChannel: AdcError::InvalidChannelNum {
        /// IN0
        Ch0 = 0,
        /// IN1
        Ch1 = 1,
        /// IN2
        Ch2 = 2,
        /// IN3
        Ch3 = 3,
        /// IN4
        Ch4 = 4,
        /// IN5
        Ch5 = 5,
        /// IN6
        Ch6 = 6,
        /// IN7
        Ch7 = 7,
        /// IN8
        Ch8 = 8,
        /// IN9
        Ch9 = 9,
        /// IN10
        Ch10 = 10,
        /// IN11
        Ch11 = 11,
        /// IN12
        Ch12 = 12,
        /// IN13
        Ch13 = 13,
        /// IN14
        Ch14 = 14,
        /// IN15
        Ch15 = 15,
        /// IN16, temperature sensor on ADC1
        Ch16 = 16,
        /// IN17, VREFINT on ADC1
        Ch17 = 17,
        /// IN18, VBAT on ADC1
        Ch18 = 18,
    }
}

impl AdcChannel {
    /// 3-bit sampling time field in `SMPR1` or `SMPR2`
    const fn sample_time(self) -> Field {
        let n = self.raw();
        if n < 10 {
            Field::new(regs::SMPR2, (n * 3) as u8, 3)
        } else {
            Field::new(regs::SMPR1, ((n - 10) * 3) as u8, 3)
        }
    }
}

config_enum! {
    /// Sampling time in ADCCLK cycles (`SMPx`)
    pub enum SampleCycles: AdcError::InvalidNumSampleCycles {
        /// 3 cycles
        Cycles3 = 0,
        /// 15 cycles
        Cycles15 = 1,
        /// 28 cycles
        Cycles28 = 2,
        /// 56 cycles
        Cycles56 = 3,
        /// 84 cycles
        Cycles84 = 4,
        /// 112 cycles
        Cycles112 = 5,
        /// 144 cycles
        Cycles144 = 6,
        /// 480 cycles
        Cycles480 = 7,
    }
}

impl SampleCycles {
    /// Sampling time in ADCCLK cycles
    #[must_use]
    pub const fn cycles(self) -> u32 {
        match self {
            Self::Cycles3 => 3,
            Self::Cycles15 => 15,
            Self::Cycles28 => 28,
            Self::Cycles56 => 56,
            Self::Cycles84 => 84,
            Self::Cycles112 => 112,
            Self::Cycles144 => 144,
            Self::Cycles480 => 480,
        }
    }
}

config_enum! {
    /// Channels guarded by the analog watchdog
    pub enum WatchdogMode: AdcError::InvalidWatchdogType {
        /// Watchdog off
        Off = 0,
        /// Every injected channel
        AllInjected = 1,
        /// Every regular channel
        AllRegular = 2,
        /// Every regular and injected channel
        AllRegularAndInjected = 3,
        /// The `AWDCH` channel when injected
        SingleInjected = 4,
        /// The `AWDCH` channel when regular
        SingleRegular = 5,
        /// The `AWDCH` channel, regular or injected
        SingleRegularAndInjected = 6,
    }
}

impl WatchdogMode {
    /// `AWDSGL`, `JAWDEN` and `AWDEN` for this mode
    const fn cr1(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::AllInjected => regs::CR1_JAWDEN,
            Self::AllRegular => regs::CR1_AWDEN,
            Self::AllRegularAndInjected => regs::CR1_AWDEN | regs::CR1_JAWDEN,
            Self::SingleInjected => regs::CR1_AWDSGL | regs::CR1_JAWDEN,
            Self::SingleRegular => regs::CR1_AWDSGL | regs::CR1_AWDEN,
            Self::SingleRegularAndInjected => regs::CR1_WATCHDOG,
        }
    }
}

config_enum! {
    /// Interrupt sources (bit position in `CR1`)
    pub enum AdcInterrupt: AdcError::InvalidIrqType {
        /// End of regular conversion (`EOCIE`)
        RegularEoc = 5,
        /// Analog watchdog (`AWDIE`)
        Watchdog = 6,
        /// End of injected conversion (`JEOCIE`)
        InjectedEoc = 7,
        /// Overrun (`OVRIE`)
        Overrun = 26,
    }
}

config_enum! {
    /// Status flags (bit position in `SR`)
    pub enum AdcFlag: AdcError::InvalidFlag {
        /// Analog watchdog tripped (`AWD`)
        Watchdog = 0,
        /// Regular conversion done (`EOC`)
        RegularEoc = 1,
        /// Injected conversion done (`JEOC`)
        InjectedEoc = 2,
        /// Injected conversion started (`JSTRT`)
        InjectedStart = 3,
        /// Regular conversion started (`STRT`)
        RegularStart = 4,
        /// Result lost (`OVR`)
        Overrun = 5,
    }
}

impl AdcFlag {
    const fn mask(self) -> u32 {
        1 << self.raw()
    }
}

config_enum! {
    /// ADCCLK divider from PCLK2 (`ADCPRE`)
    pub enum AdcPrescaler: AdcError::InvalidPrescaler {
        /// PCLK2 / 2
        Div2 = 0,
        /// PCLK2 / 4
        Div4 = 1,
        /// PCLK2 / 6
        Div6 = 2,
        /// PCLK2 / 8
        Div8 = 3,
    }
}

impl AdcPrescaler {
    /// Division factor
    #[must_use]
    pub const fn divisor(self) -> u32 {
        (self.raw() + 1) * 2
    }

    /// Smallest divider keeping ADCCLK within its limit
    ///
    /// # Errors
    ///
    /// `InvalidPrescaler` when even `/8` is too fast.
    pub fn for_pclk2(pclk2_hz: u32) -> AdcResult<Self> {
        [Self::Div2, Self::Div4, Self::Div6, Self::Div8]
            .into_iter()
            .find(|div| pclk2_hz / div.divisor() <= MAX_ADCCLK_MHZ * 1_000_000)
            .ok_or(AdcError::InvalidPrescaler)
    }
}

/// `SQR1`, `SQR2` and `SQR3` words for a regular sequence
///
/// # Errors
///
/// `InvalidSequenceLength` for an empty sequence or one longer than
/// [`MAX_SEQUENCE_LEN`].
pub fn sequence_registers(channels: &[AdcChannel]) -> AdcResult<[u32; 3]> {
    if channels.is_empty() || channels.len() > MAX_SEQUENCE_LEN {
        return Err(AdcError::InvalidSequenceLength);
    }
    // Rank 1..=6 in SQR3, 7..=12 in SQR2, 13..=16 in SQR1
    let mut words = [0u32; 3];
    for (rank, ch) in channels.iter().enumerate() {
        let slot = 2 - rank / 6;
        words[slot] |= ch.raw() << ((rank % 6) * 5);
    }
    words[0] = regs::SQR1_L.insert(words[0], channels.len() as u32 - 1);
    Ok(words)
}

/// Driver for one converter
pub struct Adc<R> {
    id: AdcId,
    regs: R,
}

impl<R: RegisterAccess> Adc<R> {
    /// Wrap the register block of `id`
    pub fn new(id: AdcId, regs: R) -> Self {
        Self { id, regs }
    }

    /// Instance handled by this driver
    #[must_use]
    pub const fn id(&self) -> AdcId {
        self.id
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Turn the instance's bus clock on
    pub fn select<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(self.id.bus_clock());
    }

    /// Turn the instance's bus clock off
    pub fn deselect<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.disable_peripheral_clock(self.id.bus_clock());
    }

    /// Power the converter up (`ADON`)
    pub fn enable(&mut self) {
        self.regs.set_bits(regs::CR2, regs::CR2_ADON);
        debug!("ADC{} on", self.id.raw());
    }

    /// Power the converter down
    pub fn disable(&mut self) {
        self.regs.clear_bits(regs::CR2, regs::CR2_ADON);
    }

    /// Whether `ADON` is set
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.regs.is_set(regs::CR2, regs::CR2_ADON)
    }

    // =========================================================================
    // Conversion setup
    // =========================================================================

    /// Set the conversion resolution
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.regs.write_field(regs::CR1_RES, resolution.raw());
    }

    /// Current conversion resolution
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        match self.regs.read_field(regs::CR1_RES) {
            0 => Resolution::Bits12,
            1 => Resolution::Bits10,
            2 => Resolution::Bits8,
            _ => Resolution::Bits6,
        }
    }

    /// Set the sampling time of one channel
    pub fn set_sample_cycles(&mut self, channel: AdcChannel, cycles: SampleCycles) {
        self.regs.write_field(channel.sample_time(), cycles.raw());
    }

    /// Sampling time of one channel
    #[must_use]
    pub fn sample_cycles(&self, channel: AdcChannel) -> SampleCycles {
        match self.regs.read_field(channel.sample_time()) {
            0 => SampleCycles::Cycles3,
            1 => SampleCycles::Cycles15,
            2 => SampleCycles::Cycles28,
            3 => SampleCycles::Cycles56,
            4 => SampleCycles::Cycles84,
            5 => SampleCycles::Cycles112,
            6 => SampleCycles::Cycles144,
            _ => SampleCycles::Cycles480,
        }
    }

    /// Program the regular sequence, replacing the previous one
    ///
    /// Scan mode is switched on for sequences longer than one channel.
    ///
    /// # Errors
    ///
    /// `InvalidSequenceLength`; nothing is written in that case.
    pub fn set_channel_sequence(&mut self, channels: &[AdcChannel]) -> AdcResult<()> {
        let [sqr1, sqr2, sqr3] = sequence_registers(channels).inspect_err(|e| {
            warn!("ADC{} sequence rejected: {}", self.id.raw(), e);
        })?;
        self.regs.write(regs::SQR1, sqr1);
        self.regs.write(regs::SQR2, sqr2);
        self.regs.write(regs::SQR3, sqr3);
        if channels.len() > 1 {
            self.regs.set_bits(regs::CR1, regs::CR1_SCAN);
        } else {
            self.regs.clear_bits(regs::CR1, regs::CR1_SCAN);
        }
        Ok(())
    }

    /// Number of channels in the regular sequence
    #[must_use]
    pub fn sequence_len(&self) -> usize {
        self.regs.read_field(regs::SQR1_L) as usize + 1
    }

    /// Restart the sequence after every pass (`CONT`)
    pub fn set_continuous(&mut self, continuous: bool) {
        if continuous {
            self.regs.set_bits(regs::CR2, regs::CR2_CONT);
        } else {
            self.regs.clear_bits(regs::CR2, regs::CR2_CONT);
        }
    }

    /// Request a DMA transfer per result; `circular` keeps requests going
    /// after the last one (`DDS`)
    pub fn enable_dma(&mut self, circular: bool) {
        let dds = if circular { regs::CR2_DDS } else { 0 };
        self.regs.modify(regs::CR2, |r| (r & !regs::CR2_DDS) | regs::CR2_DMA | dds);
    }

    /// Stop DMA requests
    pub fn disable_dma(&mut self) {
        self.regs.clear_bits(regs::CR2, regs::CR2_DMA | regs::CR2_DDS);
    }

    /// Address of `DR`, the peripheral port for DMA
    #[must_use]
    pub const fn data_register_address(&self) -> u32 {
        (self.id.base() + regs::DR) as u32
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Start the regular sequence (`SWSTART`)
    pub fn start_conversion(&mut self) {
        self.regs.set_bits(regs::CR2, regs::CR2_SWSTART);
    }

    /// Whether a regular conversion has completed (`EOC`)
    #[must_use]
    pub fn is_conversion_finished(&self) -> bool {
        self.regs.is_set(regs::SR, regs::SR_EOC)
    }

    /// Last regular result; reading it clears `EOC`
    #[must_use]
    pub fn conversion_result(&self) -> u16 {
        (self.regs.read(regs::DR) & 0xFFFF) as u16
    }

    /// Convert one channel and wait for the result
    ///
    /// Replaces the regular sequence with `channel` alone.
    pub fn read_channel(&mut self, channel: AdcChannel) -> u16 {
        self.regs.write(regs::SQR1, 0);
        self.regs.write(regs::SQR2, 0);
        self.regs.write(regs::SQR3, channel.raw());
        self.regs.clear_bits(regs::CR1, regs::CR1_SCAN);
        self.start_conversion();
        self.regs.wait_set(regs::SR, regs::SR_EOC);
        self.conversion_result()
    }

    // =========================================================================
    // Analog watchdog
    // =========================================================================

    /// Select which channels the analog watchdog guards
    pub fn select_watchdog_type(&mut self, mode: WatchdogMode) {
        self.regs.modify(regs::CR1, |r| (r & !regs::CR1_WATCHDOG) | mode.cr1());
    }

    /// Current watchdog mode
    #[must_use]
    pub fn watchdog_type(&self) -> WatchdogMode {
        let bits = self.regs.read(regs::CR1) & regs::CR1_WATCHDOG;
        [
            WatchdogMode::Off,
            WatchdogMode::AllInjected,
            WatchdogMode::AllRegular,
            WatchdogMode::AllRegularAndInjected,
            WatchdogMode::SingleInjected,
            WatchdogMode::SingleRegular,
            WatchdogMode::SingleRegularAndInjected,
        ]
        .into_iter()
        .find(|mode| mode.cr1() == bits)
        .unwrap_or(WatchdogMode::Off)
    }

    /// Guard only `channel` on regular conversions
    pub fn enable_watchdog_for_single_channel(&mut self, channel: AdcChannel) {
        self.regs.modify(regs::CR1, |r| {
            regs::CR1_AWDCH.insert(r, channel.raw()) | regs::CR1_AWDSGL | regs::CR1_AWDEN
        });
    }

    /// Stop guarding `channel`; other guarded channels are left alone
    pub fn disable_watchdog_for_single_channel(&mut self, channel: AdcChannel) {
        let cr1 = self.regs.read(regs::CR1);
        if cr1 & regs::CR1_AWDSGL != 0 && regs::CR1_AWDCH.extract(cr1) == channel.raw() {
            self.regs.modify(regs::CR1, |r| {
                regs::CR1_AWDCH.insert(r, 0) & !regs::CR1_WATCHDOG
            });
        }
    }

    /// Guard every regular channel
    pub fn enable_watchdog_for_all_channels(&mut self) {
        self.select_watchdog_type(WatchdogMode::AllRegular);
    }

    /// Switch the watchdog off
    pub fn disable_watchdog_for_all_channels(&mut self) {
        self.select_watchdog_type(WatchdogMode::Off);
    }

    /// Window the watchdog compares results against
    ///
    /// # Errors
    ///
    /// `InvalidThreshold` above 12 bits or with `low > high`; neither
    /// threshold is written in that case.
    pub fn set_watchdog_thresholds(&mut self, low: u16, high: u16) -> AdcResult<()> {
        let (low, high) = (u32::from(low), u32::from(high));
        if low > regs::THRESHOLD_MAX || high > regs::THRESHOLD_MAX || low > high {
            return Err(AdcError::InvalidThreshold);
        }
        self.regs.write(regs::HTR, high);
        self.regs.write(regs::LTR, low);
        Ok(())
    }

    // =========================================================================
    // Interrupts and flags
    // =========================================================================

    /// Unmask an interrupt source
    pub fn enable_interrupt(&mut self, irq: AdcInterrupt) {
        self.regs.set_bits(regs::CR1, 1 << irq.raw());
    }

    /// Mask an interrupt source
    pub fn disable_interrupt(&mut self, irq: AdcInterrupt) {
        self.regs.clear_bits(regs::CR1, 1 << irq.raw());
    }

    /// Whether a status flag is set
    #[must_use]
    pub fn is_flag_set(&self, flag: AdcFlag) -> bool {
        self.regs.is_set(regs::SR, flag.mask())
    }

    /// Clear a status flag
    pub fn clear_flag(&mut self, flag: AdcFlag) {
        self.regs.clear_flags(regs::SR, flag.mask());
    }
}

/// Registers shared by all converters
pub struct AdcCommon<R> {
    regs: R,
}

impl<R: RegisterAccess> AdcCommon<R> {
    /// Wrap the common block
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Set the ADCCLK divider
    ///
    /// # Errors
    ///
    /// `InvalidPrescaler` when the current PCLK2 divided by `div` exceeds
    /// the ADCCLK limit; the divider is unchanged.
    pub fn set_prescaler<C: RegisterAccess>(
        &mut self,
        rcc: &Rcc<C>,
        div: AdcPrescaler,
    ) -> AdcResult<()> {
        let pclk2 = rcc.pclk2();
        if pclk2 / div.divisor() > MAX_ADCCLK_MHZ * 1_000_000 {
            warn!("ADCCLK {} Hz over limit", pclk2 / div.divisor());
            return Err(AdcError::InvalidPrescaler);
        }
        self.regs.write_field(regs::CCR_ADCPRE, div.raw());
        Ok(())
    }

    /// Current ADCCLK divider
    #[must_use]
    pub fn prescaler(&self) -> AdcPrescaler {
        match self.regs.read_field(regs::CCR_ADCPRE) {
            0 => AdcPrescaler::Div2,
            1 => AdcPrescaler::Div4,
            2 => AdcPrescaler::Div6,
            _ => AdcPrescaler::Div8,
        }
    }

    /// Connect the temperature sensor and VREFINT to ADC1 (`TSVREFE`)
    pub fn set_internal_channels(&mut self, enabled: bool) {
        if enabled {
            self.regs.set_bits(regs::CCR, regs::CCR_TSVREFE);
        } else {
            self.regs.clear_bits(regs::CCR, regs::CCR_TSVREFE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_time_layout() {
        assert_eq!(AdcChannel::Ch0.sample_time(), Field::new(regs::SMPR2, 0, 3));
        assert_eq!(AdcChannel::Ch9.sample_time(), Field::new(regs::SMPR2, 27, 3));
        assert_eq!(AdcChannel::Ch10.sample_time(), Field::new(regs::SMPR1, 0, 3));
        assert_eq!(AdcChannel::Ch18.sample_time(), Field::new(regs::SMPR1, 24, 3));
    }

    #[test]
    fn prescaler_divisors() {
        assert_eq!(AdcPrescaler::Div2.divisor(), 2);
        assert_eq!(AdcPrescaler::Div8.divisor(), 8);
        assert_eq!(AdcPrescaler::for_pclk2(16_000_000), Ok(AdcPrescaler::Div2));
        assert_eq!(AdcPrescaler::for_pclk2(84_000_000), Ok(AdcPrescaler::Div4));
        assert_eq!(AdcPrescaler::for_pclk2(90_000_000), Ok(AdcPrescaler::Div4));
    }

    #[test]
    fn watchdog_mode_bits_are_distinct() {
        let modes = <WatchdogMode as crate::validate::Domain>::ALL;
        for (i, a) in modes.iter().enumerate() {
            for b in &modes[i + 1..] {
                assert_ne!(a.cr1(), b.cr1());
            }
        }
    }
}
