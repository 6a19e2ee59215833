//! Reset and Clock Control
//!
//! Oscillator control, PLL configuration, bus prescalers, derived clock
//! frequencies and peripheral clock gating. Every driver's `select` and
//! `deselect` go through [`Rcc::enable_peripheral_clock`] and
//! [`Rcc::disable_peripheral_clock`].
//!
//! Frequencies are computed from the register contents, never cached, so
//! they stay correct after any sequence of reconfigurations.

use crate::config::{HSE_VALUE, HSI_VALUE, MAX_PCLK1_MHZ, MAX_SYSCLK_MHZ};
use crate::hal::flash::{wait_states_for, Flash};
use crate::hal::gpio::{PinNumber, Port};
use crate::reg::{Field, RegisterAccess, SimRegisters};

/// Size of the RCC register block in words
pub const BLOCK_WORDS: usize = 34;

mod regs {
    use crate::reg::Field;

    pub const CR: usize = 0x00;
    pub const PLLCFGR: usize = 0x04;
    pub const CFGR: usize = 0x08;
    pub const AHB1RSTR: usize = 0x10;
    pub const APB1RSTR: usize = 0x20;
    pub const APB2RSTR: usize = 0x24;
    pub const AHB1ENR: usize = 0x30;
    pub const APB1ENR: usize = 0x40;
    pub const APB2ENR: usize = 0x44;

    pub const CR_HSION: u32 = 1 << 0;
    pub const CR_HSIRDY: u32 = 1 << 1;
    pub const CR_HSEON: u32 = 1 << 16;
    pub const CR_HSERDY: u32 = 1 << 17;
    pub const CR_HSEBYP: u32 = 1 << 18;
    pub const CR_CSSON: u32 = 1 << 19;
    pub const CR_PLLON: u32 = 1 << 24;
    pub const CR_PLLRDY: u32 = 1 << 25;
    pub const CR_PLLI2SON: u32 = 1 << 26;
    pub const CR_PLLI2SRDY: u32 = 1 << 27;

    pub const HSITRIM: Field = Field::new(CR, 3, 5);
    pub const HSICAL: Field = Field::new(CR, 8, 8);

    pub const PLLM: Field = Field::new(PLLCFGR, 0, 6);
    pub const PLLN: Field = Field::new(PLLCFGR, 6, 9);
    pub const PLLP: Field = Field::new(PLLCFGR, 16, 2);
    pub const PLLSRC: Field = Field::new(PLLCFGR, 22, 1);
    pub const PLLQ: Field = Field::new(PLLCFGR, 24, 4);
    pub const PLLR: Field = Field::new(PLLCFGR, 28, 3);

    pub const SW: Field = Field::new(CFGR, 0, 2);
    pub const SWS: Field = Field::new(CFGR, 2, 2);
    pub const HPRE: Field = Field::new(CFGR, 4, 4);
    pub const PPRE1: Field = Field::new(CFGR, 10, 3);
    pub const PPRE2: Field = Field::new(CFGR, 13, 3);
    pub const MCO1: Field = Field::new(CFGR, 21, 2);
    pub const MCO1PRE: Field = Field::new(CFGR, 24, 3);
    pub const MCO2PRE: Field = Field::new(CFGR, 27, 3);
    pub const MCO2: Field = Field::new(CFGR, 30, 2);

    /// Reset values (RM0390 §6.3)
    pub const CR_RESET: u32 = 0x0000_0083;
    pub const PLLCFGR_RESET: u32 = 0x2400_3010;
}

/// Shift applied to HCLK for each HPRE encoding
const AHB_SHIFT: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 6, 7, 8, 9];

/// Shift applied to PCLKx for each PPREx encoding
const APB_SHIFT: [u8; 8] = [0, 0, 0, 0, 1, 2, 3, 4];

status_codes! {
    /// RCC status codes
    pub enum RccError {
        /// Unknown oscillator or SYSCLK source
        InvalidOscillator = -120 => "invalid oscillator",
        /// Unknown PLL input
        InvalidPllSource = -121 => "invalid PLL source",
        /// PLLM outside 2..=63
        InvalidPllM = -122 => "invalid PLLM",
        /// PLLN outside 50..=432
        InvalidPllN = -123 => "invalid PLLN",
        /// PLLP not one of 2, 4, 6, 8
        InvalidPllP = -124 => "invalid PLLP",
        /// VCO input or output frequency out of range
        InvalidVcoFreq = -125 => "invalid VCO frequency",
        /// Requested SYSCLK exceeds the device limit
        InvalidSysclkFreq = -126 => "invalid SYSCLK frequency",
        /// Unknown AHB divider
        InvalidAhbPrescaler = -127 => "invalid AHB prescaler",
        /// Unknown APB divider
        InvalidApbPrescaler = -128 => "invalid APB prescaler",
        /// HSI trim value above 31
        InvalidHsiTrim = -129 => "invalid HSI trim",
        /// Clock not routable to the chosen MCO pin
        InvalidMcoSource = -130 => "invalid MCO source",
        /// Unknown MCO divider
        InvalidMcoPrescaler = -131 => "invalid MCO prescaler",
        /// Source oscillator not running
        OscillatorNotReady = -132 => "oscillator not ready",
        /// Oscillator or PLL currently drives SYSCLK or is locked
        OscillatorInUse = -133 => "oscillator in use",
        /// PLLQ outside 2..=15
        InvalidPllQ = -134 => "invalid PLLQ",
    }
}

/// RCC operation result
pub type RccResult<T> = Result<T, RccError>;

config_enum! {
    /// System clock source (`SW`)
    pub enum SysclkSource: RccError::InvalidOscillator {
        /// Internal 16 MHz RC oscillator
        Hsi = 0,
        /// External oscillator
        Hse = 1,
        /// Main PLL, P output
        PllP = 2,
        /// Main PLL, R output (F446 only)
        PllR = 3,
    }
}

config_enum! {
    /// Main PLL input (`PLLSRC`)
    pub enum PllSource: RccError::InvalidPllSource {
        /// HSI
        Hsi = 0,
        /// HSE
        Hse = 1,
    }
}

config_enum! {
    /// AHB prescaler (`HPRE`)
    pub enum AhbPrescaler: RccError::InvalidAhbPrescaler {
        /// SYSCLK / 1
        Div1 = 0,
        /// SYSCLK / 2
        Div2 = 8,
        /// SYSCLK / 4
        Div4 = 9,
        /// SYSCLK / 8
        Div8 = 10,
        /// SYSCLK / 16
        Div16 = 11,
        /// SYSCLK / 64
        Div64 = 12,
        /// SYSCLK / 128
        Div128 = 13,
        /// SYSCLK / 256
        Div256 = 14,
        /// SYSCLK / 512
        Div512 = 15,
    }
}

config_enum! {
    /// APB1/APB2 prescaler (`PPRE1`, `PPRE2`)
    pub enum ApbPrescaler: RccError::InvalidApbPrescaler {
        /// HCLK / 1
        Div1 = 0,
        /// HCLK / 2
        Div2 = 4,
        /// HCLK / 4
        Div4 = 5,
        /// HCLK / 8
        Div8 = 6,
        /// HCLK / 16
        Div16 = 7,
    }
}

impl ApbPrescaler {
    /// Smallest divider bringing `hclk_hz` to at most `max_hz`
    #[must_use]
    pub fn for_limit(hclk_hz: u32, max_hz: u32) -> Self {
        [Self::Div1, Self::Div2, Self::Div4, Self::Div8]
            .into_iter()
            .find(|div| hclk_hz >> APB_SHIFT[div.raw() as usize] <= max_hz)
            .unwrap_or(Self::Div16)
    }
}

config_enum! {
    /// Clocks that can be routed to an MCO pin
    pub enum McoSource: RccError::InvalidMcoSource {
        /// HSI (MCO1)
        Hsi = 0,
        /// LSE (MCO1)
        Lse = 1,
        /// HSE (MCO1 and MCO2)
        Hse = 2,
        /// Main PLL (MCO1 and MCO2)
        PllMain = 3,
        /// SYSCLK (MCO2)
        Sysclk = 4,
        /// I2S PLL (MCO2)
        PllI2s = 5,
    }
}

config_enum! {
    /// Microcontroller clock output pin
    pub enum McoOutput: RccError::InvalidMcoSource {
        /// MCO1 on PA8
        Mco1 = 0,
        /// MCO2 on PC9
        Mco2 = 1,
    }
}

impl McoOutput {
    /// Pin the output is bonded to (alternate function 0)
    #[must_use]
    pub const fn pin(self) -> (Port, PinNumber) {
        match self {
            Self::Mco1 => (Port::A, PinNumber::P8),
            Self::Mco2 => (Port::C, PinNumber::P9),
        }
    }

    /// `MCOx` encoding of `source`, if this output can carry it
    const fn encode(self, source: McoSource) -> Option<u32> {
        match (self, source) {
            (Self::Mco1, McoSource::Hsi) | (Self::Mco2, McoSource::Sysclk) => Some(0),
            (Self::Mco1, McoSource::Lse) | (Self::Mco2, McoSource::PllI2s) => Some(1),
            (_, McoSource::Hse) => Some(2),
            (_, McoSource::PllMain) => Some(3),
            _ => None,
        }
    }
}

config_enum! {
    /// MCO divider (`MCOxPRE`)
    pub enum McoPrescaler: RccError::InvalidMcoPrescaler {
        /// No division
        Div1 = 0,
        /// Divide by 2
        Div2 = 4,
        /// Divide by 3
        Div3 = 5,
        /// Divide by 4
        Div4 = 6,
        /// Divide by 5
        Div5 = 7,
    }
}

/// Peripheral bus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum Bus {
    /// AHB1 (GPIO, DMA)
    Ahb1,
    /// APB1 (low-speed peripherals)
    Apb1,
    /// APB2 (high-speed peripherals)
    Apb2,
}

impl Bus {
    const fn enable_register(self) -> usize {
        match self {
            Self::Ahb1 => regs::AHB1ENR,
            Self::Apb1 => regs::APB1ENR,
            Self::Apb2 => regs::APB2ENR,
        }
    }

    const fn reset_register(self) -> usize {
        match self {
            Self::Ahb1 => regs::AHB1RSTR,
            Self::Apb1 => regs::APB1RSTR,
            Self::Apb2 => regs::APB2RSTR,
        }
    }
}

/// Clock gate of one peripheral: bus plus enable bit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct BusClock {
    /// Bus the peripheral hangs off
    pub bus: Bus,
    /// Bit in the bus' `ENR`/`RSTR` registers
    pub bit: u8,
}

impl BusClock {
    /// Create a clock gate descriptor
    #[must_use]
    pub const fn new(bus: Bus, bit: u8) -> Self {
        Self { bus, bit }
    }

    const fn mask(self) -> u32 {
        1 << self.bit
    }
}

/// Main PLL settings
///
/// `p` is the division factor (2, 4, 6 or 8), not its register encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct PllConfig {
    /// PLL input
    pub source: PllSource,
    /// Input divider (2..=63)
    pub m: u32,
    /// VCO multiplier (50..=432)
    pub n: u32,
    /// SYSCLK divider (2, 4, 6, 8)
    pub p: u32,
    /// 48 MHz domain divider (2..=15)
    pub q: u32,
}

impl PllConfig {
    /// VCO input limits in Hz
    pub const VCO_IN_HZ: (u32, u32) = (1_000_000, 2_000_000);
    /// VCO output limits in Hz
    pub const VCO_OUT_HZ: (u32, u32) = (100_000_000, 432_000_000);

    /// Check every field and the derived frequencies
    ///
    /// Returns the PLL P output frequency in Hz.
    ///
    /// # Errors
    ///
    /// The first failing check, in register order: `M`, `N`, `P`, `Q`, VCO
    /// input, VCO output, then the device SYSCLK limit.
    pub fn validate(&self, source_hz: u32) -> RccResult<u32> {
        if !(2..=63).contains(&self.m) {
            return Err(RccError::InvalidPllM);
        }
        if !(50..=432).contains(&self.n) {
            return Err(RccError::InvalidPllN);
        }
        if !matches!(self.p, 2 | 4 | 6 | 8) {
            return Err(RccError::InvalidPllP);
        }
        if !(2..=15).contains(&self.q) {
            return Err(RccError::InvalidPllQ);
        }

        let vco_in = source_hz / self.m;
        if vco_in < Self::VCO_IN_HZ.0 || vco_in > Self::VCO_IN_HZ.1 {
            return Err(RccError::InvalidVcoFreq);
        }
        let vco_out = u64::from(vco_in) * u64::from(self.n);
        if vco_out < u64::from(Self::VCO_OUT_HZ.0) || vco_out > u64::from(Self::VCO_OUT_HZ.1) {
            return Err(RccError::InvalidVcoFreq);
        }

        let sysclk = vco_out / u64::from(self.p);
        if sysclk > u64::from(MAX_SYSCLK_MHZ) * 1_000_000 {
            return Err(RccError::InvalidSysclkFreq);
        }
        u32::try_from(sysclk).map_err(|_| RccError::InvalidSysclkFreq)
    }

    /// PLL settings for `mhz` with a 1 MHz VCO input
    ///
    /// Picks the largest P keeping the VCO at or below 432 MHz, and the Q
    /// bringing the 48 MHz domain closest to (not above) 48 MHz.
    ///
    /// # Errors
    ///
    /// `InvalidSysclkFreq` when `mhz` is above the device limit or too low
    /// for the VCO range; `InvalidVcoFreq` when the source is not a whole
    /// number of MHz.
    pub fn for_sysclk(source: PllSource, source_hz: u32, mhz: u32) -> RccResult<Self> {
        if mhz == 0 || mhz > MAX_SYSCLK_MHZ {
            return Err(RccError::InvalidSysclkFreq);
        }
        if source_hz % 1_000_000 != 0 {
            return Err(RccError::InvalidVcoFreq);
        }

        let p = [8, 6, 4, 2]
            .into_iter()
            .find(|p| mhz * p <= 432)
            .ok_or(RccError::InvalidSysclkFreq)?;
        let n = mhz * p;
        if n < 100 {
            return Err(RccError::InvalidSysclkFreq);
        }
        let q = n.div_ceil(48).clamp(2, 15);

        let config = Self {
            source,
            m: source_hz / 1_000_000,
            n,
            p,
            q,
        };
        config.validate(source_hz)?;
        Ok(config)
    }
}

/// Reset and clock control driver
pub struct Rcc<R> {
    regs: R,
    hse_hz: u32,
}

impl<R: RegisterAccess> Rcc<R> {
    /// Wrap the RCC block, assuming the board's default HSE crystal
    pub fn new(regs: R) -> Self {
        Self {
            regs,
            hse_hz: HSE_VALUE,
        }
    }

    /// Override the HSE frequency used in clock computations
    #[must_use]
    pub fn with_hse_frequency(mut self, hz: u32) -> Self {
        self.hse_hz = hz;
        self
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    // =========================================================================
    // Oscillators
    // =========================================================================

    /// Start the HSI and wait until it is stable
    pub fn enable_hsi(&mut self) {
        self.regs.set_bits(regs::CR, regs::CR_HSION);
        self.regs.wait_set(regs::CR, regs::CR_HSIRDY);
    }

    /// Stop the HSI
    ///
    /// # Errors
    ///
    /// `OscillatorInUse` while the HSI drives SYSCLK or feeds the PLL.
    pub fn disable_hsi(&mut self) -> RccResult<()> {
        if self.sysclk_source() == SysclkSource::Hsi || self.feeds_running_pll(PllSource::Hsi) {
            return Err(RccError::OscillatorInUse);
        }
        self.regs.clear_bits(regs::CR, regs::CR_HSION);
        Ok(())
    }

    /// Start the HSE crystal oscillator and wait until it is stable
    pub fn enable_hse(&mut self) {
        self.regs.set_bits(regs::CR, regs::CR_HSEON);
        self.regs.wait_set(regs::CR, regs::CR_HSERDY);
    }

    /// Run the HSE from an external clock signal instead of a crystal
    ///
    /// # Errors
    ///
    /// `OscillatorInUse` when the HSE is already running.
    pub fn enable_hse_bypass(&mut self) -> RccResult<()> {
        if self.regs.is_set(regs::CR, regs::CR_HSEON) {
            return Err(RccError::OscillatorInUse);
        }
        self.regs.set_bits(regs::CR, regs::CR_HSEBYP);
        self.enable_hse();
        Ok(())
    }

    /// Stop the HSE
    ///
    /// # Errors
    ///
    /// `OscillatorInUse` while the HSE drives SYSCLK or feeds the PLL.
    pub fn disable_hse(&mut self) -> RccResult<()> {
        if self.sysclk_source() == SysclkSource::Hse || self.feeds_running_pll(PllSource::Hse) {
            return Err(RccError::OscillatorInUse);
        }
        self.regs.clear_bits(regs::CR, regs::CR_HSEON | regs::CR_HSEBYP);
        Ok(())
    }

    /// Enable the clock security system on the HSE
    pub fn enable_css(&mut self) {
        self.regs.set_bits(regs::CR, regs::CR_CSSON);
    }

    /// Disable the clock security system
    pub fn disable_css(&mut self) {
        self.regs.clear_bits(regs::CR, regs::CR_CSSON);
    }

    /// Adjust the HSI trimming (0..=31, reset value 16)
    ///
    /// # Errors
    ///
    /// `InvalidHsiTrim` for values above 31.
    pub fn set_hsi_trim(&mut self, trim: u8) -> RccResult<()> {
        if trim > 31 {
            return Err(RccError::InvalidHsiTrim);
        }
        self.regs.write_field(regs::HSITRIM, u32::from(trim));
        Ok(())
    }

    /// Factory HSI calibration value
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn hsi_calibration(&self) -> u8 {
        self.regs.read_field(regs::HSICAL) as u8
    }

    // =========================================================================
    // PLLs
    // =========================================================================

    /// Select the PLL input
    ///
    /// # Errors
    ///
    /// `OscillatorInUse` while the main PLL is on.
    pub fn select_pll_source(&mut self, source: PllSource) -> RccResult<()> {
        if self.regs.is_set(regs::CR, regs::CR_PLLON) {
            return Err(RccError::OscillatorInUse);
        }
        self.regs.write_field(regs::PLLSRC, source.raw());
        Ok(())
    }

    /// Program the main PLL dividers in one write
    ///
    /// # Errors
    ///
    /// Any [`PllConfig::validate`] error, or `OscillatorInUse` while the PLL
    /// is on. Nothing is written on error.
    pub fn configure_main_pll(&mut self, config: &PllConfig) -> RccResult<u32> {
        let pll_hz = config.validate(self.source_hz(config.source))?;
        if self.regs.is_set(regs::CR, regs::CR_PLLON) {
            return Err(RccError::OscillatorInUse);
        }

        self.regs.modify(regs::PLLCFGR, |r| {
            let r = regs::PLLM.insert(r, config.m);
            let r = regs::PLLN.insert(r, config.n);
            let r = regs::PLLP.insert(r, config.p / 2 - 1);
            let r = regs::PLLSRC.insert(r, config.source.raw());
            regs::PLLQ.insert(r, config.q)
        });
        debug!("main PLL configured: {} Hz", pll_hz);
        Ok(pll_hz)
    }

    /// Start the main PLL and wait for lock
    pub fn enable_main_pll(&mut self) {
        self.regs.set_bits(regs::CR, regs::CR_PLLON);
        self.regs.wait_set(regs::CR, regs::CR_PLLRDY);
    }

    /// Stop the main PLL and wait until it is unlocked
    ///
    /// # Errors
    ///
    /// `OscillatorInUse` while the PLL drives SYSCLK.
    pub fn disable_main_pll(&mut self) -> RccResult<()> {
        if matches!(self.sysclk_source(), SysclkSource::PllP | SysclkSource::PllR) {
            return Err(RccError::OscillatorInUse);
        }
        self.regs.clear_bits(regs::CR, regs::CR_PLLON);
        self.regs.wait_clear(regs::CR, regs::CR_PLLRDY);
        Ok(())
    }

    /// Start the I2S PLL and wait for lock
    pub fn enable_i2s_pll(&mut self) {
        self.regs.set_bits(regs::CR, regs::CR_PLLI2SON);
        self.regs.wait_set(regs::CR, regs::CR_PLLI2SRDY);
    }

    /// Stop the I2S PLL and wait until it is unlocked
    pub fn disable_i2s_pll(&mut self) {
        self.regs.clear_bits(regs::CR, regs::CR_PLLI2SON);
        self.regs.wait_clear(regs::CR, regs::CR_PLLI2SRDY);
    }

    // =========================================================================
    // System clock
    // =========================================================================

    /// Switch SYSCLK and wait until the switch is reported
    ///
    /// # Errors
    ///
    /// `OscillatorNotReady` when the source is not running;
    /// `InvalidOscillator` for the PLL R output on devices without it.
    pub fn select_sysclk_source(&mut self, source: SysclkSource) -> RccResult<()> {
        let ready = match source {
            SysclkSource::Hsi => regs::CR_HSIRDY,
            SysclkSource::Hse => regs::CR_HSERDY,
            SysclkSource::PllP => regs::CR_PLLRDY,
            SysclkSource::PllR if cfg!(any(feature = "stm32f401", feature = "stm32f411")) => {
                return Err(RccError::InvalidOscillator);
            }
            SysclkSource::PllR => regs::CR_PLLRDY,
        };
        if !self.regs.is_set(regs::CR, ready) {
            warn!("SYSCLK switch refused: source not ready");
            return Err(RccError::OscillatorNotReady);
        }

        self.regs.write_field(regs::SW, source.raw());
        while self.regs.read_field(regs::SWS) != source.raw() {
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Currently active SYSCLK source (`SWS`)
    #[must_use]
    pub fn sysclk_source(&self) -> SysclkSource {
        match self.regs.read_field(regs::SWS) {
            0 => SysclkSource::Hsi,
            1 => SysclkSource::Hse,
            2 => SysclkSource::PllP,
            _ => SysclkSource::PllR,
        }
    }

    /// Run SYSCLK from the main PLL at `mhz`
    ///
    /// Starts the source oscillator, moves SYSCLK onto it while the PLL is
    /// reprogrammed for a 1 MHz VCO input, sets APB dividers within their
    /// limits and switches over. Flash latency goes up before a faster
    /// clock is selected and comes down only once the slower one runs.
    /// Returns the resulting SYSCLK in Hz.
    ///
    /// # Errors
    ///
    /// `InvalidSysclkFreq` or `InvalidVcoFreq` before any register changes.
    pub fn set_sysclk_freq<F: RegisterAccess>(
        &mut self,
        source: PllSource,
        mhz: u32,
        flash: &mut Flash<F>,
    ) -> RccResult<u32> {
        let config = PllConfig::for_sysclk(source, self.source_hz(source), mhz)?;
        let sysclk_hz = mhz * 1_000_000;
        let raise_latency_first = wait_states_for(mhz) >= flash.latency();

        match source {
            PllSource::Hsi => self.enable_hsi(),
            PllSource::Hse => self.enable_hse(),
        }
        if raise_latency_first {
            flash.configure_wait_states(mhz);
        }

        if matches!(self.sysclk_source(), SysclkSource::PllP | SysclkSource::PllR) {
            let bridge = match source {
                PllSource::Hsi => SysclkSource::Hsi,
                PllSource::Hse => SysclkSource::Hse,
            };
            self.select_sysclk_source(bridge)?;
        }

        self.set_ahb_prescaler(AhbPrescaler::Div1);
        let apb1 = ApbPrescaler::for_limit(sysclk_hz, MAX_PCLK1_MHZ * 1_000_000);
        let apb2 = ApbPrescaler::for_limit(sysclk_hz, MAX_PCLK1_MHZ * 2_000_000);
        self.set_apb1_prescaler(apb1);
        self.set_apb2_prescaler(apb2);

        self.disable_main_pll()?;
        self.configure_main_pll(&config)?;
        self.enable_main_pll();
        self.select_sysclk_source(SysclkSource::PllP)?;
        if !raise_latency_first {
            flash.configure_wait_states(mhz);
        }

        info!("SYSCLK now {} MHz", mhz);
        Ok(sysclk_hz)
    }

    /// Set the AHB divider
    pub fn set_ahb_prescaler(&mut self, div: AhbPrescaler) {
        self.regs.write_field(regs::HPRE, div.raw());
    }

    /// Set the APB1 divider
    pub fn set_apb1_prescaler(&mut self, div: ApbPrescaler) {
        self.regs.write_field(regs::PPRE1, div.raw());
    }

    /// Set the APB2 divider
    pub fn set_apb2_prescaler(&mut self, div: ApbPrescaler) {
        self.regs.write_field(regs::PPRE2, div.raw());
    }

    // =========================================================================
    // Derived frequencies
    // =========================================================================

    /// SYSCLK in Hz
    #[must_use]
    pub fn sysclk(&self) -> u32 {
        match self.sysclk_source() {
            SysclkSource::Hsi => HSI_VALUE,
            SysclkSource::Hse => self.hse_hz,
            SysclkSource::PllP => {
                let p = (self.regs.read_field(regs::PLLP) + 1) * 2;
                self.pll_vco_hz() / p
            }
            SysclkSource::PllR => {
                let r = self.regs.read_field(regs::PLLR).max(2);
                self.pll_vco_hz() / r
            }
        }
    }

    /// AHB clock (HCLK) in Hz
    #[must_use]
    pub fn hclk(&self) -> u32 {
        self.sysclk() >> AHB_SHIFT[self.regs.read_field(regs::HPRE) as usize]
    }

    /// APB1 clock (PCLK1) in Hz
    #[must_use]
    pub fn pclk1(&self) -> u32 {
        self.hclk() >> APB_SHIFT[self.regs.read_field(regs::PPRE1) as usize]
    }

    /// APB2 clock (PCLK2) in Hz
    #[must_use]
    pub fn pclk2(&self) -> u32 {
        self.hclk() >> APB_SHIFT[self.regs.read_field(regs::PPRE2) as usize]
    }

    /// Peripheral clock of `bus` in Hz
    #[must_use]
    pub fn bus_clock(&self, bus: Bus) -> u32 {
        match bus {
            Bus::Ahb1 => self.hclk(),
            Bus::Apb1 => self.pclk1(),
            Bus::Apb2 => self.pclk2(),
        }
    }

    /// Timer kernel clock on `bus`: twice PCLK when the APB divider is not 1
    #[must_use]
    pub fn timer_clock(&self, bus: Bus) -> u32 {
        let ppre = match bus {
            Bus::Ahb1 => return self.hclk(),
            Bus::Apb1 => self.regs.read_field(regs::PPRE1),
            Bus::Apb2 => self.regs.read_field(regs::PPRE2),
        };
        let pclk = self.bus_clock(bus);
        if ppre < 4 {
            pclk
        } else {
            pclk * 2
        }
    }

    fn pll_vco_hz(&self) -> u32 {
        let source = if self.regs.read_field(regs::PLLSRC) == 0 {
            PllSource::Hsi
        } else {
            PllSource::Hse
        };
        let m = self.regs.read_field(regs::PLLM).max(1);
        let n = self.regs.read_field(regs::PLLN);
        let vco = u64::from(self.source_hz(source)) * u64::from(n) / u64::from(m);
        u32::try_from(vco).unwrap_or(u32::MAX)
    }

    const fn source_hz(&self, source: PllSource) -> u32 {
        match source {
            PllSource::Hsi => HSI_VALUE,
            PllSource::Hse => self.hse_hz,
        }
    }

    fn feeds_running_pll(&self, source: PllSource) -> bool {
        self.regs.is_set(regs::CR, regs::CR_PLLON)
            && self.regs.read_field(regs::PLLSRC) == source.raw()
    }

    // =========================================================================
    // Clock output
    // =========================================================================

    /// Route `source` to an MCO pin through `prescaler`
    ///
    /// The pin itself still has to be switched to alternate function 0, see
    /// [`McoOutput::pin`].
    ///
    /// # Errors
    ///
    /// `InvalidMcoSource` when the output cannot carry `source`.
    pub fn assign_mco(
        &mut self,
        output: McoOutput,
        source: McoSource,
        prescaler: McoPrescaler,
    ) -> RccResult<()> {
        let sel = output.encode(source).ok_or(RccError::InvalidMcoSource)?;
        let (sel_field, pre_field): (Field, Field) = match output {
            McoOutput::Mco1 => (regs::MCO1, regs::MCO1PRE),
            McoOutput::Mco2 => (regs::MCO2, regs::MCO2PRE),
        };
        self.regs.modify(regs::CFGR, |r| {
            pre_field.insert(sel_field.insert(r, sel), prescaler.raw())
        });
        Ok(())
    }

    // =========================================================================
    // Peripheral clock gating
    // =========================================================================

    /// Turn on a peripheral's bus clock
    pub fn enable_peripheral_clock(&mut self, clock: BusClock) {
        self.regs.set_bits(clock.bus.enable_register(), clock.mask());
    }

    /// Turn off a peripheral's bus clock
    pub fn disable_peripheral_clock(&mut self, clock: BusClock) {
        self.regs.clear_bits(clock.bus.enable_register(), clock.mask());
    }

    /// Whether a peripheral's bus clock is on
    #[must_use]
    pub fn is_peripheral_clock_enabled(&self, clock: BusClock) -> bool {
        self.regs.is_set(clock.bus.enable_register(), clock.mask())
    }

    /// Pulse a peripheral's reset line
    pub fn reset_peripheral(&mut self, clock: BusClock) {
        let reg = clock.bus.reset_register();
        self.regs.set_bits(reg, clock.mask());
        self.regs.clear_bits(reg, clock.mask());
    }
}

impl Rcc<SimRegisters<BLOCK_WORDS>> {
    /// RCC over simulated registers at their reset values
    ///
    /// Oscillator and PLL ready flags follow their enable bits and `SWS`
    /// follows `SW`, so every wait in this driver completes.
    #[must_use]
    pub fn simulated() -> Self {
        let mut sim = SimRegisters::new()
            .echo(Field::bit(regs::CR, 0), Field::bit(regs::CR, 1))
            .echo(Field::bit(regs::CR, 16), Field::bit(regs::CR, 17))
            .echo(Field::bit(regs::CR, 24), Field::bit(regs::CR, 25))
            .echo(Field::bit(regs::CR, 26), Field::bit(regs::CR, 27))
            .echo(regs::SW, regs::SWS);
        sim.poke(regs::CR, regs::CR_RESET);
        sim.poke(regs::PLLCFGR, regs::PLLCFGR_RESET);
        Self::new(sim)
    }
}
