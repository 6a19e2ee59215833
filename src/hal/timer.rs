//! General-purpose, advanced and basic timers
//!
//! One driver covers every timer; what a given instance supports (channel
//! count, counter width, complementary outputs, DMA, trigger logic) comes
//! from [`TimerId::capabilities`] and is checked before any register write.
//!
//! # Running-state policy
//!
//! Fields differ in how the hardware treats a change while the counter runs,
//! and the driver follows the hardware instead of a single rule:
//!
//! - `PSC` is always preloaded: a change while running applies at the next
//!   update event ([`Apply::NextUpdate`]).
//! - `ARR` applies at the next update when auto-reload preload is on,
//!   immediately otherwise.
//! - `CCRx` applies at the next update when the channel's compare preload
//!   is on, immediately otherwise.
//! - Auto-reload preload, direction, center-aligned mode, clock division,
//!   one-pulse mode, slave mode, trigger selection and DMA burst setup are
//!   refused while running ([`TimerError::TimerRunning`]).
//! - Channel mapping is refused while the channel is enabled
//!   ([`TimerError::ChannelEnabled`]).
//!
//! When the counter is stopped, preloaded values are transferred at once
//! with a software update event, which also resets the counter.

mod advanced;
mod channel;
mod master_slave;

pub use advanced::{dead_time_encoding, IdleState, LockLevel};
pub use channel::{
    Channel, ChannelMapping, EventPrescaler, Filter, InputEdge, OutputCompareMode, OutputPolarity,
};
pub use master_slave::{ExternalTrigger, MasterMode, SlaveMode, TriggerSource};

use crate::config::{base, MAX_NUM_TIMER_REGISTERS, TIMER_MAX_PRESCALER};
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::RegisterAccess;

/// Size of a timer register block in words
pub const BLOCK_WORDS: usize = 21;

mod regs {
    use crate::reg::Field;

    pub const CR1: usize = 0x00;
    pub const CR2: usize = 0x04;
    pub const SMCR: usize = 0x08;
    pub const DIER: usize = 0x0C;
    pub const SR: usize = 0x10;
    pub const EGR: usize = 0x14;
    pub const CCMR1: usize = 0x18;
    pub const CCER: usize = 0x20;
    pub const CNT: usize = 0x24;
    pub const PSC: usize = 0x28;
    pub const ARR: usize = 0x2C;
    pub const RCR: usize = 0x30;
    pub const CCR1: usize = 0x34;
    pub const BDTR: usize = 0x44;
    pub const DCR: usize = 0x48;
    pub const DMAR: usize = 0x4C;

    pub const CR1_CEN: u32 = 1 << 0;
    pub const CR1_OPM: u32 = 1 << 3;
    pub const CR1_DIR: u32 = 1 << 4;
    pub const CR1_CMS: Field = Field::new(CR1, 5, 2);
    pub const CR1_ARPE: u32 = 1 << 7;
    pub const CR1_CKD: Field = Field::new(CR1, 8, 2);

    pub const CR2_CCPC: u32 = 1 << 0;
    pub const CR2_MMS: Field = Field::new(CR2, 4, 3);

    pub const SMCR_SMS: Field = Field::new(SMCR, 0, 3);
    pub const SMCR_TS: Field = Field::new(SMCR, 4, 3);
    pub const SMCR_MSM: u32 = 1 << 7;
    pub const SMCR_ETF: Field = Field::new(SMCR, 8, 4);
    pub const SMCR_ETPS: Field = Field::new(SMCR, 12, 2);
    pub const SMCR_ECE: u32 = 1 << 14;
    pub const SMCR_ETP: u32 = 1 << 15;

    /// DMA request enables sit 8 bits above the matching interrupt enables
    pub const DIER_DMA_SHIFT: u32 = 8;

    /// Overcapture flags start at bit 9 for channel 1
    pub const SR_CCOF_SHIFT: u32 = 8;

    pub const EGR_UG: u32 = 1 << 0;
    pub const SR_UIF: u32 = 1 << 0;

    pub const BDTR_DTG: Field = Field::new(BDTR, 0, 8);
    pub const BDTR_LOCK: Field = Field::new(BDTR, 8, 2);
    pub const BDTR_BKE: u32 = 1 << 12;
    pub const BDTR_BKP: u32 = 1 << 13;
    pub const BDTR_AOE: u32 = 1 << 14;
    pub const BDTR_MOE: u32 = 1 << 15;

    pub const DCR_DBA: Field = Field::new(DCR, 0, 5);
    pub const DCR_DBL: Field = Field::new(DCR, 8, 5);
}

status_codes! {
    /// Timer status codes
    pub enum TimerError {
        /// Address is not a timer block
        InvalidTimer = -40 => "invalid timer",
        /// Channel number outside 1..=4
        InvalidChannel = -41 => "invalid channel",
        /// Operation does not match the channel's input/output mapping
        InvalidChannelType = -42 => "invalid channel type",
        /// Unknown interrupt, or one the timer lacks
        InvalidIrqType = -43 => "invalid IRQ type",
        /// Timer has no capture/compare channels or complementary outputs
        CapcompNotSupported = -44 => "capture/compare not supported",
        /// Timer has no repetition counter
        RepetitionNotSupported = -45 => "repetition counter not supported",
        /// Timer has no break and dead-time register
        BdtrNotSupported = -46 => "break/dead-time not supported",
        /// Unknown DMA request, or one the timer lacks
        InvalidDmaAssignment = -47 => "invalid DMA assignment",
        /// Timer cannot run in one-pulse mode
        OneShotNotSupported = -48 => "one-shot not supported",
        /// Channel above the timer's channel count
        InvalidTimerChannelAssignment = -49 => "invalid timer channel assignment",
        /// Unknown master mode, or master/slave logic the timer lacks
        InvalidMasterSlaveModeType = -50 => "invalid master/slave mode",
        /// Unknown trigger input, or one the timer lacks
        InvalidTrigger = -51 => "invalid trigger",
        /// Unknown slave mode action
        InvalidTriggerAction = -52 => "invalid trigger action",
        /// Unknown digital filter setting
        InvalidExtTriggerFilter = -53 => "invalid external trigger filter",
        /// Unknown clock division or event prescaler
        InvalidClockDivider = -54 => "invalid clock divider",
        /// Timer has no clock division
        ClockDivisionNotSupported = -55 => "clock division not supported",
        /// Offset is not a timer register
        InvalidRegisterOffset = -56 => "invalid register offset",
        /// DMA burst cannot start at this register
        InvalidDmaBurstStartingRegister = -57 => "invalid DMA burst starting register",
        /// DMA burst length outside 1..=18 or past BDTR
        InvalidDmaBurstLength = -58 => "invalid DMA burst length",
        /// Field cannot change while the counter runs
        TimerRunning = -59 => "timer running",
        /// Field cannot change while the channel is enabled
        ChannelEnabled = -60 => "channel enabled",
        /// Timer not selected
        NotConfigured = -61 => "timer not configured",
        /// Unknown count direction or alignment, or one the timer lacks
        InvalidCountMode = -62 => "invalid count mode",
        /// Unknown output compare mode, polarity or idle state
        InvalidOutputMode = -63 => "invalid output mode",
        /// Prescaler outside 1..=65536
        InvalidPrescaler = -64 => "invalid prescaler",
        /// Value does not fit the counter or register
        InvalidCounterValue = -65 => "invalid counter value",
        /// Unknown register lock level
        InvalidLockLevel = -66 => "invalid lock level",
    }
}

/// Timer operation result
pub type TimerResult<T> = Result<T, TimerError>;

config_enum! {
    /// Timer instance
    pub enum TimerId: TimerError::InvalidTimer {
        /// TIM1, advanced control
        Tim1 = 1,
        /// TIM2, 32-bit
        Tim2 = 2,
        /// TIM3
        Tim3 = 3,
        /// TIM4
        Tim4 = 4,
        /// TIM5, 32-bit
        Tim5 = 5,
        /// TIM6, basic
        Tim6 = 6,
        /// TIM7, basic
        Tim7 = 7,
        /// TIM8, advanced control
        Tim8 = 8,
        /// TIM9, two channels
        Tim9 = 9,
        /// TIM10, one channel
        Tim10 = 10,
        /// TIM11, one channel
        Tim11 = 11,
    }
}

/// What a timer instance supports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Capture/compare channels
    pub channels: u8,
    /// 32-bit counter, prescaler excluded
    pub wide_counter: bool,
    /// Complementary outputs, COM and break events, `RCR`, `BDTR`
    pub advanced: bool,
    /// Down and center-aligned counting
    pub up_down: bool,
    /// Clock division (`CKD`)
    pub clock_division: bool,
    /// Trigger output (`MMS`)
    pub master: bool,
    /// Slave mode controller and trigger input (`SMCR`)
    pub slave: bool,
    /// External trigger input (`ETR`)
    pub external_trigger: bool,
    /// DMA requests
    pub dma: bool,
}

impl TimerId {
    /// Base address of the register block
    #[must_use]
    pub const fn base(self) -> usize {
        match self {
            Self::Tim1 => base::TIM1,
            Self::Tim2 => base::TIM2,
            Self::Tim3 => base::TIM3,
            Self::Tim4 => base::TIM4,
            Self::Tim5 => base::TIM5,
            Self::Tim6 => base::TIM6,
            Self::Tim7 => base::TIM7,
            Self::Tim8 => base::TIM8,
            Self::Tim9 => base::TIM9,
            Self::Tim10 => base::TIM10,
            Self::Tim11 => base::TIM11,
        }
    }

    /// Clock gate of the instance
    #[must_use]
    pub const fn bus_clock(self) -> BusClock {
        match self {
            Self::Tim1 => BusClock::new(Bus::Apb2, 0),
            Self::Tim8 => BusClock::new(Bus::Apb2, 1),
            Self::Tim2 => BusClock::new(Bus::Apb1, 0),
            Self::Tim3 => BusClock::new(Bus::Apb1, 1),
            Self::Tim4 => BusClock::new(Bus::Apb1, 2),
            Self::Tim5 => BusClock::new(Bus::Apb1, 3),
            Self::Tim6 => BusClock::new(Bus::Apb1, 4),
            Self::Tim7 => BusClock::new(Bus::Apb1, 5),
            Self::Tim9 => BusClock::new(Bus::Apb2, 16),
            Self::Tim10 => BusClock::new(Bus::Apb2, 17),
            Self::Tim11 => BusClock::new(Bus::Apb2, 18),
        }
    }

    /// Feature set of the instance
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        let general = Capabilities {
            channels: 4,
            wide_counter: false,
            advanced: false,
            up_down: true,
            clock_division: true,
            master: true,
            slave: true,
            external_trigger: true,
            dma: true,
        };
        match self {
            Self::Tim1 | Self::Tim8 => Capabilities {
                advanced: true,
                ..general
            },
            Self::Tim2 | Self::Tim5 => Capabilities {
                wide_counter: true,
                ..general
            },
            Self::Tim3 | Self::Tim4 => general,
            Self::Tim6 | Self::Tim7 => Capabilities {
                channels: 0,
                up_down: false,
                clock_division: false,
                slave: false,
                external_trigger: false,
                ..general
            },
            Self::Tim9 => Capabilities {
                channels: 2,
                up_down: false,
                external_trigger: false,
                dma: false,
                ..general
            },
            Self::Tim10 | Self::Tim11 => Capabilities {
                channels: 1,
                up_down: false,
                master: false,
                slave: false,
                external_trigger: false,
                dma: false,
                ..general
            },
        }
    }

    /// Instance whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidTimer` for any other address.
    pub fn from_base(addr: usize) -> TimerResult<Self> {
        <Self as crate::validate::Domain>::ALL
            .iter()
            .copied()
            .find(|id| id.base() == addr)
            .ok_or(TimerError::InvalidTimer)
    }
}

/// Lifecycle of a timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum TimerState {
    /// Bus clock off
    Disabled,
    /// Clock on, counter never started
    Configured,
    /// Counter enabled
    Running,
    /// Counter stopped by software or at the end of a one-pulse cycle
    Stopped,
}

/// When a written value reaches the counter logic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum Apply {
    /// Already in effect
    Immediate,
    /// In effect after the next update event
    NextUpdate,
}

config_enum! {
    /// Counting direction (`DIR`)
    pub enum CountDirection: TimerError::InvalidCountMode {
        /// Upcounting
        Up = 0,
        /// Downcounting
        Down = 1,
    }
}

config_enum! {
    /// Edge or center-aligned counting (`CMS`)
    pub enum CenterAlign: TimerError::InvalidCountMode {
        /// Edge-aligned, direction from `DIR`
        Edge = 0,
        /// Center-aligned, compare flags while counting down
        Mode1 = 1,
        /// Center-aligned, compare flags while counting up
        Mode2 = 2,
        /// Center-aligned, compare flags both ways
        Mode3 = 3,
    }
}

config_enum! {
    /// Dead-time and filter sampling clock ratio (`CKD`)
    pub enum ClockDivision: TimerError::InvalidClockDivider {
        /// t_DTS = t_CK_INT
        Div1 = 0,
        /// t_DTS = 2 x t_CK_INT
        Div2 = 1,
        /// t_DTS = 4 x t_CK_INT
        Div4 = 2,
    }
}

config_enum! {
    /// Events shared by `DIER`, `SR` and `EGR` (bit position)
    pub enum TimerEvent: TimerError::InvalidIrqType {
        /// Update
        Update = 0,
        /// Capture/compare 1
        Cc1 = 1,
        /// Capture/compare 2
        Cc2 = 2,
        /// Capture/compare 3
        Cc3 = 3,
        /// Capture/compare 4
        Cc4 = 4,
        /// Capture/compare control update (advanced timers)
        Com = 5,
        /// Trigger
        Trigger = 6,
        /// Break (advanced timers)
        Break = 7,
    }
}

impl TimerEvent {
    const fn mask(self) -> u32 {
        1 << self.raw()
    }
}

config_enum! {
    /// Timer registers reachable by a DMA burst, by byte offset
    pub enum TimerRegister: TimerError::InvalidRegisterOffset {
        /// `CR1`
        Cr1 = 0x00,
        /// `CR2`
        Cr2 = 0x04,
        /// `SMCR`
        Smcr = 0x08,
        /// `DIER`
        Dier = 0x0C,
        /// `SR`
        Sr = 0x10,
        /// `EGR`
        Egr = 0x14,
        /// `CCMR1`
        Ccmr1 = 0x18,
        /// `CCMR2`
        Ccmr2 = 0x1C,
        /// `CCER`
        Ccer = 0x20,
        /// `CNT`
        Cnt = 0x24,
        /// `PSC`
        Psc = 0x28,
        /// `ARR`
        Arr = 0x2C,
        /// `RCR`
        Rcr = 0x30,
        /// `CCR1`
        Ccr1 = 0x34,
        /// `CCR2`
        Ccr2 = 0x38,
        /// `CCR3`
        Ccr3 = 0x3C,
        /// `CCR4`
        Ccr4 = 0x40,
        /// `BDTR`
        Bdtr = 0x44,
        /// `DCR`
        Dcr = 0x48,
        /// `DMAR`
        Dmar = 0x4C,
        /// `OR` (TIM2, TIM5, TIM11)
        Or = 0x50,
    }
}

impl TimerRegister {
    /// Index in words from `CR1`, as used by `DCR.DBA`
    #[must_use]
    pub const fn index(self) -> u32 {
        self.raw() / 4
    }
}

/// Driver for one timer instance
pub struct Timer<R> {
    id: TimerId,
    caps: Capabilities,
    regs: R,
    state: TimerState,
}

impl<R: RegisterAccess> Timer<R> {
    /// Wrap the register block of `id`; the timer starts out `Disabled`
    pub fn new(id: TimerId, regs: R) -> Self {
        Self {
            id,
            caps: id.capabilities(),
            regs,
            state: TimerState::Disabled,
        }
    }

    /// Instance this handle drives
    #[must_use]
    pub const fn id(&self) -> TimerId {
        self.id
    }

    /// Feature set of this instance
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Current lifecycle state
    ///
    /// A one-pulse cycle clears `CEN` in hardware, which moves a running
    /// timer to `Stopped`.
    #[must_use]
    pub fn state(&self) -> TimerState {
        if self.state == TimerState::Running && !self.is_running() {
            TimerState::Stopped
        } else {
            self.state
        }
    }

    /// Whether `CEN` is set
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.regs.is_set(regs::CR1, regs::CR1_CEN)
    }

    fn ensure_configured(&self) -> TimerResult<()> {
        if self.state == TimerState::Disabled {
            Err(TimerError::NotConfigured)
        } else {
            Ok(())
        }
    }

    fn ensure_stopped(&self) -> TimerResult<()> {
        self.ensure_configured()?;
        if self.is_running() {
            warn!("TIM{} change refused while running", self.id.raw());
            Err(TimerError::TimerRunning)
        } else {
            Ok(())
        }
    }

    /// Load every preloaded register now, without raising an update interrupt
    fn force_update(&mut self) {
        self.regs.write(regs::EGR, regs::EGR_UG);
        self.regs.clear_flags(regs::SR, regs::SR_UIF);
    }

    /// Apply class of a preloaded register: transfer now when stopped
    fn commit(&mut self, preloaded: bool) -> Apply {
        if !self.is_running() {
            if preloaded {
                self.force_update();
            }
            Apply::Immediate
        } else if preloaded {
            Apply::NextUpdate
        } else {
            Apply::Immediate
        }
    }

    /// Largest value the counter and `ARR` hold
    const fn counter_max(&self) -> u32 {
        if self.caps.wide_counter {
            u32::MAX
        } else {
            0xFFFF
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Turn the bus clock on: `Disabled` to `Configured`
    pub fn select<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(self.id.bus_clock());
        if self.state == TimerState::Disabled {
            self.state = TimerState::Configured;
        }
    }

    /// Stop the counter and turn the bus clock off
    pub fn deselect<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        self.regs.clear_bits(regs::CR1, regs::CR1_CEN);
        rcc.disable_peripheral_clock(self.id.bus_clock());
        self.state = TimerState::Disabled;
    }

    /// Program prescaler and reload with the counter stopped
    ///
    /// `prescaler` and `reload` are divisors: the counter ticks every
    /// `prescaler` kernel clocks and wraps after `reload` ticks.
    ///
    /// # Errors
    ///
    /// `NotConfigured`, `TimerRunning`, `InvalidPrescaler` or
    /// `InvalidCounterValue`; nothing is written on error.
    pub fn init(&mut self, prescaler: u32, reload: u32) -> TimerResult<()> {
        self.ensure_stopped()?;
        Self::check_prescaler(prescaler)?;
        self.check_reload(reload)?;

        self.regs.write(regs::PSC, prescaler - 1);
        self.regs.write(regs::ARR, reload - 1);
        self.regs.write(regs::CNT, 0);
        self.force_update();
        Ok(())
    }

    /// Set `CEN`
    ///
    /// # Errors
    ///
    /// `NotConfigured` before [`Timer::select`].
    pub fn start(&mut self) -> TimerResult<()> {
        self.ensure_configured()?;
        self.regs.set_bits(regs::CR1, regs::CR1_CEN);
        self.state = TimerState::Running;
        info!("TIM{} started", self.id.raw());
        Ok(())
    }

    /// Clear `CEN`
    ///
    /// # Errors
    ///
    /// `NotConfigured` before [`Timer::select`].
    pub fn stop(&mut self) -> TimerResult<()> {
        self.ensure_configured()?;
        self.regs.clear_bits(regs::CR1, regs::CR1_CEN);
        self.state = TimerState::Stopped;
        info!("TIM{} stopped", self.id.raw());
        Ok(())
    }

    // =========================================================================
    // Time base
    // =========================================================================

    fn check_prescaler(prescaler: u32) -> TimerResult<()> {
        if prescaler == 0 || prescaler > TIMER_MAX_PRESCALER {
            Err(TimerError::InvalidPrescaler)
        } else {
            Ok(())
        }
    }

    fn check_reload(&self, reload: u32) -> TimerResult<()> {
        if reload == 0 || reload - 1 > self.counter_max() {
            Err(TimerError::InvalidCounterValue)
        } else {
            Ok(())
        }
    }

    /// Change the prescaler divisor
    ///
    /// # Errors
    ///
    /// `NotConfigured` or `InvalidPrescaler`.
    pub fn set_prescaler(&mut self, prescaler: u32) -> TimerResult<Apply> {
        self.ensure_configured()?;
        Self::check_prescaler(prescaler)?;
        self.regs.write(regs::PSC, prescaler - 1);
        Ok(self.commit(true))
    }

    /// Prescaler divisor
    #[must_use]
    pub fn prescaler(&self) -> u32 {
        self.regs.read(regs::PSC) + 1
    }

    /// Change the reload divisor
    ///
    /// # Errors
    ///
    /// `NotConfigured` or `InvalidCounterValue`.
    pub fn set_auto_reload(&mut self, reload: u32) -> TimerResult<Apply> {
        self.ensure_configured()?;
        self.check_reload(reload)?;
        self.regs.write(regs::ARR, reload - 1);
        let preloaded = self.regs.is_set(regs::CR1, regs::CR1_ARPE);
        Ok(self.commit(preloaded))
    }

    /// Reload divisor
    #[must_use]
    pub fn auto_reload(&self) -> u32 {
        self.regs.read(regs::ARR).wrapping_add(1)
    }

    fn write_cr1_flag(&mut self, mask: u32, on: bool) -> TimerResult<()> {
        self.ensure_stopped()?;
        if on {
            self.regs.set_bits(regs::CR1, mask);
        } else {
            self.regs.clear_bits(regs::CR1, mask);
        }
        Ok(())
    }

    /// Buffer `ARR` until the next update event
    ///
    /// # Errors
    ///
    /// `NotConfigured` or `TimerRunning`.
    pub fn enable_auto_reload_preload(&mut self, enabled: bool) -> TimerResult<()> {
        self.write_cr1_flag(regs::CR1_ARPE, enabled)
    }

    /// Stop the counter at the next update event
    ///
    /// # Errors
    ///
    /// `NotConfigured` or `TimerRunning`.
    pub fn set_one_shot(&mut self, enabled: bool) -> TimerResult<()> {
        self.write_cr1_flag(regs::CR1_OPM, enabled)
    }

    /// Whether one-pulse mode is on
    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        self.regs.is_set(regs::CR1, regs::CR1_OPM)
    }

    /// Count up or down
    ///
    /// # Errors
    ///
    /// `InvalidCountMode` on up-only timers or in center-aligned mode,
    /// where the direction is read-only; `NotConfigured`; `TimerRunning`.
    pub fn set_count_direction(&mut self, direction: CountDirection) -> TimerResult<()> {
        if !self.caps.up_down || self.regs.read_field(regs::CR1_CMS) != 0 {
            return Err(TimerError::InvalidCountMode);
        }
        self.write_cr1_flag(regs::CR1_DIR, direction == CountDirection::Down)
    }

    /// Select edge or center-aligned counting
    ///
    /// # Errors
    ///
    /// `InvalidCountMode` on up-only timers; `NotConfigured`;
    /// `TimerRunning`.
    pub fn set_center_aligned(&mut self, mode: CenterAlign) -> TimerResult<()> {
        if !self.caps.up_down {
            return Err(TimerError::InvalidCountMode);
        }
        self.ensure_stopped()?;
        self.regs.write_field(regs::CR1_CMS, mode.raw());
        Ok(())
    }

    /// Set the dead-time and filter sampling clock ratio
    ///
    /// # Errors
    ///
    /// `ClockDivisionNotSupported` on basic timers; `NotConfigured`;
    /// `TimerRunning`.
    pub fn set_clock_division(&mut self, division: ClockDivision) -> TimerResult<()> {
        if !self.caps.clock_division {
            return Err(TimerError::ClockDivisionNotSupported);
        }
        self.ensure_stopped()?;
        self.regs.write_field(regs::CR1_CKD, division.raw());
        Ok(())
    }

    /// Load the counter
    ///
    /// # Errors
    ///
    /// `NotConfigured`; `InvalidCounterValue` above the counter width.
    pub fn set_counter(&mut self, value: u32) -> TimerResult<()> {
        self.ensure_configured()?;
        if value > self.counter_max() {
            return Err(TimerError::InvalidCounterValue);
        }
        self.regs.write(regs::CNT, value);
        Ok(())
    }

    /// Counter value
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.regs.read(regs::CNT) & self.counter_max()
    }

    /// Zero the counter
    ///
    /// # Errors
    ///
    /// `NotConfigured`.
    pub fn reset_counter(&mut self) -> TimerResult<()> {
        self.set_counter(0)
    }

    // =========================================================================
    // Events, interrupts and DMA
    // =========================================================================

    fn supports(&self, event: TimerEvent) -> bool {
        match event {
            TimerEvent::Update => true,
            TimerEvent::Cc1 | TimerEvent::Cc2 | TimerEvent::Cc3 | TimerEvent::Cc4 => {
                event.raw() <= u32::from(self.caps.channels)
            }
            TimerEvent::Com | TimerEvent::Break => self.caps.advanced,
            TimerEvent::Trigger => self.caps.slave,
        }
    }

    fn check_irq(&self, event: TimerEvent) -> TimerResult<()> {
        if self.supports(event) {
            Ok(())
        } else {
            Err(TimerError::InvalidIrqType)
        }
    }

    /// Raise an event from software
    ///
    /// # Errors
    ///
    /// `InvalidIrqType` for events this timer lacks.
    pub fn generate_event(&mut self, event: TimerEvent) -> TimerResult<()> {
        self.check_irq(event)?;
        self.regs.write(regs::EGR, event.mask());
        Ok(())
    }

    /// Unmask an interrupt
    ///
    /// # Errors
    ///
    /// `InvalidIrqType` for events this timer lacks.
    pub fn enable_interrupt(&mut self, event: TimerEvent) -> TimerResult<()> {
        self.check_irq(event)?;
        self.regs.set_bits(regs::DIER, event.mask());
        Ok(())
    }

    /// Mask an interrupt
    ///
    /// # Errors
    ///
    /// `InvalidIrqType` for events this timer lacks.
    pub fn disable_interrupt(&mut self, event: TimerEvent) -> TimerResult<()> {
        self.check_irq(event)?;
        self.regs.clear_bits(regs::DIER, event.mask());
        Ok(())
    }

    /// Whether the event's flag is set in `SR`
    #[must_use]
    pub fn is_interrupt_pending(&self, event: TimerEvent) -> bool {
        self.regs.is_set(regs::SR, event.mask())
    }

    /// Clear the event's flag
    pub fn clear_interrupt_flag(&mut self, event: TimerEvent) {
        self.regs.clear_flags(regs::SR, event.mask());
    }

    fn check_dma(&self, event: TimerEvent) -> TimerResult<()> {
        if !self.caps.dma || event == TimerEvent::Break || !self.supports(event) {
            Err(TimerError::InvalidDmaAssignment)
        } else {
            Ok(())
        }
    }

    /// Enable the DMA request of an event
    ///
    /// # Errors
    ///
    /// `InvalidDmaAssignment` on timers without DMA, for break, or for
    /// events this timer lacks.
    pub fn enable_dma(&mut self, event: TimerEvent) -> TimerResult<()> {
        self.check_dma(event)?;
        self.regs.set_bits(regs::DIER, event.mask() << regs::DIER_DMA_SHIFT);
        Ok(())
    }

    /// Disable the DMA request of an event
    ///
    /// # Errors
    ///
    /// As [`Timer::enable_dma`].
    pub fn disable_dma(&mut self, event: TimerEvent) -> TimerResult<()> {
        self.check_dma(event)?;
        self.regs.clear_bits(regs::DIER, event.mask() << regs::DIER_DMA_SHIFT);
        Ok(())
    }

    /// Set up DMA burst access through `DMAR`
    ///
    /// # Errors
    ///
    /// `InvalidDmaAssignment` on timers without DMA; `TimerRunning`;
    /// `InvalidDmaBurstStartingRegister` for `DCR`, `DMAR` and `OR`;
    /// `InvalidDmaBurstLength` unless `1 <= length` and the burst ends at
    /// `BDTR` or before.
    pub fn set_dma_burst(&mut self, start: TimerRegister, length: u32) -> TimerResult<()> {
        if !self.caps.dma {
            return Err(TimerError::InvalidDmaAssignment);
        }
        self.ensure_stopped()?;
        if start.index() >= MAX_NUM_TIMER_REGISTERS {
            return Err(TimerError::InvalidDmaBurstStartingRegister);
        }
        if length == 0 || start.index() + length > MAX_NUM_TIMER_REGISTERS {
            return Err(TimerError::InvalidDmaBurstLength);
        }
        self.regs.modify(regs::DCR, |r| {
            regs::DCR_DBL.insert(regs::DCR_DBA.insert(r, start.index()), length - 1)
        });
        Ok(())
    }

    /// Address of `DMAR`, for the DMA stream's peripheral port
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn dma_burst_address(&self) -> u32 {
        (self.id.base() + regs::DMAR) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        assert!(TimerId::Tim1.capabilities().advanced);
        assert!(TimerId::Tim5.capabilities().wide_counter);
        assert_eq!(TimerId::Tim9.capabilities().channels, 2);
        assert_eq!(TimerId::Tim6.capabilities().channels, 0);
        assert!(!TimerId::Tim11.capabilities().dma);
        assert!(!TimerId::Tim10.capabilities().slave);
    }

    #[test]
    fn lookup_by_base() {
        assert_eq!(TimerId::from_base(0x4000_0000), Ok(TimerId::Tim2));
        assert_eq!(TimerId::from_base(0x4001_0400), Ok(TimerId::Tim8));
        assert_eq!(TimerId::from_base(0x4000_0100), Err(TimerError::InvalidTimer));
    }

    #[test]
    fn register_offsets_validate() {
        assert_eq!(TimerRegister::try_from(0x34), Ok(TimerRegister::Ccr1));
        assert_eq!(TimerRegister::try_from(0x36), Err(TimerError::InvalidRegisterOffset));
        assert_eq!(TimerRegister::Bdtr.index(), 17);
    }
}
