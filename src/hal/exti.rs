//! External interrupt/event controller
//!
//! Lines 0 to 15 follow GPIO pins; which port drives a line is selected in
//! the SYSCFG `EXTICRx` registers, so this driver owns both blocks. The
//! remaining lines are wired to internal sources. Line 19 is reserved on
//! the STM32F4 and rejected.

use crate::hal::gpio::{PinNumber, Port};
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::{Field, RegisterAccess};

/// Size of the EXTI register block in words
pub const BLOCK_WORDS: usize = 6;

/// Size of the SYSCFG register block in words
pub const SYSCFG_BLOCK_WORDS: usize = 9;

/// SYSCFG clock gate
pub const SYSCFG_CLOCK: BusClock = BusClock::new(Bus::Apb2, 14);

mod regs {
    pub const IMR: usize = 0x00;
    pub const EMR: usize = 0x04;
    pub const RTSR: usize = 0x08;
    pub const FTSR: usize = 0x0C;
    pub const SWIER: usize = 0x10;
    pub const PR: usize = 0x14;

    pub const SYSCFG_EXTICR1: usize = 0x08;
}

status_codes! {
    /// EXTI status codes
    pub enum ExtiError {
        /// Line number reserved or above 22
        InvalidIrqNum = -40 => "invalid IRQ number",
        /// Unknown trigger edge
        InvalidTrigger = -41 => "invalid trigger",
        /// Unknown GPIO port
        InvalidPort = -42 => "invalid port",
        /// Pin number above 15
        InvalidPin = -43 => "invalid pin",
    }
}

/// EXTI operation result
pub type ExtiResult<T> = Result<T, ExtiError>;

config_enum! {
    /// EXTI line
    pub enum ExtiLine: ExtiError::InvalidIrqNum {
        /// GPIO pin 0
        Pin0 = 0,
        /// GPIO pin 1
        Pin1 = 1,
        /// GPIO pin 2
        Pin2 = 2,
        /// GPIO pin 3
        Pin3 = 3,
        /// GPIO pin 4
        Pin4 = 4,
        /// GPIO pin 5
        Pin5 = 5,
        /// GPIO pin 6
        Pin6 = 6,
        /// GPIO pin 7
        Pin7 = 7,
        /// GPIO pin 8
        Pin8 = 8,
        /// GPIO pin 9
        Pin9 = 9,
        /// GPIO pin 10
        Pin10 = 10,
        /// GPIO pin 11
        Pin11 = 11,
        /// GPIO pin 12
        Pin12 = 12,
        /// GPIO pin 13
        Pin13 = 13,
        /// GPIO pin 14
        Pin14 = 14,
        /// GPIO pin 15
        Pin15 = 15,
        /// Programmable voltage detector
        Pvd = 16,
        /// RTC alarm
        RtcAlarm = 17,
        /// USB OTG FS wakeup
        OtgFsWakeup = 18,
        /// USB OTG HS wakeup
        OtgHsWakeup = 20,
        /// RTC tamper and timestamp
        RtcTamper = 21,
        /// RTC wakeup timer
        RtcWakeup = 22,
    }
}

impl ExtiLine {
    /// Line driven by GPIO pin `pin`
    #[must_use]
    pub const fn from_pin(pin: PinNumber) -> Self {
        match pin {
            PinNumber::P0 => Self::Pin0,
            PinNumber::P1 => Self::Pin1,
            PinNumber::P2 => Self::Pin2,
            PinNumber::P3 => Self::Pin3,
            PinNumber::P4 => Self::Pin4,
            PinNumber::P5 => Self::Pin5,
            PinNumber::P6 => Self::Pin6,
            PinNumber::P7 => Self::Pin7,
            PinNumber::P8 => Self::Pin8,
            PinNumber::P9 => Self::Pin9,
            PinNumber::P10 => Self::Pin10,
            PinNumber::P11 => Self::Pin11,
            PinNumber::P12 => Self::Pin12,
            PinNumber::P13 => Self::Pin13,
            PinNumber::P14 => Self::Pin14,
            PinNumber::P15 => Self::Pin15,
        }
    }

    /// Single-bit mask of the line in the EXTI registers
    #[must_use]
    pub const fn mask(self) -> u32 {
        1 << self.raw()
    }
}

config_enum! {
    /// Edge that sets a line pending
    pub enum Trigger: ExtiError::InvalidTrigger {
        /// Rising edge
        Rising = 0,
        /// Falling edge
        Falling = 1,
        /// Both edges
        Both = 2,
    }
}

/// Validate a raw port index (A = 0) and pin number
///
/// # Errors
///
/// `InvalidPort` or `InvalidPin`.
pub fn gpio_source(port: u32, pin: u32) -> ExtiResult<(Port, PinNumber)> {
    let port = Port::try_from(port).map_err(|_| ExtiError::InvalidPort)?;
    let pin = PinNumber::try_from(pin).map_err(|_| ExtiError::InvalidPin)?;
    Ok((port, pin))
}

/// Port selection field of GPIO line `n` in SYSCFG `EXTICR1..4`
#[allow(clippy::cast_possible_truncation)]
const fn exticr_field(n: u32) -> Field {
    Field::new(regs::SYSCFG_EXTICR1 + (n / 4) as usize * 4, ((n % 4) * 4) as u8, 4)
}

/// EXTI driver, owning the EXTI and SYSCFG blocks
pub struct Exti<E, S> {
    exti: E,
    syscfg: S,
}

impl<E: RegisterAccess, S: RegisterAccess> Exti<E, S> {
    /// Wrap the EXTI and SYSCFG blocks
    pub fn new(exti: E, syscfg: S) -> Self {
        Self { exti, syscfg }
    }

    /// Underlying EXTI register block
    #[must_use]
    pub fn registers(&self) -> &E {
        &self.exti
    }

    /// Underlying SYSCFG register block
    #[must_use]
    pub fn syscfg_registers(&self) -> &S {
        &self.syscfg
    }

    /// Enable the SYSCFG clock, needed for port selection
    pub fn init<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(SYSCFG_CLOCK);
    }

    /// Connect `pin` of `port` to its EXTI line
    ///
    /// Returns the line, which still has to be given a trigger and unmasked.
    pub fn config_irq(&mut self, port: Port, pin: PinNumber) -> ExtiLine {
        self.syscfg.write_field(exticr_field(pin.raw()), port.raw());
        ExtiLine::from_pin(pin)
    }

    /// Port currently connected to a GPIO line
    ///
    /// # Errors
    ///
    /// `InvalidPin` for lines not driven by GPIO.
    pub fn connected_port(&self, line: ExtiLine) -> ExtiResult<Port> {
        let n = line.raw();
        if n > 15 {
            return Err(ExtiError::InvalidPin);
        }
        Port::try_from(self.syscfg.read_field(exticr_field(n))).map_err(|_| ExtiError::InvalidPort)
    }

    /// Select the edge(s) that set `line` pending
    pub fn set_trigger(&mut self, line: ExtiLine, trigger: Trigger) {
        let mask = line.mask();
        match trigger {
            Trigger::Rising => {
                self.exti.set_bits(regs::RTSR, mask);
                self.exti.clear_bits(regs::FTSR, mask);
            }
            Trigger::Falling => {
                self.exti.clear_bits(regs::RTSR, mask);
                self.exti.set_bits(regs::FTSR, mask);
            }
            Trigger::Both => {
                self.exti.set_bits(regs::RTSR, mask);
                self.exti.set_bits(regs::FTSR, mask);
            }
        }
    }

    /// Unmask the interrupt request of `line`
    pub fn enable_irq(&mut self, line: ExtiLine) {
        self.exti.set_bits(regs::IMR, line.mask());
    }

    /// Mask the interrupt request of `line`
    pub fn disable_irq(&mut self, line: ExtiLine) {
        self.exti.clear_bits(regs::IMR, line.mask());
    }

    /// Unmask the event request of `line`
    pub fn enable_event(&mut self, line: ExtiLine) {
        self.exti.set_bits(regs::EMR, line.mask());
    }

    /// Mask the event request of `line`
    pub fn disable_event(&mut self, line: ExtiLine) {
        self.exti.clear_bits(regs::EMR, line.mask());
    }

    /// Set `line` pending from software
    pub fn software_trigger(&mut self, line: ExtiLine) {
        self.exti.write(regs::SWIER, line.mask());
    }

    /// Whether `line` is pending
    #[must_use]
    pub fn is_pending(&self, line: ExtiLine) -> bool {
        self.exti.is_set(regs::PR, line.mask())
    }

    /// Clear the pending bit of `line` (write 1 to clear)
    pub fn reset_pending(&mut self, line: ExtiLine) {
        self.exti.write(regs::PR, line.mask());
    }
}
