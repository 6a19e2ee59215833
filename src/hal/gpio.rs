//! GPIO Ports
//!
//! Pin mode, output driver, pull resistors, speed and alternate function
//! for ports A to H, plus atomic set/reset through `BSRR`. A single pin can
//! be borrowed as an [`embedded_hal::digital::OutputPin`], which is how SPI
//! chip selects are driven.

use core::convert::Infallible;

use crate::config::base;
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::{Field, RegisterAccess};

/// Size of a GPIO port register block in words
pub const BLOCK_WORDS: usize = 10;

mod regs {
    pub const MODER: usize = 0x00;
    pub const OTYPER: usize = 0x04;
    pub const OSPEEDR: usize = 0x08;
    pub const PUPDR: usize = 0x0C;
    pub const IDR: usize = 0x10;
    pub const ODR: usize = 0x14;
    pub const BSRR: usize = 0x18;
    pub const AFRL: usize = 0x20;
    pub const AFRH: usize = 0x24;
}

status_codes! {
    /// GPIO status codes
    pub enum GpioError {
        /// Unknown port
        InvalidPort = -1 => "invalid port",
        /// Pin number above 15
        InvalidPin = -2 => "invalid pin",
        /// Alternate function above 15
        InvalidAltFunc = -3 => "invalid alternate function",
        /// Unknown output driver type
        InvalidOutputType = -4 => "invalid output type",
        /// Unknown pull resistor setting
        InvalidResistorType = -5 => "invalid resistor type",
        /// Unknown pin mode
        InvalidPinMode = -6 => "invalid pin mode",
        /// Push-pull setting on a pin that is not an output
        InvalidPushPullMode = -7 => "invalid push-pull mode",
        /// Unknown output speed
        InvalidOutputSpeed = -8 => "invalid output speed",
    }
}

/// GPIO operation result
pub type GpioResult<T> = Result<T, GpioError>;

config_enum! {
    /// GPIO port
    pub enum Port: GpioError::InvalidPort {
        /// Port A
        A = 0,
        /// Port B
        B = 1,
        /// Port C
        C = 2,
        /// Port D
        D = 3,
        /// Port E
        E = 4,
        /// Port F
        F = 5,
        /// Port G
        G = 6,
        /// Port H
        H = 7,
    }
}

impl Port {
    /// Base address of the port's register block
    #[must_use]
    pub const fn base(self) -> usize {
        base::GPIOA + self.raw() as usize * base::GPIO_STRIDE
    }

    /// Clock gate of the port (AHB1)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn bus_clock(self) -> BusClock {
        BusClock::new(Bus::Ahb1, self.raw() as u8)
    }

    /// Port whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidPort` when no port lives there.
    pub fn from_base(addr: usize) -> GpioResult<Self> {
        let offset = addr.checked_sub(base::GPIOA).ok_or(GpioError::InvalidPort)?;
        if offset % base::GPIO_STRIDE != 0 {
            return Err(GpioError::InvalidPort);
        }
        let idx = u32::try_from(offset / base::GPIO_STRIDE).map_err(|_| GpioError::InvalidPort)?;
        Self::try_from(idx)
    }
}

config_enum! {
    /// Pin number within a port
    pub enum PinNumber: GpioError::InvalidPin {
        /// Pin 0
        P0 = 0,
        /// Pin 1
        P1 = 1,
        /// Pin 2
        P2 = 2,
        /// Pin 3
        P3 = 3,
        /// Pin 4
        P4 = 4,
        /// Pin 5
        P5 = 5,
        /// Pin 6
        P6 = 6,
        /// Pin 7
        P7 = 7,
        /// Pin 8
        P8 = 8,
        /// Pin 9
        P9 = 9,
        /// Pin 10
        P10 = 10,
        /// Pin 11
        P11 = 11,
        /// Pin 12
        P12 = 12,
        /// Pin 13
        P13 = 13,
        /// Pin 14
        P14 = 14,
        /// Pin 15
        P15 = 15,
    }
}

impl PinNumber {
    /// Single-bit mask of the pin
    #[must_use]
    pub const fn mask(self) -> u32 {
        1 << self.raw()
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn field(self, offset: usize, width: u8) -> Field {
        Field::new(offset, self.raw() as u8 * width, width)
    }
}

config_enum! {
    /// Pin mode (`MODER`)
    pub enum Mode: GpioError::InvalidPinMode {
        /// Digital input
        Input = 0,
        /// General-purpose output
        Output = 1,
        /// Alternate function
        AltFunc = 2,
        /// Analog
        Analog = 3,
    }
}

config_enum! {
    /// Output driver (`OTYPER`)
    pub enum OutputType: GpioError::InvalidOutputType {
        /// Push-pull
        PushPull = 0,
        /// Open drain
        OpenDrain = 1,
    }
}

config_enum! {
    /// Pull resistor (`PUPDR`)
    pub enum Pull: GpioError::InvalidResistorType {
        /// Floating
        None = 0,
        /// Pull-up
        Up = 1,
        /// Pull-down
        Down = 2,
    }
}

config_enum! {
    /// Output slew rate (`OSPEEDR`)
    pub enum Speed: GpioError::InvalidOutputSpeed {
        /// Low speed
        Low = 0,
        /// Medium speed
        Medium = 1,
        /// Fast speed
        Fast = 2,
        /// High speed
        High = 3,
    }
}

config_enum! {
    /// Alternate function selection (`AFRL`/`AFRH`)
    pub enum AltFunc: GpioError::InvalidAltFunc {
        /// AF0 (system: MCO, SWD)
        Af0 = 0,
        /// AF1 (TIM1/TIM2)
        Af1 = 1,
        /// AF2 (TIM3..5)
        Af2 = 2,
        /// AF3 (TIM8..11)
        Af3 = 3,
        /// AF4 (I2C1..3)
        Af4 = 4,
        /// AF5 (SPI1..4)
        Af5 = 5,
        /// AF6 (SPI2..4)
        Af6 = 6,
        /// AF7 (USART1..3)
        Af7 = 7,
        /// AF8 (USART6, UART4/5)
        Af8 = 8,
        /// AF9 (CAN, TIM12..14)
        Af9 = 9,
        /// AF10 (OTG)
        Af10 = 10,
        /// AF11
        Af11 = 11,
        /// AF12 (SDIO, FMC)
        Af12 = 12,
        /// AF13 (DCMI)
        Af13 = 13,
        /// AF14
        Af14 = 14,
        /// AF15 (EVENTOUT)
        Af15 = 15,
    }
}

/// Driver for one GPIO port
pub struct GpioPort<R> {
    port: Port,
    regs: R,
}

impl<R: RegisterAccess> GpioPort<R> {
    /// Wrap the register block of `port`
    pub fn new(port: Port, regs: R) -> Self {
        Self { port, regs }
    }

    /// Port this handle drives
    #[must_use]
    pub const fn port(&self) -> Port {
        self.port
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Turn the port clock on
    pub fn select<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(self.port.bus_clock());
    }

    /// Turn the port clock off
    pub fn deselect<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.disable_peripheral_clock(self.port.bus_clock());
    }

    /// Set a pin's mode
    pub fn set_mode(&mut self, pin: PinNumber, mode: Mode) {
        self.regs.write_field(pin.field(regs::MODER, 2), mode.raw());
    }

    /// Current mode of a pin
    #[must_use]
    pub fn mode(&self, pin: PinNumber) -> Mode {
        match self.regs.read_field(pin.field(regs::MODER, 2)) {
            0 => Mode::Input,
            1 => Mode::Output,
            2 => Mode::AltFunc,
            _ => Mode::Analog,
        }
    }

    /// Select push-pull or open-drain
    ///
    /// # Errors
    ///
    /// `InvalidPushPullMode` when the pin is neither an output nor an
    /// alternate function.
    pub fn set_output_type(&mut self, pin: PinNumber, otype: OutputType) -> GpioResult<()> {
        if !matches!(self.mode(pin), Mode::Output | Mode::AltFunc) {
            return Err(GpioError::InvalidPushPullMode);
        }
        self.regs.write_field(pin.field(regs::OTYPER, 1), otype.raw());
        Ok(())
    }

    /// Select the pull resistor
    pub fn set_pull(&mut self, pin: PinNumber, pull: Pull) {
        self.regs.write_field(pin.field(regs::PUPDR, 2), pull.raw());
    }

    /// Select the output speed
    pub fn set_speed(&mut self, pin: PinNumber, speed: Speed) {
        self.regs.write_field(pin.field(regs::OSPEEDR, 2), speed.raw());
    }

    /// Route an alternate function to the pin
    ///
    /// The pin mode is not changed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_alt_func(&mut self, pin: PinNumber, af: AltFunc) {
        let n = pin.raw() as u8;
        let field = if n < 8 {
            Field::new(regs::AFRL, n * 4, 4)
        } else {
            Field::new(regs::AFRH, (n - 8) * 4, 4)
        };
        self.regs.write_field(field, af.raw());
    }

    /// Drive a pin high
    pub fn set_pin(&mut self, pin: PinNumber) {
        self.regs.write(regs::BSRR, pin.mask());
    }

    /// Drive a pin low
    pub fn reset_pin(&mut self, pin: PinNumber) {
        self.regs.write(regs::BSRR, pin.mask() << 16);
    }

    /// Invert a pin's output latch
    pub fn toggle_pin(&mut self, pin: PinNumber) {
        if self.is_set_high(pin) {
            self.reset_pin(pin);
        } else {
            self.set_pin(pin);
        }
    }

    /// Input level of a pin
    #[must_use]
    pub fn read_pin(&self, pin: PinNumber) -> bool {
        self.regs.read(regs::IDR) & pin.mask() != 0
    }

    /// Output latch of a pin
    #[must_use]
    pub fn is_set_high(&self, pin: PinNumber) -> bool {
        self.regs.read(regs::ODR) & pin.mask() != 0
    }

    /// Configure a pin as push-pull output and borrow it
    pub fn output(&mut self, pin: PinNumber) -> Output<'_, R> {
        self.set_mode(pin, Mode::Output);
        self.regs.write_field(pin.field(regs::OTYPER, 1), OutputType::PushPull.raw());
        Output { port: self, pin }
    }
}

/// A single output pin borrowed from its port
pub struct Output<'a, R> {
    port: &'a mut GpioPort<R>,
    pin: PinNumber,
}

impl<R: RegisterAccess> Output<'_, R> {
    /// Pin number within the port
    #[must_use]
    pub fn pin(&self) -> PinNumber {
        self.pin
    }
}

impl<R: RegisterAccess> embedded_hal::digital::ErrorType for Output<'_, R> {
    type Error = Infallible;
}

impl<R: RegisterAccess> embedded_hal::digital::OutputPin for Output<'_, R> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.port.reset_pin(self.pin);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.port.set_pin(self.pin);
        Ok(())
    }
}
