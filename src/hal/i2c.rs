//! I2C Bus Driver
//!
//! Polled master driver for I2C1 to I2C3. Bus timing (`CCR`, `TRISE`) is
//! computed from the PCLK1 frequency reported by [`Rcc`], so the driver
//! must be re-timed with [`I2c::set_clock_speed`] after the APB1 clock
//! changes.
//!
//! Clock speeds up to 100 kHz use standard mode encoding, faster ones fast
//! mode. A slave that does not acknowledge its address ends the transfer
//! with a STOP and [`I2cError::Nack`]; bus errors and arbitration loss are
//! left in the status register for the caller ([`I2c::status_flags`]).

use crate::config::base;
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::RegisterAccess;

/// Size of an I2C register block in words
pub const BLOCK_WORDS: usize = 10;

mod regs {
    use crate::reg::Field;

    pub const CR1: usize = 0x00;
    pub const CR2: usize = 0x04;
    pub const OAR1: usize = 0x08;
    pub const DR: usize = 0x10;
    pub const SR1: usize = 0x14;
    pub const SR2: usize = 0x18;
    pub const CCR: usize = 0x1C;
    pub const TRISE: usize = 0x20;

    pub const CR1_PE: u32 = 1 << 0;
    pub const CR1_START: u32 = 1 << 8;
    pub const CR1_STOP: u32 = 1 << 9;
    pub const CR1_ACK: u32 = 1 << 10;
    pub const CR1_SWRST: u32 = 1 << 15;

    pub const CR2_FREQ: Field = Field::new(CR2, 0, 6);

    /// Bit 14 of `OAR1` must be kept at 1 by software
    pub const OAR1_RESERVED: u32 = 1 << 14;

    pub const SR1_SB: u32 = 1 << 0;
    pub const SR1_ADDR: u32 = 1 << 1;
    pub const SR1_BTF: u32 = 1 << 2;
    pub const SR1_RXNE: u32 = 1 << 6;
    pub const SR1_TXE: u32 = 1 << 7;
    pub const SR1_BERR: u32 = 1 << 8;
    pub const SR1_ARLO: u32 = 1 << 9;
    pub const SR1_AF: u32 = 1 << 10;
    pub const SR1_OVR: u32 = 1 << 11;
    pub const SR1_ERRORS: u32 = SR1_BERR | SR1_ARLO | SR1_AF | SR1_OVR;

    pub const SR2_BUSY: u32 = 1 << 1;

    pub const CCR_VALUE: Field = Field::new(CCR, 0, 12);
    pub const CCR_DUTY: u32 = 1 << 14;
    pub const CCR_FS: u32 = 1 << 15;

    pub const TRISE_MAX: u32 = 63;
}

status_codes! {
    /// I2C status codes
    pub enum I2cError {
        /// Address is not an I2C block
        InvalidType = -60 => "invalid I2C",
        /// Duty cycle unknown or not allowed at this speed
        InvalidDutyCycle = -61 => "invalid duty cycle",
        /// Speed unknown or unreachable from PCLK1
        InvalidClockSpeed = -62 => "invalid clock speed",
        /// PCLK1 outside 2..=50 MHz
        InvalidPeripheralClock = -63 => "invalid peripheral clock",
        /// Rise time above 63 PCLK1 periods
        InvalidRiseTime = -64 => "invalid rise time",
        /// Slave did not acknowledge its address
        Nack = -65 => "address not acknowledged",
    }
}

/// I2C operation result
pub type I2cResult<T> = Result<T, I2cError>;

config_enum! {
    /// I2C instance
    pub enum I2cId: I2cError::InvalidType {
        /// I2C1
        I2c1 = 1,
        /// I2C2
        I2c2 = 2,
        /// I2C3
        I2c3 = 3,
    }
}

impl I2cId {
    /// Base address of the register block
    #[must_use]
    pub const fn base(self) -> usize {
        match self {
            Self::I2c1 => base::I2C1,
            Self::I2c2 => base::I2C2,
            Self::I2c3 => base::I2C3,
        }
    }

    /// Clock gate of the instance (APB1)
    #[must_use]
    pub const fn bus_clock(self) -> BusClock {
        match self {
            Self::I2c1 => BusClock::new(Bus::Apb1, 21),
            Self::I2c2 => BusClock::new(Bus::Apb1, 22),
            Self::I2c3 => BusClock::new(Bus::Apb1, 23),
        }
    }

    /// Instance whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidType` for any other address.
    pub fn from_base(addr: usize) -> I2cResult<Self> {
        [Self::I2c1, Self::I2c2, Self::I2c3]
            .into_iter()
            .find(|id| id.base() == addr)
            .ok_or(I2cError::InvalidType)
    }
}

config_enum! {
    /// SCL frequency in Hz
    pub enum ClockSpeed: I2cError::InvalidClockSpeed {
        /// 50 kHz, standard mode
        Standard50k = 50_000,
        /// 100 kHz, standard mode
        Standard100k = 100_000,
        /// 200 kHz, fast mode
        Fast200k = 200_000,
        /// 400 kHz, fast mode
        Fast400k = 400_000,
        /// 1 MHz, fast mode encoding
        Fast1M = 1_000_000,
    }
}

impl ClockSpeed {
    /// Whether the speed needs fast mode timing
    #[must_use]
    pub const fn is_fast(self) -> bool {
        self.raw() > 100_000
    }
}

config_enum! {
    /// Fast mode SCL low/high ratio
    pub enum DutyCycle: I2cError::InvalidDutyCycle {
        /// t_low / t_high = 2
        Duty2 = 0,
        /// t_low / t_high = 16/9
        Duty16_9 = 1,
    }
}

/// 7-bit slave address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// Create from a 7-bit address; the top bit is dropped
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// The 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }

    /// Address byte for a write transfer
    const fn write_byte(self) -> u32 {
        (self.0 as u32) << 1
    }

    /// Address byte for a read transfer
    const fn read_byte(self) -> u32 {
        ((self.0 as u32) << 1) | 1
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02X}", self.0);
    }
}

/// Bus timing derived from PCLK1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// `CR2.FREQ` in MHz
    pub freq_mhz: u32,
    /// Full `CCR` register value
    pub ccr: u32,
    /// `TRISE` register value
    pub trise: u32,
}

/// Compute bus timing for `speed` and `duty` from a PCLK1 of `pclk1_hz`
///
/// # Errors
///
/// `InvalidPeripheralClock` unless PCLK1 is 2..=50 MHz; `InvalidDutyCycle`
/// for 16/9 in standard mode; `InvalidClockSpeed` when the clock control
/// value does not fit.
pub fn timing(pclk1_hz: u32, speed: ClockSpeed, duty: DutyCycle) -> I2cResult<Timing> {
    let freq_mhz = pclk1_hz / 1_000_000;
    if !(2..=50).contains(&freq_mhz) {
        return Err(I2cError::InvalidPeripheralClock);
    }
    let scl = speed.raw();

    let (value, trise) = if speed.is_fast() {
        let value = match duty {
            DutyCycle::Duty2 => pclk1_hz / (3 * scl),
            DutyCycle::Duty16_9 => pclk1_hz / (25 * scl),
        };
        (value, freq_mhz * 300 / 1000 + 1)
    } else {
        if duty == DutyCycle::Duty16_9 {
            return Err(I2cError::InvalidDutyCycle);
        }
        ((pclk1_hz / (2 * scl)).max(4), freq_mhz + 1)
    };
    if value == 0 || value > regs::CCR_VALUE.value_mask() {
        return Err(I2cError::InvalidClockSpeed);
    }

    let mut ccr = value;
    if speed.is_fast() {
        ccr |= regs::CCR_FS;
        if duty == DutyCycle::Duty16_9 {
            ccr |= regs::CCR_DUTY;
        }
    }
    Ok(Timing { freq_mhz, ccr, trise })
}

/// Snapshot of `SR1` (low half) and `SR2` (high half)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct I2cFlags(pub u32);

impl I2cFlags {
    /// Misplaced START or STOP seen
    #[must_use]
    pub const fn bus_error(self) -> bool {
        self.0 & regs::SR1_BERR != 0
    }

    /// Another master won the bus
    #[must_use]
    pub const fn arbitration_lost(self) -> bool {
        self.0 & regs::SR1_ARLO != 0
    }

    /// A byte was not acknowledged
    #[must_use]
    pub const fn ack_failure(self) -> bool {
        self.0 & regs::SR1_AF != 0
    }

    /// Data lost in slave mode
    #[must_use]
    pub const fn overrun(self) -> bool {
        self.0 & regs::SR1_OVR != 0
    }

    /// Communication ongoing on the bus
    #[must_use]
    pub const fn busy(self) -> bool {
        self.0 & (regs::SR2_BUSY << 16) != 0
    }

    /// Any error flag set
    #[must_use]
    pub const fn has_error(self) -> bool {
        self.0 & regs::SR1_ERRORS != 0
    }
}

/// I2C master driver for one instance
pub struct I2c<R> {
    id: I2cId,
    regs: R,
    pclk1_hz: u32,
    speed: ClockSpeed,
    duty: DutyCycle,
}

impl<R: RegisterAccess> I2c<R> {
    /// Wrap the register block of `id`
    pub fn new(id: I2cId, regs: R) -> Self {
        Self {
            id,
            regs,
            pclk1_hz: 0,
            speed: ClockSpeed::Standard100k,
            duty: DutyCycle::Duty2,
        }
    }

    /// Instance this handle drives
    #[must_use]
    pub const fn id(&self) -> I2cId {
        self.id
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Configured SCL speed
    #[must_use]
    pub const fn clock_speed(&self) -> ClockSpeed {
        self.speed
    }

    /// Turn the instance's bus clock on
    pub fn select<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(self.id.bus_clock());
    }

    /// Turn the instance's bus clock off
    pub fn deselect<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.disable_peripheral_clock(self.id.bus_clock());
    }

    /// Reset, time the bus from PCLK1 and enable with acknowledge on
    ///
    /// # Errors
    ///
    /// Any [`timing`] error; nothing is written in that case.
    pub fn init<C: RegisterAccess>(
        &mut self,
        rcc: &Rcc<C>,
        speed: ClockSpeed,
        duty: DutyCycle,
    ) -> I2cResult<()> {
        let pclk1_hz = rcc.pclk1();
        let t = timing(pclk1_hz, speed, duty).inspect_err(|e| {
            warn!("I2C init rejected: {}", e);
        })?;

        self.reset();
        self.regs.write_field(regs::CR2_FREQ, t.freq_mhz);
        self.regs.write(regs::CCR, t.ccr);
        self.regs.write(regs::TRISE, t.trise);
        self.regs.write(regs::OAR1, regs::OAR1_RESERVED);
        self.regs.write(regs::CR1, regs::CR1_PE | regs::CR1_ACK);

        self.pclk1_hz = pclk1_hz;
        self.speed = speed;
        self.duty = duty;
        debug!("I2C bus at {} Hz, CCR {}", speed.raw(), t.ccr);
        Ok(())
    }

    /// Set `PE`
    pub fn enable(&mut self) {
        self.regs.set_bits(regs::CR1, regs::CR1_PE);
    }

    /// Clear `PE`
    pub fn disable(&mut self) {
        self.regs.clear_bits(regs::CR1, regs::CR1_PE);
    }

    /// Pulse `SWRST`, returning every register to its reset value
    pub fn reset(&mut self) {
        self.regs.set_bits(regs::CR1, regs::CR1_SWRST);
        self.regs.clear_bits(regs::CR1, regs::CR1_SWRST);
    }

    /// Write timing with the peripheral briefly disabled
    fn apply_timing(&mut self, t: Timing) {
        let enabled = self.regs.is_set(regs::CR1, regs::CR1_PE);
        self.disable();
        self.regs.write_field(regs::CR2_FREQ, t.freq_mhz);
        self.regs.write(regs::CCR, t.ccr);
        self.regs.write(regs::TRISE, t.trise);
        if enabled {
            self.enable();
        }
    }

    /// Re-time the bus for `speed`, reading PCLK1 again
    ///
    /// # Errors
    ///
    /// Any [`timing`] error with the current duty cycle.
    pub fn set_clock_speed<C: RegisterAccess>(
        &mut self,
        rcc: &Rcc<C>,
        speed: ClockSpeed,
    ) -> I2cResult<()> {
        let pclk1_hz = rcc.pclk1();
        let duty = if speed.is_fast() {
            self.duty
        } else {
            DutyCycle::Duty2
        };
        let t = timing(pclk1_hz, speed, duty)?;
        self.apply_timing(t);
        self.pclk1_hz = pclk1_hz;
        self.speed = speed;
        self.duty = duty;
        Ok(())
    }

    /// Change the fast mode duty cycle
    ///
    /// # Errors
    ///
    /// `InvalidDutyCycle` for 16/9 in standard mode; `InvalidPeripheralClock`
    /// before [`I2c::init`].
    pub fn set_duty_cycle(&mut self, duty: DutyCycle) -> I2cResult<()> {
        let t = timing(self.pclk1_hz, self.speed, duty)?;
        self.apply_timing(t);
        self.duty = duty;
        Ok(())
    }

    /// Override the maximum rise time, in PCLK1 periods plus one
    ///
    /// # Errors
    ///
    /// `InvalidRiseTime` above 63.
    pub fn set_rise_time(&mut self, trise: u32) -> I2cResult<()> {
        if trise > regs::TRISE_MAX {
            return Err(I2cError::InvalidRiseTime);
        }
        self.regs.write(regs::TRISE, trise);
        Ok(())
    }

    /// `SR1` and `SR2` in one word (`SR2` in the high half)
    ///
    /// Reading `SR2` after `SR1` clears `ADDR`; do not call mid-transfer.
    #[must_use]
    pub fn status_flags(&self) -> I2cFlags {
        let sr1 = self.regs.read(regs::SR1);
        let sr2 = self.regs.read(regs::SR2);
        I2cFlags(sr1 | (sr2 << 16))
    }

    /// Clear bus error, arbitration lost, acknowledge failure and overrun
    pub fn clear_error_flags(&mut self) {
        self.regs.clear_flags(regs::SR1, regs::SR1_ERRORS);
    }

    // =========================================================================
    // Transfer phases
    // =========================================================================

    fn start(&mut self) {
        self.regs.set_bits(regs::CR1, regs::CR1_START);
        self.regs.wait_set(regs::SR1, regs::SR1_SB);
    }

    fn stop(&mut self) {
        self.regs.set_bits(regs::CR1, regs::CR1_STOP);
    }

    /// Send an address byte and wait for `ADDR` or `AF`
    ///
    /// `ADDR` is left set; the caller clears it with [`Self::clear_addr`].
    fn address(&mut self, byte: u32) -> I2cResult<()> {
        self.regs.write(regs::DR, byte);
        loop {
            let sr1 = self.regs.read(regs::SR1);
            if sr1 & regs::SR1_ADDR != 0 {
                return Ok(());
            }
            if sr1 & regs::SR1_AF != 0 {
                return Err(self.nack());
            }
            core::hint::spin_loop();
        }
    }

    /// Wait for `flag` during the data phase; a NACK from the slave ends
    /// the transfer
    fn wait_ack(&mut self, flag: u32) -> I2cResult<()> {
        loop {
            let sr1 = self.regs.read(regs::SR1);
            if sr1 & regs::SR1_AF != 0 {
                return Err(self.nack());
            }
            if sr1 & flag != 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
    }

    /// Clear `AF` and release the bus
    fn nack(&mut self) -> I2cError {
        self.regs.clear_flags(regs::SR1, regs::SR1_AF);
        self.stop();
        debug!("I2C{} not acknowledged", self.id.raw());
        I2cError::Nack
    }

    fn clear_addr(&mut self) {
        let _ = self.regs.read(regs::SR1);
        let _ = self.regs.read(regs::SR2);
    }

    fn begin_write(&mut self, addr: I2cAddress) -> I2cResult<()> {
        self.regs.wait_clear(regs::SR2, regs::SR2_BUSY);
        self.start();
        self.address(addr.write_byte())?;
        self.clear_addr();
        Ok(())
    }

    fn put(&mut self, byte: u8) -> I2cResult<()> {
        self.wait_ack(regs::SR1_TXE)?;
        self.regs.write(regs::DR, u32::from(byte));
        Ok(())
    }

    fn end_write(&mut self) -> I2cResult<()> {
        self.wait_ack(regs::SR1_BTF)?;
        self.stop();
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get(&mut self) -> u8 {
        self.regs.wait_set(regs::SR1, regs::SR1_RXNE);
        self.regs.read(regs::DR) as u8
    }

    /// Receive `buf.len()` bytes after a START, NACK the last one and STOP
    fn receive(&mut self, addr: I2cAddress, buf: &mut [u8]) -> I2cResult<()> {
        self.address(addr.read_byte())?;
        match buf.len() {
            0 => {
                self.clear_addr();
                self.stop();
            }
            1 => {
                self.regs.clear_bits(regs::CR1, regs::CR1_ACK);
                self.clear_addr();
                self.stop();
                buf[0] = self.get();
            }
            len => {
                self.regs.set_bits(regs::CR1, regs::CR1_ACK);
                self.clear_addr();
                for (i, byte) in buf.iter_mut().enumerate() {
                    if i + 1 == len {
                        self.regs.clear_bits(regs::CR1, regs::CR1_ACK);
                        self.stop();
                    }
                    *byte = self.get();
                }
            }
        }
        self.regs.set_bits(regs::CR1, regs::CR1_ACK);
        Ok(())
    }

    // =========================================================================
    // Master transfers
    // =========================================================================

    /// Write one byte to a slave
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn send_byte(&mut self, addr: I2cAddress, byte: u8) -> I2cResult<()> {
        self.burst_write(addr, &[byte])
    }

    /// Write one byte to register `reg` of a slave
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn send_byte_to_slave_reg(&mut self, addr: I2cAddress, reg: u8, byte: u8) -> I2cResult<()> {
        self.burst_write(addr, &[reg, byte])
    }

    /// Write `data` in a single transfer
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn burst_write(&mut self, addr: I2cAddress, data: &[u8]) -> I2cResult<()> {
        self.begin_write(addr)?;
        for &byte in data {
            self.put(byte)?;
        }
        self.end_write()
    }

    /// Write `values` to consecutive registers starting at `reg`
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn burst_reg_write(&mut self, addr: I2cAddress, reg: u8, values: &[u8]) -> I2cResult<()> {
        self.begin_write(addr)?;
        self.put(reg)?;
        for &byte in values {
            self.put(byte)?;
        }
        self.end_write()
    }

    /// Read one byte from a slave
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn read_byte(&mut self, addr: I2cAddress) -> I2cResult<u8> {
        let mut buf = [0u8];
        self.burst_read(addr, &mut buf)?;
        Ok(buf[0])
    }

    /// Read register `reg` of a slave
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn read_byte_from_slave_reg(&mut self, addr: I2cAddress, reg: u8) -> I2cResult<u8> {
        let mut buf = [0u8];
        self.burst_reg_read(addr, reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Fill `buf` from a slave in a single transfer
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn burst_read(&mut self, addr: I2cAddress, buf: &mut [u8]) -> I2cResult<()> {
        self.regs.wait_clear(regs::SR2, regs::SR2_BUSY);
        self.start();
        self.receive(addr, buf)
    }

    /// Write `reg`, then read `buf.len()` bytes after a repeated START
    ///
    /// # Errors
    ///
    /// `Nack` when the address or a data byte is not acknowledged.
    pub fn burst_reg_read(&mut self, addr: I2cAddress, reg: u8, buf: &mut [u8]) -> I2cResult<()> {
        self.begin_write(addr)?;
        self.put(reg)?;
        self.wait_ack(regs::SR1_BTF)?;
        self.start();
        self.receive(addr, buf)
    }

    /// Whether a slave acknowledges `addr`
    pub fn probe(&mut self, addr: I2cAddress) -> bool {
        self.regs.wait_clear(regs::SR2, regs::SR2_BUSY);
        self.start();
        match self.address(addr.write_byte()) {
            Ok(()) => {
                self.clear_addr();
                self.stop();
                true
            }
            Err(_) => false,
        }
    }

    /// Lowest non-reserved address that acknowledges
    pub fn find_slave_addr(&mut self) -> Option<I2cAddress> {
        (0x08..0x78)
            .map(I2cAddress::new)
            .find(|&addr| self.probe(addr))
    }

    /// Every non-reserved address that acknowledges, up to 16
    pub fn scan(&mut self) -> heapless::Vec<I2cAddress, 16> {
        let mut devices = heapless::Vec::new();

        for addr in (0x08..0x78).map(I2cAddress::new) {
            if self.probe(addr) && devices.push(addr).is_err() {
                break;
            }
        }

        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_mode_timing() {
        let t = timing(16_000_000, ClockSpeed::Standard100k, DutyCycle::Duty2);
        assert_eq!(t, Ok(Timing { freq_mhz: 16, ccr: 80, trise: 17 }));
    }

    #[test]
    fn fast_mode_timing() {
        let t = timing(16_000_000, ClockSpeed::Fast1M, DutyCycle::Duty2);
        assert_eq!(t.map(|t| t.ccr), Ok(regs::CCR_FS | 5));

        let t = timing(40_000_000, ClockSpeed::Fast400k, DutyCycle::Duty16_9);
        assert_eq!(t.map(|t| t.ccr), Ok(regs::CCR_FS | regs::CCR_DUTY | 4));
    }

    #[test]
    fn standard_mode_ccr_floor() {
        let t = timing(2_000_000, ClockSpeed::Standard100k, DutyCycle::Duty2);
        assert_eq!(t.map(|t| t.ccr), Ok(10));
        let t = timing(2_000_000, ClockSpeed::Standard50k, DutyCycle::Duty2);
        assert_eq!(t.map(|t| t.ccr), Ok(20));
    }

    #[test]
    fn timing_rejections() {
        assert_eq!(
            timing(1_000_000, ClockSpeed::Standard100k, DutyCycle::Duty2),
            Err(I2cError::InvalidPeripheralClock)
        );
        assert_eq!(
            timing(16_000_000, ClockSpeed::Standard100k, DutyCycle::Duty16_9),
            Err(I2cError::InvalidDutyCycle)
        );
        assert_eq!(
            timing(16_000_000, ClockSpeed::Fast1M, DutyCycle::Duty16_9),
            Err(I2cError::InvalidClockSpeed)
        );
    }
}
