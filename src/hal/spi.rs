//! SPI Bus Driver
//!
//! Blocking, polled SPI master/slave driver for SPI1 to SPI4. Frame format
//! fields (`BR`, `CPOL`, `CPHA`, `DFF`, `MSTR`) may only change while the
//! peripheral is disabled; setters refuse with [`SpiError::Enabled`]
//! otherwise.
//!
//! Every transmit waits for `TXE` before writing `DR`. A plain
//! [`Spi::write_byte`] leaves the received frame in `DR`, so a following
//! [`Spi::read_byte`] returns what came back on MISO during that write.

use embedded_hal::digital::OutputPin;

use crate::config::base;
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::RegisterAccess;

/// Size of an SPI register block in words
pub const BLOCK_WORDS: usize = 9;

mod regs {
    use crate::reg::Field;

    pub const CR1: usize = 0x00;
    pub const CR2: usize = 0x04;
    pub const SR: usize = 0x08;
    pub const DR: usize = 0x0C;

    pub const CR1_CPHA: u32 = 1 << 0;
    pub const CR1_CPOL: u32 = 1 << 1;
    pub const CR1_MSTR: u32 = 1 << 2;
    pub const CR1_BR: Field = Field::new(CR1, 3, 3);
    pub const CR1_SPE: u32 = 1 << 6;
    pub const CR1_SSI: u32 = 1 << 8;
    pub const CR1_SSM: u32 = 1 << 9;
    pub const CR1_DFF: u32 = 1 << 11;

    pub const CR2_SSOE: u32 = 1 << 2;

    pub const SR_RXNE: u32 = 1 << 0;
    pub const SR_TXE: u32 = 1 << 1;
    pub const SR_MODF: u32 = 1 << 5;
    pub const SR_OVR: u32 = 1 << 6;
    pub const SR_BSY: u32 = 1 << 7;
}

status_codes! {
    /// SPI status codes
    pub enum SpiError {
        /// Address is not an SPI block
        InvalidSpi = -80 => "invalid SPI",
        /// Baud rate divider not a power of two in 2..=256
        InvalidClockDivider = -81 => "invalid clock divider",
        /// Frame length not 8 or 16 bits
        InvalidDataLength = -82 => "invalid data length",
        /// Unknown slave management mode
        InvalidSwSlvMgmt = -83 => "invalid software slave management",
        /// Unknown NSS output setting
        InvalidSlaveSelection = -84 => "invalid slave selection",
        /// SSI level that would raise a mode fault
        InvalidSsiLevel = -85 => "invalid SSI level",
        /// Neither master nor slave
        InvalidOpMode = -86 => "invalid operation mode",
        /// Unknown clock phase
        InvalidPhase = -87 => "invalid phase",
        /// Unknown idle polarity
        InvalidIdlePolarity = -88 => "invalid idle polarity",
        /// Frame format change while SPE is set
        Enabled = -89 => "SPI enabled",
        /// Unknown interrupt source
        InvalidIrqType = -90 => "invalid IRQ type",
        /// Unknown DMA request
        InvalidDmaRequest = -91 => "invalid DMA request",
        /// Chip select pin could not be driven
        ChipSelect = -92 => "chip select failed",
    }
}

/// SPI operation result
pub type SpiResult<T> = Result<T, SpiError>;

impl embedded_hal::spi::Error for SpiError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

config_enum! {
    /// SPI instance
    pub enum SpiId: SpiError::InvalidSpi {
        /// SPI1 (APB2)
        Spi1 = 1,
        /// SPI2 (APB1)
        Spi2 = 2,
        /// SPI3 (APB1)
        Spi3 = 3,
        /// SPI4 (APB2)
        Spi4 = 4,
    }
}

impl SpiId {
    /// Base address of the register block
    #[must_use]
    pub const fn base(self) -> usize {
        match self {
            Self::Spi1 => base::SPI1,
            Self::Spi2 => base::SPI2,
            Self::Spi3 => base::SPI3,
            Self::Spi4 => base::SPI4,
        }
    }

    /// Clock gate of the instance
    #[must_use]
    pub const fn bus_clock(self) -> BusClock {
        match self {
            Self::Spi1 => BusClock::new(Bus::Apb2, 12),
            Self::Spi2 => BusClock::new(Bus::Apb1, 14),
            Self::Spi3 => BusClock::new(Bus::Apb1, 15),
            Self::Spi4 => BusClock::new(Bus::Apb2, 13),
        }
    }

    /// Instance whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidSpi` for any other address.
    pub fn from_base(addr: usize) -> SpiResult<Self> {
        [Self::Spi1, Self::Spi2, Self::Spi3, Self::Spi4]
            .into_iter()
            .find(|id| id.base() == addr)
            .ok_or(SpiError::InvalidSpi)
    }
}

config_enum! {
    /// Baud rate divider (`BR`)
    pub enum ClockDivider: SpiError::InvalidClockDivider {
        /// fPCLK / 2
        Div2 = 0,
        /// fPCLK / 4
        Div4 = 1,
        /// fPCLK / 8
        Div8 = 2,
        /// fPCLK / 16
        Div16 = 3,
        /// fPCLK / 32
        Div32 = 4,
        /// fPCLK / 64
        Div64 = 5,
        /// fPCLK / 128
        Div128 = 6,
        /// fPCLK / 256
        Div256 = 7,
    }
}

impl ClockDivider {
    /// Division factor
    #[must_use]
    pub const fn divisor(self) -> u32 {
        2 << self.raw()
    }

    /// Divider for a division factor
    ///
    /// # Errors
    ///
    /// `InvalidClockDivider` unless `divisor` is a power of two in 2..=256.
    pub fn from_divisor(divisor: u32) -> SpiResult<Self> {
        if !divisor.is_power_of_two() || !(2..=256).contains(&divisor) {
            return Err(SpiError::InvalidClockDivider);
        }
        Self::try_from(divisor.trailing_zeros() - 1)
    }
}

config_enum! {
    /// Frame length (`DFF`)
    pub enum DataLength: SpiError::InvalidDataLength {
        /// 8-bit frames
        Bits8 = 0,
        /// 16-bit frames
        Bits16 = 1,
    }
}

config_enum! {
    /// Slave select management (`SSM`)
    pub enum SlaveManagement: SpiError::InvalidSwSlvMgmt {
        /// NSS pin drives slave select
        Hardware = 0,
        /// `SSI` bit drives slave select
        Software = 1,
    }
}

config_enum! {
    /// Internal slave select level (`SSI`)
    pub enum SsiLevel: SpiError::InvalidSsiLevel {
        /// Selected
        Low = 0,
        /// Deselected
        High = 1,
    }
}

config_enum! {
    /// NSS output in master mode (`SSOE`)
    pub enum NssOutput: SpiError::InvalidSlaveSelection {
        /// NSS is an input
        Disabled = 0,
        /// NSS driven low while enabled
        Enabled = 1,
    }
}

config_enum! {
    /// Role on the bus (`MSTR`)
    pub enum OpMode: SpiError::InvalidOpMode {
        /// Slave
        Slave = 0,
        /// Master
        Master = 1,
    }
}

config_enum! {
    /// Clock phase (`CPHA`)
    pub enum Phase: SpiError::InvalidPhase {
        /// Capture on the first clock edge
        FirstEdge = 0,
        /// Capture on the second clock edge
        SecondEdge = 1,
    }
}

config_enum! {
    /// Clock idle level (`CPOL`)
    pub enum Polarity: SpiError::InvalidIdlePolarity {
        /// SCK low when idle
        IdleLow = 0,
        /// SCK high when idle
        IdleHigh = 1,
    }
}

config_enum! {
    /// Interrupt sources (bit position in `CR2`)
    pub enum SpiInterrupt: SpiError::InvalidIrqType {
        /// Error (`ERRIE`)
        Error = 5,
        /// Receive buffer not empty (`RXNEIE`)
        RxNotEmpty = 6,
        /// Transmit buffer empty (`TXEIE`)
        TxEmpty = 7,
    }
}

config_enum! {
    /// DMA requests (bit position in `CR2`)
    pub enum SpiDmaRequest: SpiError::InvalidDmaRequest {
        /// Receive (`RXDMAEN`)
        Rx = 0,
        /// Transmit (`TXDMAEN`)
        Tx = 1,
    }
}

/// Complete SPI frame configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct SpiConfig {
    /// Baud rate divider
    pub divider: ClockDivider,
    /// Frame length
    pub data_length: DataLength,
    /// Master or slave
    pub op_mode: OpMode,
    /// Clock phase
    pub phase: Phase,
    /// Clock idle polarity
    pub polarity: Polarity,
    /// Slave select management
    pub slave_management: SlaveManagement,
    /// Internal slave select level (software management only)
    pub ssi: SsiLevel,
    /// NSS output (hardware management only)
    pub nss_output: NssOutput,
}

impl SpiConfig {
    /// Mode 0 with software slave select, deselected
    #[must_use]
    pub const fn new(divider: ClockDivider, data_length: DataLength, op_mode: OpMode) -> Self {
        Self {
            divider,
            data_length,
            op_mode,
            phase: Phase::FirstEdge,
            polarity: Polarity::IdleLow,
            slave_management: SlaveManagement::Software,
            ssi: SsiLevel::High,
            nss_output: NssOutput::Disabled,
        }
    }

    /// Set clock phase and polarity
    #[must_use]
    pub const fn with_mode(mut self, phase: Phase, polarity: Polarity) -> Self {
        self.phase = phase;
        self.polarity = polarity;
        self
    }

    /// Set slave select handling
    #[must_use]
    pub const fn with_slave_select(
        mut self,
        management: SlaveManagement,
        ssi: SsiLevel,
        nss_output: NssOutput,
    ) -> Self {
        self.slave_management = management;
        self.ssi = ssi;
        self.nss_output = nss_output;
        self
    }

    /// Check field combinations
    ///
    /// # Errors
    ///
    /// `InvalidSsiLevel` for a master with software slave select held low,
    /// which would raise a mode fault as soon as SPE is set.
    /// `InvalidSlaveSelection` when NSS output is requested together with
    /// software management or in slave mode.
    pub fn validate(&self) -> SpiResult<()> {
        let software = self.slave_management == SlaveManagement::Software;
        if self.op_mode == OpMode::Master && software && self.ssi == SsiLevel::Low {
            return Err(SpiError::InvalidSsiLevel);
        }
        if self.nss_output == NssOutput::Enabled && (software || self.op_mode == OpMode::Slave) {
            return Err(SpiError::InvalidSlaveSelection);
        }
        Ok(())
    }

    /// `CR1` value without `SPE`
    const fn cr1(&self) -> u32 {
        let mut cr1 = regs::CR1_BR.insert(0, self.divider.raw());
        if matches!(self.data_length, DataLength::Bits16) {
            cr1 |= regs::CR1_DFF;
        }
        if matches!(self.slave_management, SlaveManagement::Software) {
            cr1 |= regs::CR1_SSM;
        }
        if matches!(self.ssi, SsiLevel::High) {
            cr1 |= regs::CR1_SSI;
        }
        if matches!(self.op_mode, OpMode::Master) {
            cr1 |= regs::CR1_MSTR;
        }
        if matches!(self.phase, Phase::SecondEdge) {
            cr1 |= regs::CR1_CPHA;
        }
        if matches!(self.polarity, Polarity::IdleHigh) {
            cr1 |= regs::CR1_CPOL;
        }
        cr1
    }
}

/// Raw `SR` contents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct SpiFlags(pub u32);

impl SpiFlags {
    /// Receive buffer holds a frame
    #[must_use]
    pub const fn rx_not_empty(self) -> bool {
        self.0 & regs::SR_RXNE != 0
    }

    /// Transmit buffer can take a frame
    #[must_use]
    pub const fn tx_empty(self) -> bool {
        self.0 & regs::SR_TXE != 0
    }

    /// Transfer in progress
    #[must_use]
    pub const fn busy(self) -> bool {
        self.0 & regs::SR_BSY != 0
    }

    /// Received frame lost
    #[must_use]
    pub const fn overrun(self) -> bool {
        self.0 & regs::SR_OVR != 0
    }

    /// Master lost its NSS
    #[must_use]
    pub const fn mode_fault(self) -> bool {
        self.0 & regs::SR_MODF != 0
    }
}

/// SPI driver for one instance
pub struct Spi<R> {
    id: SpiId,
    regs: R,
}

impl<R: RegisterAccess> Spi<R> {
    /// Wrap the register block of `id`
    pub fn new(id: SpiId, regs: R) -> Self {
        Self { id, regs }
    }

    /// Instance this handle drives
    #[must_use]
    pub const fn id(&self) -> SpiId {
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

    /// Configure and enable
    ///
    /// # Errors
    ///
    /// Any [`SpiConfig::validate`] error; nothing is written in that case.
    pub fn init(&mut self, config: &SpiConfig) -> SpiResult<()> {
        if let Err(e) = config.validate() {
            warn!("SPI init rejected: {}", e);
            return Err(e);
        }

        self.regs.write(regs::CR1, config.cr1());
        let cr2 = if config.nss_output == NssOutput::Enabled {
            regs::CR2_SSOE
        } else {
            0
        };
        self.regs.write(regs::CR2, cr2);
        self.enable();
        Ok(())
    }

    /// Set `SPE`
    pub fn enable(&mut self) {
        self.regs.set_bits(regs::CR1, regs::CR1_SPE);
    }

    /// Wait for the last frame to leave, then clear `SPE`
    pub fn disable(&mut self) {
        self.regs.wait_set(regs::SR, regs::SR_TXE);
        self.regs.wait_clear(regs::SR, regs::SR_BSY);
        self.regs.clear_bits(regs::CR1, regs::CR1_SPE);
    }

    /// Whether `SPE` is set
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.regs.is_set(regs::CR1, regs::CR1_SPE)
    }

    fn ensure_disabled(&self) -> SpiResult<()> {
        if self.is_enabled() {
            Err(SpiError::Enabled)
        } else {
            Ok(())
        }
    }

    fn write_cr1_bit(&mut self, mask: u32, on: bool) {
        if on {
            self.regs.set_bits(regs::CR1, mask);
        } else {
            self.regs.clear_bits(regs::CR1, mask);
        }
    }

    /// Change the baud rate divider
    ///
    /// # Errors
    ///
    /// `Enabled` while `SPE` is set.
    pub fn set_clock_divider(&mut self, divider: ClockDivider) -> SpiResult<()> {
        self.ensure_disabled()?;
        self.regs.write_field(regs::CR1_BR, divider.raw());
        Ok(())
    }

    /// Change the frame length
    ///
    /// # Errors
    ///
    /// `Enabled` while `SPE` is set.
    pub fn set_data_len(&mut self, length: DataLength) -> SpiResult<()> {
        self.ensure_disabled()?;
        self.write_cr1_bit(regs::CR1_DFF, length == DataLength::Bits16);
        Ok(())
    }

    /// Change master/slave role
    ///
    /// # Errors
    ///
    /// `Enabled` while `SPE` is set.
    pub fn set_op_mode(&mut self, mode: OpMode) -> SpiResult<()> {
        self.ensure_disabled()?;
        self.write_cr1_bit(regs::CR1_MSTR, mode == OpMode::Master);
        Ok(())
    }

    /// Change the clock phase
    ///
    /// # Errors
    ///
    /// `Enabled` while `SPE` is set.
    pub fn set_phase(&mut self, phase: Phase) -> SpiResult<()> {
        self.ensure_disabled()?;
        self.write_cr1_bit(regs::CR1_CPHA, phase == Phase::SecondEdge);
        Ok(())
    }

    /// Change the clock idle level
    ///
    /// # Errors
    ///
    /// `Enabled` while `SPE` is set.
    pub fn set_polarity(&mut self, polarity: Polarity) -> SpiResult<()> {
        self.ensure_disabled()?;
        self.write_cr1_bit(regs::CR1_CPOL, polarity == Polarity::IdleHigh);
        Ok(())
    }

    /// Change slave select management and the internal level
    ///
    /// # Errors
    ///
    /// `Enabled` while `SPE` is set; `InvalidSsiLevel` for a master with
    /// software management held low.
    pub fn set_software_slave_management(
        &mut self,
        management: SlaveManagement,
        ssi: SsiLevel,
    ) -> SpiResult<()> {
        self.ensure_disabled()?;
        let master = self.regs.is_set(regs::CR1, regs::CR1_MSTR);
        if master && management == SlaveManagement::Software && ssi == SsiLevel::Low {
            return Err(SpiError::InvalidSsiLevel);
        }
        self.write_cr1_bit(regs::CR1_SSM, management == SlaveManagement::Software);
        self.write_cr1_bit(regs::CR1_SSI, ssi == SsiLevel::High);
        Ok(())
    }

    /// Current frame length
    #[must_use]
    pub fn data_len(&self) -> DataLength {
        if self.regs.is_set(regs::CR1, regs::CR1_DFF) {
            DataLength::Bits16
        } else {
            DataLength::Bits8
        }
    }

    /// Unmask an interrupt source
    pub fn enable_interrupt(&mut self, irq: SpiInterrupt) {
        self.regs.set_bits(regs::CR2, 1 << irq.raw());
    }

    /// Mask an interrupt source
    pub fn disable_interrupt(&mut self, irq: SpiInterrupt) {
        self.regs.clear_bits(regs::CR2, 1 << irq.raw());
    }

    /// Enable a DMA request
    pub fn enable_dma(&mut self, request: SpiDmaRequest) {
        self.regs.set_bits(regs::CR2, 1 << request.raw());
    }

    /// Disable a DMA request
    pub fn disable_dma(&mut self, request: SpiDmaRequest) {
        self.regs.clear_bits(regs::CR2, 1 << request.raw());
    }

    /// Status register snapshot
    #[must_use]
    pub fn flags(&self) -> SpiFlags {
        SpiFlags(self.regs.read(regs::SR))
    }

    /// Clear `OVR` (read `DR` then `SR`)
    pub fn clear_overrun(&mut self) {
        let _ = self.regs.read(regs::DR);
        let _ = self.regs.read(regs::SR);
    }

    // =========================================================================
    // Data transfer
    // =========================================================================

    fn push_frame(&mut self, frame: u16) {
        self.regs.wait_set(regs::SR, regs::SR_TXE);
        self.regs.write(regs::DR, u32::from(frame));
    }

    #[allow(clippy::cast_possible_truncation)]
    fn pull_frame(&mut self) -> u16 {
        self.regs.wait_set(regs::SR, regs::SR_RXNE);
        self.regs.read(regs::DR) as u16
    }

    fn finish(&self) {
        self.regs.wait_set(regs::SR, regs::SR_TXE);
        self.regs.wait_clear(regs::SR, regs::SR_BSY);
    }

    /// Send one byte framed by `cs`, leaving the received byte in `DR`
    ///
    /// # Errors
    ///
    /// `ChipSelect` when the pin cannot be driven.
    pub fn write_byte<CS: OutputPin>(&mut self, cs: &mut CS, data: u8) -> SpiResult<()> {
        self.regs.wait_set(regs::SR, regs::SR_TXE);
        cs.set_low().map_err(|_| SpiError::ChipSelect)?;
        self.push_frame(u16::from(data));
        self.finish();
        cs.set_high().map_err(|_| SpiError::ChipSelect)
    }

    /// Send one 16-bit frame framed by `cs`
    ///
    /// # Errors
    ///
    /// `InvalidDataLength` unless the peripheral uses 16-bit frames;
    /// `ChipSelect` when the pin cannot be driven.
    pub fn write_word<CS: OutputPin>(&mut self, cs: &mut CS, data: u16) -> SpiResult<()> {
        if self.data_len() != DataLength::Bits16 {
            return Err(SpiError::InvalidDataLength);
        }
        self.regs.wait_set(regs::SR, regs::SR_TXE);
        cs.set_low().map_err(|_| SpiError::ChipSelect)?;
        self.push_frame(data);
        self.finish();
        cs.set_high().map_err(|_| SpiError::ChipSelect)
    }

    /// Wait for a received byte and return it
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_byte(&mut self) -> u8 {
        self.pull_frame() as u8
    }

    /// Wait for a received 16-bit frame and return it
    pub fn read_word(&mut self) -> u16 {
        self.pull_frame()
    }

    /// Full-duplex exchange of one byte framed by `cs`
    ///
    /// # Errors
    ///
    /// `ChipSelect` when the pin cannot be driven.
    pub fn transfer_byte<CS: OutputPin>(&mut self, cs: &mut CS, data: u8) -> SpiResult<u8> {
        self.write_byte(cs, data)?;
        Ok(self.read_byte())
    }

    /// Write `data` to device register `reg` in one chip-select frame
    ///
    /// # Errors
    ///
    /// `ChipSelect` when the pin cannot be driven.
    pub fn send_data<CS: OutputPin>(&mut self, cs: &mut CS, reg: u8, data: u8) -> SpiResult<()> {
        cs.set_low().map_err(|_| SpiError::ChipSelect)?;
        for byte in [reg, data] {
            self.push_frame(u16::from(byte));
            let _ = self.pull_frame();
        }
        self.finish();
        cs.set_high().map_err(|_| SpiError::ChipSelect)
    }

    /// Read `buf.len()` bytes starting at device register `reg`
    ///
    /// Clocks out `reg`, then one dummy `0x00` per byte read.
    ///
    /// # Errors
    ///
    /// `ChipSelect` when the pin cannot be driven.
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_reg_burst<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: u8,
        buf: &mut [u8],
    ) -> SpiResult<()> {
        cs.set_low().map_err(|_| SpiError::ChipSelect)?;
        self.push_frame(u16::from(reg));
        let _ = self.pull_frame();
        for byte in buf.iter_mut() {
            self.push_frame(0);
            *byte = self.pull_frame() as u8;
        }
        self.finish();
        cs.set_high().map_err(|_| SpiError::ChipSelect)
    }
}

impl<R: RegisterAccess> embedded_hal::spi::ErrorType for Spi<R> {
    type Error = SpiError;
}

impl<R: RegisterAccess> embedded_hal::spi::SpiBus<u8> for Spi<R> {
    #[allow(clippy::cast_possible_truncation)]
    fn read(&mut self, words: &mut [u8]) -> SpiResult<()> {
        for word in words.iter_mut() {
            self.push_frame(0);
            *word = self.pull_frame() as u8;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> SpiResult<()> {
        for &word in words {
            self.push_frame(u16::from(word));
            let _ = self.pull_frame();
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> SpiResult<()> {
        for i in 0..read.len().max(write.len()) {
            self.push_frame(u16::from(write.get(i).copied().unwrap_or(0)));
            let rx = self.pull_frame() as u8;
            if let Some(slot) = read.get_mut(i) {
                *slot = rx;
            }
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn transfer_in_place(&mut self, words: &mut [u8]) -> SpiResult<()> {
        for word in words.iter_mut() {
            self.push_frame(u16::from(*word));
            *word = self.pull_frame() as u8;
        }
        Ok(())
    }

    fn flush(&mut self) -> SpiResult<()> {
        self.finish();
        Ok(())
    }
}
