//! USART Driver
//!
//! Asynchronous serial for USART1, USART2 and USART6. The baud rate
//! register is computed from the instance's APB clock, so
//! [`Usart::set_baudrate`] and [`Usart::set_oversampling`] take the
//! [`Rcc`] handle.
//!
//! Blocking transfers poll `TXE`/`RXNE`. Interrupt-driven reception and
//! transmission go through the two ends of a split [`UsartBuffer`]:
//! [`Usart::on_rx_interrupt`] and [`Usart::on_tx_interrupt`] are meant to
//! be called from the USART interrupt handler.

mod buffer;

pub use buffer::{Consumer, Producer, UsartBuffer, BUFFER_SLOTS};

use crate::config::base;
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::RegisterAccess;

/// Size of a USART register block in words
pub const BLOCK_WORDS: usize = 7;

mod regs {
    use crate::reg::Field;

    pub const SR: usize = 0x00;
    pub const DR: usize = 0x04;
    pub const BRR: usize = 0x08;
    pub const CR1: usize = 0x0C;
    pub const CR2: usize = 0x10;
    pub const CR3: usize = 0x14;

    pub const SR_RXNE: u32 = 1 << 5;
    pub const SR_TC: u32 = 1 << 6;
    pub const SR_TXE: u32 = 1 << 7;
    /// Flags cleared by writing 0
    pub const SR_WRITE_CLEAR: u32 = SR_RXNE | SR_TC | (1 << 8) | (1 << 9);

    pub const CR1_RE: u32 = 1 << 2;
    pub const CR1_TE: u32 = 1 << 3;
    pub const CR1_TXEIE: u32 = 1 << 7;
    pub const CR1_PS: u32 = 1 << 9;
    pub const CR1_PCE: u32 = 1 << 10;
    pub const CR1_M: u32 = 1 << 12;
    pub const CR1_UE: u32 = 1 << 13;
    pub const CR1_OVER8: u32 = 1 << 15;
    pub const CR1_PARITY: u32 = CR1_PS | CR1_PCE;

    pub const CR2_STOP: Field = Field::new(CR2, 12, 2);

    pub const CR3_DMAR: u32 = 1 << 6;
    pub const CR3_DMAT: u32 = 1 << 7;
    pub const CR3_FLOW: Field = Field::new(CR3, 8, 2);

    pub const BRR_MANTISSA_MAX: u32 = 0xFFF;
}

status_codes! {
    /// USART status codes
    pub enum UsartError {
        /// Address is not a USART block
        InvalidUsart = -100 => "invalid USART",
        /// Unknown interrupt source
        InvalidIrqType = -101 => "invalid IRQ type",
        /// Unknown parity setting
        InvalidParity = -102 => "invalid parity",
        /// Word length not 8 or 9 bits
        InvalidWordlen = -103 => "invalid word length",
        /// Unknown stop bit count
        InvalidNumStop = -104 => "invalid number of stop bits",
        /// Unknown oversampling mode
        InvalidOversamplingMode = -105 => "invalid oversampling mode",
        /// Unknown receiver enable setting
        InvalidRxEnableMode = -106 => "invalid receiver mode",
        /// Unknown transmitter enable setting
        InvalidTxEnableMode = -107 => "invalid transmitter mode",
        /// Unknown transmit DMA setting
        InvalidDmaTxMode = -108 => "invalid DMA transmit mode",
        /// Unknown receive DMA setting
        InvalidDmaRxMode = -109 => "invalid DMA receive mode",
        /// Baud rate unreachable from the bus clock
        InvalidBaudrate = -110 => "invalid baud rate",
        /// Ring buffer full
        BufferFull = -111 => "buffer full",
        /// Ring buffer empty
        BufferEmpty = -112 => "buffer empty",
        /// Unknown flag, or flag not clearable by software
        InvalidFlag = -113 => "invalid flag",
        /// Unknown flow control setting
        InvalidFlowControl = -114 => "invalid flow control",
    }
}

/// USART operation result
pub type UsartResult<T> = Result<T, UsartError>;

impl embedded_io::Error for UsartError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::BufferFull => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

config_enum! {
    /// USART instance
    pub enum UsartId: UsartError::InvalidUsart {
        /// USART1 (APB2)
        Usart1 = 1,
        /// USART2 (APB1)
        Usart2 = 2,
        /// USART6 (APB2)
        Usart6 = 6,
    }
}

impl UsartId {
    /// Base address of the register block
    #[must_use]
    pub const fn base(self) -> usize {
        match self {
            Self::Usart1 => base::USART1,
            Self::Usart2 => base::USART2,
            Self::Usart6 => base::USART6,
        }
    }

    /// Clock gate of the instance
    #[must_use]
    pub const fn bus_clock(self) -> BusClock {
        match self {
            Self::Usart1 => BusClock::new(Bus::Apb2, 4),
            Self::Usart2 => BusClock::new(Bus::Apb1, 17),
            Self::Usart6 => BusClock::new(Bus::Apb2, 5),
        }
    }

    /// Instance whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidUsart` for any other address.
    pub fn from_base(addr: usize) -> UsartResult<Self> {
        [Self::Usart1, Self::Usart2, Self::Usart6]
            .into_iter()
            .find(|id| id.base() == addr)
            .ok_or(UsartError::InvalidUsart)
    }
}

config_enum! {
    /// Data bits per frame (`M`)
    pub enum WordLength: UsartError::InvalidWordlen {
        /// 8 data bits
        Bits8 = 0,
        /// 9 data bits
        Bits9 = 1,
    }
}

config_enum! {
    /// Parity (`PCE`, `PS`)
    pub enum Parity: UsartError::InvalidParity {
        /// No parity bit
        None = 0,
        /// Even parity
        Even = 1,
        /// Odd parity
        Odd = 2,
    }
}

config_enum! {
    /// Stop bits (`STOP`)
    pub enum StopBits: UsartError::InvalidNumStop {
        /// 1 stop bit
        One = 0,
        /// 0.5 stop bit
        Half = 1,
        /// 2 stop bits
        Two = 2,
        /// 1.5 stop bits
        OneAndHalf = 3,
    }
}

config_enum! {
    /// Receiver sampling rate (`OVER8`)
    pub enum Oversampling: UsartError::InvalidOversamplingMode {
        /// 16 samples per bit
        By16 = 0,
        /// 8 samples per bit
        By8 = 1,
    }
}

config_enum! {
    /// Receiver enable (`RE`)
    pub enum Receiver: UsartError::InvalidRxEnableMode {
        /// Receiver off
        Off = 0,
        /// Receiver on
        On = 1,
    }
}

config_enum! {
    /// Transmitter enable (`TE`)
    pub enum Transmitter: UsartError::InvalidTxEnableMode {
        /// Transmitter off
        Off = 0,
        /// Transmitter on
        On = 1,
    }
}

config_enum! {
    /// Transmit DMA request (`DMAT`)
    pub enum DmaTx: UsartError::InvalidDmaTxMode {
        /// No DMA
        Off = 0,
        /// DMA feeds `DR`
        On = 1,
    }
}

config_enum! {
    /// Receive DMA request (`DMAR`)
    pub enum DmaRx: UsartError::InvalidDmaRxMode {
        /// No DMA
        Off = 0,
        /// DMA drains `DR`
        On = 1,
    }
}

config_enum! {
    /// Hardware flow control (`RTSE`, `CTSE`)
    pub enum FlowControl: UsartError::InvalidFlowControl {
        /// None
        None = 0,
        /// RTS only
        Rts = 1,
        /// CTS only
        Cts = 2,
        /// RTS and CTS
        RtsCts = 3,
    }
}

config_enum! {
    /// Interrupt sources, encoded as control register offset and enable bit
    pub enum UsartInterrupt: UsartError::InvalidIrqType {
        /// Idle line (`IDLEIE`)
        Idle = 0x0C04,
        /// Receive buffer not empty (`RXNEIE`)
        RxNotEmpty = 0x0C05,
        /// Transmission complete (`TCIE`)
        TxComplete = 0x0C06,
        /// Transmit buffer empty (`TXEIE`)
        TxEmpty = 0x0C07,
        /// Parity error (`PEIE`)
        ParityError = 0x0C08,
        /// LIN break (`LBDIE`)
        LinBreak = 0x1006,
        /// Framing, noise and overrun errors (`EIE`)
        Error = 0x1400,
        /// CTS change (`CTSIE`)
        Cts = 0x140A,
    }
}

impl UsartInterrupt {
    const fn location(self) -> (usize, u32) {
        ((self.raw() >> 8) as usize, 1 << (self.raw() & 0xFF))
    }
}

config_enum! {
    /// Status flags, as bit positions in `SR`
    pub enum UsartFlag: UsartError::InvalidFlag {
        /// Parity error (`PE`)
        ParityError = 0,
        /// Framing error (`FE`)
        FramingError = 1,
        /// Noise detected (`NF`)
        Noise = 2,
        /// Overrun (`ORE`)
        Overrun = 3,
        /// Idle line (`IDLE`)
        Idle = 4,
        /// Receive buffer not empty (`RXNE`)
        RxNotEmpty = 5,
        /// Transmission complete (`TC`)
        TxComplete = 6,
        /// Transmit buffer empty (`TXE`)
        TxEmpty = 7,
        /// LIN break (`LBD`)
        LinBreak = 8,
        /// CTS change (`CTS`)
        Cts = 9,
    }
}

impl UsartFlag {
    /// Single-bit mask in `SR`
    #[must_use]
    pub const fn mask(self) -> u32 {
        1 << self.raw()
    }
}

/// Frame format and speed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct UsartConfig {
    /// Bits per second
    pub baud: u32,
    /// Data bits
    pub word_length: WordLength,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Oversampling
    pub oversampling: Oversampling,
    /// Hardware flow control
    pub flow_control: FlowControl,
}

impl UsartConfig {
    /// 8N1 at `baud`, 16x oversampling, no flow control
    #[must_use]
    pub const fn new(baud: u32) -> Self {
        Self {
            baud,
            word_length: WordLength::Bits8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            oversampling: Oversampling::By16,
            flow_control: FlowControl::None,
        }
    }

    /// Set the frame format
    #[must_use]
    pub const fn with_format(
        mut self,
        word_length: WordLength,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Self {
        self.word_length = word_length;
        self.parity = parity;
        self.stop_bits = stop_bits;
        self
    }

    /// Set the oversampling
    #[must_use]
    pub const fn with_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Set hardware flow control
    #[must_use]
    pub const fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// `CR1` value without `UE`, `TE` or `RE`
    const fn cr1(&self) -> u32 {
        let mut cr1 = parity_bits(self.parity);
        if matches!(self.word_length, WordLength::Bits9) {
            cr1 |= regs::CR1_M;
        }
        if matches!(self.oversampling, Oversampling::By8) {
            cr1 |= regs::CR1_OVER8;
        }
        cr1
    }
}

const fn parity_bits(parity: Parity) -> u32 {
    match parity {
        Parity::None => 0,
        Parity::Even => regs::CR1_PCE,
        Parity::Odd => regs::CR1_PCE | regs::CR1_PS,
    }
}

/// `BRR` value for `baud` from a peripheral clock of `fck_hz`
///
/// # Errors
///
/// `InvalidBaudrate` when the rate is zero or the mantissa falls outside
/// 1..=0xFFF.
#[allow(clippy::cast_possible_truncation)]
pub const fn brr_for(fck_hz: u32, baud: u32, oversampling: Oversampling) -> UsartResult<u32> {
    if baud == 0 {
        return Err(UsartError::InvalidBaudrate);
    }
    // fck / baud, rounded: USARTDIV in 1/16 (or 1/8) units
    let div = ((fck_hz as u64 + baud as u64 / 2) / baud as u64) as u32;
    let (mantissa, brr) = match oversampling {
        Oversampling::By16 => (div >> 4, div),
        Oversampling::By8 => (div >> 3, ((div >> 3) << 4) | (div & 0x7)),
    };
    if mantissa == 0 || mantissa > regs::BRR_MANTISSA_MAX {
        return Err(UsartError::InvalidBaudrate);
    }
    Ok(brr)
}

/// USART driver for one instance
pub struct Usart<R> {
    id: UsartId,
    regs: R,
    baud: u32,
}

impl<R: RegisterAccess> Usart<R> {
    /// Wrap the register block of `id`
    pub fn new(id: UsartId, regs: R) -> Self {
        Self { id, regs, baud: 0 }
    }

    /// Instance this handle drives
    #[must_use]
    pub const fn id(&self) -> UsartId {
        self.id
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Baud rate last programmed
    #[must_use]
    pub const fn baud(&self) -> u32 {
        self.baud
    }

    /// Turn the instance's bus clock on
    pub fn select<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(self.id.bus_clock());
    }

    /// Turn the instance's bus clock off
    pub fn deselect<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.disable_peripheral_clock(self.id.bus_clock());
    }

    fn kernel_clock<C: RegisterAccess>(&self, rcc: &Rcc<C>) -> u32 {
        rcc.bus_clock(self.id.bus_clock().bus)
    }

    /// Program frame format and speed, empty `buffer`, then enable with TX
    /// and RX on
    ///
    /// # Errors
    ///
    /// `InvalidBaudrate`; neither the registers nor `buffer` are touched in
    /// that case.
    pub fn init<C: RegisterAccess>(
        &mut self,
        rcc: &Rcc<C>,
        config: &UsartConfig,
        buffer: &mut UsartBuffer,
    ) -> UsartResult<()> {
        self.set_comm_params(rcc, config)?;
        buffer.init();
        self.regs.set_bits(regs::CR1, regs::CR1_TE | regs::CR1_RE | regs::CR1_UE);
        debug!("USART{} at {} baud", self.id.raw(), config.baud);
        Ok(())
    }

    /// Program frame format and speed with the USART disabled
    ///
    /// `TE`/`RE` and interrupt enables are kept; `UE` is left clear.
    ///
    /// # Errors
    ///
    /// `InvalidBaudrate`; nothing is written in that case.
    pub fn set_comm_params<C: RegisterAccess>(
        &mut self,
        rcc: &Rcc<C>,
        config: &UsartConfig,
    ) -> UsartResult<()> {
        let brr = brr_for(self.kernel_clock(rcc), config.baud, config.oversampling).inspect_err(
            |e| {
                warn!("USART{} baud {} rejected: {}", self.id.raw(), config.baud, e);
            },
        )?;

        self.clear_ue();
        let keep = !(regs::CR1_M | regs::CR1_PARITY | regs::CR1_OVER8 | regs::CR1_UE);
        self.regs.modify(regs::CR1, |r| (r & keep) | config.cr1());
        self.regs.write_field(regs::CR2_STOP, config.stop_bits.raw());
        self.regs.write_field(regs::CR3_FLOW, config.flow_control.raw());
        self.regs.write(regs::BRR, brr);
        self.baud = config.baud;
        Ok(())
    }

    /// Set `UE`
    pub fn enable(&mut self) {
        self.regs.set_bits(regs::CR1, regs::CR1_UE);
    }

    /// Clear `UE` and drop whatever `buffer` still holds
    ///
    /// The buffer must not be split at this point, so no interrupt handler
    /// can be feeding it.
    pub fn disable(&mut self, buffer: &mut UsartBuffer) {
        self.clear_ue();
        buffer.init();
    }

    fn clear_ue(&mut self) {
        self.regs.clear_bits(regs::CR1, regs::CR1_UE);
    }

    /// Reprogram `BRR` for `baud` with the current oversampling
    ///
    /// # Errors
    ///
    /// `InvalidBaudrate`; `BRR` is unchanged.
    pub fn set_baudrate<C: RegisterAccess>(&mut self, rcc: &Rcc<C>, baud: u32) -> UsartResult<()> {
        let brr = brr_for(self.kernel_clock(rcc), baud, self.oversampling())?;
        self.regs.write(regs::BRR, brr);
        self.baud = baud;
        Ok(())
    }

    /// Current oversampling
    #[must_use]
    pub fn oversampling(&self) -> Oversampling {
        if self.regs.is_set(regs::CR1, regs::CR1_OVER8) {
            Oversampling::By8
        } else {
            Oversampling::By16
        }
    }

    /// Change the oversampling and recompute `BRR` for the current baud rate
    ///
    /// # Errors
    ///
    /// `InvalidBaudrate` when the current rate is unreachable in the new
    /// mode; nothing is written.
    pub fn set_oversampling<C: RegisterAccess>(
        &mut self,
        rcc: &Rcc<C>,
        oversampling: Oversampling,
    ) -> UsartResult<()> {
        let brr = brr_for(self.kernel_clock(rcc), self.baud, oversampling)?;
        match oversampling {
            Oversampling::By16 => self.regs.clear_bits(regs::CR1, regs::CR1_OVER8),
            Oversampling::By8 => self.regs.set_bits(regs::CR1, regs::CR1_OVER8),
        }
        self.regs.write(regs::BRR, brr);
        Ok(())
    }

    /// Set the data bits per frame
    pub fn set_word_length(&mut self, length: WordLength) {
        match length {
            WordLength::Bits8 => self.regs.clear_bits(regs::CR1, regs::CR1_M),
            WordLength::Bits9 => self.regs.set_bits(regs::CR1, regs::CR1_M),
        }
    }

    /// Set the parity
    pub fn set_parity(&mut self, parity: Parity) {
        self.regs.modify(regs::CR1, |r| (r & !regs::CR1_PARITY) | parity_bits(parity));
    }

    /// Set the stop bits
    pub fn set_stop_bits(&mut self, stop: StopBits) {
        self.regs.write_field(regs::CR2_STOP, stop.raw());
    }

    /// Turn the receiver on or off
    pub fn set_receiver(&mut self, mode: Receiver) {
        match mode {
            Receiver::Off => self.regs.clear_bits(regs::CR1, regs::CR1_RE),
            Receiver::On => self.regs.set_bits(regs::CR1, regs::CR1_RE),
        }
    }

    /// Turn the transmitter on or off
    pub fn set_transmitter(&mut self, mode: Transmitter) {
        match mode {
            Transmitter::Off => self.regs.clear_bits(regs::CR1, regs::CR1_TE),
            Transmitter::On => self.regs.set_bits(regs::CR1, regs::CR1_TE),
        }
    }

    /// Select hardware flow control
    pub fn set_flow_control(&mut self, flow: FlowControl) {
        self.regs.write_field(regs::CR3_FLOW, flow.raw());
    }

    /// Turn the transmit DMA request on or off
    pub fn set_dma_tx(&mut self, mode: DmaTx) {
        match mode {
            DmaTx::Off => self.regs.clear_bits(regs::CR3, regs::CR3_DMAT),
            DmaTx::On => self.regs.set_bits(regs::CR3, regs::CR3_DMAT),
        }
    }

    /// Turn the receive DMA request on or off
    pub fn set_dma_rx(&mut self, mode: DmaRx) {
        match mode {
            DmaRx::Off => self.regs.clear_bits(regs::CR3, regs::CR3_DMAR),
            DmaRx::On => self.regs.set_bits(regs::CR3, regs::CR3_DMAR),
        }
    }

    /// Address of `DR`, for DMA peripheral ports
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn data_register_address(&self) -> u32 {
        (self.id.base() + regs::DR) as u32
    }

    // =========================================================================
    // Interrupts and flags
    // =========================================================================

    /// Unmask an interrupt source
    pub fn enable_interrupt(&mut self, irq: UsartInterrupt) {
        let (reg, mask) = irq.location();
        self.regs.set_bits(reg, mask);
    }

    /// Mask an interrupt source
    pub fn disable_interrupt(&mut self, irq: UsartInterrupt) {
        let (reg, mask) = irq.location();
        self.regs.clear_bits(reg, mask);
    }

    /// Whether an interrupt source is unmasked
    #[must_use]
    pub fn is_interrupt_enabled(&self, irq: UsartInterrupt) -> bool {
        let (reg, mask) = irq.location();
        self.regs.is_set(reg, mask)
    }

    /// Whether `flag` is set in `SR`
    #[must_use]
    pub fn is_flag_set(&self, flag: UsartFlag) -> bool {
        self.regs.is_set(regs::SR, flag.mask())
    }

    /// Clear a status flag
    ///
    /// `RXNE`, `TC`, `LBD` and `CTS` are written to zero; the error flags and
    /// `IDLE` are cleared by reading `SR` then `DR`, which discards any
    /// received byte.
    ///
    /// # Errors
    ///
    /// `InvalidFlag` for `TXE`, which only a write to `DR` clears.
    pub fn clear_flag(&mut self, flag: UsartFlag) -> UsartResult<()> {
        let mask = flag.mask();
        if flag == UsartFlag::TxEmpty {
            return Err(UsartError::InvalidFlag);
        }
        if mask & regs::SR_WRITE_CLEAR != 0 {
            self.regs.clear_flags(regs::SR, mask);
        } else {
            let _ = self.regs.read(regs::SR);
            let _ = self.regs.read(regs::DR);
        }
        Ok(())
    }

    // =========================================================================
    // Blocking transfers
    // =========================================================================

    /// Wait for `TXE` and send one byte
    pub fn send_byte(&mut self, byte: u8) {
        self.regs.wait_set(regs::SR, regs::SR_TXE);
        self.regs.write(regs::DR, u32::from(byte));
    }

    /// Send every byte of `s` and wait for the last to leave the shifter
    pub fn send_string(&mut self, s: &str) {
        for byte in s.bytes() {
            self.send_byte(byte);
        }
        self.wait_idle();
    }

    /// Wait for `TC`
    pub fn wait_idle(&self) {
        self.regs.wait_set(regs::SR, regs::SR_TC);
    }

    /// Wait for `RXNE` and return the received byte
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_byte(&mut self) -> u8 {
        self.regs.wait_set(regs::SR, regs::SR_RXNE);
        self.regs.read(regs::DR) as u8
    }

    /// Received byte, if one is waiting
    #[allow(clippy::cast_possible_truncation)]
    pub fn try_read_byte(&mut self) -> Option<u8> {
        self.regs
            .is_set(regs::SR, regs::SR_RXNE)
            .then(|| self.regs.read(regs::DR) as u8)
    }

    // =========================================================================
    // Interrupt-driven transfers
    // =========================================================================

    /// Move a received byte into `rx`
    ///
    /// Returns the byte moved, `None` when `RXNE` was clear.
    ///
    /// # Errors
    ///
    /// `BufferFull`; the byte is read out of `DR` and dropped.
    pub fn on_rx_interrupt(&mut self, rx: &mut Producer<'_>) -> UsartResult<Option<u8>> {
        match self.try_read_byte() {
            Some(byte) => rx.push(byte).map(|()| Some(byte)),
            None => Ok(None),
        }
    }

    /// Feed the next queued byte to `DR`, masking `TXEIE` once `tx` is empty
    ///
    /// Returns whether a byte was sent.
    pub fn on_tx_interrupt(&mut self, tx: &mut Consumer<'_>) -> bool {
        if !self.regs.is_set(regs::SR, regs::SR_TXE) {
            return false;
        }
        if let Ok(byte) = tx.get_byte() {
            self.regs.write(regs::DR, u32::from(byte));
            true
        } else {
            self.regs.clear_bits(regs::CR1, regs::CR1_TXEIE);
            false
        }
    }

    /// Queue `data` for interrupt-driven transmission and unmask `TXEIE`
    ///
    /// Returns how many bytes were queued.
    ///
    /// # Errors
    ///
    /// `BufferFull` when not a single byte fit.
    pub fn queue_transmit(&mut self, tx: &mut Producer<'_>, data: &[u8]) -> UsartResult<usize> {
        let mut queued = 0;
        for &byte in data {
            if tx.push(byte).is_err() {
                break;
            }
            queued += 1;
        }
        if queued > 0 {
            self.regs.set_bits(regs::CR1, regs::CR1_TXEIE);
        }
        if queued == 0 && !data.is_empty() {
            return Err(UsartError::BufferFull);
        }
        Ok(queued)
    }
}

impl<R: RegisterAccess> embedded_io::ErrorType for Usart<R> {
    type Error = UsartError;
}

impl<R: RegisterAccess> embedded_io::Write for Usart<R> {
    fn write(&mut self, buf: &[u8]) -> UsartResult<usize> {
        for &byte in buf {
            self.send_byte(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> UsartResult<()> {
        self.wait_idle();
        Ok(())
    }
}

impl<R: RegisterAccess> embedded_io::Read for Usart<R> {
    /// Block for the first byte, then take whatever else is already waiting
    fn read(&mut self, buf: &mut [u8]) -> UsartResult<usize> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };
        *first = self.read_byte();
        let mut n = 1;
        for slot in rest {
            match self.try_read_byte() {
                Some(byte) => {
                    *slot = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}
