//! DMA Controller
//!
//! DMA1 and DMA2 each have eight streams. The interrupt status and clear
//! registers (`LISR`/`HISR`, `LIFCR`/`HIFCR`) are shared by all streams of
//! a controller and belong to [`DmaController`]; each stream's own six
//! registers are a separate block driven by [`Stream`].
//!
//! Only DMA2 can do memory-to-memory transfers.

mod stream;

pub use stream::{Stream, StreamConfig, StreamState};

use crate::config::base;
use crate::hal::rcc::{Bus, BusClock, Rcc};
use crate::reg::RegisterAccess;

/// Size of the shared status/clear register block in words
pub const CONTROLLER_BLOCK_WORDS: usize = 4;

/// Size of one stream's register block in words
pub const STREAM_BLOCK_WORDS: usize = 6;

mod regs {
    pub const LISR: usize = 0x00;
    pub const HISR: usize = 0x04;
    pub const LIFCR: usize = 0x08;
    pub const HIFCR: usize = 0x0C;

    /// Offset of stream 0's block from the controller base
    pub const STREAM0: usize = 0x10;
    /// Distance between consecutive stream blocks
    pub const STREAM_STRIDE: usize = 0x18;

    /// Bit offset of each stream's flag group within `LISR`/`HISR`
    pub const FLAG_SHIFT: [u8; 4] = [0, 6, 16, 22];
    pub const FLAG_GROUP: u32 = 0x3D;
}

status_codes! {
    /// DMA status codes
    pub enum DmacError {
        /// Address is not a DMA controller
        InvalidDmac = -20 => "invalid DMA controller",
        /// Stream number above 7
        InvalidStream = -21 => "invalid stream",
        /// Channel number above 7
        InvalidChannel = -22 => "invalid channel",
        /// Direction unknown or not allowed with this setup
        InvalidDir = -23 => "invalid direction",
        /// Item count above 65535, or zero under DMA flow control
        InvalidDataLen = -24 => "invalid data length",
        /// Data sizes unknown or mismatched in direct mode
        InvalidDataFormat = -25 => "invalid data format",
        /// Source address not aligned to its data size
        InvalidSrcDataFormat = -26 => "invalid source data format",
        /// Destination address not aligned to its data size
        InvalidDestDataFormat = -27 => "invalid destination data format",
        /// Unknown interrupt or flag
        InvalidIrqType = -28 => "invalid IRQ type",
        /// Unknown priority level
        InvalidPrioritySetting = -29 => "invalid priority",
        /// Unknown increment mode
        InvalidIncrement = -30 => "invalid increment",
        /// Fixed offset on a non-incrementing peripheral pointer
        InvalidIncrementalMode = -31 => "invalid incremental mode",
        /// Unknown burst length, or burst in direct mode
        InvalidNumBeats = -32 => "invalid number of beats",
        /// Unknown flow controller, or peripheral flow with this setup
        InvalidFlowController = -33 => "invalid flow controller",
        /// Unknown peripheral increment offset size
        InvalidOffsetSize = -34 => "invalid offset size",
        /// Target memory selection outside double buffer mode
        NotInDoubleBufferMode = -35 => "not in double buffer mode",
        /// Unknown target memory
        InvalidTargetMemory = -36 => "invalid target memory",
        /// Unknown FIFO threshold, or memory burst not fitting it
        InvalidThresholdLevel = -37 => "invalid threshold level",
        /// Configuration change while the stream is enabled
        StreamEnabled = -38 => "stream enabled",
    }
}

/// DMA operation result
pub type DmacResult<T> = Result<T, DmacError>;

config_enum! {
    /// DMA controller
    pub enum DmaId: DmacError::InvalidDmac {
        /// DMA1 (peripheral/memory only)
        Dma1 = 1,
        /// DMA2
        Dma2 = 2,
    }
}

impl DmaId {
    /// Base address of the controller
    #[must_use]
    pub const fn base(self) -> usize {
        match self {
            Self::Dma1 => base::DMA1,
            Self::Dma2 => base::DMA2,
        }
    }

    /// Clock gate of the controller (AHB1)
    #[must_use]
    pub const fn bus_clock(self) -> BusClock {
        match self {
            Self::Dma1 => BusClock::new(Bus::Ahb1, 21),
            Self::Dma2 => BusClock::new(Bus::Ahb1, 22),
        }
    }

    /// Base address of one stream's register block
    #[must_use]
    pub const fn stream_base(self, stream: StreamId) -> usize {
        self.base() + regs::STREAM0 + stream.raw() as usize * regs::STREAM_STRIDE
    }

    /// Controller whose block starts at `addr`
    ///
    /// # Errors
    ///
    /// `InvalidDmac` for any other address.
    pub fn from_base(addr: usize) -> DmacResult<Self> {
        [Self::Dma1, Self::Dma2]
            .into_iter()
            .find(|id| id.base() == addr)
            .ok_or(DmacError::InvalidDmac)
    }
}

config_enum! {
    /// Stream within a controller
    pub enum StreamId: DmacError::InvalidStream {
        /// Stream 0
        S0 = 0,
        /// Stream 1
        S1 = 1,
        /// Stream 2
        S2 = 2,
        /// Stream 3
        S3 = 3,
        /// Stream 4
        S4 = 4,
        /// Stream 5
        S5 = 5,
        /// Stream 6
        S6 = 6,
        /// Stream 7
        S7 = 7,
    }
}

impl StreamId {
    /// Whether the stream's flags live in `HISR`/`HIFCR`
    #[must_use]
    pub const fn is_high(self) -> bool {
        self.raw() >= 4
    }

    const fn flag_shift(self) -> u8 {
        regs::FLAG_SHIFT[(self.raw() % 4) as usize]
    }
}

config_enum! {
    /// Request channel (`CHSEL`)
    pub enum DmaChannel: DmacError::InvalidChannel {
        /// Channel 0
        Ch0 = 0,
        /// Channel 1
        Ch1 = 1,
        /// Channel 2
        Ch2 = 2,
        /// Channel 3
        Ch3 = 3,
        /// Channel 4
        Ch4 = 4,
        /// Channel 5
        Ch5 = 5,
        /// Channel 6
        Ch6 = 6,
        /// Channel 7
        Ch7 = 7,
    }
}

config_enum! {
    /// Transfer direction (`DIR`)
    pub enum Direction: DmacError::InvalidDir {
        /// Peripheral port to memory
        PeriphToMem = 0,
        /// Memory to peripheral port
        MemToPeriph = 1,
        /// Memory to memory (DMA2, FIFO mode)
        MemToMem = 2,
    }
}

config_enum! {
    /// Item size (`PSIZE`/`MSIZE`)
    pub enum DataFormat: DmacError::InvalidDataFormat {
        /// 8 bits
        Byte = 0,
        /// 16 bits
        HalfWord = 1,
        /// 32 bits
        Word = 2,
    }
}

impl DataFormat {
    /// Item size in bytes
    #[must_use]
    pub const fn bytes(self) -> u32 {
        1 << self.raw()
    }
}

config_enum! {
    /// Stream priority (`PL`)
    pub enum Priority: DmacError::InvalidPrioritySetting {
        /// Low
        Low = 0,
        /// Medium
        Medium = 1,
        /// High
        High = 2,
        /// Very high
        VeryHigh = 3,
    }
}

config_enum! {
    /// Pointer increment (`PINC`/`MINC`)
    pub enum Increment: DmacError::InvalidIncrement {
        /// Pointer fixed
        Fixed = 0,
        /// Pointer advanced by the item size
        Increment = 1,
    }
}

config_enum! {
    /// Peripheral increment offset (`PINCOS`)
    pub enum IncrementOffset: DmacError::InvalidOffsetSize {
        /// Advance by `PSIZE`
        Psize = 0,
        /// Advance by 4 bytes
        Word = 1,
    }
}

config_enum! {
    /// Burst length (`PBURST`/`MBURST`)
    pub enum Burst: DmacError::InvalidNumBeats {
        /// Single transfer
        Single = 0,
        /// 4 beats
        Incr4 = 1,
        /// 8 beats
        Incr8 = 2,
        /// 16 beats
        Incr16 = 3,
    }
}

impl Burst {
    /// Beats per burst
    #[must_use]
    pub const fn beats(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Incr4 => 4,
            Self::Incr8 => 8,
            Self::Incr16 => 16,
        }
    }
}

config_enum! {
    /// Flow controller (`PFCTRL`)
    pub enum FlowController: DmacError::InvalidFlowController {
        /// DMA counts `NDTR` items
        Dma = 0,
        /// Peripheral signals the last item
        Peripheral = 1,
    }
}

config_enum! {
    /// Memory pointer in use in double buffer mode (`CT`)
    pub enum TargetMemory: DmacError::InvalidTargetMemory {
        /// `M0AR`
        M0 = 0,
        /// `M1AR`
        M1 = 1,
    }
}

config_enum! {
    /// FIFO threshold (`FTH`)
    pub enum FifoThreshold: DmacError::InvalidThresholdLevel {
        /// 1/4 full (4 bytes)
        Quarter = 0,
        /// 1/2 full (8 bytes)
        Half = 1,
        /// 3/4 full (12 bytes)
        ThreeQuarters = 2,
        /// Full (16 bytes)
        Full = 3,
    }
}

impl FifoThreshold {
    /// Threshold in bytes
    #[must_use]
    pub const fn bytes(self) -> u32 {
        (self.raw() + 1) * 4
    }
}

config_enum! {
    /// Stream interrupt sources, as enable masks
    ///
    /// FIFO error lives in `FCR`, the rest in `CR`.
    pub enum DmaInterrupt: DmacError::InvalidIrqType {
        /// Direct mode error (`DMEIE`)
        DirectModeError = 0x02,
        /// Transfer error (`TEIE`)
        TransferError = 0x04,
        /// Half transfer (`HTIE`)
        HalfTransfer = 0x08,
        /// Transfer complete (`TCIE`)
        TransferComplete = 0x10,
        /// FIFO error (`FEIE`)
        FifoError = 0x80,
    }
}

config_enum! {
    /// Stream status flags, as bit positions within a stream's flag group
    pub enum DmaFlag: DmacError::InvalidIrqType {
        /// FIFO error (`FEIF`)
        FifoError = 0,
        /// Direct mode error (`DMEIF`)
        DirectModeError = 2,
        /// Transfer error (`TEIF`)
        TransferError = 3,
        /// Half transfer (`HTIF`)
        HalfTransfer = 4,
        /// Transfer complete (`TCIF`)
        TransferComplete = 5,
    }
}

/// One stream's six-bit flag group, shifted down to bit 0
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct StreamFlags(pub u32);

impl StreamFlags {
    /// Whether `flag` is set
    #[must_use]
    pub const fn contains(self, flag: DmaFlag) -> bool {
        self.0 & (1 << flag.raw()) != 0
    }

    /// FIFO overrun or underrun
    #[must_use]
    pub const fn fifo_error(self) -> bool {
        self.contains(DmaFlag::FifoError)
    }

    /// Direct mode error
    #[must_use]
    pub const fn direct_mode_error(self) -> bool {
        self.contains(DmaFlag::DirectModeError)
    }

    /// Bus error; the stream was disabled by hardware
    #[must_use]
    pub const fn transfer_error(self) -> bool {
        self.contains(DmaFlag::TransferError)
    }

    /// Half of the items transferred
    #[must_use]
    pub const fn half_transfer(self) -> bool {
        self.contains(DmaFlag::HalfTransfer)
    }

    /// All items transferred
    #[must_use]
    pub const fn transfer_complete(self) -> bool {
        self.contains(DmaFlag::TransferComplete)
    }

    /// No flag set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Shared interrupt status and clear registers of one controller
pub struct DmaController<R> {
    id: DmaId,
    regs: R,
}

impl<R: RegisterAccess> DmaController<R> {
    /// Wrap the status/clear block of `id`
    pub fn new(id: DmaId, regs: R) -> Self {
        Self { id, regs }
    }

    /// Controller this handle drives
    #[must_use]
    pub const fn id(&self) -> DmaId {
        self.id
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Turn the controller clock on
    pub fn select<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.enable_peripheral_clock(self.id.bus_clock());
    }

    /// Turn the controller clock off
    pub fn deselect<C: RegisterAccess>(&mut self, rcc: &mut Rcc<C>) {
        rcc.disable_peripheral_clock(self.id.bus_clock());
    }

    /// Raw `LISR` (streams 0 to 3)
    #[must_use]
    pub fn low_interrupt_status(&self) -> u32 {
        self.regs.read(regs::LISR)
    }

    /// Raw `HISR` (streams 4 to 7)
    #[must_use]
    pub fn high_interrupt_status(&self) -> u32 {
        self.regs.read(regs::HISR)
    }

    /// Flag group of one stream
    #[must_use]
    pub fn stream_flags(&self, stream: StreamId) -> StreamFlags {
        let isr = if stream.is_high() {
            self.high_interrupt_status()
        } else {
            self.low_interrupt_status()
        };
        StreamFlags((isr >> stream.flag_shift()) & regs::FLAG_GROUP)
    }

    fn clear(&mut self, stream: StreamId, group: u32) {
        let ifcr = if stream.is_high() {
            regs::HIFCR
        } else {
            regs::LIFCR
        };
        self.regs.write(ifcr, group << stream.flag_shift());
    }

    /// Clear one flag of a stream
    pub fn clear_interrupt_flag(&mut self, stream: StreamId, flag: DmaFlag) {
        self.clear(stream, 1 << flag.raw());
    }

    /// Clear every flag of a stream, as needed before enabling it
    pub fn clear_all_stream_flags(&mut self, stream: StreamId) {
        self.clear(stream, regs::FLAG_GROUP);
    }
}
