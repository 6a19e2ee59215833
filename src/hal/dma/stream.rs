//! DMA stream configuration and control

use super::{
    Burst, DataFormat, DmaChannel, DmaId, DmaInterrupt, DmacError, DmacResult, Direction,
    FifoThreshold, FlowController, Increment, IncrementOffset, Priority, StreamId, TargetMemory,
};
use crate::config::DMA_MAX_DATA_LEN;
use crate::reg::{Field, RegisterAccess};

mod regs {
    use crate::reg::Field;

    pub const CR: usize = 0x00;
    pub const NDTR: usize = 0x04;
    pub const PAR: usize = 0x08;
    pub const M0AR: usize = 0x0C;
    pub const M1AR: usize = 0x10;
    pub const FCR: usize = 0x14;

    pub const CR_EN: u32 = 1 << 0;
    pub const CR_IRQ_MASK: u32 = 0x1E;
    pub const CR_PFCTRL: Field = Field::new(CR, 5, 1);
    pub const CR_DIR: Field = Field::new(CR, 6, 2);
    pub const CR_CIRC: u32 = 1 << 8;
    pub const CR_PINC: Field = Field::new(CR, 9, 1);
    pub const CR_MINC: Field = Field::new(CR, 10, 1);
    pub const CR_PSIZE: Field = Field::new(CR, 11, 2);
    pub const CR_MSIZE: Field = Field::new(CR, 13, 2);
    pub const CR_PINCOS: Field = Field::new(CR, 15, 1);
    pub const CR_PL: Field = Field::new(CR, 16, 2);
    pub const CR_DBM: u32 = 1 << 18;
    pub const CR_CT: Field = Field::new(CR, 19, 1);
    pub const CR_PBURST: Field = Field::new(CR, 21, 2);
    pub const CR_MBURST: Field = Field::new(CR, 23, 2);
    pub const CR_CHSEL: Field = Field::new(CR, 25, 3);

    pub const FCR_FTH: Field = Field::new(FCR, 0, 2);
    pub const FCR_DMDIS: u32 = 1 << 2;
    pub const FCR_FEIE: u32 = 1 << 7;

    pub const NDTR_VALUE: Field = Field::new(NDTR, 0, 16);
}

/// Lifecycle of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum StreamState {
    /// Never configured
    Idle,
    /// Configured, `EN` clear
    Configured,
    /// `EN` set; configuration is locked
    Enabled,
}

/// Complete stream configuration, committed by [`Stream::configure`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct StreamConfig {
    /// Request channel
    pub channel: DmaChannel,
    /// Transfer direction
    pub direction: Direction,
    /// Peripheral port address (source for memory-to-memory)
    pub peripheral_addr: u32,
    /// Memory 0 address
    pub memory_addr: u32,
    /// Memory 1 address; `Some` selects double buffer mode
    pub double_buffer: Option<u32>,
    /// Number of items (`NDTR`)
    pub data_len: u32,
    /// Peripheral item size
    pub peripheral_format: DataFormat,
    /// Memory item size
    pub memory_format: DataFormat,
    /// Peripheral pointer increment
    pub peripheral_increment: Increment,
    /// Memory pointer increment
    pub memory_increment: Increment,
    /// Arbitration priority
    pub priority: Priority,
    /// Reload `NDTR` and addresses at the end of each block
    pub circular: bool,
    /// Who ends the transfer
    pub flow_controller: FlowController,
    /// FIFO threshold; `None` selects direct mode
    pub fifo: Option<FifoThreshold>,
    /// Peripheral burst length
    pub peripheral_burst: Burst,
    /// Memory burst length
    pub memory_burst: Burst,
}

impl StreamConfig {
    /// Byte-wide direct mode transfer with an incrementing memory pointer
    #[must_use]
    pub const fn new(
        channel: DmaChannel,
        direction: Direction,
        peripheral_addr: u32,
        memory_addr: u32,
        data_len: u32,
    ) -> Self {
        Self {
            channel,
            direction,
            peripheral_addr,
            memory_addr,
            double_buffer: None,
            data_len,
            peripheral_format: DataFormat::Byte,
            memory_format: DataFormat::Byte,
            peripheral_increment: Increment::Fixed,
            memory_increment: Increment::Increment,
            priority: Priority::Low,
            circular: false,
            flow_controller: FlowController::Dma,
            fifo: None,
            peripheral_burst: Burst::Single,
            memory_burst: Burst::Single,
        }
    }

    /// Set both item sizes
    #[must_use]
    pub const fn with_formats(mut self, peripheral: DataFormat, memory: DataFormat) -> Self {
        self.peripheral_format = peripheral;
        self.memory_format = memory;
        self
    }

    /// Set both pointer increments
    #[must_use]
    pub const fn with_increments(mut self, peripheral: Increment, memory: Increment) -> Self {
        self.peripheral_increment = peripheral;
        self.memory_increment = memory;
        self
    }

    /// Set the arbitration priority
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Run in circular mode
    #[must_use]
    pub const fn circular(mut self) -> Self {
        self.circular = true;
        self
    }

    /// Use the FIFO with `threshold` instead of direct mode
    #[must_use]
    pub const fn with_fifo(mut self, threshold: FifoThreshold) -> Self {
        self.fifo = Some(threshold);
        self
    }

    /// Set both burst lengths
    #[must_use]
    pub const fn with_bursts(mut self, peripheral: Burst, memory: Burst) -> Self {
        self.peripheral_burst = peripheral;
        self.memory_burst = memory;
        self
    }

    /// Alternate between `memory_addr` and `memory1_addr`
    #[must_use]
    pub const fn with_double_buffer(mut self, memory1_addr: u32) -> Self {
        self.double_buffer = Some(memory1_addr);
        self
    }

    /// Select the flow controller
    #[must_use]
    pub const fn with_flow_controller(mut self, flow: FlowController) -> Self {
        self.flow_controller = flow;
        self
    }

    /// Check field combinations
    ///
    /// # Errors
    ///
    /// - `InvalidDataLen`: more than 65535 items, or none under DMA flow
    ///   control
    /// - `InvalidDir`: memory-to-memory in direct, circular or double
    ///   buffer mode
    /// - `InvalidTargetMemory`: double buffer mode with a null second address
    /// - `InvalidFlowController`: peripheral flow control with
    ///   memory-to-memory, circular or double buffer mode
    /// - `InvalidDataFormat`: different item sizes in direct mode
    /// - `InvalidNumBeats`: bursts in direct mode
    /// - `InvalidThresholdLevel`: a memory burst that does not divide the
    ///   FIFO threshold
    /// - `InvalidSrcDataFormat`/`InvalidDestDataFormat`: an address not
    ///   aligned to its item size
    pub fn validate(&self) -> DmacResult<()> {
        if self.data_len > DMA_MAX_DATA_LEN
            || (self.data_len == 0 && self.flow_controller == FlowController::Dma)
        {
            return Err(DmacError::InvalidDataLen);
        }

        let mem_to_mem = self.direction == Direction::MemToMem;
        let double_buffer = self.double_buffer.is_some();
        if self.double_buffer == Some(0) {
            return Err(DmacError::InvalidTargetMemory);
        }
        if mem_to_mem && (self.fifo.is_none() || self.circular || double_buffer) {
            return Err(DmacError::InvalidDir);
        }
        if self.flow_controller == FlowController::Peripheral
            && (mem_to_mem || self.circular || double_buffer)
        {
            return Err(DmacError::InvalidFlowController);
        }

        match self.fifo {
            None => {
                if self.peripheral_format != self.memory_format {
                    return Err(DmacError::InvalidDataFormat);
                }
                if self.peripheral_burst != Burst::Single || self.memory_burst != Burst::Single {
                    return Err(DmacError::InvalidNumBeats);
                }
            }
            Some(threshold) => {
                let burst_bytes = self.memory_burst.beats() * self.memory_format.bytes();
                if self.memory_burst != Burst::Single
                    && (burst_bytes > threshold.bytes() || threshold.bytes() % burst_bytes != 0)
                {
                    return Err(DmacError::InvalidThresholdLevel);
                }
            }
        }

        let periph_aligned = self.peripheral_addr % self.peripheral_format.bytes() == 0;
        let mem_aligned = [Some(self.memory_addr), self.double_buffer]
            .into_iter()
            .flatten()
            .all(|addr| addr % self.memory_format.bytes() == 0);
        let (src_ok, dst_ok) = match self.direction {
            Direction::PeriphToMem | Direction::MemToMem => (periph_aligned, mem_aligned),
            Direction::MemToPeriph => (mem_aligned, periph_aligned),
        };
        if !src_ok {
            return Err(DmacError::InvalidSrcDataFormat);
        }
        if !dst_ok {
            return Err(DmacError::InvalidDestDataFormat);
        }
        Ok(())
    }

    /// `CR` value without `EN` or interrupt enables
    fn cr(&self) -> u32 {
        let mut cr = 0;
        cr = regs::CR_CHSEL.insert(cr, self.channel.raw());
        cr = regs::CR_MBURST.insert(cr, self.memory_burst.raw());
        cr = regs::CR_PBURST.insert(cr, self.peripheral_burst.raw());
        cr = regs::CR_PL.insert(cr, self.priority.raw());
        cr = regs::CR_MSIZE.insert(cr, self.memory_format.raw());
        cr = regs::CR_PSIZE.insert(cr, self.peripheral_format.raw());
        cr = regs::CR_MINC.insert(cr, self.memory_increment.raw());
        cr = regs::CR_PINC.insert(cr, self.peripheral_increment.raw());
        cr = regs::CR_DIR.insert(cr, self.direction.raw());
        cr = regs::CR_PFCTRL.insert(cr, self.flow_controller.raw());
        if self.circular {
            cr |= regs::CR_CIRC;
        }
        if self.double_buffer.is_some() {
            cr |= regs::CR_DBM | regs::CR_CIRC;
        }
        cr
    }

    /// `FCR` value without `FEIE`
    fn fcr(&self) -> u32 {
        match self.fifo {
            None => regs::FCR_FTH.insert(0, FifoThreshold::Half.raw()),
            Some(threshold) => regs::FCR_FTH.insert(regs::FCR_DMDIS, threshold.raw()),
        }
    }
}

/// Driver for one DMA stream
pub struct Stream<R> {
    dma: DmaId,
    stream: StreamId,
    regs: R,
    configured: bool,
}

impl<R: RegisterAccess> Stream<R> {
    /// Wrap the register block of `stream` on controller `dma`
    pub fn new(dma: DmaId, stream: StreamId, regs: R) -> Self {
        Self {
            dma,
            stream,
            regs,
            configured: false,
        }
    }

    /// Controller and stream this handle drives
    #[must_use]
    pub const fn id(&self) -> (DmaId, StreamId) {
        (self.dma, self.stream)
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Current lifecycle state
    ///
    /// Hardware clears `EN` when a non-circular transfer completes, so an
    /// enabled stream falls back to `Configured` by itself.
    #[must_use]
    pub fn state(&self) -> StreamState {
        if self.regs.is_set(regs::CR, regs::CR_EN) {
            StreamState::Enabled
        } else if self.configured {
            StreamState::Configured
        } else {
            StreamState::Idle
        }
    }

    fn ensure_disabled(&self) -> DmacResult<()> {
        if self.regs.is_set(regs::CR, regs::CR_EN) {
            warn!("DMA stream {} is enabled", self.stream.raw());
            Err(DmacError::StreamEnabled)
        } else {
            Ok(())
        }
    }

    fn write_cr_field(&mut self, field: Field, value: u32) -> DmacResult<()> {
        self.ensure_disabled()?;
        self.regs.write_field(field, value);
        self.configured = true;
        Ok(())
    }

    fn write_cr_flag(&mut self, mask: u32, on: bool) -> DmacResult<()> {
        self.ensure_disabled()?;
        if on {
            self.regs.set_bits(regs::CR, mask);
        } else {
            self.regs.clear_bits(regs::CR, mask);
        }
        self.configured = true;
        Ok(())
    }

    /// Validate and commit a full configuration, leaving the stream disabled
    ///
    /// Interrupt enables already set are kept.
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled, `InvalidDir` for memory-to-memory on
    /// DMA1, or any [`StreamConfig::validate`] error. Nothing is written on
    /// error.
    pub fn configure(&mut self, config: &StreamConfig) -> DmacResult<()> {
        self.ensure_disabled()?;
        if let Err(e) = self.check(config) {
            warn!("DMA stream {} config rejected: {}", self.stream.raw(), e);
            return Err(e);
        }

        let irqs = self.regs.read(regs::CR) & regs::CR_IRQ_MASK;
        let feie = self.regs.read(regs::FCR) & regs::FCR_FEIE;

        self.regs.write(regs::CR, config.cr() | irqs);
        self.regs.write(regs::NDTR, config.data_len);
        self.regs.write(regs::PAR, config.peripheral_addr);
        self.regs.write(regs::M0AR, config.memory_addr);
        if let Some(m1) = config.double_buffer {
            self.regs.write(regs::M1AR, m1);
        }
        self.regs.write(regs::FCR, config.fcr() | feie);
        self.configured = true;
        Ok(())
    }

    fn check(&self, config: &StreamConfig) -> DmacResult<()> {
        if self.dma == DmaId::Dma1 && config.direction == Direction::MemToMem {
            return Err(DmacError::InvalidDir);
        }
        config.validate()
    }

    /// Decode the stream registers back into a configuration
    ///
    /// # Errors
    ///
    /// The field's `Invalid*` error when a register holds a reserved
    /// encoding.
    pub fn read_config(&self) -> DmacResult<StreamConfig> {
        let r = &self.regs;
        let cr = r.read(regs::CR);
        let fcr = r.read(regs::FCR);
        let double_buffer = (cr & regs::CR_DBM != 0).then(|| r.read(regs::M1AR));
        let fifo = if fcr & regs::FCR_DMDIS != 0 {
            Some(FifoThreshold::try_from(regs::FCR_FTH.extract(fcr))?)
        } else {
            None
        };

        Ok(StreamConfig {
            channel: DmaChannel::try_from(regs::CR_CHSEL.extract(cr))?,
            direction: Direction::try_from(regs::CR_DIR.extract(cr))?,
            peripheral_addr: r.read(regs::PAR),
            memory_addr: r.read(regs::M0AR),
            double_buffer,
            data_len: r.read_field(regs::NDTR_VALUE),
            peripheral_format: DataFormat::try_from(regs::CR_PSIZE.extract(cr))?,
            memory_format: DataFormat::try_from(regs::CR_MSIZE.extract(cr))?,
            peripheral_increment: Increment::try_from(regs::CR_PINC.extract(cr))?,
            memory_increment: Increment::try_from(regs::CR_MINC.extract(cr))?,
            priority: Priority::try_from(regs::CR_PL.extract(cr))?,
            circular: cr & regs::CR_CIRC != 0 && double_buffer.is_none(),
            flow_controller: FlowController::try_from(regs::CR_PFCTRL.extract(cr))?,
            fifo,
            peripheral_burst: Burst::try_from(regs::CR_PBURST.extract(cr))?,
            memory_burst: Burst::try_from(regs::CR_MBURST.extract(cr))?,
        })
    }

    /// Re-check the programmed configuration and set `EN`
    ///
    /// The stream's flags must have been cleared through the controller
    /// first.
    ///
    /// # Errors
    ///
    /// `StreamEnabled` when the stream already runs. Otherwise any error
    /// [`Stream::configure`] would return for the current register
    /// contents; `EN` stays clear.
    pub fn enable(&mut self) -> DmacResult<()> {
        self.ensure_disabled()?;
        let config = self.read_config()?;
        if let Err(e) = self.check(&config) {
            warn!("DMA stream {} enable rejected: {}", self.stream.raw(), e);
            return Err(e);
        }
        self.regs.set_bits(regs::CR, regs::CR_EN);
        self.configured = true;
        info!("DMA stream {} enabled, {} items", self.stream.raw(), config.data_len);
        Ok(())
    }

    /// Clear `EN` and wait for the current transfer to stop
    pub fn disable(&mut self) {
        self.regs.clear_bits(regs::CR, regs::CR_EN);
        self.regs.wait_clear(regs::CR, regs::CR_EN);
    }

    /// Set memory address register 0 or 1
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_memory_address(&mut self, target: TargetMemory, addr: u32) -> DmacResult<()> {
        self.ensure_disabled()?;
        let reg = match target {
            TargetMemory::M0 => regs::M0AR,
            TargetMemory::M1 => regs::M1AR,
        };
        self.regs.write(reg, addr);
        self.configured = true;
        Ok(())
    }

    /// Set the peripheral port address
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_peripheral_address(&mut self, addr: u32) -> DmacResult<()> {
        self.ensure_disabled()?;
        self.regs.write(regs::PAR, addr);
        self.configured = true;
        Ok(())
    }

    /// Set the transfer direction
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled; `InvalidDir` for memory-to-memory on
    /// DMA1.
    pub fn set_direction(&mut self, direction: Direction) -> DmacResult<()> {
        if self.dma == DmaId::Dma1 && direction == Direction::MemToMem {
            return Err(DmacError::InvalidDir);
        }
        self.write_cr_field(regs::CR_DIR, direction.raw())
    }

    /// Select the request channel
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn assign_channel(&mut self, channel: DmaChannel) -> DmacResult<()> {
        self.write_cr_field(regs::CR_CHSEL, channel.raw())
    }

    /// Set the number of items
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled; `InvalidDataLen` above 65535.
    pub fn set_data_len(&mut self, len: u32) -> DmacResult<()> {
        self.ensure_disabled()?;
        if len > DMA_MAX_DATA_LEN {
            return Err(DmacError::InvalidDataLen);
        }
        self.regs.write(regs::NDTR, len);
        self.configured = true;
        Ok(())
    }

    /// Set the arbitration priority
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_priority(&mut self, priority: Priority) -> DmacResult<()> {
        self.write_cr_field(regs::CR_PL, priority.raw())
    }

    /// Set the memory pointer increment
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_memory_increment(&mut self, inc: Increment) -> DmacResult<()> {
        self.write_cr_field(regs::CR_MINC, inc.raw())
    }

    /// Set the peripheral pointer increment
    ///
    /// Turning the increment off also drops a fixed 4-byte offset.
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_peripheral_increment(&mut self, inc: Increment) -> DmacResult<()> {
        self.write_cr_field(regs::CR_PINC, inc.raw())?;
        if inc == Increment::Fixed {
            self.regs.write_field(regs::CR_PINCOS, IncrementOffset::Psize.raw());
        }
        Ok(())
    }

    /// Set the peripheral increment offset
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled; `InvalidIncrementalMode` for a 4-byte
    /// offset while the peripheral pointer does not increment.
    pub fn set_peripheral_increment_offset(&mut self, offset: IncrementOffset) -> DmacResult<()> {
        self.ensure_disabled()?;
        if offset == IncrementOffset::Word && self.regs.read_field(regs::CR_PINC) == 0 {
            return Err(DmacError::InvalidIncrementalMode);
        }
        self.write_cr_field(regs::CR_PINCOS, offset.raw())
    }

    /// Set peripheral and memory burst lengths
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_burst(&mut self, peripheral: Burst, memory: Burst) -> DmacResult<()> {
        self.write_cr_field(regs::CR_PBURST, peripheral.raw())?;
        self.regs.write_field(regs::CR_MBURST, memory.raw());
        Ok(())
    }

    /// Select the flow controller
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_flow_controller(&mut self, flow: FlowController) -> DmacResult<()> {
        self.write_cr_field(regs::CR_PFCTRL, flow.raw())
    }

    /// Turn circular mode on or off
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_circular(&mut self, circular: bool) -> DmacResult<()> {
        self.write_cr_flag(regs::CR_CIRC, circular)
    }

    /// Turn double buffer mode on or off; on also sets circular mode
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled; `InvalidDir` when the stream is set
    /// up for memory-to-memory.
    pub fn set_double_buffer(&mut self, enabled: bool) -> DmacResult<()> {
        self.ensure_disabled()?;
        if enabled {
            if self.regs.read_field(regs::CR_DIR) == Direction::MemToMem.raw() {
                return Err(DmacError::InvalidDir);
            }
            self.write_cr_flag(regs::CR_DBM | regs::CR_CIRC, true)
        } else {
            self.write_cr_flag(regs::CR_DBM, false)
        }
    }

    /// Select which memory pointer the next transfer uses
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled; `NotInDoubleBufferMode` unless double
    /// buffer mode is on.
    pub fn select_target_memory(&mut self, target: TargetMemory) -> DmacResult<()> {
        self.ensure_disabled()?;
        if !self.regs.is_set(regs::CR, regs::CR_DBM) {
            return Err(DmacError::NotInDoubleBufferMode);
        }
        self.write_cr_field(regs::CR_CT, target.raw())
    }

    /// Memory pointer in use
    #[must_use]
    pub fn current_target(&self) -> TargetMemory {
        if self.regs.read_field(regs::CR_CT) == 0 {
            TargetMemory::M0
        } else {
            TargetMemory::M1
        }
    }

    /// Use the FIFO with `threshold`
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn enable_fifo(&mut self, threshold: FifoThreshold) -> DmacResult<()> {
        self.ensure_disabled()?;
        self.regs.modify(regs::FCR, |r| regs::FCR_FTH.insert(r, threshold.raw()) | regs::FCR_DMDIS);
        self.configured = true;
        Ok(())
    }

    /// Return to direct mode
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn disable_fifo(&mut self) -> DmacResult<()> {
        self.ensure_disabled()?;
        self.regs.clear_bits(regs::FCR, regs::FCR_DMDIS);
        self.configured = true;
        Ok(())
    }

    /// Change the FIFO threshold
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_fifo_threshold(&mut self, threshold: FifoThreshold) -> DmacResult<()> {
        self.ensure_disabled()?;
        self.regs.write_field(regs::FCR_FTH, threshold.raw());
        self.configured = true;
        Ok(())
    }

    /// Set the peripheral item size
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_peripheral_data_format(&mut self, format: DataFormat) -> DmacResult<()> {
        self.write_cr_field(regs::CR_PSIZE, format.raw())
    }

    /// Set the memory item size
    ///
    /// # Errors
    ///
    /// `StreamEnabled` while enabled.
    pub fn set_memory_data_format(&mut self, format: DataFormat) -> DmacResult<()> {
        self.write_cr_field(regs::CR_MSIZE, format.raw())
    }

    fn irq_location(irq: DmaInterrupt) -> (usize, u32) {
        match irq {
            DmaInterrupt::FifoError => (regs::FCR, regs::FCR_FEIE),
            other => (regs::CR, other.raw()),
        }
    }

    /// Unmask one interrupt source; allowed while enabled
    pub fn enable_interrupt(&mut self, irq: DmaInterrupt) {
        let (reg, mask) = Self::irq_location(irq);
        self.regs.set_bits(reg, mask);
    }

    /// Mask one interrupt source; allowed while enabled
    pub fn disable_interrupt(&mut self, irq: DmaInterrupt) {
        let (reg, mask) = Self::irq_location(irq);
        self.regs.clear_bits(reg, mask);
    }

    /// Unmask every source in `irqs`
    pub fn enable_interrupt_list(&mut self, irqs: &[DmaInterrupt]) {
        for &irq in irqs {
            self.enable_interrupt(irq);
        }
    }

    /// Items left to transfer
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.regs.read_field(regs::NDTR_VALUE)
    }
}
