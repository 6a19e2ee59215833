//! DMA Tests
//!
//! Stream configuration checks, register encoding and controller flags.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test dma_tests

use mcal::hal::dma::{
    self, Burst, DataFormat, DmaChannel, DmaController, DmaFlag, DmaId, DmaInterrupt, DmacError,
    Direction, FifoThreshold, FlowController, Increment, IncrementOffset, Priority, Stream,
    StreamConfig, StreamId, StreamState, TargetMemory,
};
use mcal::hal::rcc::Rcc;
use mcal::SimRegisters;

type SimStream = Stream<SimRegisters<{ dma::STREAM_BLOCK_WORDS }>>;

const CR: usize = 0x00;
const NDTR: usize = 0x04;
const PAR: usize = 0x08;
const M0AR: usize = 0x0C;
const M1AR: usize = 0x10;
const FCR: usize = 0x14;

const USART2_DR: u32 = 0x4000_4404;
const SRAM: u32 = 0x2000_0000;

fn stream(dma: DmaId) -> SimStream {
    Stream::new(dma, StreamId::S5, SimRegisters::new())
}

fn usart_rx() -> StreamConfig {
    StreamConfig::new(DmaChannel::Ch4, Direction::PeriphToMem, USART2_DR, SRAM, 64)
}

// =============================================================================
// Configuration checks
// =============================================================================

#[test]
fn test_default_config_is_valid() {
    assert_eq!(usart_rx().validate(), Ok(()));
}

#[test]
fn test_data_len_limits() {
    let mut cfg = usart_rx();
    cfg.data_len = 65_535;
    assert_eq!(cfg.validate(), Ok(()));

    cfg.data_len = 65_536;
    assert_eq!(cfg.validate(), Err(DmacError::InvalidDataLen));

    cfg.data_len = 0;
    assert_eq!(cfg.validate(), Err(DmacError::InvalidDataLen));

    let cfg = cfg.with_flow_controller(FlowController::Peripheral);
    assert_eq!(cfg.validate(), Ok(()));
}

#[test]
fn test_mem_to_mem_needs_fifo_and_single_shot() {
    let copy = StreamConfig::new(DmaChannel::Ch0, Direction::MemToMem, SRAM, SRAM + 0x100, 16)
        .with_increments(Increment::Increment, Increment::Increment);
    assert_eq!(copy.validate(), Err(DmacError::InvalidDir));

    let copy = copy.with_fifo(FifoThreshold::Full);
    assert_eq!(copy.validate(), Ok(()));
    assert_eq!(copy.circular().validate(), Err(DmacError::InvalidDir));
    assert_eq!(
        copy.with_double_buffer(SRAM + 0x200).validate(),
        Err(DmacError::InvalidDir)
    );
}

#[test]
fn test_double_buffer_needs_second_address() {
    assert_eq!(
        usart_rx().with_double_buffer(0).validate(),
        Err(DmacError::InvalidTargetMemory)
    );
    assert_eq!(usart_rx().with_double_buffer(SRAM + 0x40).validate(), Ok(()));
}

#[test]
fn test_peripheral_flow_control_restrictions() {
    let cfg = usart_rx().with_flow_controller(FlowController::Peripheral);
    assert_eq!(cfg.circular().validate(), Err(DmacError::InvalidFlowController));
    assert_eq!(
        cfg.with_double_buffer(SRAM + 0x40).validate(),
        Err(DmacError::InvalidFlowController)
    );
}

#[test]
fn test_direct_mode_requires_equal_sizes_and_no_bursts() {
    let cfg = usart_rx().with_formats(DataFormat::Byte, DataFormat::Word);
    assert_eq!(cfg.validate(), Err(DmacError::InvalidDataFormat));

    let cfg = usart_rx().with_bursts(Burst::Single, Burst::Incr4);
    assert_eq!(cfg.validate(), Err(DmacError::InvalidNumBeats));

    // The FIFO lifts both restrictions
    let cfg = usart_rx()
        .with_formats(DataFormat::Byte, DataFormat::Word)
        .with_fifo(FifoThreshold::Full)
        .with_bursts(Burst::Single, Burst::Incr4);
    assert_eq!(cfg.validate(), Ok(()));
}

#[test]
fn test_memory_burst_must_fit_threshold() {
    // 4 words = 16 bytes does not fit a 4-byte threshold
    let cfg = usart_rx()
        .with_formats(DataFormat::Word, DataFormat::Word)
        .with_fifo(FifoThreshold::Quarter)
        .with_bursts(Burst::Single, Burst::Incr4);
    let cfg = StreamConfig {
        peripheral_addr: 0x4000_4400,
        ..cfg
    };
    assert_eq!(cfg.validate(), Err(DmacError::InvalidThresholdLevel));

    // 8 half-words = 16 bytes fills a full FIFO exactly
    let cfg = StreamConfig {
        fifo: Some(FifoThreshold::Full),
        memory_format: DataFormat::HalfWord,
        memory_burst: Burst::Incr8,
        ..cfg
    };
    assert_eq!(cfg.validate(), Ok(()));

    // 4 half-words = 8 bytes do not divide 12
    let cfg = StreamConfig {
        fifo: Some(FifoThreshold::ThreeQuarters),
        memory_burst: Burst::Incr4,
        ..cfg
    };
    assert_eq!(cfg.validate(), Err(DmacError::InvalidThresholdLevel));
}

#[test]
fn test_address_alignment_per_direction() {
    let rx = usart_rx().with_formats(DataFormat::HalfWord, DataFormat::HalfWord);
    let rx = StreamConfig {
        peripheral_addr: 0x4000_4405,
        ..rx
    };
    assert_eq!(rx.validate(), Err(DmacError::InvalidSrcDataFormat));

    let tx = StreamConfig {
        direction: Direction::MemToPeriph,
        memory_addr: SRAM + 1,
        ..rx
    };
    assert_eq!(tx.validate(), Err(DmacError::InvalidSrcDataFormat));

    let tx = StreamConfig {
        memory_addr: SRAM,
        ..tx
    };
    assert_eq!(tx.validate(), Err(DmacError::InvalidDestDataFormat));
}

// =============================================================================
// Stream register encoding
// =============================================================================

#[test]
fn test_configure_writes_every_register() {
    let mut s = stream(DmaId::Dma1);
    let cfg = usart_rx()
        .with_priority(Priority::High)
        .with_double_buffer(SRAM + 0x80);
    s.configure(&cfg).unwrap();

    let regs = s.registers();
    let cr = regs.peek(CR);
    assert_eq!(cr >> 25 & 0b111, 4, "CHSEL");
    assert_eq!(cr >> 16 & 0b11, 2, "PL");
    assert_ne!(cr & 1 << 18, 0, "DBM");
    assert_ne!(cr & 1 << 8, 0, "CIRC follows DBM");
    assert_ne!(cr & 1 << 10, 0, "MINC");
    assert_eq!(cr & 1, 0, "EN stays clear");
    assert_eq!(regs.peek(NDTR), 64);
    assert_eq!(regs.peek(PAR), USART2_DR);
    assert_eq!(regs.peek(M0AR), SRAM);
    assert_eq!(regs.peek(M1AR), SRAM + 0x80);
    assert_eq!(regs.peek(FCR) & 1 << 2, 0, "direct mode");

    assert_eq!(s.state(), StreamState::Configured);
    assert_eq!(s.read_config(), Ok(cfg));
}

#[test]
fn test_fifo_config_round_trips() {
    let mut s = stream(DmaId::Dma2);
    let cfg = StreamConfig::new(DmaChannel::Ch0, Direction::MemToMem, SRAM, SRAM + 0x400, 256)
        .with_formats(DataFormat::Word, DataFormat::Word)
        .with_increments(Increment::Increment, Increment::Increment)
        .with_fifo(FifoThreshold::Full)
        .with_bursts(Burst::Incr4, Burst::Incr4);
    s.configure(&cfg).unwrap();

    let fcr = s.registers().peek(FCR);
    assert_eq!(fcr & 0b111, 0b111, "DMDIS and FTH=full");
    assert_eq!(s.read_config(), Ok(cfg));
}

#[test]
fn test_configure_rejects_without_writing() {
    let mut s = stream(DmaId::Dma1);
    let bad = usart_rx().with_bursts(Burst::Incr8, Burst::Single);
    assert_eq!(s.configure(&bad), Err(DmacError::InvalidNumBeats));
    assert_eq!(s.registers().write_count(), 0);
    assert_eq!(s.state(), StreamState::Idle);
}

#[test]
fn test_dma1_cannot_copy_memory() {
    let mut s = stream(DmaId::Dma1);
    let copy = StreamConfig::new(DmaChannel::Ch0, Direction::MemToMem, SRAM, SRAM + 4, 1)
        .with_fifo(FifoThreshold::Half);
    assert_eq!(s.configure(&copy), Err(DmacError::InvalidDir));
    assert_eq!(s.set_direction(Direction::MemToMem), Err(DmacError::InvalidDir));
}

#[test]
fn test_configure_keeps_interrupt_enables() {
    let mut s = stream(DmaId::Dma1);
    s.enable_interrupt_list(&[DmaInterrupt::TransferComplete, DmaInterrupt::FifoError]);
    s.configure(&usart_rx()).unwrap();

    assert_ne!(s.registers().peek(CR) & 0x10, 0);
    assert_ne!(s.registers().peek(FCR) & 0x80, 0);

    s.disable_interrupt(DmaInterrupt::TransferComplete);
    assert_eq!(s.registers().peek(CR) & 0x10, 0);
}

// =============================================================================
// Enable / disable
// =============================================================================

#[test]
fn test_enable_locks_configuration() {
    let mut s = stream(DmaId::Dma1);
    s.configure(&usart_rx()).unwrap();
    s.enable().unwrap();
    assert_eq!(s.state(), StreamState::Enabled);

    assert_eq!(s.set_priority(Priority::VeryHigh), Err(DmacError::StreamEnabled));
    assert_eq!(s.configure(&usart_rx()), Err(DmacError::StreamEnabled));
    assert_eq!(s.set_data_len(8), Err(DmacError::StreamEnabled));

    // Interrupt masks stay reachable while running
    s.enable_interrupt(DmaInterrupt::HalfTransfer);
    assert_ne!(s.registers().peek(CR) & 0x08, 0);

    s.disable();
    assert_eq!(s.state(), StreamState::Configured);
    assert_eq!(s.set_priority(Priority::VeryHigh), Ok(()));
}

#[test]
fn test_second_enable_is_rejected() {
    let mut s = stream(DmaId::Dma1);
    s.configure(&usart_rx()).unwrap();
    s.enable().unwrap();
    let writes = s.registers().write_count();
    let before = s.registers().snapshot();

    assert_eq!(s.enable(), Err(DmacError::StreamEnabled));
    assert_eq!(s.registers().write_count(), writes);
    assert_eq!(s.registers().snapshot(), before);
    assert_eq!(s.state(), StreamState::Enabled);
}

#[test]
fn test_enable_rechecks_piecewise_setup() {
    let mut s = stream(DmaId::Dma1);
    s.set_peripheral_data_format(DataFormat::HalfWord).unwrap();
    s.set_memory_data_format(DataFormat::Word).unwrap();
    s.set_data_len(4).unwrap();
    s.set_peripheral_address(USART2_DR & !3).unwrap();
    s.set_memory_address(TargetMemory::M0, SRAM).unwrap();

    assert_eq!(s.enable(), Err(DmacError::InvalidDataFormat));
    assert_ne!(s.state(), StreamState::Enabled);

    s.enable_fifo(FifoThreshold::Half).unwrap();
    assert_eq!(s.enable(), Ok(()));
    assert_eq!(s.remaining(), 4);
}

#[test]
fn test_enable_with_empty_count_fails() {
    let mut s = stream(DmaId::Dma2);
    s.assign_channel(DmaChannel::Ch3).unwrap();
    assert_eq!(s.enable(), Err(DmacError::InvalidDataLen));
}

// =============================================================================
// Individual setters
// =============================================================================

#[test]
fn test_increment_offset_needs_peripheral_increment() {
    let mut s = stream(DmaId::Dma2);
    assert_eq!(
        s.set_peripheral_increment_offset(IncrementOffset::Word),
        Err(DmacError::InvalidIncrementalMode)
    );

    s.set_peripheral_increment(Increment::Increment).unwrap();
    s.set_peripheral_increment_offset(IncrementOffset::Word).unwrap();
    assert_ne!(s.registers().peek(CR) & 1 << 15, 0);

    s.set_peripheral_increment(Increment::Fixed).unwrap();
    assert_eq!(s.registers().peek(CR) & 1 << 15, 0, "PINCOS dropped");
}

#[test]
fn test_target_memory_needs_double_buffer() {
    let mut s = stream(DmaId::Dma2);
    assert_eq!(
        s.select_target_memory(TargetMemory::M1),
        Err(DmacError::NotInDoubleBufferMode)
    );

    s.set_double_buffer(true).unwrap();
    s.select_target_memory(TargetMemory::M1).unwrap();
    assert_eq!(s.current_target(), TargetMemory::M1);

    s.set_double_buffer(false).unwrap();
    assert_eq!(s.registers().peek(CR) & 1 << 18, 0);
}

#[test]
fn test_double_buffer_refused_for_mem_to_mem() {
    let mut s = stream(DmaId::Dma2);
    s.set_direction(Direction::MemToMem).unwrap();
    assert_eq!(s.set_double_buffer(true), Err(DmacError::InvalidDir));
}

#[test]
fn test_fifo_toggle() {
    let mut s = stream(DmaId::Dma2);
    s.enable_fifo(FifoThreshold::ThreeQuarters).unwrap();
    assert_eq!(s.registers().peek(FCR) & 0b111, 0b110);

    s.set_fifo_threshold(FifoThreshold::Quarter).unwrap();
    s.disable_fifo().unwrap();
    assert_eq!(s.registers().peek(FCR) & 0b111, 0);
}

#[test]
fn test_burst_and_flow_fields() {
    let mut s = stream(DmaId::Dma2);
    s.set_burst(Burst::Incr16, Burst::Incr8).unwrap();
    s.set_flow_controller(FlowController::Peripheral).unwrap();
    s.set_circular(true).unwrap();
    s.set_memory_increment(Increment::Fixed).unwrap();

    let cr = s.registers().peek(CR);
    assert_eq!(cr >> 21 & 0b11, 3);
    assert_eq!(cr >> 23 & 0b11, 2);
    assert_ne!(cr & 1 << 5, 0);
    assert_ne!(cr & 1 << 8, 0);
    assert_eq!(cr & 1 << 10, 0);
}

#[test]
fn test_raw_values_validate() {
    assert_eq!(DmaChannel::try_from(8), Err(DmacError::InvalidChannel));
    assert_eq!(StreamId::try_from(7), Ok(StreamId::S7));
    assert_eq!(Priority::try_from(4), Err(DmacError::InvalidPrioritySetting));
    assert_eq!(DataFormat::try_from(3), Err(DmacError::InvalidDataFormat));
    assert_eq!(Direction::try_from(3), Err(DmacError::InvalidDir));
    assert_eq!(DmaId::from_base(0x4002_6400), Ok(DmaId::Dma2));
    assert_eq!(DmaId::from_base(0x4002_6800), Err(DmacError::InvalidDmac));
}

// =============================================================================
// Controller flags
// =============================================================================

type SimController = DmaController<SimRegisters<{ dma::CONTROLLER_BLOCK_WORDS }>>;

const LISR: usize = 0x00;
const HISR: usize = 0x04;
const LIFCR: usize = 0x08;
const HIFCR: usize = 0x0C;

#[test]
fn test_stream_flags_from_shared_status() {
    let mut regs = SimRegisters::new();
    // Stream 1: TCIF + HTIF at bits 11 and 10; stream 6: TEIF at bit 19
    regs.poke(LISR, (1 << 11) | (1 << 10));
    regs.poke(HISR, 1 << 19);
    let ctl: SimController = DmaController::new(DmaId::Dma1, regs);

    let s1 = ctl.stream_flags(StreamId::S1);
    assert!(s1.transfer_complete());
    assert!(s1.half_transfer());
    assert!(!s1.transfer_error());

    let s6 = ctl.stream_flags(StreamId::S6);
    assert!(s6.transfer_error());
    assert!(s6.contains(DmaFlag::TransferError));

    assert!(ctl.stream_flags(StreamId::S0).is_empty());
}

#[test]
fn test_clear_writes_the_right_register() {
    let mut ctl: SimController = DmaController::new(DmaId::Dma2, SimRegisters::new());

    ctl.clear_interrupt_flag(StreamId::S3, DmaFlag::TransferComplete);
    assert_eq!(ctl.registers().peek(LIFCR), 1 << 27);

    ctl.clear_all_stream_flags(StreamId::S4);
    assert_eq!(ctl.registers().peek(HIFCR), 0x3D);
}

#[test]
fn test_controller_clock_gate() {
    let mut rcc = Rcc::simulated();
    let mut ctl: SimController = DmaController::new(DmaId::Dma2, SimRegisters::new());
    ctl.select(&mut rcc);
    assert!(rcc.is_peripheral_clock_enabled(DmaId::Dma2.bus_clock()));
    ctl.deselect(&mut rcc);
    assert!(!rcc.is_peripheral_clock_enabled(DmaId::Dma2.bus_clock()));
}
