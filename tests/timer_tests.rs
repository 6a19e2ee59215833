//! Timer Driver Tests
//!
//! Lifecycle, the running-state policy, capability checks per instance,
//! channels, trigger logic and the advanced-control features.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test timer_tests

use mcal::hal::rcc::Rcc;
use mcal::hal::timer::{
    Apply, CenterAlign, Channel, ChannelMapping, ClockDivision, CountDirection, EventPrescaler,
    ExternalTrigger, Filter, IdleState, InputEdge, LockLevel, MasterMode, OutputCompareMode,
    OutputPolarity, SlaveMode, Timer, TimerError, TimerEvent, TimerId, TimerRegister,
    TimerState, TriggerSource, BLOCK_WORDS,
};
use mcal::SimRegisters;

const CR1: usize = 0x00;
const CR2: usize = 0x04;
const SMCR: usize = 0x08;
const DIER: usize = 0x0C;
const SR: usize = 0x10;
const EGR: usize = 0x14;
const CCMR1: usize = 0x18;
const CCMR2: usize = 0x1C;
const CCER: usize = 0x20;
const CNT: usize = 0x24;
const PSC: usize = 0x28;
const ARR: usize = 0x2C;
const RCR: usize = 0x30;
const CCR2: usize = 0x38;
const BDTR: usize = 0x44;
const DCR: usize = 0x48;

/// `rc_w0` bits of TIMx_SR: UIF, CC1IF..CC4IF, COMIF, TIF, BIF, CC1OF..CC4OF
const SR_FLAGS: u32 = 0x1EFF;

const CR1_CEN: u32 = 1 << 0;
const CR1_ARPE: u32 = 1 << 7;

type SimTimer = Timer<SimRegisters<BLOCK_WORDS>>;

fn block() -> SimRegisters<BLOCK_WORDS> {
    SimRegisters::new().write_zero_clears(SR, SR_FLAGS)
}

fn unselected(id: TimerId) -> SimTimer {
    Timer::new(id, block())
}

/// Timer with its bus clock on, counter stopped
fn selected(id: TimerId) -> SimTimer {
    let mut rcc = Rcc::simulated();
    let mut tim = unselected(id);
    tim.select(&mut rcc);
    tim
}

/// Timer counting with a 1 kHz prescaler and 1000-tick period
fn running(id: TimerId) -> SimTimer {
    let mut tim = selected(id);
    tim.init(16_000, 1000).unwrap();
    tim.start().unwrap();
    tim
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_calls_before_select_are_refused() {
    let mut tim = unselected(TimerId::Tim3);
    assert_eq!(tim.state(), TimerState::Disabled);
    assert_eq!(tim.init(16, 100), Err(TimerError::NotConfigured));
    assert_eq!(tim.start(), Err(TimerError::NotConfigured));
    assert_eq!(tim.set_pwm(Channel::Ch1, 10), Err(TimerError::NotConfigured));
    assert_eq!(tim.registers().write_count(), 0);
}

#[test]
fn test_select_init_start_stop() {
    let mut rcc = Rcc::simulated();
    let mut tim = unselected(TimerId::Tim3);

    tim.select(&mut rcc);
    assert_eq!(tim.state(), TimerState::Configured);
    assert_eq!(rcc.registers().peek(0x40), 1 << 1);

    assert_eq!(tim.init(16, 1000), Ok(()));
    assert_eq!(tim.registers().peek(PSC), 15);
    assert_eq!(tim.registers().peek(ARR), 999);
    assert_eq!(tim.registers().peek(CNT), 0);
    assert_eq!(tim.registers().peek(EGR), 1);
    assert_eq!(tim.registers().peek(SR), 0);
    assert_eq!(tim.prescaler(), 16);
    assert_eq!(tim.auto_reload(), 1000);

    assert_eq!(tim.start(), Ok(()));
    assert_eq!(tim.state(), TimerState::Running);
    assert!(tim.is_running());

    assert_eq!(tim.stop(), Ok(()));
    assert_eq!(tim.state(), TimerState::Stopped);
    assert_eq!(tim.registers().peek(CR1) & CR1_CEN, 0);

    tim.deselect(&mut rcc);
    assert_eq!(tim.state(), TimerState::Disabled);
    assert_eq!(rcc.registers().peek(0x40), 0);
}

#[test]
fn test_apb2_instances_gate_their_own_bit() {
    let mut rcc = Rcc::simulated();
    let mut tim = unselected(TimerId::Tim9);
    tim.select(&mut rcc);
    assert_eq!(rcc.registers().peek(0x44), 1 << 16);
    assert_eq!(TimerId::from_base(0x4001_4000), Ok(TimerId::Tim9));
}

#[test]
fn test_init_limits() {
    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.init(0, 100), Err(TimerError::InvalidPrescaler));
    assert_eq!(tim.init(65_537, 100), Err(TimerError::InvalidPrescaler));
    assert_eq!(tim.init(1, 0), Err(TimerError::InvalidCounterValue));
    assert_eq!(tim.init(1, 0x1_0001), Err(TimerError::InvalidCounterValue));
    assert_eq!(tim.registers().write_count(), 0);

    assert_eq!(tim.init(65_536, 0x1_0000), Ok(()));
    assert_eq!(tim.registers().peek(PSC), 0xFFFF);
    assert_eq!(tim.registers().peek(ARR), 0xFFFF);

    let mut wide = selected(TimerId::Tim5);
    assert_eq!(wide.init(1, 0x1_0001), Ok(()));
    assert_eq!(wide.auto_reload(), 0x1_0001);
}

#[test]
fn test_init_refused_while_running() {
    let mut tim = running(TimerId::Tim4);
    assert_eq!(tim.init(8, 50), Err(TimerError::TimerRunning));
    assert_eq!(tim.prescaler(), 16_000);
}

// =============================================================================
// Running-state policy
// =============================================================================

#[test]
fn test_prescaler_always_waits_for_update_while_running() {
    let mut tim = selected(TimerId::Tim3);
    tim.init(16, 100).unwrap();
    assert_eq!(tim.set_prescaler(32), Ok(Apply::Immediate));

    tim.start().unwrap();
    assert_eq!(tim.set_prescaler(64), Ok(Apply::NextUpdate));
    assert_eq!(tim.registers().peek(PSC), 63);
    assert_eq!(tim.set_prescaler(0), Err(TimerError::InvalidPrescaler));
}

#[test]
fn test_reload_follows_preload_bit() {
    let mut tim = running(TimerId::Tim3);
    assert_eq!(tim.set_auto_reload(500), Ok(Apply::Immediate));
    assert_eq!(tim.auto_reload(), 500);

    tim.stop().unwrap();
    assert_eq!(tim.enable_auto_reload_preload(true), Ok(()));
    assert_ne!(tim.registers().peek(CR1) & CR1_ARPE, 0);
    assert_eq!(tim.set_auto_reload(400), Ok(Apply::Immediate));

    tim.start().unwrap();
    assert_eq!(tim.set_auto_reload(300), Ok(Apply::NextUpdate));
    assert_eq!(tim.registers().peek(ARR), 299);
}

#[test]
fn test_structural_fields_refused_while_running() {
    let mut tim = running(TimerId::Tim2);
    let before = tim.registers().snapshot();

    assert_eq!(tim.enable_auto_reload_preload(true), Err(TimerError::TimerRunning));
    assert_eq!(tim.set_one_shot(true), Err(TimerError::TimerRunning));
    assert_eq!(
        tim.set_count_direction(CountDirection::Down),
        Err(TimerError::TimerRunning)
    );
    assert_eq!(
        tim.set_center_aligned(CenterAlign::Mode3),
        Err(TimerError::TimerRunning)
    );
    assert_eq!(
        tim.set_clock_division(ClockDivision::Div2),
        Err(TimerError::TimerRunning)
    );
    assert_eq!(tim.set_slave_mode(SlaveMode::Gated), Err(TimerError::TimerRunning));
    assert_eq!(tim.set_trigger(TriggerSource::Itr1), Err(TimerError::TimerRunning));
    assert_eq!(
        tim.set_dma_burst(TimerRegister::Ccr1, 4),
        Err(TimerError::TimerRunning)
    );
    assert_eq!(tim.registers().snapshot(), before);
}

// =============================================================================
// Time base
// =============================================================================

#[test]
fn test_one_shot_flag() {
    let mut tim = selected(TimerId::Tim6);
    assert_eq!(tim.set_one_shot(true), Ok(()));
    assert!(tim.is_one_shot());
    assert_eq!(tim.registers().peek(CR1), 1 << 3);
}

#[test]
fn test_count_modes_per_instance() {
    let mut up_only = selected(TimerId::Tim9);
    assert_eq!(
        up_only.set_count_direction(CountDirection::Down),
        Err(TimerError::InvalidCountMode)
    );
    assert_eq!(
        up_only.set_center_aligned(CenterAlign::Mode1),
        Err(TimerError::InvalidCountMode)
    );

    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.set_count_direction(CountDirection::Down), Ok(()));
    assert_eq!(tim.registers().peek(CR1), 1 << 4);
    assert_eq!(tim.set_center_aligned(CenterAlign::Mode1), Ok(()));
    assert_eq!(tim.registers().peek(CR1) & (0b11 << 5), 1 << 5);
    // direction is read-only in center-aligned mode
    assert_eq!(
        tim.set_count_direction(CountDirection::Up),
        Err(TimerError::InvalidCountMode)
    );
}

#[test]
fn test_clock_division() {
    let mut basic = selected(TimerId::Tim7);
    assert_eq!(
        basic.set_clock_division(ClockDivision::Div2),
        Err(TimerError::ClockDivisionNotSupported)
    );

    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.set_clock_division(ClockDivision::Div4), Ok(()));
    assert_eq!(tim.registers().peek(CR1), 2 << 8);
}

#[test]
fn test_counter_width() {
    let mut narrow = selected(TimerId::Tim3);
    assert_eq!(narrow.set_counter(0x1_0000), Err(TimerError::InvalidCounterValue));
    assert_eq!(narrow.set_counter(0xFFFF), Ok(()));
    assert_eq!(narrow.counter(), 0xFFFF);
    assert_eq!(narrow.reset_counter(), Ok(()));
    assert_eq!(narrow.counter(), 0);

    let mut wide = selected(TimerId::Tim2);
    assert_eq!(wide.set_counter(0x1234_5678), Ok(()));
    assert_eq!(wide.counter(), 0x1234_5678);
}

// =============================================================================
// Events, interrupts and DMA
// =============================================================================

#[test]
fn test_interrupts_checked_against_instance() {
    let mut basic = selected(TimerId::Tim6);
    assert_eq!(basic.enable_interrupt(TimerEvent::Update), Ok(()));
    assert_eq!(basic.enable_interrupt(TimerEvent::Cc1), Err(TimerError::InvalidIrqType));
    assert_eq!(basic.enable_interrupt(TimerEvent::Trigger), Err(TimerError::InvalidIrqType));
    assert_eq!(basic.registers().peek(DIER), 1);

    let mut general = selected(TimerId::Tim3);
    assert_eq!(general.enable_interrupt(TimerEvent::Com), Err(TimerError::InvalidIrqType));
    assert_eq!(general.enable_interrupt(TimerEvent::Cc4), Ok(()));

    let mut advanced = selected(TimerId::Tim1);
    assert_eq!(advanced.enable_interrupt(TimerEvent::Break), Ok(()));
    assert_eq!(advanced.disable_interrupt(TimerEvent::Break), Ok(()));
    assert_eq!(advanced.registers().peek(DIER), 0);
}

#[test]
fn test_pending_flags() {
    let mut regs = block();
    regs.poke(SR, (1 << 0) | (1 << 2) | (1 << 10));
    let mut tim = Timer::new(TimerId::Tim3, regs);

    assert!(tim.is_interrupt_pending(TimerEvent::Update));
    assert!(tim.is_interrupt_pending(TimerEvent::Cc2));
    assert!(!tim.is_interrupt_pending(TimerEvent::Cc1));
    assert!(tim.is_overcaptured(Channel::Ch2));

    tim.clear_interrupt_flag(TimerEvent::Update);
    tim.clear_overcapture(Channel::Ch2);
    assert_eq!(tim.registers().peek(SR), 1 << 2);
}

#[test]
fn test_software_events() {
    let mut tim = selected(TimerId::Tim10);
    assert_eq!(tim.generate_event(TimerEvent::Cc1), Ok(()));
    assert_eq!(tim.registers().peek(EGR), 1 << 1);
    assert_eq!(tim.generate_event(TimerEvent::Cc2), Err(TimerError::InvalidIrqType));
    assert_eq!(tim.generate_event(TimerEvent::Trigger), Err(TimerError::InvalidIrqType));
}

#[test]
fn test_dma_requests() {
    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.enable_dma(TimerEvent::Update), Ok(()));
    assert_eq!(tim.enable_dma(TimerEvent::Cc2), Ok(()));
    assert_eq!(tim.registers().peek(DIER), (1 << 8) | (1 << 10));
    assert_eq!(tim.disable_dma(TimerEvent::Update), Ok(()));
    assert_eq!(tim.registers().peek(DIER), 1 << 10);

    let mut no_dma = selected(TimerId::Tim11);
    assert_eq!(no_dma.enable_dma(TimerEvent::Update), Err(TimerError::InvalidDmaAssignment));

    let mut advanced = selected(TimerId::Tim8);
    assert_eq!(advanced.enable_dma(TimerEvent::Break), Err(TimerError::InvalidDmaAssignment));
    assert_eq!(advanced.enable_dma(TimerEvent::Com), Ok(()));
}

#[test]
fn test_dma_burst_window() {
    let mut tim = selected(TimerId::Tim2);
    assert_eq!(tim.set_dma_burst(TimerRegister::Ccr1, 4), Ok(()));
    assert_eq!(tim.registers().peek(DCR), 13 | (3 << 8));

    assert_eq!(tim.set_dma_burst(TimerRegister::Bdtr, 1), Ok(()));
    assert_eq!(tim.registers().peek(DCR), 17);
    assert_eq!(
        tim.set_dma_burst(TimerRegister::Bdtr, 2),
        Err(TimerError::InvalidDmaBurstLength)
    );
    assert_eq!(
        tim.set_dma_burst(TimerRegister::Cr1, 0),
        Err(TimerError::InvalidDmaBurstLength)
    );
    assert_eq!(
        tim.set_dma_burst(TimerRegister::Dcr, 1),
        Err(TimerError::InvalidDmaBurstStartingRegister)
    );
    assert_eq!(tim.dma_burst_address(), 0x4000_004C);

    let mut no_dma = selected(TimerId::Tim9);
    assert_eq!(
        no_dma.set_dma_burst(TimerRegister::Cr1, 1),
        Err(TimerError::InvalidDmaAssignment)
    );
}

// =============================================================================
// Channels
// =============================================================================

#[test]
fn test_channel_counts() {
    let mut basic = selected(TimerId::Tim6);
    assert_eq!(basic.enable_channel(Channel::Ch1), Err(TimerError::CapcompNotSupported));

    let mut two = selected(TimerId::Tim9);
    assert_eq!(
        two.enable_channel(Channel::Ch3),
        Err(TimerError::InvalidTimerChannelAssignment)
    );
    assert_eq!(two.enable_channel(Channel::Ch2), Ok(()));
    assert!(two.is_channel_enabled(Channel::Ch2));
    assert_eq!(two.registers().peek(CCER), 1 << 4);
}

#[test]
fn test_pwm_on_stopped_timer() {
    let mut tim = selected(TimerId::Tim3);
    tim.init(16, 1000).unwrap();

    assert_eq!(tim.set_pwm(Channel::Ch2, 250), Ok(Apply::Immediate));
    assert_eq!(tim.registers().peek(CCMR1), (6 << 12) | (1 << 11));
    assert_eq!(tim.registers().peek(CCR2), 250);
    assert_eq!(tim.registers().peek(CCER), 1 << 4);
    assert_eq!(tim.output_compare_mode(Channel::Ch2), OutputCompareMode::Pwm1);
    assert_eq!(tim.capture_compare(Channel::Ch2), Ok(250));
}

#[test]
fn test_rejected_pwm_leaves_registers_untouched() {
    let mut tim = selected(TimerId::Tim3);
    tim.init(16, 1000).unwrap();
    let before = tim.registers().snapshot();

    assert_eq!(
        tim.set_pwm(Channel::Ch1, 0x1_0000),
        Err(TimerError::InvalidCounterValue)
    );
    assert_eq!(tim.registers().snapshot(), before);

    tim.set_channel_mapping(Channel::Ch2, ChannelMapping::InputDirect).unwrap();
    tim.enable_channel(Channel::Ch2).unwrap();
    let armed = tim.registers().snapshot();
    assert_eq!(tim.set_pwm(Channel::Ch2, 10), Err(TimerError::ChannelEnabled));
    assert_eq!(tim.registers().snapshot(), armed);
}

#[test]
fn test_compare_value_while_running() {
    let mut tim = running(TimerId::Tim3);

    // compare preload on: the new duty waits for the update event
    assert_eq!(tim.set_pwm(Channel::Ch1, 100), Ok(Apply::NextUpdate));
    assert_eq!(tim.set_capture_compare(Channel::Ch1, 200), Ok(Apply::NextUpdate));

    // preload off: CCR3 is live
    assert_eq!(tim.set_capture_compare(Channel::Ch3, 300), Ok(Apply::Immediate));
    assert_eq!(
        tim.set_capture_compare(Channel::Ch3, 0x1_0000),
        Err(TimerError::InvalidCounterValue)
    );
}

#[test]
fn test_output_compare_fields_on_second_register() {
    let mut tim = selected(TimerId::Tim4);
    assert_eq!(tim.set_output_compare_mode(Channel::Ch3, OutputCompareMode::Toggle), Ok(()));
    assert_eq!(tim.set_output_compare_fast(Channel::Ch4, true), Ok(()));
    assert_eq!(tim.set_output_compare_clear(Channel::Ch4, true), Ok(()));
    assert_eq!(tim.registers().peek(CCMR2), (3 << 4) | (1 << 10) | (1 << 15));
    assert_eq!(tim.output_compare_mode(Channel::Ch3), OutputCompareMode::Toggle);

    assert_eq!(tim.set_channel_polarity(Channel::Ch3, OutputPolarity::ActiveLow), Ok(()));
    assert_eq!(tim.registers().peek(CCER), 1 << 9);

    let mut no_etr = selected(TimerId::Tim9);
    assert_eq!(
        no_etr.set_output_compare_clear(Channel::Ch1, true),
        Err(TimerError::InvalidTrigger)
    );
}

#[test]
fn test_input_capture_channel() {
    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.set_channel_mapping(Channel::Ch1, ChannelMapping::InputDirect), Ok(()));
    assert_eq!(tim.set_input_prescaler(Channel::Ch1, EventPrescaler::Div8), Ok(()));
    assert_eq!(tim.set_input_filter(Channel::Ch1, Filter::DtsDiv32N8), Ok(()));
    assert_eq!(tim.registers().peek(CCMR1), 1 | (3 << 2) | (15 << 4));

    assert_eq!(tim.enable_channel(Channel::Ch1), Ok(()));
    assert_eq!(tim.set_input_edge(Channel::Ch1, InputEdge::Both), Ok(()));
    assert_eq!(tim.registers().peek(CCER), 0b1011);
    assert_eq!(tim.set_input_edge(Channel::Ch1, InputEdge::Falling), Ok(()));
    assert_eq!(tim.registers().peek(CCER), 0b0011);

    // output-only operations on an input channel
    assert_eq!(
        tim.set_capture_compare(Channel::Ch1, 5),
        Err(TimerError::InvalidChannelType)
    );
    assert_eq!(
        tim.set_output_compare_mode(Channel::Ch1, OutputCompareMode::Pwm2),
        Err(TimerError::InvalidChannelType)
    );
    assert_eq!(
        tim.set_input_filter(Channel::Ch2, Filter::None),
        Err(TimerError::InvalidChannelType)
    );
}

#[test]
fn test_mapping_refused_while_channel_enabled() {
    let mut tim = selected(TimerId::Tim3);
    tim.set_channel_mapping(Channel::Ch1, ChannelMapping::InputIndirect).unwrap();
    tim.enable_channel(Channel::Ch1).unwrap();
    assert_eq!(
        tim.set_channel_mapping(Channel::Ch1, ChannelMapping::Output),
        Err(TimerError::ChannelEnabled)
    );
    assert_eq!(tim.channel_mapping(Channel::Ch1), ChannelMapping::InputIndirect);

    tim.disable_channel(Channel::Ch1).unwrap();
    assert_eq!(tim.set_pwm(Channel::Ch1, 1), Ok(Apply::Immediate));
    assert_eq!(tim.channel_mapping(Channel::Ch1), ChannelMapping::Output);

    let mut no_trc = selected(TimerId::Tim10);
    assert_eq!(
        no_trc.set_channel_mapping(Channel::Ch1, ChannelMapping::InputTrc),
        Err(TimerError::InvalidChannelType)
    );
}

// =============================================================================
// Master/slave
// =============================================================================

#[test]
fn test_master_mode() {
    let mut basic = selected(TimerId::Tim6);
    assert_eq!(basic.set_master_mode(MasterMode::Update), Ok(()));
    assert_eq!(basic.registers().peek(CR2), 2 << 4);
    assert_eq!(
        basic.set_master_mode(MasterMode::Oc1Ref),
        Err(TimerError::InvalidTimerChannelAssignment)
    );

    let mut two = selected(TimerId::Tim9);
    assert_eq!(two.set_master_mode(MasterMode::Oc2Ref), Ok(()));
    assert_eq!(
        two.set_master_mode(MasterMode::Oc3Ref),
        Err(TimerError::InvalidTimerChannelAssignment)
    );

    let mut none = selected(TimerId::Tim11);
    assert_eq!(
        none.set_master_mode(MasterMode::Enable),
        Err(TimerError::InvalidMasterSlaveModeType)
    );
}

#[test]
fn test_slave_mode_and_trigger() {
    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.set_slave_mode(SlaveMode::Encoder3), Ok(()));
    assert_eq!(tim.slave_mode(), SlaveMode::Encoder3);
    assert_eq!(tim.set_trigger(TriggerSource::Etrf), Ok(()));
    assert_eq!(tim.set_master_slave_sync(true), Ok(()));
    assert_eq!(tim.registers().peek(SMCR), 3 | (7 << 4) | (1 << 7));

    let mut two = selected(TimerId::Tim9);
    assert_eq!(
        two.set_slave_mode(SlaveMode::Encoder1),
        Err(TimerError::InvalidTriggerAction)
    );
    assert_eq!(two.set_trigger(TriggerSource::Etrf), Err(TimerError::InvalidTrigger));
    assert_eq!(two.set_trigger(TriggerSource::Ti2Fp2), Ok(()));
    assert_eq!(two.registers().peek(SMCR), 6 << 4);

    let mut basic = selected(TimerId::Tim7);
    assert_eq!(
        basic.set_slave_mode(SlaveMode::Reset),
        Err(TimerError::InvalidMasterSlaveModeType)
    );
    assert_eq!(
        basic.set_master_slave_sync(true),
        Err(TimerError::InvalidMasterSlaveModeType)
    );
}

#[test]
fn test_external_trigger_conditioning() {
    let mut tim = selected(TimerId::Tim2);
    let etr = ExternalTrigger {
        filter: Filter::CkIntN4,
        prescaler: EventPrescaler::Div2,
        inverted: true,
        clock_mode2: true,
    };
    assert_eq!(tim.set_external_trigger(&etr), Ok(()));
    assert_eq!(
        tim.registers().peek(SMCR),
        (2 << 8) | (1 << 12) | (1 << 14) | (1 << 15)
    );

    assert_eq!(tim.set_external_trigger(&ExternalTrigger::default()), Ok(()));
    assert_eq!(tim.registers().peek(SMCR), 0);

    let mut no_etr = selected(TimerId::Tim10);
    assert_eq!(
        no_etr.set_external_trigger(&ExternalTrigger::new()),
        Err(TimerError::InvalidTrigger)
    );
}

// =============================================================================
// Advanced control
// =============================================================================

#[test]
fn test_advanced_features_need_tim1_or_tim8() {
    let mut tim = selected(TimerId::Tim3);
    assert_eq!(tim.set_dead_time(10), Err(TimerError::BdtrNotSupported));
    assert_eq!(tim.enable_main_output(true), Err(TimerError::BdtrNotSupported));
    assert_eq!(tim.set_repetition_counter(1), Err(TimerError::RepetitionNotSupported));
    assert_eq!(
        tim.enable_complementary(Channel::Ch1, true),
        Err(TimerError::CapcompNotSupported)
    );
    assert_eq!(tim.set_ccpc(true), Err(TimerError::CapcompNotSupported));
}

#[test]
fn test_repetition_counter() {
    let mut tim = selected(TimerId::Tim1);
    assert_eq!(tim.set_repetition_counter(256), Err(TimerError::InvalidCounterValue));
    assert_eq!(tim.set_repetition_counter(3), Ok(Apply::Immediate));
    assert_eq!(tim.registers().peek(RCR), 3);

    tim.start().unwrap();
    assert_eq!(tim.set_repetition_counter(4), Ok(Apply::NextUpdate));
}

#[test]
fn test_dead_time_rounds_to_band_step() {
    let mut tim = selected(TimerId::Tim8);
    assert_eq!(tim.set_dead_time(200), Ok(200));
    assert_eq!(tim.registers().peek(BDTR), 0x80 | 36);

    assert_eq!(tim.set_dead_time(301), Ok(296));
    assert_eq!(tim.registers().peek(BDTR), 0xC5);
    assert_eq!(tim.dead_time(), 296);

    assert_eq!(tim.set_dead_time(2000), Err(TimerError::InvalidCounterValue));
    assert_eq!(tim.dead_time(), 296);
}

#[test]
fn test_break_and_main_output() {
    let mut tim = selected(TimerId::Tim1);
    assert_eq!(tim.set_break(true, OutputPolarity::ActiveHigh), Ok(()));
    assert_eq!(tim.enable_main_output(true), Ok(()));
    assert_eq!(tim.set_automatic_output(true), Ok(()));
    assert_eq!(tim.set_lock_level(LockLevel::Level2), Ok(()));
    assert!(tim.is_main_output_enabled());
    assert_eq!(
        tim.registers().peek(BDTR),
        (2 << 8) | (1 << 12) | (1 << 13) | (1 << 14) | (1 << 15)
    );

    assert_eq!(tim.set_break(false, OutputPolarity::ActiveLow), Ok(()));
    assert_eq!(tim.enable_main_output(false), Ok(()));
    assert!(!tim.is_main_output_enabled());
    assert_eq!(tim.registers().peek(BDTR), (2 << 8) | (1 << 14));
}

#[test]
fn test_complementary_outputs() {
    let mut tim = selected(TimerId::Tim1);
    assert_eq!(
        tim.enable_complementary(Channel::Ch4, true),
        Err(TimerError::InvalidTimerChannelAssignment)
    );
    assert_eq!(tim.enable_complementary(Channel::Ch2, true), Ok(()));
    assert_eq!(
        tim.set_complementary_polarity(Channel::Ch2, OutputPolarity::ActiveLow),
        Ok(())
    );
    assert_eq!(tim.registers().peek(CCER), (1 << 6) | (1 << 7));

    assert_eq!(
        tim.set_idle_states(Channel::Ch2, IdleState::High, IdleState::Low),
        Ok(())
    );
    assert_eq!(
        tim.set_idle_states(Channel::Ch4, IdleState::Low, IdleState::High),
        Err(TimerError::InvalidTimerChannelAssignment)
    );
    assert_eq!(tim.set_ccpc(true), Ok(()));
    assert_eq!(tim.registers().peek(CR2), (1 << 10) | 1);
}
