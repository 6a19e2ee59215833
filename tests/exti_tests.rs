//! EXTI Driver Tests
//!
//! Port selection in SYSCFG, trigger edges, masks and pending bits.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test exti_tests

use mcal::hal::exti::{
    gpio_source, Exti, ExtiError, ExtiLine, Trigger, BLOCK_WORDS, SYSCFG_BLOCK_WORDS, SYSCFG_CLOCK,
};
use mcal::hal::gpio::{PinNumber, Port};
use mcal::hal::rcc::Rcc;
use mcal::SimRegisters;

const IMR: usize = 0x00;
const EMR: usize = 0x04;
const RTSR: usize = 0x08;
const FTSR: usize = 0x0C;
const SWIER: usize = 0x10;
const PR: usize = 0x14;
const EXTICR1: usize = 0x08;
const EXTICR4: usize = 0x14;

type SimExti = Exti<SimRegisters<BLOCK_WORDS>, SimRegisters<SYSCFG_BLOCK_WORDS>>;

fn exti() -> SimExti {
    Exti::new(SimRegisters::new(), SimRegisters::new())
}

// =============================================================================
// Port selection
// =============================================================================

#[test]
fn test_init_enables_syscfg_clock() {
    let mut rcc = Rcc::simulated();
    let mut exti = exti();
    exti.init(&mut rcc);
    assert!(rcc.is_peripheral_clock_enabled(SYSCFG_CLOCK));
    assert_eq!(rcc.registers().peek(0x44), 1 << 14);
}

#[test]
fn test_config_irq_selects_port_nibble() {
    let mut exti = exti();

    let line = exti.config_irq(Port::C, PinNumber::P13);
    assert_eq!(line, ExtiLine::Pin13);
    assert_eq!(exti.syscfg_registers().peek(EXTICR4), 2 << 4);

    let line = exti.config_irq(Port::B, PinNumber::P1);
    assert_eq!(line, ExtiLine::Pin1);
    assert_eq!(exti.syscfg_registers().peek(EXTICR1), 1 << 4);

    assert_eq!(exti.connected_port(ExtiLine::Pin13), Ok(Port::C));
    assert_eq!(exti.connected_port(ExtiLine::Pin0), Ok(Port::A));
}

#[test]
fn test_reconfiguring_a_line_replaces_its_port() {
    let mut exti = exti();
    exti.config_irq(Port::H, PinNumber::P3);
    exti.config_irq(Port::D, PinNumber::P3);
    assert_eq!(exti.syscfg_registers().peek(EXTICR1), 3 << 12);
}

#[test]
fn test_internal_lines_have_no_port() {
    let exti = exti();
    assert_eq!(exti.connected_port(ExtiLine::Pvd), Err(ExtiError::InvalidPin));
}

#[test]
fn test_raw_sources_and_lines() {
    assert_eq!(gpio_source(7, 15), Ok((Port::H, PinNumber::P15)));
    assert_eq!(gpio_source(9, 1), Err(ExtiError::InvalidPort));
    assert_eq!(gpio_source(1, 99), Err(ExtiError::InvalidPin));

    assert_eq!(ExtiLine::try_from(19), Err(ExtiError::InvalidIrqNum));
    assert_eq!(ExtiLine::try_from(23), Err(ExtiError::InvalidIrqNum));
    assert_eq!(ExtiLine::try_from(22), Ok(ExtiLine::RtcWakeup));
}

// =============================================================================
// Triggers and masks
// =============================================================================

#[test]
fn test_trigger_edges() {
    let mut exti = exti();
    let line = ExtiLine::Pin5;

    exti.set_trigger(line, Trigger::Rising);
    assert_eq!(exti.registers().peek(RTSR), 1 << 5);
    assert_eq!(exti.registers().peek(FTSR), 0);

    exti.set_trigger(line, Trigger::Falling);
    assert_eq!(exti.registers().peek(RTSR), 0);
    assert_eq!(exti.registers().peek(FTSR), 1 << 5);

    exti.set_trigger(line, Trigger::Both);
    assert_eq!(exti.registers().peek(RTSR), 1 << 5);
    assert_eq!(exti.registers().peek(FTSR), 1 << 5);
}

#[test]
fn test_irq_and_event_masks_are_independent() {
    let mut exti = exti();
    exti.enable_irq(ExtiLine::Pin0);
    exti.enable_irq(ExtiLine::RtcAlarm);
    exti.enable_event(ExtiLine::Pin0);
    exti.disable_irq(ExtiLine::Pin0);

    assert_eq!(exti.registers().peek(IMR), 1 << 17);
    assert_eq!(exti.registers().peek(EMR), 1);

    exti.disable_event(ExtiLine::Pin0);
    assert_eq!(exti.registers().peek(EMR), 0);
}

// =============================================================================
// Pending bits
// =============================================================================

#[test]
fn test_pending_bits() {
    let mut regs = SimRegisters::<BLOCK_WORDS>::new();
    regs.poke(PR, 1 << 13);
    let mut exti = Exti::new(regs, SimRegisters::<SYSCFG_BLOCK_WORDS>::new());

    assert!(exti.is_pending(ExtiLine::Pin13));
    assert!(!exti.is_pending(ExtiLine::Pin12));

    exti.reset_pending(ExtiLine::Pin13);
    assert_eq!(exti.registers().peek(PR), 1 << 13);
    assert_eq!(exti.registers().write_count(), 1);
}

#[test]
fn test_software_trigger_writes_one_bit() {
    let mut exti = exti();
    exti.software_trigger(ExtiLine::Pin2);
    exti.software_trigger(ExtiLine::Pin4);
    assert_eq!(exti.registers().peek(SWIER), 1 << 4);
}
