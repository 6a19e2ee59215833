//! Clock Tree Tests
//!
//! RCC oscillators, PLL validation, SYSCLK switching and derived bus
//! frequencies, plus flash latency and SysTick software timers.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test clock_tests

use mcal::hal::flash::{self, Flash};
use mcal::hal::rcc::{
    ApbPrescaler, Bus, BusClock, McoOutput, McoPrescaler, McoSource, PllConfig, PllSource, Rcc,
    RccError, SysclkSource,
};
use mcal::hal::systick::{
    self, delay, reload_for, update_timers, SoftTimer, SysTick, SysTickError, TickFlag,
};
use mcal::{RegisterAccess, SimRegisters};

use std::cell::RefCell;
use std::rc::Rc;

const CFGR: usize = 0x08;
const APB1RSTR: usize = 0x20;
const APB1ENR: usize = 0x40;

fn flash() -> Flash<SimRegisters<{ flash::BLOCK_WORDS }>> {
    Flash::new(SimRegisters::new())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Rcc,
    Flash,
}

type WriteLog = Rc<RefCell<Vec<(Block, usize, u32)>>>;

/// Register block that appends every write to a log shared across blocks
struct Recorded<R> {
    regs: R,
    block: Block,
    log: WriteLog,
}

impl<R: RegisterAccess> RegisterAccess for Recorded<R> {
    fn read(&self, offset: usize) -> u32 {
        self.regs.read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.log.borrow_mut().push((self.block, offset, value));
        self.regs.write(offset, value);
    }
}

// =============================================================================
// Reset state and oscillators
// =============================================================================

#[test]
fn test_reset_runs_from_hsi() {
    let rcc = Rcc::simulated();
    assert_eq!(rcc.sysclk_source(), SysclkSource::Hsi);
    assert_eq!(rcc.sysclk(), 16_000_000);
    assert_eq!(rcc.hclk(), 16_000_000);
    assert_eq!(rcc.pclk1(), 16_000_000);
    assert_eq!(rcc.pclk2(), 16_000_000);
    assert_eq!(rcc.timer_clock(Bus::Apb1), 16_000_000);
}

#[test]
fn test_hsi_cannot_stop_while_driving_sysclk() {
    let mut rcc = Rcc::simulated();
    assert_eq!(rcc.disable_hsi(), Err(RccError::OscillatorInUse));
}

#[test]
fn test_switch_to_hse() {
    let mut rcc = Rcc::simulated();
    assert_eq!(
        rcc.select_sysclk_source(SysclkSource::Hse),
        Err(RccError::OscillatorNotReady)
    );

    rcc.enable_hse();
    assert_eq!(rcc.select_sysclk_source(SysclkSource::Hse), Ok(()));
    assert_eq!(rcc.sysclk(), 8_000_000);
    assert_eq!(rcc.disable_hse(), Err(RccError::OscillatorInUse));
    assert_eq!(rcc.disable_hsi(), Ok(()));
}

#[test]
fn test_bypass_refused_on_running_hse() {
    let mut rcc = Rcc::simulated();
    rcc.enable_hse();
    assert_eq!(rcc.enable_hse_bypass(), Err(RccError::OscillatorInUse));
}

#[test]
fn test_hsi_trim_range() {
    let mut rcc = Rcc::simulated();
    assert_eq!(rcc.set_hsi_trim(31), Ok(()));
    assert_eq!(rcc.set_hsi_trim(32), Err(RccError::InvalidHsiTrim));
    assert_eq!((rcc.registers().peek(0x00) >> 3) & 0x1F, 31);
}

// =============================================================================
// PLL
// =============================================================================

fn pll(m: u32, n: u32, p: u32, q: u32) -> PllConfig {
    PllConfig {
        source: PllSource::Hse,
        m,
        n,
        p,
        q,
    }
}

#[test]
fn test_pll_field_limits() {
    let hse = 8_000_000;
    assert_eq!(pll(8, 336, 4, 7).validate(hse), Ok(84_000_000));
    assert_eq!(pll(1, 336, 4, 7).validate(hse), Err(RccError::InvalidPllM));
    assert_eq!(pll(8, 49, 4, 7).validate(hse), Err(RccError::InvalidPllN));
    assert_eq!(pll(8, 336, 3, 7).validate(hse), Err(RccError::InvalidPllP));
    assert_eq!(pll(8, 336, 4, 1).validate(hse), Err(RccError::InvalidPllQ));
}

#[test]
fn test_pll_frequency_limits() {
    let hse = 8_000_000;
    // 4 MHz VCO input
    assert_eq!(pll(2, 100, 4, 7).validate(hse), Err(RccError::InvalidVcoFreq));
    // 50 MHz VCO output
    assert_eq!(pll(8, 50, 2, 2).validate(hse), Err(RccError::InvalidVcoFreq));
    // 216 MHz SYSCLK
    assert_eq!(pll(8, 432, 2, 9).validate(hse), Err(RccError::InvalidSysclkFreq));
}

#[test]
fn test_pll_settings_for_sysclk() {
    let config = PllConfig::for_sysclk(PllSource::Hsi, 16_000_000, 84).unwrap();
    assert_eq!((config.m, config.n, config.p, config.q), (16, 336, 4, 7));

    let config = PllConfig::for_sysclk(PllSource::Hse, 8_000_000, 168).unwrap();
    assert_eq!((config.m, config.n, config.p, config.q), (8, 336, 2, 7));

    assert_eq!(
        PllConfig::for_sysclk(PllSource::Hsi, 16_000_000, 10),
        Err(RccError::InvalidSysclkFreq)
    );
    assert_eq!(
        PllConfig::for_sysclk(PllSource::Hse, 12_500_000, 84),
        Err(RccError::InvalidVcoFreq)
    );
}

#[test]
fn test_pll_reconfiguration_refused_while_locked() {
    let mut rcc = Rcc::simulated();
    assert_eq!(rcc.select_pll_source(PllSource::Hse), Ok(()));
    rcc.enable_main_pll();
    assert_eq!(rcc.select_pll_source(PllSource::Hsi), Err(RccError::OscillatorInUse));
    assert_eq!(
        rcc.configure_main_pll(&pll(8, 336, 4, 7)),
        Err(RccError::OscillatorInUse)
    );
}

// =============================================================================
// SYSCLK from the PLL
// =============================================================================

#[test]
fn test_sysclk_84_mhz_from_hsi() {
    let mut rcc = Rcc::simulated();
    let mut flash = flash();

    assert_eq!(rcc.set_sysclk_freq(PllSource::Hsi, 84, &mut flash), Ok(84_000_000));
    assert_eq!(rcc.sysclk_source(), SysclkSource::PllP);
    assert_eq!(rcc.sysclk(), 84_000_000);
    assert_eq!(rcc.pclk1(), 42_000_000);
    assert_eq!(rcc.pclk2(), 84_000_000);
    assert_eq!(rcc.timer_clock(Bus::Apb1), 84_000_000);
    assert_eq!(rcc.timer_clock(Bus::Apb2), 84_000_000);
    assert_eq!(flash.latency(), 2);

    // HSI now feeds the running PLL
    assert_eq!(rcc.disable_hsi(), Err(RccError::OscillatorInUse));
    assert_eq!(rcc.disable_main_pll(), Err(RccError::OscillatorInUse));
}

#[test]
fn test_sysclk_reprogrammed_while_on_pll() {
    let mut rcc = Rcc::simulated();
    let mut flash = flash();
    rcc.set_sysclk_freq(PllSource::Hsi, 84, &mut flash).unwrap();

    assert_eq!(rcc.set_sysclk_freq(PllSource::Hse, 168, &mut flash), Ok(168_000_000));
    assert_eq!(rcc.sysclk(), 168_000_000);
    assert_eq!(rcc.pclk1(), 42_000_000);
    assert_eq!(rcc.pclk2(), 84_000_000);
    assert_eq!(rcc.timer_clock(Bus::Apb2), 168_000_000);
    assert_eq!(flash.latency(), 5);
}

#[test]
fn test_flash_latency_follows_clock_direction() {
    let log = WriteLog::default();
    let mut rcc = Rcc::new(Recorded {
        regs: Rcc::simulated().registers().clone(),
        block: Block::Rcc,
        log: Rc::clone(&log),
    });
    let mut flash = Flash::new(Recorded {
        regs: SimRegisters::<{ flash::BLOCK_WORDS }>::new(),
        block: Block::Flash,
        log: Rc::clone(&log),
    });
    let latency_write = |writes: &[(Block, usize, u32)], ws: u32| {
        writes
            .iter()
            .position(|&(b, _, v)| b == Block::Flash && v & 0xF == ws)
            .unwrap()
    };
    let pll_switch = |writes: &[(Block, usize, u32)]| {
        writes
            .iter()
            .rposition(|&(b, off, v)| b == Block::Rcc && off == CFGR && v & 0b11 == 2)
            .unwrap()
    };

    // Going up: five wait states before the core sees 168 MHz
    rcc.set_sysclk_freq(PllSource::Hsi, 168, &mut flash).unwrap();
    let up = log.take();
    assert!(latency_write(&up, 5) < pll_switch(&up));
    assert_eq!(flash.latency(), 5);

    // Going down: latency drops only after 84 MHz is selected
    rcc.set_sysclk_freq(PllSource::Hsi, 84, &mut flash).unwrap();
    let down = log.take();
    assert!(pll_switch(&down) < latency_write(&down, 2));
    assert_eq!(flash.latency(), 2);
    assert_eq!(rcc.sysclk(), 84_000_000);
}

#[test]
fn test_unreachable_sysclk_writes_nothing() {
    let mut rcc = Rcc::simulated();
    let mut flash = flash();

    assert_eq!(
        rcc.set_sysclk_freq(PllSource::Hsi, 400, &mut flash),
        Err(RccError::InvalidSysclkFreq)
    );
    assert_eq!(rcc.registers().write_count(), 0);
    assert_eq!(flash.registers().write_count(), 0);
    assert_eq!(rcc.sysclk(), 16_000_000);
}

#[test]
fn test_apb_divider_for_limit() {
    assert_eq!(ApbPrescaler::for_limit(16_000_000, 45_000_000), ApbPrescaler::Div1);
    assert_eq!(ApbPrescaler::for_limit(180_000_000, 45_000_000), ApbPrescaler::Div4);
    assert_eq!(ApbPrescaler::for_limit(180_000_000, 90_000_000), ApbPrescaler::Div2);
}

// =============================================================================
// Clock output and gating
// =============================================================================

#[test]
fn test_mco_routing() {
    let mut rcc = Rcc::simulated();
    assert_eq!(
        rcc.assign_mco(McoOutput::Mco1, McoSource::Sysclk, McoPrescaler::Div1),
        Err(RccError::InvalidMcoSource)
    );
    assert_eq!(rcc.registers().peek(CFGR), 0);

    rcc.assign_mco(McoOutput::Mco1, McoSource::Hse, McoPrescaler::Div2)
        .unwrap();
    assert_eq!(rcc.registers().peek(CFGR), (2 << 21) | (4 << 24));

    rcc.assign_mco(McoOutput::Mco2, McoSource::PllI2s, McoPrescaler::Div4)
        .unwrap();
    assert_eq!(
        rcc.registers().peek(CFGR),
        (2 << 21) | (4 << 24) | (6 << 27) | (1 << 30)
    );
}

#[test]
fn test_peripheral_clock_gate_and_reset() {
    let mut rcc = Rcc::simulated();
    let usart2 = BusClock::new(Bus::Apb1, 17);

    rcc.enable_peripheral_clock(usart2);
    assert!(rcc.is_peripheral_clock_enabled(usart2));
    assert_eq!(rcc.registers().peek(APB1ENR), 1 << 17);

    let before = rcc.registers().write_count();
    rcc.reset_peripheral(usart2);
    assert_eq!(rcc.registers().write_count(), before + 2);
    assert_eq!(rcc.registers().peek(APB1RSTR), 0);

    rcc.disable_peripheral_clock(usart2);
    assert!(!rcc.is_peripheral_clock_enabled(usart2));
}

// =============================================================================
// Flash and SysTick
// =============================================================================

#[test]
fn test_flash_latency_with_caches_on() {
    let mut flash = flash();
    assert_eq!(flash.configure_wait_states(100), 3);
    assert_eq!(flash.registers().peek(0x00), 3 | (1 << 8) | (1 << 9) | (1 << 10));
}

#[test]
fn test_systick_reload_limits() {
    assert_eq!(reload_for(84_000_000, 1_000), Ok(83_999));
    assert_eq!(reload_for(16_000_000, 1), Ok(15_999_999));
    assert_eq!(reload_for(84_000_000, 1), Err(SysTickError::InvalidReload));
    assert_eq!(reload_for(16_000_000, 0), Err(SysTickError::InvalidReload));
    assert_eq!(reload_for(1_000, 1_000), Err(SysTickError::InvalidReload));
}

#[test]
fn test_systick_init_and_wrap_flag() {
    let mut tick = SysTick::new(SimRegisters::<{ systick::BLOCK_WORDS }>::new());
    assert_eq!(tick.init(16_000_000, 2_000_000), Ok(()));
    assert_eq!(tick.init(84_000_000, 1), Err(SysTickError::InvalidReload));
    assert_eq!(tick.registers().peek(0x04), 7);
    assert_eq!(tick.registers().peek(0x00), 0b111);
    assert!(!tick.has_wrapped());

    let mut regs = SimRegisters::<{ systick::BLOCK_WORDS }>::new();
    regs.poke(0x00, 1 << 16);
    let mut tick = SysTick::new(regs);
    assert!(tick.has_wrapped());
    tick.stop();
    assert_eq!(tick.registers().peek(0x00), 1 << 16);
}

#[test]
fn test_soft_timers_count_on_flag() {
    let flag = TickFlag::new();
    let mut a = SoftTimer::new();
    let mut b = SoftTimer::new();
    a.set_ticks(2);
    b.set_millis(1);

    assert!(!update_timers(&flag, &mut [&mut a, &mut b]));
    assert_eq!(a.remaining(), 2);

    flag.raise();
    assert!(update_timers(&flag, &mut [&mut a, &mut b]));
    assert_eq!(a.remaining(), 1);
    assert!(b.is_expired());

    flag.raise();
    update_timers(&flag, &mut [&mut a, &mut b]);
    assert!(a.is_expired());
    assert_eq!(b.remaining(), 0);
}

#[test]
fn test_delay_consumes_ticks() {
    let flag = TickFlag::default();
    delay(&flag, 0);

    flag.raise();
    delay(&flag, 1);
    assert!(!flag.take());
}
