//! MCAL demo for a Nucleo-F4 board
//!
//! Brings the core up to 84 MHz from the HSI PLL, then:
//!
//! - blinks LD2 from the TIM2 update interrupt at 1 Hz
//! - echoes console input on USART2, received through the interrupt-fed
//!   ring buffer
//! - logs presses of the user button through EXTI line 13

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use cortex_m_rt::{entry, exception};
use critical_section::Mutex;
use defmt::{info, warn};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use mcal::config::{pins, CONSOLE_BAUD};
use mcal::hal::exti::{Exti, ExtiLine, Trigger};
use mcal::hal::gpio::{GpioPort, Mode, Pull};
use mcal::hal::rcc::{Bus, PllSource};
use mcal::hal::timer::{Timer, TimerEvent};
use mcal::hal::usart::{Consumer, Producer, Usart, UsartBuffer, UsartConfig, UsartInterrupt};
use mcal::peripherals::Peripherals;
use mcal::reg::Mmio;

/// Interrupt lines used by the demo (RM0390 vector table positions)
#[derive(Clone, Copy)]
#[repr(u16)]
enum Irq {
    Tim2 = 28,
    Usart2 = 38,
    Exti15_10 = 40,
}

// SAFETY: the discriminants are valid STM32F4 interrupt numbers.
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self as u16
    }
}

const SYSCLK_MHZ: u32 = 84;
const TICK_HZ: u32 = 10_000;

static RX_BUFFER: StaticCell<UsartBuffer> = StaticCell::new();

static CONSOLE: Mutex<RefCell<Option<(Usart<Mmio>, Producer<'static>)>>> =
    Mutex::new(RefCell::new(None));
static BLINKER: Mutex<RefCell<Option<(Timer<Mmio>, GpioPort<Mmio>)>>> =
    Mutex::new(RefCell::new(None));
static BUTTON: Mutex<RefCell<Option<Exti<Mmio, Mmio>>>> = Mutex::new(RefCell::new(None));

static BUTTON_PRESSED: AtomicBool = AtomicBool::new(false);

#[entry]
fn main() -> ! {
    info!("MCAL demo v{}", env!("CARGO_PKG_VERSION"));

    let Some(p) = Peripherals::take() else {
        panic!("peripherals already taken");
    };
    let Peripherals {
        mut rcc,
        mut flash,
        mut exti,
        mut gpioa,
        mut gpioc,
        mut usart2,
        mut tim2,
        ..
    } = p;

    match rcc.set_sysclk_freq(PllSource::Hsi, SYSCLK_MHZ, &mut flash) {
        Ok(hz) => info!("SYSCLK {} Hz, PCLK1 {} Hz", hz, rcc.pclk1()),
        Err(e) => warn!("PLL setup failed, staying on HSI: {}", e),
    }

    // Pins
    gpioa.select(&mut rcc);
    gpioc.select(&mut rcc);
    let (_, led) = pins::LED;
    gpioa.set_mode(led, Mode::Output);
    for (_, pin) in [pins::CONSOLE_TX, pins::CONSOLE_RX] {
        gpioa.set_mode(pin, Mode::AltFunc);
        gpioa.set_alt_func(pin, pins::CONSOLE_AF);
    }
    let (button_port, button) = pins::BUTTON;
    gpioc.set_mode(button, Mode::Input);
    gpioc.set_pull(button, Pull::None);

    // Console
    let rx_buffer = RX_BUFFER.init(UsartBuffer::new());
    usart2.select(&mut rcc);
    if let Err(e) = usart2.init(&rcc, &UsartConfig::new(CONSOLE_BAUD), rx_buffer) {
        warn!("USART2 init failed: {}", e);
    }
    let (producer, mut consumer) = rx_buffer.split();
    usart2.send_string("mcal demo ready\r\n");
    usart2.enable_interrupt(UsartInterrupt::RxNotEmpty);

    // 1 Hz blink
    tim2.select(&mut rcc);
    let prescaler = rcc.timer_clock(Bus::Apb1) / TICK_HZ;
    let started = tim2
        .init(prescaler, TICK_HZ)
        .and_then(|()| tim2.enable_interrupt(TimerEvent::Update))
        .and_then(|()| tim2.start());
    if let Err(e) = started {
        warn!("TIM2 setup failed: {}", e);
    }

    // Button
    exti.init(&mut rcc);
    let line = exti.config_irq(button_port, button);
    exti.set_trigger(line, Trigger::Falling);
    exti.enable_irq(line);

    critical_section::with(|cs| {
        CONSOLE.borrow_ref_mut(cs).replace((usart2, producer));
        BLINKER.borrow_ref_mut(cs).replace((tim2, gpioa));
        BUTTON.borrow_ref_mut(cs).replace(exti);
    });

    // SAFETY: the shared state is initialized above, before any handler can run.
    unsafe {
        NVIC::unmask(Irq::Tim2);
        NVIC::unmask(Irq::Usart2);
        NVIC::unmask(Irq::Exti15_10);
    }

    loop {
        echo(&mut consumer);
        if BUTTON_PRESSED.swap(false, Ordering::AcqRel) {
            info!("button pressed");
        }
        cortex_m::asm::wfi();
    }
}

/// Send back everything received since the last call
fn echo(rx: &mut Consumer<'_>) {
    while let Ok(byte) = rx.get_byte() {
        critical_section::with(|cs| {
            if let Some((usart, _)) = CONSOLE.borrow_ref_mut(cs).as_mut() {
                usart.send_byte(byte);
            }
        });
    }
}

fn on_usart2() {
    critical_section::with(|cs| {
        if let Some((usart, rx)) = CONSOLE.borrow_ref_mut(cs).as_mut() {
            if let Err(e) = usart.on_rx_interrupt(rx) {
                warn!("console rx: {}", e);
            }
        }
    });
}

fn on_tim2() {
    critical_section::with(|cs| {
        if let Some((timer, gpio)) = BLINKER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt_flag(TimerEvent::Update);
            gpio.toggle_pin(pins::LED.1);
        }
    });
}

fn on_exti15_10() {
    critical_section::with(|cs| {
        if let Some(exti) = BUTTON.borrow_ref_mut(cs).as_mut() {
            if exti.is_pending(ExtiLine::Pin13) {
                exti.reset_pending(ExtiLine::Pin13);
                BUTTON_PRESSED.store(true, Ordering::Release);
            }
        }
    });
}

/// Device interrupts land here; `irqn` is the exception number minus 16
#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    match irqn {
        n if n == Irq::Tim2 as i16 => on_tim2(),
        n if n == Irq::Usart2 as i16 => on_usart2(),
        n if n == Irq::Exti15_10 as i16 => on_exti15_10(),
        _ => warn!("unhandled interrupt {}", irqn),
    }
}
