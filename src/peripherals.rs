//! Peripheral singletons
//!
//! [`Peripherals::take`] builds one MMIO-backed driver per register block
//! the first time it is called and `None` ever after, so each block has
//! exactly one owner. Handles are moved into interrupt handlers through a
//! `critical_section::Mutex` by the application.

#![allow(unsafe_code)]

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::base;
use crate::hal::adc::{Adc, AdcCommon, AdcId};
use crate::hal::dma::{DmaController, DmaId, Stream, StreamId};
use crate::hal::exti::Exti;
use crate::hal::flash::Flash;
use crate::hal::gpio::{GpioPort, Port};
use crate::hal::i2c::{I2c, I2cId};
use crate::hal::rcc::Rcc;
use crate::hal::spi::{Spi, SpiId};
use crate::hal::systick::SysTick;
use crate::hal::timer::{Timer, TimerId};
use crate::hal::usart::{Usart, UsartId};
use crate::reg::Mmio;

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Every driver of the device, each owning its register block
#[allow(missing_docs)]
pub struct Peripherals {
    pub rcc: Rcc<Mmio>,
    pub flash: Flash<Mmio>,
    pub systick: SysTick<Mmio>,
    pub exti: Exti<Mmio, Mmio>,

    pub gpioa: GpioPort<Mmio>,
    pub gpiob: GpioPort<Mmio>,
    pub gpioc: GpioPort<Mmio>,
    pub gpiod: GpioPort<Mmio>,
    pub gpioh: GpioPort<Mmio>,

    pub i2c1: I2c<Mmio>,
    pub i2c2: I2c<Mmio>,
    pub i2c3: I2c<Mmio>,

    pub adc1: Adc<Mmio>,
    #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
    pub adc2: Adc<Mmio>,
    #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
    pub adc3: Adc<Mmio>,
    pub adc_common: AdcCommon<Mmio>,

    pub spi1: Spi<Mmio>,
    pub spi2: Spi<Mmio>,
    pub spi3: Spi<Mmio>,
    pub spi4: Spi<Mmio>,

    pub dma1: DmaController<Mmio>,
    pub dma2: DmaController<Mmio>,
    pub dma1_streams: [Stream<Mmio>; 8],
    pub dma2_streams: [Stream<Mmio>; 8],

    pub usart1: Usart<Mmio>,
    pub usart2: Usart<Mmio>,
    pub usart6: Usart<Mmio>,

    pub tim1: Timer<Mmio>,
    pub tim2: Timer<Mmio>,
    pub tim3: Timer<Mmio>,
    pub tim4: Timer<Mmio>,
    pub tim5: Timer<Mmio>,
    #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
    pub tim6: Timer<Mmio>,
    #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
    pub tim7: Timer<Mmio>,
    #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
    pub tim8: Timer<Mmio>,
    pub tim9: Timer<Mmio>,
    pub tim10: Timer<Mmio>,
    pub tim11: Timer<Mmio>,
}

/// Register block at `addr`
///
/// Only called from [`Peripherals::take`], which runs once, with addresses
/// from the device memory map.
fn block(addr: usize) -> Mmio {
    // SAFETY: `addr` is a peripheral block and `take` hands out a single owner.
    unsafe { Mmio::new(addr) }
}

fn gpio(port: Port) -> GpioPort<Mmio> {
    GpioPort::new(port, block(port.base()))
}

fn streams(dma: DmaId) -> [Stream<Mmio>; 8] {
    [
        StreamId::S0,
        StreamId::S1,
        StreamId::S2,
        StreamId::S3,
        StreamId::S4,
        StreamId::S5,
        StreamId::S6,
        StreamId::S7,
    ]
    .map(|stream| Stream::new(dma, stream, block(dma.stream_base(stream))))
}

fn timer(id: TimerId) -> Timer<Mmio> {
    Timer::new(id, block(id.base()))
}

impl Peripherals {
    /// Claim every peripheral; `None` after the first call
    #[must_use]
    pub fn take() -> Option<Self> {
        critical_section::with(|_| {
            if TAKEN.load(Ordering::Relaxed) {
                None
            } else {
                TAKEN.store(true, Ordering::Relaxed);
                Some(Self::steal())
            }
        })
    }

    fn steal() -> Self {
        Self {
            rcc: Rcc::new(block(base::RCC)),
            flash: Flash::new(block(base::FLASH)),
            systick: SysTick::new(block(base::SYSTICK)),
            exti: Exti::new(block(base::EXTI), block(base::SYSCFG)),

            gpioa: gpio(Port::A),
            gpiob: gpio(Port::B),
            gpioc: gpio(Port::C),
            gpiod: gpio(Port::D),
            gpioh: gpio(Port::H),

            i2c1: I2c::new(I2cId::I2c1, block(I2cId::I2c1.base())),
            i2c2: I2c::new(I2cId::I2c2, block(I2cId::I2c2.base())),
            i2c3: I2c::new(I2cId::I2c3, block(I2cId::I2c3.base())),

            adc1: Adc::new(AdcId::Adc1, block(AdcId::Adc1.base())),
            #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
            adc2: Adc::new(AdcId::Adc2, block(AdcId::Adc2.base())),
            #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
            adc3: Adc::new(AdcId::Adc3, block(AdcId::Adc3.base())),
            adc_common: AdcCommon::new(block(base::ADC_COMMON)),

            spi1: Spi::new(SpiId::Spi1, block(SpiId::Spi1.base())),
            spi2: Spi::new(SpiId::Spi2, block(SpiId::Spi2.base())),
            spi3: Spi::new(SpiId::Spi3, block(SpiId::Spi3.base())),
            spi4: Spi::new(SpiId::Spi4, block(SpiId::Spi4.base())),

            dma1: DmaController::new(DmaId::Dma1, block(DmaId::Dma1.base())),
            dma2: DmaController::new(DmaId::Dma2, block(DmaId::Dma2.base())),
            dma1_streams: streams(DmaId::Dma1),
            dma2_streams: streams(DmaId::Dma2),

            usart1: Usart::new(UsartId::Usart1, block(UsartId::Usart1.base())),
            usart2: Usart::new(UsartId::Usart2, block(UsartId::Usart2.base())),
            usart6: Usart::new(UsartId::Usart6, block(UsartId::Usart6.base())),

            tim1: timer(TimerId::Tim1),
            tim2: timer(TimerId::Tim2),
            tim3: timer(TimerId::Tim3),
            tim4: timer(TimerId::Tim4),
            tim5: timer(TimerId::Tim5),
            #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
            tim6: timer(TimerId::Tim6),
            #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
            tim7: timer(TimerId::Tim7),
            #[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
            tim8: timer(TimerId::Tim8),
            tim9: timer(TimerId::Tim9),
            tim10: timer(TimerId::Tim10),
            tim11: timer(TimerId::Tim11),
        }
    }
}
