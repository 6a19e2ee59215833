//! Device limits and memory map
//!
//! Oscillator frequencies, per-device clock ceilings, ring buffer sizes
//! and the base address of every register block. The ceilings follow the
//! `stm32f401`/`stm32f411` features and default to the F446.

/// Internal high-speed oscillator frequency (16 MHz)
pub const HSI_VALUE: u32 = 16_000_000;

/// External crystal frequency (8 MHz on Nucleo boards via ST-LINK MCO)
pub const HSE_VALUE: u32 = 8_000_000;

/// Capacity of each USART ring buffer in bytes
pub const BUFFER_SIZE: usize = 128;

/// Largest value accepted by a DMA stream's NDTR register
pub const DMA_MAX_DATA_LEN: u32 = 65_535;

/// Largest timer prescaler divisor (PSC + 1)
pub const TIMER_MAX_PRESCALER: u32 = 65_536;

/// Number of timer registers a DMA burst can reach (CR1 through BDTR)
pub const MAX_NUM_TIMER_REGISTERS: u32 = 18;

/// Maximum SYSCLK of the selected device in MHz
#[cfg(feature = "stm32f401")]
pub const MAX_SYSCLK_MHZ: u32 = 84;

/// Maximum SYSCLK of the selected device in MHz
#[cfg(all(feature = "stm32f411", not(feature = "stm32f401")))]
pub const MAX_SYSCLK_MHZ: u32 = 100;

/// Maximum SYSCLK of the selected device in MHz
#[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
pub const MAX_SYSCLK_MHZ: u32 = 180;

/// Maximum APB1 clock in MHz
#[cfg(feature = "stm32f401")]
pub const MAX_PCLK1_MHZ: u32 = 42;

/// Maximum APB1 clock in MHz
#[cfg(all(feature = "stm32f411", not(feature = "stm32f401")))]
pub const MAX_PCLK1_MHZ: u32 = 50;

/// Maximum APB1 clock in MHz
#[cfg(not(any(feature = "stm32f401", feature = "stm32f411")))]
pub const MAX_PCLK1_MHZ: u32 = 45;

/// Maximum ADC clock in MHz
pub const MAX_ADCCLK_MHZ: u32 = 36;

/// Flash wait-state band width in MHz (2.7 V to 3.6 V supply)
pub const FLASH_MHZ_PER_WAIT_STATE: u32 = 30;

/// Default console baud rate
pub const CONSOLE_BAUD: u32 = 115_200;

/// SysTick rate used by software timers (1 kHz)
pub const SYSTICK_RATE_HZ: u32 = 1_000;

/// Peripheral base addresses
pub mod base {
    //! Memory map of the STM32F4 peripheral blocks (RM0390 §2.2)

    /// TIM2 (APB1)
    pub const TIM2: usize = 0x4000_0000;
    /// TIM3 (APB1)
    pub const TIM3: usize = 0x4000_0400;
    /// TIM4 (APB1)
    pub const TIM4: usize = 0x4000_0800;
    /// TIM5 (APB1)
    pub const TIM5: usize = 0x4000_0C00;
    /// TIM6 (APB1, basic)
    pub const TIM6: usize = 0x4000_1000;
    /// TIM7 (APB1, basic)
    pub const TIM7: usize = 0x4000_1400;
    /// SPI2 (APB1)
    pub const SPI2: usize = 0x4000_3800;
    /// SPI3 (APB1)
    pub const SPI3: usize = 0x4000_3C00;
    /// USART2 (APB1)
    pub const USART2: usize = 0x4000_4400;
    /// I2C1 (APB1)
    pub const I2C1: usize = 0x4000_5400;
    /// I2C2 (APB1)
    pub const I2C2: usize = 0x4000_5800;
    /// I2C3 (APB1)
    pub const I2C3: usize = 0x4000_5C00;
    /// TIM1 (APB2)
    pub const TIM1: usize = 0x4001_0000;
    /// TIM8 (APB2)
    pub const TIM8: usize = 0x4001_0400;
    /// USART1 (APB2)
    pub const USART1: usize = 0x4001_1000;
    /// USART6 (APB2)
    pub const USART6: usize = 0x4001_1400;
    /// ADC1 (APB2); ADC2 and ADC3 follow at 0x100 steps
    pub const ADC1: usize = 0x4001_2000;
    /// Registers shared by the ADCs
    pub const ADC_COMMON: usize = 0x4001_2300;
    /// SPI1 (APB2)
    pub const SPI1: usize = 0x4001_3000;
    /// SPI4 (APB2)
    pub const SPI4: usize = 0x4001_3400;
    /// SYSCFG (APB2)
    pub const SYSCFG: usize = 0x4001_3800;
    /// EXTI (APB2)
    pub const EXTI: usize = 0x4001_3C00;
    /// TIM9 (APB2)
    pub const TIM9: usize = 0x4001_4000;
    /// TIM10 (APB2)
    pub const TIM10: usize = 0x4001_4400;
    /// TIM11 (APB2)
    pub const TIM11: usize = 0x4001_4800;
    /// GPIOA (AHB1); ports B..H follow at 0x400 strides
    pub const GPIOA: usize = 0x4002_0000;
    /// Stride between GPIO ports
    pub const GPIO_STRIDE: usize = 0x400;
    /// RCC (AHB1)
    pub const RCC: usize = 0x4002_3800;
    /// Flash interface (AHB1)
    pub const FLASH: usize = 0x4002_3C00;
    /// DMA1 (AHB1)
    pub const DMA1: usize = 0x4002_6000;
    /// DMA2 (AHB1)
    pub const DMA2: usize = 0x4002_6400;
    /// SysTick (Cortex-M4 private peripheral bus)
    pub const SYSTICK: usize = 0xE000_E010;
}

/// Pin assignments used by the demo binary (Nucleo-64 layout)
pub mod pins {
    //! GPIO pin assignments matching the Nucleo-F4 board

    use crate::hal::gpio::{AltFunc, PinNumber, Port};

    /// User LED LD2
    pub const LED: (Port, PinNumber) = (Port::A, PinNumber::P5);

    /// User button B1 (active low)
    pub const BUTTON: (Port, PinNumber) = (Port::C, PinNumber::P13);

    /// USART2 TX (ST-LINK virtual COM port)
    pub const CONSOLE_TX: (Port, PinNumber) = (Port::A, PinNumber::P2);

    /// USART2 RX (ST-LINK virtual COM port)
    pub const CONSOLE_RX: (Port, PinNumber) = (Port::A, PinNumber::P3);

    /// Alternate function of the USART2 pins
    pub const CONSOLE_AF: AltFunc = AltFunc::Af7;
}
