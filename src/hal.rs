//! Hardware Abstraction Layer
//!
//! Register-level drivers for the STM32F4 peripherals. Each driver is an
//! owning handle over one register block, generic over the
//! [`RegisterAccess`](crate::reg::RegisterAccess) backend so that the same
//! code runs against MMIO on target and against simulated registers on
//! the host. Bus clock gating always goes through an explicit
//! [`Rcc`](rcc::Rcc) handle.

pub mod adc;
pub mod dma;
pub mod exti;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod rcc;
pub mod spi;
pub mod systick;
pub mod timer;
pub mod usart;
