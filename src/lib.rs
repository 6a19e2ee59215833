//! STM32F4 Microcontroller Abstraction Layer
//!
//! Register-level drivers for the STM32F401, F411 and F446: clocks and
//! flash latency, GPIO and EXTI lines, SysTick, I2C, SPI, USART, DMA
//! streams, timers and the ADCs.
//!
//! A driver owns one peripheral block through a [`RegisterAccess`] backend.
//! On target that backend is `Mmio`; on the host it is
//! [`SimRegisters`], which is what the integration tests drive. Settings
//! that name a hardware field are closed enums from [`validate`], and every
//! setter checks all of its arguments before it writes the first register,
//! so an `Err` leaves the block as it was. Errors are per-peripheral enums
//! carrying the numeric status codes of [`error`].
//!
//! Clock gates are switched through an explicit [`hal::rcc::Rcc`] handle
//! rather than from inside the drivers. With the `embedded` feature,
//! `Peripherals::take` hands out each block exactly once.

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use cortex_m;
#[cfg(feature = "embedded")]
pub use cortex_m_rt;

#[macro_use]
mod fmt;

/// Register Access Layer
///
/// Read/modify/write primitives over memory-mapped register blocks.
pub mod reg;

/// Status codes shared by every driver
#[macro_use]
pub mod error;

/// Configuration Validators
///
/// Closed enumerations for hardware field domains.
#[macro_use]
pub mod validate;

/// Hardware Abstraction Layer
///
/// Register-level drivers for the STM32F4 peripherals.
pub mod hal;

/// Compile-time configuration and memory map
pub mod config;

/// Peripheral singletons backed by MMIO
#[cfg(feature = "embedded")]
pub mod peripherals;

pub use error::StatusCode;
pub use reg::{Field, RegisterAccess, SimRegisters};
