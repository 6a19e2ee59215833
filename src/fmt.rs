//! Logging shim
//!
//! Drivers log through these macros. With the `embedded` feature they
//! forward to `defmt`; on the host they evaluate nothing but still borrow
//! their arguments so that call sites stay warning-free.

#![allow(unused_macros)]

#[cfg(feature = "embedded")]
macro_rules! trace {
    ($($arg:tt)*) => (::defmt::trace!($($arg)*));
}

#[cfg(feature = "embedded")]
macro_rules! debug {
    ($($arg:tt)*) => (::defmt::debug!($($arg)*));
}

#[cfg(feature = "embedded")]
macro_rules! info {
    ($($arg:tt)*) => (::defmt::info!($($arg)*));
}

#[cfg(feature = "embedded")]
macro_rules! warn {
    ($($arg:tt)*) => (::defmt::warn!($($arg)*));
}

#[cfg(feature = "embedded")]
macro_rules! error {
    ($($arg:tt)*) => (::defmt::error!($($arg)*));
}

#[cfg(not(feature = "embedded"))]
macro_rules! trace {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "embedded"))]
macro_rules! debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "embedded"))]
macro_rules! info {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "embedded"))]
macro_rules! warn {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "embedded"))]
macro_rules! error {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}
