//! SysTick and software timers
//!
//! The SysTick exception raises a [`TickFlag`]; the foreground loop takes
//! the flag and counts down any number of [`SoftTimer`]s. Nothing is
//! decremented from interrupt context, so the timers need no locking.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::reg::RegisterAccess;

/// Size of the SysTick register block in words
pub const BLOCK_WORDS: usize = 4;

mod regs {
    pub const CSR: usize = 0x00;
    pub const RVR: usize = 0x04;
    pub const CVR: usize = 0x08;

    pub const CSR_ENABLE: u32 = 1 << 0;
    pub const CSR_TICKINT: u32 = 1 << 1;
    pub const CSR_CLKSOURCE: u32 = 1 << 2;
    pub const CSR_COUNTFLAG: u32 = 1 << 16;

    pub const RELOAD_MAX: u32 = 0x00FF_FFFF;
}

status_codes! {
    /// SysTick status codes
    pub enum SysTickError {
        /// Tick rate unreachable with a 24-bit reload
        InvalidReload = -140 => "invalid SysTick reload",
    }
}

/// SysTick operation result
pub type SysTickResult<T> = Result<T, SysTickError>;

/// Reload value giving `rate_hz` ticks from `core_clock_hz`
///
/// # Errors
///
/// `InvalidReload` when the rate is zero or the reload does not fit in 24 bits.
pub const fn reload_for(core_clock_hz: u32, rate_hz: u32) -> SysTickResult<u32> {
    if rate_hz == 0 || rate_hz > core_clock_hz {
        return Err(SysTickError::InvalidReload);
    }
    let reload = core_clock_hz / rate_hz - 1;
    if reload == 0 || reload > regs::RELOAD_MAX {
        return Err(SysTickError::InvalidReload);
    }
    Ok(reload)
}

/// SysTick driver
pub struct SysTick<R> {
    regs: R,
}

impl<R: RegisterAccess> SysTick<R> {
    /// Wrap the SysTick block
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Underlying register block
    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Start ticking at `rate_hz` from the processor clock with the exception enabled
    ///
    /// # Errors
    ///
    /// `InvalidReload`; the counter is left untouched.
    pub fn init(&mut self, core_clock_hz: u32, rate_hz: u32) -> SysTickResult<()> {
        let reload = reload_for(core_clock_hz, rate_hz)?;
        self.regs.write(regs::CSR, 0);
        self.regs.write(regs::RVR, reload);
        self.regs.write(regs::CVR, 0);
        self.regs.write(regs::CSR, regs::CSR_CLKSOURCE | regs::CSR_TICKINT | regs::CSR_ENABLE);
        Ok(())
    }

    /// Stop the counter
    pub fn stop(&mut self) {
        self.regs.clear_bits(regs::CSR, regs::CSR_ENABLE);
    }

    /// Whether the counter wrapped since the last call (clears on read)
    pub fn has_wrapped(&mut self) -> bool {
        self.regs.read(regs::CSR) & regs::CSR_COUNTFLAG != 0
    }
}

/// Set by the SysTick exception, taken by the foreground loop
pub struct TickFlag(AtomicBool);

impl TickFlag {
    /// A lowered flag
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag (exception handler side)
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lower the flag, returning whether it was raised
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for TickFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Countdown timer in SysTick periods
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct SoftTimer {
    remaining: u32,
}

impl SoftTimer {
    /// An expired timer
    #[must_use]
    pub const fn new() -> Self {
        Self { remaining: 0 }
    }

    /// Arm for `ticks` periods
    pub fn set_ticks(&mut self, ticks: u32) {
        self.remaining = ticks;
    }

    /// Arm for `millis` at a 1 kHz tick
    pub fn set_millis(&mut self, millis: u32) {
        self.set_ticks(millis);
    }

    /// Periods left
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether the countdown reached zero
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Count one period down, stopping at zero
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Count every timer in `timers` down once if the tick flag was raised
///
/// Returns whether a tick was consumed.
pub fn update_timers(flag: &TickFlag, timers: &mut [&mut SoftTimer]) -> bool {
    if !flag.take() {
        return false;
    }
    for timer in timers.iter_mut() {
        timer.tick();
    }
    true
}

/// Spin until `millis` ticks have been raised on `flag`
pub fn delay(flag: &TickFlag, millis: u32) {
    let mut timer = SoftTimer::new();
    timer.set_millis(millis);
    while !timer.is_expired() {
        if flag.take() {
            timer.tick();
        } else {
            core::hint::spin_loop();
        }
    }
}
