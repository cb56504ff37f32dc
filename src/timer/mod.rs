//! Timer traits and tick utilities for the IR transmitter and device scheduler.
//!
//! The transmitter needs a one-shot hardware timer whose expiry runs the drain
//! step ([`IrTransmitter::on_timer_fired`](crate::transmitter::IrTransmitter::on_timer_fired)).
//! The device scheduler needs a free-running millisecond clock it can poll.
//! Both are expressed as traits the application implements over its HAL.
//!
//! Two ways of driving the drain step are provided:
//! - `timer-isr` (default): global singleton helpers and macros for calling the
//!   drain step from the timer interrupt, guarded by `critical_section`
//! - `delay-loop`: a blocking loop that drains the queue with a `DelayNs` provider
//!
//! Common millisecond-tick reload values (for use with [`compute_timer_modulo`]
//! and [`const_timer_modulo`]):
//!
//! | TIMER CLOCK | PRESCALER | MODULO |
//! |-------------|-----------|--------|
//! |      48 MHz |         1 | 48 000 |
//! |      24 MHz |         1 | 24 000 |
//! |      16 MHz |        64 |    250 |
//! |       8 MHz |         8 |  1 000 |

use libm::round;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use macros::*;

/// 1,000 microseconds = 1 millisecond
pub const MICROSECONDS_PER_MILLISECOND: u32 = 1_000;

/// A one-shot hardware timer whose expiry calls back into the transmitter.
pub trait OneShotTimer {
    /// Arms the timer to expire once after `duration_ms` milliseconds.
    fn start_ms(&mut self, duration_ms: u32);

    /// Cancels any pending expiry.
    fn stop(&mut self);

    /// Makes the expiry callback run as soon as possible.
    fn fire_now(&mut self) {
        self.start_ms(0);
    }
}

/// A free-running millisecond counter.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch. Allowed to wrap.
    fn now_ms(&mut self) -> u32;
}

/// Rounds a duration in microseconds up to whole milliseconds.
pub const fn us_to_ms_ceil(us: u32) -> u32 {
    us.div_ceil(MICROSECONDS_PER_MILLISECOND)
}

/// Computes the reload value for a timer overflowing every `period_ms` milliseconds.
///
/// # Arguments
/// - `timer_clock_hz`: timer input clock in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
/// - `period_ms`: desired overflow period in milliseconds (e.g., 1.0)
///
/// # Returns
/// - The modulo register value, rounded to the nearest count
pub fn compute_timer_modulo(timer_clock_hz: u32, prescaler: u32, period_ms: f32) -> u16 {
    let counts_per_second = f64::from(timer_clock_hz) / f64::from(prescaler);
    let counts = counts_per_second * f64::from(period_ms) / 1_000.0;
    round(counts) as u16
}

/// Compile-time reload value for a timer overflowing once per millisecond.
///
/// # Arguments
/// - `timer_clock_hz`: timer input clock in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
///
/// # Returns
/// - The modulo register value, truncated
pub const fn const_timer_modulo(timer_clock_hz: u32, prescaler: u32) -> u16 {
    (timer_clock_hz / prescaler / MICROSECONDS_PER_MILLISECOND) as u16
}
