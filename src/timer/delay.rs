use crate::timer::OneShotTimer;
use crate::transmitter::IrTransmitter;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// A stand-in for a hardware timer when the drain step is run by [`run_until_idle`].
///
/// Nothing expires by itself; the timer only remembers what it was last asked for.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PolledTimer {
    armed_ms: Option<u32>,
}

impl PolledTimer {
    /// A stopped timer.
    pub const fn new() -> Self {
        Self { armed_ms: None }
    }

    /// The duration the timer was last armed for, `None` if stopped.
    pub fn armed_ms(&self) -> Option<u32> {
        self.armed_ms
    }
}

impl OneShotTimer for PolledTimer {
    fn start_ms(&mut self, duration_ms: u32) {
        self.armed_ms = Some(duration_ms);
    }

    fn stop(&mut self) {
        self.armed_ms = None;
    }
}

/// Runs a blocking loop that drains the transmitter's queue.
///
/// This is a simple timing loop for use in environments where interrupts are unavailable
/// or undesired. Each drain step is followed by a delay of exactly as long as the
/// step asked the timer for, using a delay provider implementing
/// `embedded_hal::delay::DelayNs`.
///
/// # Arguments
/// - `transmitter`: The transmitter to drain, usually built with a [`PolledTimer`].
/// - `delay`: A delay provider implementing `DelayNs`, typically from the HAL.
///
/// # Example
/// ```rust
/// # use embedded_hal_mock::eh1::{delay::NoopDelay, i2c::Mock as I2cMock};
/// use irblaster::code::{IrAction, IrCode, ToggleFlag};
/// use irblaster::config::TransmitterConfig;
/// use irblaster::timer::{PolledTimer, run_until_idle};
/// use irblaster::transmitter::IrTransmitter;
///
/// static PAUSE: [IrCode; 1] = [IrCode::pause_ms(5)];
/// static WAIT: IrAction<'static> = IrAction::new(&PAUSE);
/// static TOGGLE: ToggleFlag = ToggleFlag::new();
///
/// let transmitter = IrTransmitter::new(I2cMock::new(&[]), PolledTimer::new(), TransmitterConfig::new());
/// transmitter.queue_action(&WAIT, &TOGGLE).unwrap();
/// run_until_idle(&transmitter, &mut NoopDelay::new());
/// assert!(transmitter.is_idle());
/// # let (mut bus, _) = transmitter.release();
/// # bus.done();
/// ```
///
/// # Notes
/// - Returns as soon as the queue is empty; call it again after queueing more actions.
/// - For concurrent applications, prefer interrupt-driven draining (`timer-isr`).
pub fn run_until_idle<B, T, D>(transmitter: &IrTransmitter<'_, B, T>, delay: &mut D)
where
    B: I2c,
    T: OneShotTimer,
    D: DelayNs,
{
    while let Some(duration_ms) = transmitter.on_timer_fired() {
        delay.delay_ms(duration_ms);
    }
}
