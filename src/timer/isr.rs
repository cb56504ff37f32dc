use crate::code::{IrAction, ToggleFlag};
use crate::config::TransmitterConfig;
use crate::error::IrError;
use crate::timer::OneShotTimer;
use crate::transmitter::IrTransmitter;
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::i2c::I2c;

/// A global `IrTransmitter` slot, empty until it is set up.
pub type GlobalIrTransmitter<B, T> = Mutex<RefCell<Option<IrTransmitter<'static, B, T>>>>;

/// Used to initialize the global static `IrTransmitter` for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// use irblaster::timer::{GlobalIrTransmitter, global_ir_transmitter_init};
/// use some_hal::{I2c0, Tpm1};
///
/// static IR_TRANSMITTER: GlobalIrTransmitter<I2c0, Tpm1> =
///     global_ir_transmitter_init::<I2c0, Tpm1>();
/// ```
pub const fn global_ir_transmitter_init<B: I2c, T: OneShotTimer>() -> GlobalIrTransmitter<B, T> {
    Mutex::new(RefCell::new(None))
}

/// Builds the transmitter and stores it in the global slot.
///
/// # Arguments
/// * The global static `IrTransmitter`
/// * The I2C bus the IR blaster is attached to
/// * The one-shot timer whose interrupt calls [`global_ir_timer_fired`]
/// * Bus address and protocol settings
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     global_ir_transmitter_setup(&IR_TRANSMITTER, i2c, tpm, TransmitterConfig::default());
/// }
/// ```
pub fn global_ir_transmitter_setup<B: I2c, T: OneShotTimer>(
    global_transmitter: &'static GlobalIrTransmitter<B, T>,
    bus: B,
    timer: T,
    config: TransmitterConfig,
) {
    critical_section::with(|cs| {
        let _ = global_transmitter
            .borrow(cs)
            .replace(Some(IrTransmitter::new(bus, timer, config)));
    });
}

/// Runs the drain step from the timer interrupt.
///
/// # Returns
/// * `Some(ms)` if the timer was re-armed, `None` if the queue is empty or the
///   transmitter has not been set up
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TPM1() {
///     global_ir_timer_fired(&IR_TRANSMITTER);
/// }
/// ```
pub fn global_ir_timer_fired<B: I2c, T: OneShotTimer>(
    global_transmitter: &'static GlobalIrTransmitter<B, T>,
) -> Option<u32> {
    critical_section::with(|cs| {
        global_transmitter
            .borrow(cs)
            .borrow()
            .as_ref()
            .and_then(IrTransmitter::on_timer_fired)
    })
}

/// Queues an action on the global transmitter without blocking.
///
/// # Errors
/// * [`IrError::NotInitialized`] before [`global_ir_transmitter_setup`]
/// * [`IrError::QueueFull`] if four actions are already waiting
pub fn global_ir_queue_action<B: I2c, T: OneShotTimer>(
    global_transmitter: &'static GlobalIrTransmitter<B, T>,
    action: &'static IrAction<'static>,
    toggle: &'static ToggleFlag,
) -> Result<(), IrError> {
    critical_section::with(|cs| match global_transmitter.borrow(cs).borrow().as_ref() {
        Some(transmitter) => transmitter.queue_action(action, toggle),
        None => Err(IrError::NotInitialized),
    })
}

/// Whether the global transmitter has nothing left to send.
///
/// A transmitter that has not been set up counts as idle.
pub fn global_ir_is_idle<B: I2c, T: OneShotTimer>(
    global_transmitter: &'static GlobalIrTransmitter<B, T>,
) -> bool {
    critical_section::with(|cs| {
        global_transmitter
            .borrow(cs)
            .borrow()
            .as_ref()
            .is_none_or(IrTransmitter::is_idle)
    })
}
