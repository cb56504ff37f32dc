/// Declares a static global `IR_TRANSMITTER` instance protected by a `critical_section` mutex.
///
/// This macro creates a `static` singleton `IR_TRANSMITTER` suitable for use in
/// interrupt-based environments, where both the main thread and the timer ISR need
/// to safely reach the transmitter.
///
/// # Arguments
/// - `$bus`: The concrete type of the I2C bus (must implement `I2c`)
/// - `$timer`: The concrete type of the one-shot timer (must implement `OneShotTimer`)
///
/// # Example
/// ```rust,ignore
/// init_ir_transmitter!(MyI2cType, MyTimerType);
/// ```
#[macro_export]
macro_rules! init_ir_transmitter {
    ( $bus:ty, $timer:ty ) => {
        /// The global IR transmitter, driven by the timer interrupt.
        pub static IR_TRANSMITTER: $crate::timer::GlobalIrTransmitter<$bus, $timer> =
            $crate::timer::global_ir_transmitter_init::<$bus, $timer>();
    };
}

/// Initializes the global `IR_TRANSMITTER` singleton with a new transmitter.
///
/// # Arguments
/// - `$bus`: The I2C bus the IR blaster sits on
/// - `$timer`: The one-shot timer whose interrupt calls `ir_timer_fired!`
/// - `$config`: Optional `TransmitterConfig`; the default configuration if omitted
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     setup_ir_transmitter!(i2c, tpm);
/// }
/// ```
///
/// # Notes
/// - Requires `init_ir_transmitter!` to have been used earlier.
#[macro_export]
macro_rules! setup_ir_transmitter {
    ( $bus:expr, $timer:expr ) => {
        $crate::setup_ir_transmitter!($bus, $timer, $crate::config::TransmitterConfig::new())
    };
    ( $bus:expr, $timer:expr, $config:expr ) => {
        $crate::timer::global_ir_transmitter_setup(&IR_TRANSMITTER, $bus, $timer, $config)
    };
}

/// Runs the drain step on the global `IR_TRANSMITTER` if it has been set up.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TPM1() {
///     ir_timer_fired!();
/// }
/// ```
///
/// # Notes
/// - Safe to call before setup; it silently does nothing.
#[macro_export]
macro_rules! ir_timer_fired {
    () => {{
        let _ = $crate::timer::global_ir_timer_fired(&IR_TRANSMITTER);
    }};
}

#[cfg(test)]
mod tests {
    use crate::code::{IrAction, IrCode, IrEncoding, ToggleFlag};
    use crate::timer::{global_ir_is_idle, global_ir_queue_action};
    use crate::transmitter::tests::{MockTimer, frame};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    crate::init_ir_transmitter!(I2cMock, MockTimer);

    static MUTE_CODES: [IrCode; 1] = [IrCode::rc6(21, 0x1_000d).with_toggle(0x8000)];
    static MUTE: IrAction<'static> = IrAction::new(&MUTE_CODES);
    static TOGGLE: ToggleFlag = ToggleFlag::new();

    #[test]
    fn test_macros_drive_global_transmitter() {
        crate::ir_timer_fired!();

        let bus = I2cMock::new(&[I2cTransaction::write(0x38, frame(IrEncoding::Rc6, 0x1_800d, 21))]);
        crate::setup_ir_transmitter!(
            bus,
            MockTimer::default(),
            crate::config::TransmitterConfig::new().with_bus_address(0x38)
        );
        global_ir_queue_action(&IR_TRANSMITTER, &MUTE, &TOGGLE).unwrap();
        while !global_ir_is_idle(&IR_TRANSMITTER) {
            crate::ir_timer_fired!();
        }
        assert!(TOGGLE.get());

        let transmitter = critical_section::with(|cs| IR_TRANSMITTER.borrow(cs).take()).unwrap();
        let (mut bus, _) = transmitter.release();
        bus.done();
    }
}
