//! Parallel device-state scheduler.
//!
//! [`apply_states`] walks every active device through its options at the same
//! time. Each device keeps its own settle countdown, measured against a
//! free-running millisecond [`Clock`] read once per round, so a device waiting out
//! a slow power-on never holds back the others: switching an activity takes as
//! long as its slowest device, not the sum of all of them.
//!
//! All devices share the one transmitter. Ordering between devices is not
//! defined, but each device's options are visited in ascending order.

use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::consts::MAX_DEVICES;
use crate::device::{ActivityId, DeviceRegistry, DeviceState, OptionFlags};
use crate::timer::{Clock, OneShotTimer};
use crate::transition::{Transition, TransitionContext, transition};
use crate::transmitter::IrTransmitter;

/// Progress of one active device during a switch.
#[derive(Clone, Copy, Debug)]
struct DeviceSwitchingState<'s> {
    finished: bool,
    /// Remaining settle time in milliseconds.
    delay: u32,
    current_option: usize,
    /// `None` drives the device to its defaults.
    target: Option<&'s DeviceState<'s>>,
}

impl<'s> DeviceSwitchingState<'s> {
    const fn new(target: Option<&'s DeviceState<'s>>) -> Self {
        Self {
            finished: false,
            delay: 0,
            current_option: 0,
            target,
        }
    }
}

/// Handles one option of one device that is not settling.
fn step<'a, B, T, W>(
    transmitter: &IrTransmitter<'a, B, T>,
    registry: &mut DeviceRegistry<'a>,
    index: usize,
    device: &mut DeviceSwitchingState<'_>,
    wait: &mut W,
) where
    B: I2c,
    T: OneShotTimer,
    W: FnMut(),
{
    let data = registry.data();
    let (Some(id), Some(toggle)) = (registry.active_device(index), registry.toggle(index)) else {
        device.finished = true;
        return;
    };
    let Some(option) = data.device_options(id).get(device.current_option) else {
        debug!("device {} settled", id.0);
        device.finished = true;
        return;
    };
    let Some(current) = registry
        .option_values(index)
        .and_then(|values| values.get(device.current_option).copied())
    else {
        // Device got no value storage.
        device.finished = true;
        return;
    };

    let (target, drive) = match device.target {
        Some(state) => (state.values.get(device.current_option).copied(), true),
        None if option.flags.contains(OptionFlags::DEFAULT_TO_ZERO) => {
            (Some(0), option.flags.contains(OptionFlags::ACTION_ON_DEFAULT))
        }
        None => (None, false),
    };

    let mut settle_ms = 0;
    let value = match target {
        None => None,
        Some(target) if !drive => Some(target),
        Some(target) => {
            let mut ctx = TransitionContext {
                transmitter,
                data,
                toggle,
                wait,
            };
            match transition(&mut ctx, option, current, target) {
                Transition::Reached { action } => {
                    settle_ms = option.post_delay(action);
                    Some(target)
                }
                Transition::Unchanged => Some(target),
                Transition::Stopped { value } => Some(value),
            }
        }
    };
    // Only what was actually sent is tracked.
    let slot = registry
        .option_values_mut(index)
        .and_then(|values| values.get_mut(device.current_option));
    if let (Some(value), Some(slot)) = (value, slot) {
        *slot = value;
    }

    if settle_ms > 0 {
        trace!("device {} settling for {} ms", id.0, settle_ms);
        device.delay = u32::from(settle_ms);
    } else {
        device.current_option += 1;
    }
}

/// Drives every active device to its entry in `states`, or to its defaults if it
/// has none, and returns once all of them have settled and the transmitter is idle.
///
/// # Arguments
/// - `transmitter`: Where the actions are queued.
/// - `registry`: Active devices and their tracked option values, updated in place.
/// - `states`: Target values, matched to active devices by [`DeviceId`](crate::device::DeviceId).
/// - `clock`: Free-running millisecond clock pacing the settle delays.
/// - `wait`: Low-power wait called once per round and while the queue is busy.
///
/// # Notes
/// Without a target, options flagged [`OptionFlags::DEFAULT_TO_ZERO`] go to 0. Codes
/// are only sent for that if [`OptionFlags::ACTION_ON_DEFAULT`] is also set; otherwise
/// the value is just recorded. Other options of such a device are left alone.
pub fn apply_states<'a, 's, B, T, C, W>(
    transmitter: &IrTransmitter<'a, B, T>,
    registry: &mut DeviceRegistry<'a>,
    states: &'s [DeviceState<'s>],
    clock: &mut C,
    mut wait: W,
) where
    B: I2c,
    T: OneShotTimer,
    C: Clock,
    W: FnMut(),
{
    let mut switching: Vec<DeviceSwitchingState<'s>, MAX_DEVICES> = Vec::new();
    for index in 0..registry.active_count() {
        let target = registry
            .active_device(index)
            .and_then(|id| states.iter().find(|state| state.device == id));
        if switching.push(DeviceSwitchingState::new(target)).is_err() {
            break;
        }
    }
    debug!("switching {} devices towards {} target states", switching.len(), states.len());

    let mut last = clock.now_ms();
    loop {
        let now = clock.now_ms();
        let elapsed = now.wrapping_sub(last);
        last = now;

        let mut pending = false;
        for (index, device) in switching.iter_mut().enumerate() {
            if device.finished {
                continue;
            }
            if device.delay > 0 {
                device.delay = device.delay.saturating_sub(elapsed);
                if device.delay > 0 {
                    pending = true;
                    continue;
                }
                device.current_option += 1;
            }
            step(transmitter, registry, index, device, &mut wait);
            pending |= !device.finished;
        }

        if !pending {
            break;
        }
        wait();
    }

    transmitter.wait_idle(&mut wait);
    info!("{} devices settled", switching.len());
}

/// Applies the activity behind `activity`.
///
/// # Returns
/// `false`, without touching any device, if the handle does not resolve.
pub fn switch_activity<'a, B, T, C, W>(
    transmitter: &IrTransmitter<'a, B, T>,
    registry: &mut DeviceRegistry<'a>,
    activity: ActivityId,
    clock: &mut C,
    wait: W,
) -> bool
where
    B: I2c,
    T: OneShotTimer,
    C: Clock,
    W: FnMut(),
{
    let Some(found) = registry.data().activity(activity) else {
        warn!("unknown activity {}", activity.0);
        return false;
    };
    info!("switching to activity {}", activity.0);
    apply_states(transmitter, registry, found.states, clock, wait);
    true
}

/// Applies [`RemoteData::home_activity`](crate::device::RemoteData::home_activity), if one is set.
pub fn switch_home_activity<'a, B, T, C, W>(
    transmitter: &IrTransmitter<'a, B, T>,
    registry: &mut DeviceRegistry<'a>,
    clock: &mut C,
    wait: W,
) -> bool
where
    B: I2c,
    T: OneShotTimer,
    C: Clock,
    W: FnMut(),
{
    match registry.data().home_activity {
        Some(home) => switch_activity(transmitter, registry, home, clock, wait),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{IrAction, IrCode, IrEncoding, ToggleFlag};
    use crate::config::TransmitterConfig;
    use crate::device::{ActionId, Activity, Device, DeviceId, OptionSpec, RemoteData};
    use crate::transmitter::tests::{MockTimer, frame};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    /// Advances one millisecond per read.
    #[derive(Debug, Default)]
    struct MockClock {
        now: u32,
    }

    impl Clock for MockClock {
        fn now_ms(&mut self) -> u32 {
            let now = self.now;
            self.now += 1;
            now
        }
    }

    static PROJECTOR_OFF: [IrCode; 1] = [IrCode::sirc(12, 0x02f)];
    static PROJECTOR_ON: [IrCode; 1] = [IrCode::sirc(12, 0x02e)];
    static RECEIVER_TV: [IrCode; 1] = [IrCode::rc6(21, 0x1_0010)];
    static RECEIVER_GAME: [IrCode; 1] = [IrCode::rc6(21, 0x1_0011)];
    static VOLUME_DOWN: [IrCode; 1] = [IrCode::rc6(21, 0x1_0019)];
    static VOLUME_UP: [IrCode; 1] = [IrCode::rc6(21, 0x1_0018)];
    static PLAYER_OFF: [IrCode; 2] = [IrCode::sirc(12, 0x015), IrCode::pause_ms(30)];
    static PLAYER_ON: [IrCode; 1] = [IrCode::sirc(12, 0x016)];

    static ACTIONS: [IrAction<'static>; 8] = [
        IrAction::new(&PROJECTOR_OFF),
        IrAction::new(&PROJECTOR_ON),
        IrAction::new(&RECEIVER_TV),
        IrAction::new(&RECEIVER_GAME),
        IrAction::new(&VOLUME_DOWN),
        IrAction::new(&VOLUME_UP),
        IrAction::new(&PLAYER_OFF),
        IrAction::new(&PLAYER_ON),
    ];

    static OPTIONS: [OptionSpec<'static>; 4] = [
        // Projector power, slow to warm up.
        OptionSpec::new(
            OptionFlags::DEFAULT_TO_ZERO.union(OptionFlags::ACTION_ON_DEFAULT),
            1,
            &[ActionId(0), ActionId(1)],
        )
        .with_post_delays(&[0, 500]),
        // Receiver input.
        OptionSpec::new(OptionFlags::DEFAULT_TO_ZERO, 1, &[ActionId(2), ActionId(3)])
            .with_post_delays(&[0, 50]),
        // Receiver volume.
        OptionSpec::new(
            OptionFlags::CYCLED.union(OptionFlags::ABSOLUTE_FROM_ZERO),
            3,
            &[ActionId(4), ActionId(5)],
        ),
        // Player power, a single toggle key that can't be tracked reliably.
        OptionSpec::new(OptionFlags::ALWAYS_SET, 1, &[ActionId(6), ActionId(7)]),
    ];

    static DEVICES: [Device; 3] = [Device::new(0, 1), Device::new(1, 2), Device::new(3, 1)];

    static WATCH_PROJECTOR: [u8; 1] = [1];
    static WATCH: [DeviceState<'static>; 1] = [DeviceState::new(DeviceId(0), &WATCH_PROJECTOR)];
    static ACTIVITIES: [Activity<'static>; 1] = [Activity { states: &WATCH }];

    static DATA: RemoteData<'static> = RemoteData {
        actions: &ACTIONS,
        options: &OPTIONS,
        devices: &DEVICES,
        activities: &ACTIVITIES,
        home_activity: Some(ActivityId(0)),
    };

    fn sirc(code: u32) -> I2cTransaction {
        I2cTransaction::write(0x70, frame(IrEncoding::Sirc, code, 12))
    }

    fn rc6(code: u32) -> I2cTransaction {
        I2cTransaction::write(0x70, frame(IrEncoding::Rc6, code, 21))
    }

    /// Activates every device, seeds the tracked values, runs `switch`, and returns
    /// the tracked values afterwards along with the clock reading.
    fn run<F>(
        data: &'static RemoteData<'static>,
        initial: &[&[u8]],
        expected: &[I2cTransaction],
        switch: F,
    ) -> (Vec<Vec<u8, 4>, 3>, u32)
    where
        F: for<'a> FnOnce(&IrTransmitter<'a, I2cMock, MockTimer>, &mut DeviceRegistry<'a>, &mut MockClock),
    {
        let toggles: [ToggleFlag; MAX_DEVICES] = Default::default();
        let mut registry = DeviceRegistry::new(data, &toggles);
        registry.set_all_active();
        for (index, values) in initial.iter().enumerate() {
            registry.option_values_mut(index).unwrap().copy_from_slice(values);
        }

        let tx = IrTransmitter::new(I2cMock::new(expected), MockTimer::default(), TransmitterConfig::default());
        let mut clock = MockClock::default();
        switch(&tx, &mut registry, &mut clock);

        let values = (0..registry.active_count())
            .map(|index| Vec::from_slice(registry.option_values(index).unwrap()).unwrap())
            .collect();
        let (mut bus, _) = tx.release();
        bus.done();
        (values, clock.now)
    }

    fn drain<'a>(tx: &'a IrTransmitter<'_, I2cMock, MockTimer>) -> impl FnMut() + 'a {
        move || {
            let _ = tx.on_timer_fired();
        }
    }

    #[test]
    fn test_switch_takes_slowest_device_time() {
        static PROJECTOR: [u8; 1] = [1];
        static RECEIVER: [u8; 2] = [1, 0];
        static PLAYER: [u8; 1] = [0];
        let states = [
            DeviceState::new(DeviceId(0), &PROJECTOR),
            DeviceState::new(DeviceId(1), &RECEIVER),
            DeviceState::new(DeviceId(2), &PLAYER),
        ];
        let expected = [sirc(0x02e), rc6(0x1_0011), sirc(0x015)];

        let (values, elapsed) = run(&DATA, &[], &expected, |tx, registry, clock| {
            apply_states(tx, registry, &states, clock, drain(tx));
        });

        assert_eq!(values, [&[1][..], &[1, 0][..], &[0][..]]);
        assert!((500..520).contains(&elapsed), "switch took {elapsed} ms");
    }

    #[test]
    fn test_empty_states_drive_defaults() {
        let expected = [sirc(0x02f)];
        let (values, _) = run(&DATA, &[&[1], &[1, 2], &[1]], &expected, |tx, registry, clock| {
            apply_states(tx, registry, &[], clock, drain(tx));
        });
        // Receiver input is recorded without a code; volume and player are untouched.
        assert_eq!(values, [&[0][..], &[0, 2][..], &[1][..]]);
    }

    #[test]
    fn test_settled_options_are_not_resent() {
        static RECEIVER: [u8; 2] = [1, 2];
        let states = [DeviceState::new(DeviceId(1), &RECEIVER)];
        let (values, _) = run(&DATA, &[&[0], &[1, 2], &[0]], &[], |tx, registry, clock| {
            apply_states(tx, registry, &states, clock, drain(tx));
        });
        assert_eq!(values, [&[0][..], &[1, 2][..], &[0][..]]);
    }

    #[test]
    fn test_volume_resets_from_zero() {
        static RECEIVER: [u8; 2] = [0, 1];
        let states = [DeviceState::new(DeviceId(1), &RECEIVER)];
        let expected = [rc6(0x1_0019), rc6(0x1_0019), rc6(0x1_0019), rc6(0x1_0018)];
        let (values, _) = run(&DATA, &[&[0], &[0, 2], &[0]], &expected, |tx, registry, clock| {
            apply_states(tx, registry, &states, clock, drain(tx));
        });
        assert_eq!(values[1], [0, 1]);
    }

    #[test]
    fn test_unreachable_target_keeps_tracked_value() {
        static RECEIVER: [u8; 2] = [7, 1];
        let states = [DeviceState::new(DeviceId(1), &RECEIVER)];
        let expected = [rc6(0x1_0018)];
        let (values, _) = run(&DATA, &[&[0], &[0, 0], &[0]], &expected, |tx, registry, clock| {
            apply_states(tx, registry, &states, clock, drain(tx));
        });
        assert_eq!(values[1], [0, 1]);
    }

    static TRACKING_OPTIONS: [OptionSpec<'static>; 2] = [
        // Defaults to zero but has no codes at all.
        OptionSpec::new(OptionFlags::DEFAULT_TO_ZERO, 3, &[]),
        // Cycled through a handle that doesn't resolve.
        OptionSpec::new(OptionFlags::CYCLED, 3, &[ActionId(42)]),
    ];
    static TRACKING_DEVICES: [Device; 1] = [Device::new(0, 2)];
    static TRACKING: RemoteData<'static> = RemoteData {
        actions: &[],
        options: &TRACKING_OPTIONS,
        devices: &TRACKING_DEVICES,
        activities: &[],
        home_activity: None,
    };

    #[test]
    fn test_default_is_recorded_without_actions() {
        let (values, _) = run(&TRACKING, &[&[2, 1]], &[], |tx, registry, clock| {
            apply_states(tx, registry, &[], clock, drain(tx));
        });
        assert_eq!(values, [&[0, 1][..]]);
    }

    #[test]
    fn test_unsent_target_is_not_tracked() {
        static TARGET: [u8; 2] = [2, 2];
        let states = [DeviceState::new(DeviceId(0), &TARGET)];
        let (values, _) = run(&TRACKING, &[&[0, 0]], &[], |tx, registry, clock| {
            apply_states(tx, registry, &states, clock, drain(tx));
        });
        assert_eq!(values, [&[0, 0][..]]);
    }

    #[test]
    fn test_switch_activity() {
        let expected = [sirc(0x02e)];
        let (values, elapsed) = run(&DATA, &[], &expected, |tx, registry, clock| {
            assert!(!switch_activity(tx, registry, ActivityId(3), clock, drain(tx)));
            assert!(switch_home_activity(tx, registry, clock, drain(tx)));
        });
        assert_eq!(values[0], [1]);
        assert!(elapsed >= 500);
    }

    #[test]
    fn test_no_active_devices_returns_at_once() {
        let toggles: [ToggleFlag; MAX_DEVICES] = Default::default();
        let mut registry = DeviceRegistry::new(&DATA, &toggles);
        let tx = IrTransmitter::new(I2cMock::new(&[]), MockTimer::default(), TransmitterConfig::default());
        let mut clock = MockClock::default();
        apply_states(&tx, &mut registry, &[], &mut clock, drain(&tx));
        assert_eq!(clock.now, 2);
        let (mut bus, _) = tx.release();
        bus.done();
    }
}
