//! Option transition function.
//!
//! Decides which actions move one option of one device from its tracked value to a
//! target value, and queues them on the transmitter:
//!
//! | Option kind                 | Actions            | Sequence sent |
//! |-----------------------------|--------------------|---------------|
//! | direct                      | one per value      | `actions[target]` |
//! | `CYCLED`, single action     | `[next]`           | `next` until the value wraps round to the target |
//! | `CYCLED`, two actions       | `[down, up]`       | `up` while below, `down` while above |
//! | `+ ABSOLUTE_FROM_ZERO`      | `[down, up]`       | `down` × `max_value`, then `up` × target |
//!
//! Any configured pre-action goes out first. Targets outside the option's range,
//! missing actions, and malformed action lists make the transition a no-op.

use embedded_hal::i2c::I2c;

use crate::code::ToggleFlag;
use crate::device::{ActionId, OptionFlags, OptionSpec, RemoteData};
use crate::timer::OneShotTimer;
use crate::transmitter::IrTransmitter;

/// Everything a transition needs to queue actions for one device.
pub struct TransitionContext<'t, 'a, B, T, W> {
    /// Transmitter the actions are queued on.
    pub transmitter: &'t IrTransmitter<'a, B, T>,
    /// Arena the option's action handles resolve against.
    pub data: &'a RemoteData<'a>,
    /// Toggle flag of the device being driven.
    pub toggle: &'a ToggleFlag,
    /// Low-power wait used while the transmit queue is full.
    pub wait: &'t mut W,
}

impl<B, T, W> core::fmt::Debug for TransitionContext<'_, '_, B, T, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransitionContext")
            .field("toggle", &self.toggle)
            .finish_non_exhaustive()
    }
}

impl<B, T, W> TransitionContext<'_, '_, B, T, W>
where
    B: I2c,
    T: OneShotTimer,
    W: FnMut(),
{
    /// Queues the action behind `id`, waiting for room if the queue is full.
    ///
    /// # Returns
    /// `false` if the handle does not resolve, in which case nothing is sent.
    fn press(&mut self, id: ActionId) -> bool {
        match self.data.action(id) {
            Some(action) => {
                self.transmitter.send_action(action, self.toggle, self.wait);
                true
            }
            None => false,
        }
    }

    fn press_times(&mut self, id: ActionId, times: u8) -> bool {
        for _ in 0..times {
            if !self.press(id) {
                return false;
            }
        }
        true
    }
}

/// Whether `target` is a value `option` can be driven to.
///
/// Out-of-range values never are. Direct options also need an action at that
/// index, and cycled options need either `[next]` or `[down, up]`.
pub fn is_reachable(option: &OptionSpec<'_>, target: u8) -> bool {
    if target > option.max_value {
        return false;
    }
    if option.flags.contains(OptionFlags::CYCLED) {
        matches!(option.actions.len(), 1 | 2)
    } else {
        option.actions.get(usize::from(target)).is_some()
    }
}

/// What a call to [`transition`] did to the option.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Transition {
    /// The option already held the target and nothing value-changing was sent.
    Unchanged,
    /// The option was driven to the target.
    Reached {
        /// Index into the option's actions of the last action sent, used to look up
        /// its settle time.
        action: u8,
    },
    /// The target could not be reached. The option was left at `value`, which is
    /// the starting value unless part of a sequence went out.
    Stopped {
        /// Value matching the codes actually queued.
        value: u8,
    },
}

/// Drives `option` from `current` to `target`.
///
/// Without [`OptionFlags::ALWAYS_SET`] nothing happens when the values already match.
/// Unreachable targets send nothing, not even the pre-action.
pub fn transition<B, T, W>(
    ctx: &mut TransitionContext<'_, '_, B, T, W>,
    option: &OptionSpec<'_>,
    current: u8,
    target: u8,
) -> Transition
where
    B: I2c,
    T: OneShotTimer,
    W: FnMut(),
{
    if !is_reachable(option, target) {
        return Transition::Stopped { value: current };
    }
    if current == target && !option.flags.contains(OptionFlags::ALWAYS_SET) {
        return Transition::Unchanged;
    }

    if let Some(pre_action) = option.pre_action {
        let _ = ctx.press(pre_action);
    }

    if !option.flags.contains(OptionFlags::CYCLED) {
        return if ctx.press(option.actions[usize::from(target)]) {
            Transition::Reached { action: target }
        } else {
            Transition::Stopped { value: current }
        };
    }

    match *option.actions {
        [next] => {
            let mut value = current;
            while value != target {
                if !ctx.press(next) {
                    return Transition::Stopped { value };
                }
                value = if value >= option.max_value { 0 } else { value + 1 };
            }
            if current == target {
                Transition::Unchanged
            } else {
                Transition::Reached { action: 0 }
            }
        }
        [down, up] => {
            let mut value = current;
            let mut taken = None;
            if option.flags.contains(OptionFlags::ABSOLUTE_FROM_ZERO) && value != 0 {
                if !ctx.press_times(down, option.max_value) {
                    return Transition::Stopped { value };
                }
                taken = Some(0);
                value = 0;
            }
            if value < target {
                if !ctx.press_times(up, target - value) {
                    return Transition::Stopped { value };
                }
                taken = Some(1);
            } else if value > target {
                if !ctx.press_times(down, value - target) {
                    return Transition::Stopped { value };
                }
                taken = Some(0);
            }
            match taken {
                Some(action) => Transition::Reached { action },
                None => Transition::Unchanged,
            }
        }
        _ => Transition::Stopped { value: current },
    }
}
