//! Device and option model.
//!
//! Configuration lives in a read-only [`RemoteData`] arena: a table of actions, a
//! table of options, a table of devices, and a table of activities, cross-referenced
//! by typed handles ([`ActionId`], [`DeviceId`], [`ActivityId`]) instead of raw
//! offsets. Every lookup is checked and returns `Option`, so a malformed handle
//! silently does nothing rather than faulting.
//!
//! Dynamic per-device state (toggle flags and tracked option values) is kept apart
//! in a [`DeviceRegistry`], re-initialized whenever the set of active devices
//! changes. Since IR is one-way the tracked values are never re-read from the
//! devices; they are only ever updated alongside the codes actually queued.

use core::ops::BitOr;

use heapless::Vec;

use crate::code::{IrAction, ToggleFlag};
use crate::consts::{MAX_DEVICES, MAX_OPTION_VALUES};

/// Handle of an [`IrAction`] in [`RemoteData::actions`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ActionId(pub u16);

/// Handle of a [`Device`] in [`RemoteData::devices`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DeviceId(pub u8);

/// Handle of an [`Activity`] in [`RemoteData::activities`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ActivityId(pub u8);

/// Behavior flags of an [`OptionSpec`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct OptionFlags(u16);

impl OptionFlags {
    /// No flags: the option is set by pressing the action at index `value`.
    pub const NONE: Self = Self(0);
    /// The option is stepped through with "next" (one action) or "down"/"up" (two actions).
    pub const CYCLED: Self = Self(0x0001);
    /// Devices left out of an activity fall back to value 0.
    pub const DEFAULT_TO_ZERO: Self = Self(0x0002);
    /// Falling back to 0 sends codes; without it the value is only recorded.
    pub const ACTION_ON_DEFAULT: Self = Self(0x0004);
    /// Send codes even when the tracked value already equals the target.
    pub const ALWAYS_SET: Self = Self(0x0008);
    /// Two-action cycled options first step down to a known zero.
    pub const ABSOLUTE_FROM_ZERO: Self = Self(0x0010);

    /// Flags from their raw representation.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw representation.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Both sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for OptionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One configurable axis of a device, e.g. input or power.
#[derive(Clone, Copy, Debug)]
pub struct OptionSpec<'a> {
    /// How the option is driven.
    pub flags: OptionFlags,
    /// Highest valid value.
    pub max_value: u8,
    /// Actions realizing the transitions. Direct options index this by value;
    /// cycled options use `[next]` or `[down, up]`.
    pub actions: &'a [ActionId],
    /// Action sent once before any value change, e.g. waking the device.
    pub pre_action: Option<ActionId>,
    /// Settle time in milliseconds after a transition, indexed like `actions`.
    pub post_delays: &'a [u16],
}

impl<'a> OptionSpec<'a> {
    /// A direct-indexed option without pre-action or settle times.
    pub const fn new(flags: OptionFlags, max_value: u8, actions: &'a [ActionId]) -> Self {
        Self {
            flags,
            max_value,
            actions,
            pre_action: None,
            post_delays: &[],
        }
    }

    /// Sets the pre-action.
    pub const fn with_pre_action(mut self, action: ActionId) -> Self {
        self.pre_action = Some(action);
        self
    }

    /// Sets the settle-time table.
    pub const fn with_post_delays(mut self, post_delays: &'a [u16]) -> Self {
        self.post_delays = post_delays;
        self
    }

    /// Settle time after taking the transition at `action_index`, zero if none is listed.
    pub fn post_delay(&self, action_index: u8) -> u16 {
        self.post_delays
            .get(usize::from(action_index))
            .copied()
            .unwrap_or(0)
    }
}

/// A physical device: a contiguous run of options in [`RemoteData::options`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Device {
    /// Index of the device's first option.
    pub first_option: u16,
    /// Number of options.
    pub option_count: u8,
}

impl Device {
    /// A device owning `option_count` options starting at `first_option`.
    pub const fn new(first_option: u16, option_count: u8) -> Self {
        Self {
            first_option,
            option_count,
        }
    }
}

/// A target for one device: a value per option.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DeviceState<'a> {
    /// The device to drive.
    pub device: DeviceId,
    /// Target value of each option, in option order.
    pub values: &'a [u8],
}

impl<'a> DeviceState<'a> {
    /// Targets `values` for `device`.
    pub const fn new(device: DeviceId, values: &'a [u8]) -> Self {
        Self { device, values }
    }
}

/// A user-facing configuration ("Watch TV") applied as one batch of device states.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Activity<'a> {
    /// Targets for the devices the activity uses. All others go to their defaults.
    pub states: &'a [DeviceState<'a>],
}

/// Read-only configuration arena.
#[derive(Clone, Copy, Debug)]
pub struct RemoteData<'a> {
    /// Every IR action.
    pub actions: &'a [IrAction<'a>],
    /// Every option, grouped per device.
    pub options: &'a [OptionSpec<'a>],
    /// Every device.
    pub devices: &'a [Device],
    /// Every activity.
    pub activities: &'a [Activity<'a>],
    /// Activity selected at power-up.
    pub home_activity: Option<ActivityId>,
}

impl<'a> RemoteData<'a> {
    /// Resolves an action handle.
    pub fn action(&self, id: ActionId) -> Option<&'a IrAction<'a>> {
        self.actions.get(usize::from(id.0))
    }

    /// Resolves a device handle.
    pub fn device(&self, id: DeviceId) -> Option<&'a Device> {
        self.devices.get(usize::from(id.0))
    }

    /// Resolves an activity handle.
    pub fn activity(&self, id: ActivityId) -> Option<&'a Activity<'a>> {
        self.activities.get(usize::from(id.0))
    }

    /// The options of a device, empty if the handle or its option range is invalid.
    pub fn device_options(&self, id: DeviceId) -> &'a [OptionSpec<'a>] {
        let Some(device) = self.device(id) else {
            return &[];
        };
        let start = usize::from(device.first_option);
        let end = start + usize::from(device.option_count);
        self.options.get(start..end).unwrap_or(&[])
    }

    /// Handles of every device, in table order.
    pub fn device_ids(&self) -> impl Iterator<Item = DeviceId> + use<'a> {
        (0..self.devices.len().min(usize::from(u8::MAX) + 1)).map(|i| DeviceId(i as u8))
    }
}

/// Where an active device's option values live in the shared pool.
#[derive(Clone, Copy, Debug)]
struct ActiveDevice {
    id: DeviceId,
    values: Option<(usize, usize)>,
}

/// Dynamic state of the active devices.
///
/// Toggle flags live in caller-provided storage (usually a `static`) because the
/// transmitter's interrupt flips them while actions are in flight.
#[derive(Debug)]
pub struct DeviceRegistry<'a> {
    data: &'a RemoteData<'a>,
    toggles: &'a [ToggleFlag; MAX_DEVICES],
    active: Vec<ActiveDevice, MAX_DEVICES>,
    values: [u8; MAX_OPTION_VALUES],
}

impl<'a> DeviceRegistry<'a> {
    /// Creates a registry with no active devices.
    ///
    /// # Arguments
    /// - `data`: The configuration arena.
    /// - `toggles`: One toggle flag per possible active device.
    pub fn new(data: &'a RemoteData<'a>, toggles: &'a [ToggleFlag; MAX_DEVICES]) -> Self {
        Self {
            data,
            toggles,
            active: Vec::new(),
            values: [0; MAX_OPTION_VALUES],
        }
    }

    /// The configuration arena.
    pub fn data(&self) -> &'a RemoteData<'a> {
        self.data
    }

    /// Replaces the set of active devices and resets all their dynamic state.
    ///
    /// Option values are handed out from the shared pool in order; devices that no
    /// longer fit, or beyond [`MAX_DEVICES`], get no storage and are left alone by
    /// the scheduler.
    pub fn set_active(&mut self, devices: &[DeviceId]) {
        self.active.clear();
        self.values = [0; MAX_OPTION_VALUES];
        for toggle in self.toggles.iter() {
            toggle.set(false);
        }

        let mut next_value = 0;
        for &id in devices {
            let count = self.data.device_options(id).len();
            let values = if next_value + count <= MAX_OPTION_VALUES {
                let range = (next_value, next_value + count);
                next_value += count;
                Some(range)
            } else {
                warn!("no option storage left for device {}", id.0);
                None
            };
            if self.active.push(ActiveDevice { id, values }).is_err() {
                warn!("too many active devices, ignoring device {}", id.0);
                break;
            }
        }
        debug!("{} devices active, {} option values", self.active.len(), next_value);
    }

    /// Activates every device in the arena.
    pub fn set_all_active(&mut self) {
        let ids: Vec<DeviceId, MAX_DEVICES> = self.data.device_ids().take(MAX_DEVICES).collect();
        self.set_active(&ids);
    }

    /// Number of active devices.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Handle of the active device at `index`.
    pub fn active_device(&self, index: usize) -> Option<DeviceId> {
        self.active.get(index).map(|device| device.id)
    }

    /// Position of `id` in the active set.
    pub fn index_of(&self, id: DeviceId) -> Option<usize> {
        self.active.iter().position(|device| device.id == id)
    }

    /// Tracked option values of the active device at `index`.
    pub fn option_values(&self, index: usize) -> Option<&[u8]> {
        let (start, end) = self.active.get(index)?.values?;
        self.values.get(start..end)
    }

    /// Mutable tracked option values of the active device at `index`.
    pub fn option_values_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let (start, end) = self.active.get(index)?.values?;
        self.values.get_mut(start..end)
    }

    /// Toggle flag storage of the active device at `index`.
    pub fn toggle(&self, index: usize) -> Option<&'a ToggleFlag> {
        if index < self.active.len() {
            self.toggles.get(index)
        } else {
            None
        }
    }

    /// Current toggle polarity of `id`, `false` if it is not active.
    pub fn toggle_flag(&self, id: DeviceId) -> bool {
        self.index_of(id)
            .and_then(|index| self.toggle(index))
            .is_some_and(ToggleFlag::get)
    }

    /// Overwrites the toggle polarity of `id`. Does nothing if it is not active.
    pub fn set_toggle_flag(&self, id: DeviceId, value: bool) {
        if let Some(toggle) = self.index_of(id).and_then(|index| self.toggle(index)) {
            toggle.set(value);
        }
    }
}
