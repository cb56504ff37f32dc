//! Constants used across the IR encoding and scheduling implementation.
//!
//! This module defines the protocol timings for the supported IR encodings,
//! the layout of the packet sent to the IR blaster, and the fixed capacities
//! of the transmission queue and per-device state pools.
//!
//! ## Key Concepts
//!
//! - **Pulse timings**: All durations are in microseconds. A pulse train alternates
//!   mark (carrier on) and space (carrier off), beginning with a mark.
//! - **Packet layout**: A 4-byte header (`start`, `repeats`, `repeat_delay`, `length`)
//!   followed by `length` little-endian `u16` durations.
//! - **Capacities**: Everything is statically sized so the crate never allocates.

/// I2C address of the IR blaster peripheral.
pub const IR_BLASTER_ADDRESS: u8 = 0x70;

/// Value of the `start` byte that opens every packet written to the blaster.
pub const IR_PACKET_START: u8 = 1;

/// Maximum number of mark/space timing slots in a single packet.
pub const IR_MAX_PULSES: usize = 64;

/// Length (in bytes) of the packet header: `start`, `repeats`, `repeat_delay`, `length`.
pub const IR_PACKET_HEADER_LEN: usize = 4;

/// Largest frame ever written to the bus: the header plus every timing slot as a `u16`.
pub const IR_MAX_PACKET_BYTES: usize = IR_PACKET_HEADER_LEN + IR_MAX_PULSES * 2;

/// Number of actions the transmission queue can hold at once.
pub const ACTION_QUEUE_CAPACITY: usize = 4;

/// Maximum number of simultaneously active devices.
pub const MAX_DEVICES: usize = 32;

/// Size of the shared pool holding every active device's current option values.
pub const MAX_OPTION_VALUES: usize = 64;

/// Duration of one RC6 half-bit.
pub const RC6_UNIT_US: u16 = 444;

/// RC6 leader mark (6 units).
pub const RC6_HEADER_MARK_US: u16 = RC6_UNIT_US * 6;

/// RC6 leader space (2 units).
pub const RC6_HEADER_SPACE_US: u16 = RC6_UNIT_US * 2;

/// Position (counting from the first transmitted bit) of the double-width trailer bit.
pub const RC6_TRAILER_BIT_POSITION: u8 = 4;

/// Signal-free time closing every RC6 packet (6 units).
pub const RC6_SIGNAL_FREE_US: u16 = RC6_UNIT_US * 6;

/// SIRC leader mark.
pub const SIRC_HEADER_MARK_US: u16 = 2400;

/// SIRC leader space.
pub const SIRC_HEADER_SPACE_US: u16 = 600;

/// SIRC mark for a `1` bit.
pub const SIRC_ONE_MARK_US: u16 = 1200;

/// SIRC mark for a `0` bit.
pub const SIRC_ZERO_MARK_US: u16 = 600;

/// SIRC space following every bit mark.
pub const SIRC_SPACE_US: u16 = 600;

/// Start-to-start period of repeated SIRC frames.
pub const SIRC_FRAME_PERIOD_US: u32 = 45_000;

/// Lower bound for the SIRC inter-repeat gap, in milliseconds.
pub const SIRC_MIN_REPEAT_DELAY_MS: u8 = 1;

/// Sony receivers expect each command at least three times.
pub const SIRC_DEFAULT_REPEATS: u8 = 3;
