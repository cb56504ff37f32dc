//! Runtime configuration for [`IrTransmitter`](crate::transmitter::IrTransmitter).

use crate::consts::{IR_BLASTER_ADDRESS, SIRC_DEFAULT_REPEATS};

/// Settings that depend on the board and the IR blaster rather than on the devices.
///
/// # Example
/// ```rust
/// use irblaster::config::TransmitterConfig;
///
/// let config = TransmitterConfig::new().with_sirc_repeats(4);
/// assert_eq!(config.bus_address, 0x70);
/// ```
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TransmitterConfig {
    /// I2C address of the IR blaster.
    pub bus_address: u8,
    /// How many frames every SIRC code is sent as.
    pub sirc_repeats: u8,
    /// Idle time added after each packet before the next code is sent.
    pub post_packet_delay_ms: u32,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmitterConfig {
    /// The default configuration: address `0x70`, three SIRC frames, no extra delay.
    pub const fn new() -> Self {
        Self {
            bus_address: IR_BLASTER_ADDRESS,
            sirc_repeats: SIRC_DEFAULT_REPEATS,
            post_packet_delay_ms: 0,
        }
    }

    /// Sets the IR blaster's bus address.
    pub const fn with_bus_address(mut self, address: u8) -> Self {
        self.bus_address = address;
        self
    }

    /// Sets the number of SIRC frames per code. Zero is treated as one.
    pub const fn with_sirc_repeats(mut self, repeats: u8) -> Self {
        self.sirc_repeats = repeats;
        self
    }

    /// Sets the idle time appended to every transmitted packet.
    pub const fn with_post_packet_delay_ms(mut self, delay_ms: u32) -> Self {
        self.post_packet_delay_ms = delay_ms;
        self
    }
}
