//! Error types for encoding and transmission.
//!
//! None of these are fatal. A full queue is reported to the caller, who may retry
//! or drop the keypress. Encoding and bus failures only ever surface inside a
//! drain step, where the offending code is skipped and transmission carries on.

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

/// Failure to turn a logical code into a pulse train.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum EncodeError {
    /// The pulse train needs more timing slots than a packet can hold.
    #[error("pulse train does not fit in the packet timing buffer")]
    BufferOverflow,
    /// A single mark or space would exceed 65535 µs.
    #[error("pulse duration exceeds the 16-bit microsecond range")]
    DurationOverflow,
}

/// Errors raised by the transmission pipeline.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum IrError {
    /// The transmission queue already holds its maximum number of actions.
    #[error("transmission queue is full")]
    QueueFull,
    /// A code could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The IR blaster rejected the packet.
    #[error("bus write to the IR blaster failed: {0:?}")]
    Bus(ErrorKind),
    /// The global transmitter has not been set up yet.
    #[error("IR transmitter is not initialized")]
    NotInitialized,
}
