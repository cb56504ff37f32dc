//! IR codes, actions, and per-device toggle state.
//!
//! An [`IrCode`] is one protocol step, an [`IrAction`] an ordered list of steps
//! sent back to back (e.g. "power toggle" = two RC6 codes, a pause, one SIRC code).
//! Both are immutable and normally live in `static` configuration tables.
//!
//! ## Toggle bits
//!
//! Some protocols carry a bit that flips between logically distinct presses so the
//! receiver can tell a fresh keypress from a held one. A code with a non-zero
//! `toggle_mask` flips its device's [`ToggleFlag`] each time it is sent, and while
//! the flag is set the mask is OR'd into the payload.

use core::sync::atomic::{AtomicBool, Ordering};

/// The wire protocol of a single [`IrCode`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum IrEncoding {
    /// No transmission. The code's payload is a pause in milliseconds.
    #[default]
    Nop,
    /// Philips RC6.
    Rc6,
    /// Sony SIRC.
    Sirc,
}

/// One protocol step.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct IrCode {
    /// Protocol used to send `code`.
    pub encoding: IrEncoding,
    /// Number of payload bits to transmit.
    pub bits: u8,
    /// Payload, or the pause length in milliseconds for [`IrEncoding::Nop`].
    pub code: u32,
    /// Bit(s) OR'd into the payload on every other transmission. Zero disables toggling.
    pub toggle_mask: u32,
}

impl IrCode {
    /// An RC6 code of `bits` bits, counting the start, mode, and trailer bits.
    pub const fn rc6(bits: u8, code: u32) -> Self {
        Self {
            encoding: IrEncoding::Rc6,
            bits,
            code,
            toggle_mask: 0,
        }
    }

    /// A SIRC code of `bits` bits (12, 15, or 20 for real devices).
    pub const fn sirc(bits: u8, code: u32) -> Self {
        Self {
            encoding: IrEncoding::Sirc,
            bits,
            code,
            toggle_mask: 0,
        }
    }

    /// A pause of `ms` milliseconds between two transmitted codes.
    pub const fn pause_ms(ms: u32) -> Self {
        Self {
            encoding: IrEncoding::Nop,
            bits: 0,
            code: ms,
            toggle_mask: 0,
        }
    }

    /// Returns the same code with `mask` as its toggle mask.
    pub const fn with_toggle(mut self, mask: u32) -> Self {
        self.toggle_mask = mask;
        self
    }

    /// Computes the payload for the next transmission given the device's toggle flag.
    ///
    /// # Returns
    /// The payload and the flag value to commit once the packet has actually been sent.
    /// Codes without a toggle mask leave the flag as it is.
    pub fn next_payload(&self, toggle: &ToggleFlag) -> (u32, bool) {
        let current = toggle.get();
        if self.toggle_mask == 0 {
            return (self.code, current);
        }
        let next = !current;
        let payload = if next {
            self.code | self.toggle_mask
        } else {
            self.code
        };
        (payload, next)
    }
}

/// An ordered list of codes sent in sequence.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct IrAction<'a> {
    /// Steps, transmitted strictly in order.
    pub codes: &'a [IrCode],
}

impl<'a> IrAction<'a> {
    /// Wraps a list of codes.
    pub const fn new(codes: &'a [IrCode]) -> Self {
        Self { codes }
    }

    /// Number of steps in this action.
    pub const fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the action has no steps at all.
    pub const fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Current toggle-bit polarity of one device.
///
/// Written by the transmitter's drain step (interrupt context) and reset by the
/// device registry, so it is stored atomically. Only plain loads and stores are
/// used, which every Cortex-M core supports.
#[derive(Debug, Default)]
pub struct ToggleFlag(AtomicBool);

impl ToggleFlag {
    /// A cleared flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Current polarity.
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Overwrites the polarity.
    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}
