//! RC6 and SIRC pulse-train encoding.
//!
//! This module turns a logical code (payload + bit count) into the alternating
//! mark/space durations the IR blaster replays, stored in an [`IrPacket`].
//!
//! ## Pulse state machine
//!
//! Encoders never write timing slots directly. They request marks and spaces
//! from a small state machine (`Undefined`, `Mark`, `Space`) which coalesces
//! consecutive requests of the same polarity into one slot and opens a new slot
//! whenever the polarity changes. Every accumulation is checked:
//!
//! - more than [`IR_MAX_PULSES`] slots fails with [`EncodeError::BufferOverflow`]
//! - a slot longer than `u16::MAX` µs fails with [`EncodeError::DurationOverflow`]
//!
//! Either way the packet is left unusable and the caller decides whether to
//! drop the command; a truncated packet is never produced.
//!
//! ## Protocols
//!
//! - **RC6**: leader mark and space, then one half-bit pair per bit, most
//!   significant first. `1` is sent space-then-mark, `0` mark-then-space, and the
//!   trailer bit at position [`RC6_TRAILER_BIT_POSITION`] is twice as wide. A
//!   signal-free space closes the packet. Sent once.
//! - **SIRC**: leader mark and space, then a long (`1`) or short (`0`) mark per bit,
//!   least significant first, each followed by a fixed space. The blaster repeats
//!   the frame, and the gap is shortened by the frame's own length so frames start
//!   every [`SIRC_FRAME_PERIOD_US`].

use heapless::Vec;

use crate::code::IrEncoding;
use crate::consts::{
    IR_MAX_PACKET_BYTES, IR_MAX_PULSES, IR_PACKET_START, RC6_HEADER_MARK_US,
    RC6_HEADER_SPACE_US, RC6_SIGNAL_FREE_US, RC6_TRAILER_BIT_POSITION, RC6_UNIT_US,
    SIRC_FRAME_PERIOD_US, SIRC_HEADER_MARK_US, SIRC_HEADER_SPACE_US, SIRC_MIN_REPEAT_DELAY_MS,
    SIRC_ONE_MARK_US, SIRC_SPACE_US, SIRC_ZERO_MARK_US,
};
use crate::error::EncodeError;
use crate::timer::us_to_ms_ceil;

/// Widest payload an encoder accepts. Bit counts are 5-bit fields, so 31.
const MAX_PAYLOAD_BITS: u8 = 31;

/// A packet ready to be written to the IR blaster.
///
/// The packet doubles as scratch storage: the transmitter keeps one and re-encodes
/// into it for every code, so only one is ever in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrPacket {
    /// Start marker byte.
    pub start: u8,
    /// How many times the blaster sends the pulse train.
    pub repeats: u8,
    /// Gap between repeats, in milliseconds.
    pub repeat_delay: u8,
    /// Number of valid entries in `timing`.
    pub length: u8,
    /// Alternating mark/space durations in microseconds, beginning with a mark.
    pub timing: [u16; IR_MAX_PULSES],
    /// Sum of every valid timing slot, i.e. the duration of one pulse train.
    pub active_us: u32,
}

impl Default for IrPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl IrPacket {
    /// An empty packet.
    pub const fn new() -> Self {
        Self {
            start: IR_PACKET_START,
            repeats: 1,
            repeat_delay: 0,
            length: 0,
            timing: [0; IR_MAX_PULSES],
            active_us: 0,
        }
    }

    /// The valid timing slots.
    pub fn pulses(&self) -> &[u16] {
        &self.timing[..self.length as usize]
    }

    /// Total time the blaster is busy with this packet, repeats and gaps included.
    pub fn transmit_us(&self) -> u32 {
        let repeats = u32::from(self.repeats.max(1));
        self.active_us
            .saturating_mul(repeats)
            .saturating_add(u32::from(self.repeat_delay) * 1000 * (repeats - 1))
    }

    /// Serializes the packet into the frame written to the bus.
    ///
    /// # Returns
    /// The 4 header bytes followed by `length` little-endian `u16` durations.
    pub fn to_bytes(&self) -> Vec<u8, IR_MAX_PACKET_BYTES> {
        let mut frame = Vec::new();
        let _ = frame.extend_from_slice(&[self.start, self.repeats, self.repeat_delay, self.length]);
        for pulse in self.pulses() {
            let _ = frame.extend_from_slice(&pulse.to_le_bytes());
        }
        frame
    }

    /// Encodes `payload` into this packet using `encoding`.
    ///
    /// # Arguments
    /// - `encoding`: The protocol to use. [`IrEncoding::Nop`] yields an empty packet.
    /// - `payload`: The code, toggle bit already applied.
    /// - `bits`: Number of payload bits to send.
    /// - `repeats`: Number of SIRC frames to send. Ignored for RC6.
    ///
    /// # Errors
    /// [`EncodeError`] if the pulse train does not fit. The packet contents are
    /// unspecified afterwards.
    pub fn encode(
        &mut self,
        encoding: IrEncoding,
        payload: u32,
        bits: u8,
        repeats: u8,
    ) -> Result<(), EncodeError> {
        match encoding {
            IrEncoding::Nop => {
                let _ = PulseWriter::new(self);
                Ok(())
            }
            IrEncoding::Rc6 => encode_rc6(self, payload, bits),
            IrEncoding::Sirc => encode_sirc(self, payload, bits, repeats),
        }
    }
}

/// Encodes a code into a fresh packet. See [`IrPacket::encode`].
pub fn encode(encoding: IrEncoding, payload: u32, bits: u8, repeats: u8) -> Result<IrPacket, EncodeError> {
    let mut packet = IrPacket::new();
    packet.encode(encoding, payload, bits, repeats)?;
    Ok(packet)
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Polarity {
    Undefined,
    Mark,
    Space,
}

/// Accumulates marks and spaces into a packet, coalescing equal polarities.
struct PulseWriter<'p> {
    packet: &'p mut IrPacket,
    state: Polarity,
}

impl<'p> PulseWriter<'p> {
    fn new(packet: &'p mut IrPacket) -> Self {
        packet.start = IR_PACKET_START;
        packet.repeats = 1;
        packet.repeat_delay = 0;
        packet.length = 0;
        packet.active_us = 0;
        Self {
            packet,
            state: Polarity::Undefined,
        }
    }

    fn mark(&mut self, us: u16) -> Result<(), EncodeError> {
        self.push(Polarity::Mark, us)
    }

    fn space(&mut self, us: u16) -> Result<(), EncodeError> {
        // The line is idle before the first mark, so a leading space carries nothing.
        if self.state == Polarity::Undefined {
            return Ok(());
        }
        self.push(Polarity::Space, us)
    }

    fn push(&mut self, polarity: Polarity, us: u16) -> Result<(), EncodeError> {
        let length = self.packet.length as usize;
        if self.state == polarity {
            let slot = &mut self.packet.timing[length - 1];
            *slot = slot.checked_add(us).ok_or(EncodeError::DurationOverflow)?;
        } else {
            if length >= IR_MAX_PULSES {
                return Err(EncodeError::BufferOverflow);
            }
            self.packet.timing[length] = us;
            self.packet.length += 1;
            self.state = polarity;
        }
        self.packet.active_us += u32::from(us);
        Ok(())
    }
}

/// Encodes `bits` bits of `payload` as RC6 into `packet`.
pub fn encode_rc6(packet: &mut IrPacket, payload: u32, bits: u8) -> Result<(), EncodeError> {
    if bits > MAX_PAYLOAD_BITS {
        return Err(EncodeError::BufferOverflow);
    }
    let mut writer = PulseWriter::new(packet);
    writer.mark(RC6_HEADER_MARK_US)?;
    writer.space(RC6_HEADER_SPACE_US)?;

    for position in 0..bits {
        let bit = (payload >> (bits - 1 - position)) & 1;
        let unit = if position == RC6_TRAILER_BIT_POSITION {
            RC6_UNIT_US * 2
        } else {
            RC6_UNIT_US
        };
        if bit == 1 {
            writer.space(unit)?;
            writer.mark(unit)?;
        } else {
            writer.mark(unit)?;
            writer.space(unit)?;
        }
    }

    writer.space(RC6_SIGNAL_FREE_US)
}

/// Encodes `bits` bits of `payload` as SIRC into `packet`, sent `repeats` times.
pub fn encode_sirc(
    packet: &mut IrPacket,
    payload: u32,
    bits: u8,
    repeats: u8,
) -> Result<(), EncodeError> {
    if bits > MAX_PAYLOAD_BITS {
        return Err(EncodeError::BufferOverflow);
    }
    let mut writer = PulseWriter::new(packet);
    writer.mark(SIRC_HEADER_MARK_US)?;
    writer.space(SIRC_HEADER_SPACE_US)?;

    for position in 0..bits {
        let mark = if (payload >> position) & 1 == 1 {
            SIRC_ONE_MARK_US
        } else {
            SIRC_ZERO_MARK_US
        };
        writer.mark(mark)?;
        writer.space(SIRC_SPACE_US)?;
    }

    let gap_ms = us_to_ms_ceil(SIRC_FRAME_PERIOD_US.saturating_sub(packet.active_us));
    packet.repeats = repeats.max(1);
    packet.repeat_delay = u8::try_from(gap_ms)
        .unwrap_or(u8::MAX)
        .max(SIRC_MIN_REPEAT_DELAY_MS);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc6_nominal_us(bits: u8) -> u32 {
        let mut total = u32::from(RC6_HEADER_MARK_US) + u32::from(RC6_HEADER_SPACE_US);
        for position in 0..bits {
            let unit = if position == RC6_TRAILER_BIT_POSITION { 2 } else { 1 };
            total += 2 * unit * u32::from(RC6_UNIT_US);
        }
        total + u32::from(RC6_SIGNAL_FREE_US)
    }

    #[test]
    fn test_sirc_pulse_count_and_duration() {
        // 12-bit Sony "power" (device 1, command 21)
        let packet = encode(IrEncoding::Sirc, 0x095, 12, 3).unwrap();
        assert_eq!(packet.length, 2 + 2 * 12);

        let ones = 0x095u32.count_ones();
        let expected = 2400 + 600 + ones * 1200 + (12 - ones) * 600 + 12 * 600;
        assert_eq!(packet.active_us, expected);
        assert_eq!(packet.pulses().iter().map(|&p| u32::from(p)).sum::<u32>(), expected);

        // First data bit is the LSB (1), so a long mark follows the leader.
        assert_eq!(&packet.pulses()[..4], &[2400, 600, 1200, 600]);
    }

    #[test]
    fn test_sirc_repeat_gap_fills_frame_period() {
        let packet = encode(IrEncoding::Sirc, 0x095, 12, 3).unwrap();
        assert_eq!(packet.repeats, 3);
        let gap_us = SIRC_FRAME_PERIOD_US - packet.active_us;
        assert_eq!(u32::from(packet.repeat_delay), gap_us.div_ceil(1000));
        assert!(packet.active_us + u32::from(packet.repeat_delay) * 1000 >= SIRC_FRAME_PERIOD_US);
        assert_eq!(
            packet.transmit_us(),
            packet.active_us * 3 + u32::from(packet.repeat_delay) * 2000
        );
    }

    #[test]
    fn test_sirc_long_frame_keeps_minimum_gap() {
        // 31 ones: 2400 + 600 + 31 * 1800 = 58_800 µs, longer than the frame period.
        let packet = encode(IrEncoding::Sirc, 0x7fff_ffff, 31, 2).unwrap();
        assert_eq!(packet.length, 64);
        assert_eq!(packet.repeat_delay, SIRC_MIN_REPEAT_DELAY_MS);
    }

    #[test]
    fn test_rc6_matches_nominal_time() {
        // RC6 mode 0: start bit, mode 000, trailer 0, address 0x04, command 0x0c
        let payload = 0b1_000_0_00000100_00001100;
        let packet = encode(IrEncoding::Rc6, payload, 21, 3).unwrap();
        assert_eq!(packet.repeats, 1);
        assert_eq!(packet.repeat_delay, 0);
        assert_eq!(packet.active_us, rc6_nominal_us(21));
        assert!(packet.length as usize <= 3 + 2 * 21);
        assert_eq!(packet.pulses()[0], RC6_HEADER_MARK_US);
    }

    #[test]
    fn test_rc6_inverted_biphase() {
        // Leading 1: header space merges with the bit's space, then a unit mark.
        let packet = encode(IrEncoding::Rc6, 0b1, 1, 1).unwrap();
        assert_eq!(
            packet.pulses(),
            &[RC6_HEADER_MARK_US, RC6_HEADER_SPACE_US + RC6_UNIT_US, RC6_UNIT_US, RC6_SIGNAL_FREE_US]
        );

        // Leading 0: mark then space, which merges into the signal-free space.
        let packet = encode(IrEncoding::Rc6, 0b0, 1, 1).unwrap();
        assert_eq!(
            packet.pulses(),
            &[
                RC6_HEADER_MARK_US,
                RC6_HEADER_SPACE_US,
                RC6_UNIT_US,
                RC6_UNIT_US + RC6_SIGNAL_FREE_US
            ]
        );
    }

    #[test]
    fn test_rc6_trailer_bit_is_double_width() {
        // Bits 0,0,0,0 then trailer 0: the fifth mark is two units wide.
        let packet = encode(IrEncoding::Rc6, 0, 5, 1).unwrap();
        let marks: Vec<u16, 8> = packet.pulses().iter().step_by(2).copied().collect();
        assert_eq!(
            marks.as_slice(),
            &[RC6_HEADER_MARK_US, RC6_UNIT_US, RC6_UNIT_US, RC6_UNIT_US, RC6_UNIT_US, RC6_UNIT_US * 2]
        );
    }

    #[test]
    fn test_rc6_overflow_is_rejected() {
        assert_eq!(
            encode(IrEncoding::Rc6, u32::MAX, 32, 1),
            Err(EncodeError::BufferOverflow)
        );
        assert_eq!(
            encode(IrEncoding::Rc6, 0, 40, 1),
            Err(EncodeError::BufferOverflow)
        );
    }

    #[test]
    fn test_32_bit_payloads_are_rejected() {
        // Alternating bits never coalesce, so this would otherwise fit the slots.
        assert_eq!(
            encode(IrEncoding::Rc6, 0xAAAA_AAAA, 32, 1),
            Err(EncodeError::BufferOverflow)
        );
        assert_eq!(
            encode(IrEncoding::Sirc, 0, 32, 1),
            Err(EncodeError::BufferOverflow)
        );
        assert!(encode(IrEncoding::Rc6, 0xAAAA_AAAA, 31, 1).is_ok());
    }

    #[test]
    fn test_duration_overflow_is_rejected() {
        let mut packet = IrPacket::new();
        let mut writer = PulseWriter::new(&mut packet);
        writer.mark(60_000).unwrap();
        assert_eq!(writer.mark(6_000), Err(EncodeError::DurationOverflow));
    }

    #[test]
    fn test_nop_clears_packet() {
        let mut packet = encode(IrEncoding::Sirc, 0x095, 12, 3).unwrap();
        packet.encode(IrEncoding::Nop, 0, 0, 0).unwrap();
        assert_eq!(packet.length, 0);
        assert_eq!(packet.transmit_us(), 0);
    }

    #[test]
    fn test_frame_layout() {
        let packet = encode(IrEncoding::Sirc, 0b1, 1, 1).unwrap();
        let frame = packet.to_bytes();
        assert_eq!(
            frame.as_slice(),
            &[
                IR_PACKET_START,
                1,
                packet.repeat_delay,
                4,
                0x60,
                0x09, // 2400
                0x58,
                0x02, // 600
                0xb0,
                0x04, // 1200
                0x58,
                0x02, // 600
            ]
        );
    }
}
