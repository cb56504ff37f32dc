//! Queued, interrupt-driven IR transmission.
//!
//! This module provides the [`IrTransmitter`], which sends [`IrAction`]s through an
//! I2C IR blaster without blocking the caller. Actions are appended to a small ring
//! buffer; a one-shot hardware timer then runs the *drain step*
//! ([`on_timer_fired`](IrTransmitter::on_timer_fired)) once per code, which encodes
//! the code, writes the packet to the bus, and re-arms the timer for exactly as long
//! as the blaster will be busy.
//!
//! ## Concurrency
//!
//! The queue is shared between main-line code (enqueue) and the timer interrupt
//! (drain). Both sides access it through `critical_section::with`, which masks
//! interrupts for the duration of the closure and restores them on every exit
//! path. Bus, timer, and the scratch [`IrPacket`] are only ever touched inside
//! that same section.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! use irblaster::code::{IrAction, IrCode, ToggleFlag};
//! use irblaster::config::TransmitterConfig;
//! use irblaster::timer::OneShotTimer;
//! use irblaster::transmitter::IrTransmitter;
//!
//! struct Tpm;
//! impl OneShotTimer for Tpm {
//!     fn start_ms(&mut self, _duration_ms: u32) {}
//!     fn stop(&mut self) {}
//! }
//!
//! static PAUSE: [IrCode; 1] = [IrCode::pause_ms(50)];
//! static WAIT: IrAction<'static> = IrAction::new(&PAUSE);
//! static TOGGLE: ToggleFlag = ToggleFlag::new();
//!
//! let bus = I2cMock::new(&[]);
//! let transmitter = IrTransmitter::new(bus, Tpm, TransmitterConfig::default());
//! transmitter.queue_action(&WAIT, &TOGGLE).unwrap();
//!
//! // Normally called from the timer interrupt.
//! assert_eq!(transmitter.on_timer_fired(), Some(50));
//! assert_eq!(transmitter.on_timer_fired(), None);
//! # let (mut bus, _) = transmitter.release();
//! # bus.done();
//! ```

use core::cell::RefCell;
use core::convert::Infallible;
use core::fmt;

use critical_section::Mutex;
use embedded_hal::i2c::{Error as _, I2c};

use crate::code::{IrAction, IrCode, IrEncoding, ToggleFlag};
use crate::config::TransmitterConfig;
use crate::encoding::IrPacket;
use crate::error::IrError;
use crate::queue::ActionQueue;
use crate::timer::{OneShotTimer, us_to_ms_ceil};

/// Counters describing what the drain step has done so far.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TransmitStats {
    /// Packets successfully written to the IR blaster.
    pub sent: u16,
    /// Codes skipped because they could not be encoded or written.
    pub dropped: u16,
}

/// Everything only the drain step and the enqueue kick-off touch.
struct Hardware<B, T> {
    bus: B,
    timer: T,
    packet: IrPacket,
    config: TransmitterConfig,
    stats: TransmitStats,
}

impl<B, T> Hardware<B, T>
where
    B: I2c,
    T: OneShotTimer,
{
    /// Sends one code and returns how long to wait before the next drain step.
    fn send_code(&mut self, code: &IrCode, toggle: &ToggleFlag) -> Result<u32, IrError> {
        if code.encoding == IrEncoding::Nop {
            trace!("ir pause {} ms", code.code);
            return Ok(code.code);
        }

        let (payload, next_toggle) = code.next_payload(toggle);
        self.packet
            .encode(code.encoding, payload, code.bits, self.config.sirc_repeats)?;
        let frame = self.packet.to_bytes();
        self.bus
            .write(self.config.bus_address, &frame)
            .map_err(|e| IrError::Bus(e.kind()))?;
        toggle.set(next_toggle);

        self.stats.sent = self.stats.sent.wrapping_add(1);
        trace!(
            "ir sent {:?} code {:x} ({} bits)",
            code.encoding,
            payload,
            code.bits
        );
        Ok(us_to_ms_ceil(self.packet.transmit_us()).saturating_add(self.config.post_packet_delay_ms))
    }
}

/// Sends IR actions through an I2C IR blaster, paced by a one-shot timer.
///
/// `queue_action` and friends are called from main-line code; `on_timer_fired`
/// must be called whenever the timer armed through `T` expires. All methods take
/// `&self`, so a transmitter can live in a `static` (see [`crate::timer`] for the
/// interrupt helpers).
///
/// ## Type Parameters
///
/// - `B`: The I2C bus the IR blaster sits on
/// - `T`: The one-shot timer driving the drain step
pub struct IrTransmitter<'a, B, T> {
    queue: Mutex<RefCell<ActionQueue<'a>>>,
    hardware: Mutex<RefCell<Hardware<B, T>>>,
}

impl<B, T> fmt::Debug for IrTransmitter<'_, B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrTransmitter").finish_non_exhaustive()
    }
}

impl<'a, B, T> IrTransmitter<'a, B, T>
where
    B: I2c,
    T: OneShotTimer,
{
    /// Creates a transmitter with an empty queue.
    ///
    /// # Arguments
    /// - `bus`: The I2C bus the IR blaster is attached to.
    /// - `timer`: The one-shot timer whose expiry calls [`on_timer_fired`](Self::on_timer_fired).
    /// - `config`: Bus address and protocol settings.
    ///
    /// # Notes
    /// The timer is stopped so no drain step runs before something is queued.
    pub fn new(bus: B, timer: T, config: TransmitterConfig) -> Self {
        let mut timer = timer;
        timer.stop();
        Self {
            queue: Mutex::new(RefCell::new(ActionQueue::new())),
            hardware: Mutex::new(RefCell::new(Hardware {
                bus,
                timer,
                packet: IrPacket::new(),
                config,
                stats: TransmitStats::default(),
            })),
        }
    }

    /// Consumes the transmitter, handing back the bus and the timer.
    pub fn release(self) -> (B, T) {
        let hardware = self.hardware.into_inner().into_inner();
        (hardware.bus, hardware.timer)
    }

    /// Appends `action` to the queue without blocking.
    ///
    /// If the queue was empty the timer is fired immediately, so the first code
    /// goes out without waiting for a tick.
    ///
    /// # Arguments
    /// - `action`: The codes to send.
    /// - `toggle`: The toggle flag of the device the action belongs to.
    ///
    /// # Errors
    /// [`IrError::QueueFull`] if four actions are already waiting.
    pub fn queue_action(&self, action: &'a IrAction<'a>, toggle: &'a ToggleFlag) -> Result<(), IrError> {
        critical_section::with(|cs| {
            let was_empty = match self.queue.borrow(cs).borrow_mut().push(action, toggle) {
                Ok(was_empty) => was_empty,
                Err(e) => {
                    debug!("ir queue full, rejecting action");
                    return Err(e);
                }
            };
            if was_empty {
                self.hardware.borrow(cs).borrow_mut().timer.fire_now();
            }
            Ok(())
        })
    }

    /// Queues `action`, calling `wait` until there is room for it.
    ///
    /// `wait` is the low-power wait of the platform (e.g. `cortex_m::asm::wfi`);
    /// the timer interrupt is what eventually frees a slot.
    pub fn send_action<W: FnMut()>(&self, action: &'a IrAction<'a>, toggle: &'a ToggleFlag, wait: &mut W) {
        while let Err(IrError::QueueFull) = self.queue_action(action, toggle) {
            wait();
        }
    }

    /// Queues `action` and blocks until every queued action has been sent.
    ///
    /// Used where the caller has nothing else to do, such as a single button press.
    pub fn do_action<W: FnMut()>(&self, action: &'a IrAction<'a>, toggle: &'a ToggleFlag, mut wait: W) {
        self.send_action(action, toggle, &mut wait);
        self.wait_idle(&mut wait);
    }

    /// Blocks, calling `wait`, until the queue has drained.
    pub fn wait_idle<W: FnMut()>(&self, wait: &mut W) {
        while let Err(nb::Error::WouldBlock) = self.poll_idle() {
            wait();
        }
    }

    /// Non-blocking check for an empty queue.
    ///
    /// # Returns
    /// - `Ok(())` once every queued code has been sent and its duration has elapsed
    /// - `Err(nb::Error::WouldBlock)` while actions are still pending
    pub fn poll_idle(&self) -> nb::Result<(), Infallible> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Whether the queue is empty.
    pub fn is_idle(&self) -> bool {
        critical_section::with(|cs| self.queue.borrow(cs).borrow().is_empty())
    }

    /// Number of actions currently queued.
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow(cs).borrow().len())
    }

    /// What the drain step has sent and dropped so far.
    pub fn stats(&self) -> TransmitStats {
        critical_section::with(|cs| self.hardware.borrow(cs).borrow().stats)
    }

    /// The drain step. Call this whenever the transmitter's timer expires.
    ///
    /// Advances the queue by one code and, for a pause, re-arms the timer for the
    /// pause; for an RC6 or SIRC code, encodes it, writes the packet to the bus, and
    /// re-arms the timer for the packet's full duration. A code that cannot be
    /// encoded or written is skipped and the next one is tried straight away, so a
    /// single bad code never stalls the queue.
    ///
    /// # Returns
    /// - `Some(ms)`: the timer was re-armed for `ms` milliseconds
    /// - `None`: the queue is empty and the timer has been stopped
    pub fn on_timer_fired(&self) -> Option<u32> {
        critical_section::with(|cs| {
            let mut queue = self.queue.borrow(cs).borrow_mut();
            let mut hardware = self.hardware.borrow(cs).borrow_mut();
            while let Some((code, toggle)) = queue.advance() {
                match hardware.send_code(&code, toggle) {
                    Ok(duration_ms) => {
                        hardware.timer.start_ms(duration_ms);
                        return Some(duration_ms);
                    }
                    Err(e) => {
                        warn!("ir code dropped: {:?}", e);
                        hardware.stats.dropped = hardware.stats.dropped.wrapping_add(1);
                    }
                }
            }
            hardware.timer.stop();
            None
        })
    }
}
