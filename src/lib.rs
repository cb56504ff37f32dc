//! # irblaster
//!
//! A portable, no_std Rust core for infrared universal remotes: it turns "put this
//! device into this state" requests into precisely timed IR pulse trains, sent
//! through an external I2C IR blaster.
//!
//! The crate is built from three layers:
//! - a pulse-train encoder for the Philips RC6 and Sony SIRC protocols
//! - an interrupt-driven transmitter with a 4-slot action queue and per-device toggle bits
//! - a parallel device-state scheduler that switches many devices at once, each
//!   with its own settle delays
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support (host builds and tests) |
//! | `delay-loop`          | Drains the transmitter with `embedded_hal::delay::DelayNs` |
//! | `timer-isr` (default) | Global transmitter helpers for use from a timer interrupt |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **RC6 mode 0** (biphase, double-width trailer bit) and **SIRC** (pulse width,
//!   LSB first, repeated on a 45 ms frame period) encoders with overflow checks
//! - **Toggle bits** tracked per device, flipped only once a packet is on the bus
//! - **Non-blocking queueing** with `critical-section`; a one-shot timer paces
//!   every packet by its exact duration
//! - **Activities**: devices, options, and target states live in a read-only arena
//!   addressed by typed handles
//!
//! ## Usage
//!
//! ```rust,ignore
//! use irblaster::config::TransmitterConfig;
//! use irblaster::device::DeviceRegistry;
//! use irblaster::switcher::switch_home_activity;
//! use irblaster::transmitter::IrTransmitter;
//!
//! let transmitter = IrTransmitter::new(i2c, tpm, TransmitterConfig::default());
//! let mut registry = DeviceRegistry::new(&REMOTE_DATA, &TOGGLES);
//! registry.set_all_active();
//! switch_home_activity(&transmitter, &mut registry, &mut clock, cortex_m::asm::wfi);
//! ```
//!
//! The timer interrupt must call
//! [`IrTransmitter::on_timer_fired`](transmitter::IrTransmitter::on_timer_fired), or
//! `ir_timer_fired!()` when the transmitter lives in the global slot declared with
//! `init_ir_transmitter!`.
//!
//! ## Integration Notes
//!
//! - The IR blaster receives one I2C block write per packet: 4 header bytes, then
//!   little-endian 16-bit mark/space durations in microseconds
//! - Timer durations are whole milliseconds, rounded up from the packet length
//! - Only one transmitter should own the blaster at a time
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

pub use critical_section;
pub use heapless;

#[macro_use]
mod fmt;

pub mod code;
pub mod config;
pub mod consts;
pub mod device;
pub mod encoding;
pub mod error;
pub mod queue;
pub mod switcher;
pub mod timer;
pub mod transition;
pub mod transmitter;
