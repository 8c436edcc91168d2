//! Z-Wave Serial API controller.
//!
//! Implements the console's [`Controller`](zwave_console_core::Controller)
//! trait over a serial link: request framing, response and callback
//! handling, inclusion/exclusion, and the XML node configuration file.
mod config;
mod frame;
mod function;
mod serial_controller;

pub use serial_controller::{MAX_PAYLOAD, SerialController};
