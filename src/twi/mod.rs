// Licensed under the Apache-2.0 license

//! AVR TWI (I2C) master driver.
//!
//! This module drives the two-wire interface of AVR microcontrollers in
//! polled master mode. It is designed for bare-metal and `no_std` use: the
//! primitives in [`TwiMasterCore`] map one-to-one onto the controller's bus
//! phases, and [`TwiController`] layers the embedded-hal I2C contract on top.

pub mod common;
pub mod i2c_controller;
pub mod master;
pub mod registers;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod status;
pub mod traits;

pub use common::{
    AckPolicy, BusSpeed, ConfigurationError, Deadline, Direction, Prescaler, TwiConfig,
    TwiConfigBuilder, WaitOutcome,
};
pub use i2c_controller::TwiController;
pub use master::TwiMaster;
pub use registers::{Mmio, Register, RegisterMap, TwiRegisters};
pub use status::{Error, Status, StatusCode};
pub use traits::TwiMasterCore;
