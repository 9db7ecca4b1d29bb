// Licensed under the Apache-2.0 license

//! # TWI Master Primitives
//!
//! The primitive set a caller sequences by hand to run one bus transaction:
//!
//! ```text
//! init (once)
//! start -> transmit_address -> (transmit_byte | receive_byte)* -> stop
//! ```
//!
//! No primitive retries or releases the bus on its own. After any error the
//! caller decides whether to issue a repeated start or a stop; issuing
//! [`stop`](TwiMasterCore::stop) on every exit path keeps the bus usable for
//! the next transaction.

use crate::twi::common::{AckPolicy, Deadline, Direction, Prescaler, WaitOutcome};
use crate::twi::status::Error;
use fugit::HertzU32;

/// Master-mode primitives of a polled TWI controller.
///
/// # Examples
///
/// ```rust,no_run
/// use avr_twi::twi::{Direction, TwiMasterCore};
///
/// fn write_register<T: TwiMasterCore>(twi: &mut T, reg: u8, value: u8) -> Result<(), avr_twi::twi::Error> {
///     let result = twi
///         .start()
///         .and_then(|()| twi.transmit_address(0x50, Direction::Write))
///         .and_then(|()| twi.transmit_byte(reg))
///         .and_then(|()| twi.transmit_byte(value));
///     twi.stop();
///     result
/// }
/// ```
pub trait TwiMasterCore {
    /// Program prescaler and bit rate for `frequency`, then enable the controller.
    ///
    /// The divisor is not range-checked; see
    /// [`try_divisor`](crate::twi::common::try_divisor).
    fn init(&mut self, frequency: HertzU32, prescaler: Prescaler);

    /// Generate a start (or repeated start) condition.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedStatus`] when the controller reports anything other
    /// than start or repeated start sent.
    fn start_within(&mut self, deadline: Deadline) -> Result<(), Error>;

    /// Send the 7-bit `address` followed by the direction bit.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedStatus`] unless the address was acknowledged in the
    /// requested direction.
    fn transmit_address_within(
        &mut self,
        address: u8,
        direction: Direction,
        deadline: Deadline,
    ) -> Result<(), Error>;

    /// Send one data byte.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedStatus`] unless the peripheral acknowledged it.
    fn transmit_byte_within(&mut self, byte: u8, deadline: Deadline) -> Result<(), Error>;

    /// Clock in one byte, answering with `ack`.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if the controller did not finish in time,
    /// [`Error::UnexpectedStatus`] if it finished in a non-receive state.
    fn receive_byte_within(&mut self, ack: AckPolicy, deadline: Deadline) -> Result<u8, Error>;

    /// Generate a stop condition. Does not wait for the bus to be released.
    fn stop(&mut self);

    /// Poll the interrupt flag at most `budget` times.
    fn wait_ready(&mut self, budget: u8) -> WaitOutcome;

    /// Deadline applied by the plain Start, Address and Transmit primitives.
    fn phase_deadline(&self) -> Deadline {
        Deadline::Never
    }

    /// Poll budget applied by the plain Receive primitive.
    fn receive_budget(&self) -> u8 {
        crate::twi::common::DEFAULT_RECEIVE_BUDGET
    }

    /// [`start_within`](Self::start_within) with the phase deadline.
    ///
    /// # Errors
    ///
    /// See [`start_within`](Self::start_within).
    fn start(&mut self) -> Result<(), Error> {
        self.start_within(self.phase_deadline())
    }

    /// [`transmit_address_within`](Self::transmit_address_within) with the
    /// phase deadline.
    ///
    /// # Errors
    ///
    /// See [`transmit_address_within`](Self::transmit_address_within).
    fn transmit_address(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        self.transmit_address_within(address, direction, self.phase_deadline())
    }

    /// [`transmit_byte_within`](Self::transmit_byte_within) with the phase
    /// deadline.
    ///
    /// # Errors
    ///
    /// See [`transmit_byte_within`](Self::transmit_byte_within).
    fn transmit_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.transmit_byte_within(byte, self.phase_deadline())
    }

    /// [`receive_byte_within`](Self::receive_byte_within) bounded by the
    /// receive budget.
    ///
    /// # Errors
    ///
    /// See [`receive_byte_within`](Self::receive_byte_within).
    fn receive_byte(&mut self, ack: AckPolicy) -> Result<u8, Error> {
        let budget = u32::from(self.receive_budget());
        self.receive_byte_within(ack, Deadline::Polls(budget))
    }
}
