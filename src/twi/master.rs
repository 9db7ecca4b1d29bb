// Licensed under the Apache-2.0 license

//! Polled TWI master driver.
//!
//! [`TwiMaster`] implements the [`TwiMasterCore`] primitives on top of any
//! [`TwiRegisters`] implementation. All waits spin on the interrupt flag;
//! Start, Address and Transmit are unbounded unless a phase deadline is
//! configured, Receive is always bounded by the receive budget.

use core::convert::Infallible;

use crate::common::{Logger, NoOpLogger};
use crate::twi::common::{
    divisor, scl_frequency, AckPolicy, Deadline, Direction, Prescaler, TwiConfig, WaitOutcome,
};
use crate::twi::registers::{Register, TwiRegisters, TWEA, TWEN, TWINT, TWSTA, TWSTO};
use crate::twi::status::{Error, Status};
use crate::twi::traits::TwiMasterCore;
use fugit::HertzU32;

pub struct TwiMaster<R: TwiRegisters, L: Logger = NoOpLogger> {
    registers: R,
    config: TwiConfig,
    logger: L,
}

impl<R: TwiRegisters> TwiMaster<R, NoOpLogger> {
    pub fn new(registers: R, config: TwiConfig) -> Self {
        Self::with_logger(registers, config, NoOpLogger)
    }
}

impl<R: TwiRegisters, L: Logger> TwiMaster<R, L> {
    pub fn with_logger(registers: R, config: TwiConfig, logger: L) -> Self {
        Self {
            registers,
            config,
            logger,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TwiConfig {
        &self.config
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.registers
    }

    /// Release the register access and the logger.
    pub fn free(self) -> (R, L) {
        (self.registers, self.logger)
    }

    /// [`init`](TwiMasterCore::init) with the configured speed and prescaler.
    pub fn init_from_config(&mut self) {
        let frequency = self.config.speed.frequency();
        let prescaler = self.config.prescaler;
        self.init(frequency, prescaler);
    }

    /// Single non-blocking check of the interrupt flag.
    ///
    /// # Errors
    ///
    /// `nb::Error::WouldBlock` while the current operation is in progress.
    pub fn poll_ready(&mut self) -> nb::Result<(), Infallible> {
        if self.registers.read(Register::Control) & TWINT != 0 {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn wait(&mut self, deadline: Deadline) -> Result<(), Error> {
        match deadline {
            Deadline::Never => match nb::block!(self.poll_ready()) {
                Ok(()) => Ok(()),
                Err(never) => match never {},
            },
            Deadline::Polls(budget) => {
                for _ in 0..budget {
                    match self.poll_ready() {
                        Ok(()) => return Ok(()),
                        Err(nb::Error::WouldBlock) => {}
                        Err(nb::Error::Other(never)) => match never {},
                    }
                }
                Err(Error::Timeout)
            }
        }
    }

    fn status(&mut self) -> Status {
        Status::from_register(self.registers.read(Register::Status))
    }

    /// Wait for the kicked operation and check that it ended in `expected`.
    fn complete(
        &mut self,
        phase: &'static str,
        deadline: Deadline,
        expected: &[Status],
    ) -> Result<(), Error> {
        if let Err(error) = self.wait(deadline) {
            self.logger
                .error(format_args!("{phase}: no response within {deadline:?}"));
            return Err(error);
        }
        let status = self.status();
        if expected.contains(&status) {
            Ok(())
        } else {
            self.logger.error(format_args!("{phase}: {status:?}"));
            Err(Error::UnexpectedStatus(status))
        }
    }
}

impl<R: TwiRegisters, L: Logger> TwiMasterCore for TwiMaster<R, L> {
    fn init(&mut self, frequency: HertzU32, prescaler: Prescaler) {
        let reference = self.config.reference_clock;
        let bit_rate = divisor(reference, frequency, prescaler);

        self.registers.write(Register::Status, prescaler.selector());
        self.registers.write(Register::BitRate, bit_rate);
        self.registers.write(Register::Control, TWEN);

        self.logger.debug(format_args!(
            "init: TWBR={bit_rate} prescaler={prescaler:?} scl={}Hz",
            scl_frequency(reference, bit_rate, prescaler).raw()
        ));
    }

    fn start_within(&mut self, deadline: Deadline) -> Result<(), Error> {
        self.registers.write(Register::Control, TWINT | TWSTA | TWEN);
        self.complete("start", deadline, &[Status::START, Status::REP_START])
    }

    fn transmit_address_within(
        &mut self,
        address: u8,
        direction: Direction,
        deadline: Deadline,
    ) -> Result<(), Error> {
        let sla = ((address & 0x7F) << 1) | direction as u8;
        self.registers.write(Register::Data, sla);
        self.registers.write(Register::Control, TWINT | TWEN);

        let expected = match direction {
            Direction::Write => Status::MT_SLA_ACK,
            Direction::Read => Status::MR_SLA_ACK,
        };
        self.complete("address", deadline, &[expected])
    }

    fn transmit_byte_within(&mut self, byte: u8, deadline: Deadline) -> Result<(), Error> {
        self.registers.write(Register::Data, byte);
        self.registers.write(Register::Control, TWINT | TWEN);
        self.complete("transmit", deadline, &[Status::MT_DATA_ACK])
    }

    fn receive_byte_within(&mut self, ack: AckPolicy, deadline: Deadline) -> Result<u8, Error> {
        let ea = match ack {
            AckPolicy::SendAck => TWEA,
            AckPolicy::SendNack => 0,
        };
        self.registers.write(Register::Control, TWINT | TWEN | ea);
        self.complete(
            "receive",
            deadline,
            &[Status::MR_DATA_ACK, Status::MR_DATA_NACK],
        )?;
        Ok(self.registers.read(Register::Data))
    }

    fn stop(&mut self) {
        self.registers.write(Register::Control, TWINT | TWSTO | TWEN);
    }

    fn wait_ready(&mut self, budget: u8) -> WaitOutcome {
        match self.wait(Deadline::Polls(u32::from(budget))) {
            Ok(()) => WaitOutcome::Ready,
            Err(_) => WaitOutcome::TimedOut,
        }
    }

    fn phase_deadline(&self) -> Deadline {
        self.config.phase_deadline
    }

    fn receive_budget(&self) -> u8 {
        self.config.receive_budget
    }
}
